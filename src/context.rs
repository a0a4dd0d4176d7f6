use crate::id::GeometryId;
use crate::program::{Program, UniformLocation};
use crate::state_set::StateAttribute;

/// Pixel rectangle the stage renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Which buffers a stage clears before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const NONE: ClearMask = ClearMask {
        color: false,
        depth: false,
        stencil: false,
    };

    pub const COLOR_DEPTH: ClearMask = ClearMask {
        color: true,
        depth: true,
        stencil: false,
    };

    pub fn is_empty(&self) -> bool {
        !(self.color || self.depth || self.stencil)
    }
}

impl Default for ClearMask {
    fn default() -> Self {
        ClearMask::COLOR_DEPTH
    }
}

/// Output a stage draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTarget {
    /// The surface the frame is presented on.
    #[default]
    Surface,
    /// An offscreen texture, e.g. a shadow map.
    Texture(u64),
}

/// One geometry submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub geometry: GeometryId,
    pub topology: wgpu::PrimitiveTopology,
    pub vertices: std::ops::Range<u32>,
    pub instances: std::ops::Range<u32>,
}

/// The device seam. Every draw-path operation receives the active context
/// explicitly; nothing in this crate keeps a global handle to it.
pub trait GraphicsContext {
    fn set_render_target(&mut self, target: RenderTarget);

    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, mask: ClearMask, color: wgpu::Color, depth: f32);

    fn use_program(&mut self, program: &Program);

    /// Applies a non-program attribute. Programs go through
    /// [`GraphicsContext::use_program`].
    fn set_attribute(&mut self, attribute: &StateAttribute);

    fn upload_uniform(&mut self, location: UniformLocation, data: &[u8]);

    fn draw(&mut self, call: &DrawCall);
}

#[cfg(test)]
mod tests {
    use super::{ClearMask, Viewport};

    #[test]
    fn aspect_ratio_guards_zero_height() {
        assert_eq!(Viewport::new(0, 0, 800, 0).aspect_ratio(), 1.0);
        assert_eq!(Viewport::new(0, 0, 800, 400).aspect_ratio(), 2.0);
    }

    #[test]
    fn clear_mask_emptiness() {
        assert!(ClearMask::NONE.is_empty());
        assert!(!ClearMask::default().is_empty());
    }
}
