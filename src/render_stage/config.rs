use crate::context::{ClearMask, RenderTarget, Viewport};
use crate::state_graph::DEFAULT_MAX_RETAINED_LEAF_CAPACITY;

/// Nodes the state graph may keep between frames before it is rebuilt.
pub const DEFAULT_MAX_RETAINED_NODES: usize = 16_384;

/// Order in which the leaves of one bin are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Depth-first over the state graph, attach order within a node.
    #[default]
    StateSorted,
    /// Farthest first. Stable for equal depths.
    BackToFront,
    /// Nearest first. Stable for equal depths.
    FrontToBack,
    /// Attach order across the whole bin.
    Unsorted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderStageConfig {
    pub clear_mask: ClearMask,
    pub clear_color: wgpu::Color,
    pub clear_depth: f32,
    /// `None` leaves the viewport as the previous stage set it.
    pub viewport: Option<Viewport>,
    pub render_target: RenderTarget,
    pub opaque_sort: SortMode,
    pub transparent_sort: SortMode,
    pub max_retained_nodes: usize,
    pub max_leaf_capacity: usize,
}

impl Default for RenderStageConfig {
    fn default() -> Self {
        Self {
            clear_mask: ClearMask::COLOR_DEPTH,
            clear_color: wgpu::Color::BLACK,
            clear_depth: 1.0,
            viewport: None,
            render_target: RenderTarget::Surface,
            opaque_sort: SortMode::StateSorted,
            transparent_sort: SortMode::BackToFront,
            max_retained_nodes: DEFAULT_MAX_RETAINED_NODES,
            max_leaf_capacity: DEFAULT_MAX_RETAINED_LEAF_CAPACITY,
        }
    }
}

impl RenderStageConfig {
    pub fn with_clear_mask(mut self, clear_mask: ClearMask) -> Self {
        self.clear_mask = clear_mask;
        self
    }

    pub fn with_clear_color(mut self, clear_color: wgpu::Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_clear_depth(mut self, clear_depth: f32) -> Self {
        self.clear_depth = clear_depth;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_render_target(mut self, render_target: RenderTarget) -> Self {
        self.render_target = render_target;
        self
    }

    pub fn with_opaque_sort(mut self, sort: SortMode) -> Self {
        self.opaque_sort = sort;
        self
    }

    pub fn with_transparent_sort(mut self, sort: SortMode) -> Self {
        self.transparent_sort = sort;
        self
    }

    pub fn with_max_retained_nodes(mut self, max_retained_nodes: usize) -> Self {
        self.max_retained_nodes = max_retained_nodes;
        self
    }

    pub fn with_max_leaf_capacity(mut self, max_leaf_capacity: usize) -> Self {
        self.max_leaf_capacity = max_leaf_capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderStageConfig, SortMode};
    use crate::context::{ClearMask, RenderTarget, Viewport};

    #[test]
    fn defaults_sort_transparent_back_to_front() {
        let config = RenderStageConfig::default();
        assert_eq!(config.opaque_sort, SortMode::StateSorted);
        assert_eq!(config.transparent_sort, SortMode::BackToFront);
        assert_eq!(config.clear_mask, ClearMask::COLOR_DEPTH);
        assert_eq!(config.viewport, None);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = RenderStageConfig::default()
            .with_clear_mask(ClearMask::NONE)
            .with_viewport(Viewport::new(0, 0, 512, 512))
            .with_render_target(RenderTarget::Texture(3))
            .with_opaque_sort(SortMode::FrontToBack)
            .with_max_retained_nodes(8);

        assert!(config.clear_mask.is_empty());
        assert_eq!(config.viewport, Some(Viewport::new(0, 0, 512, 512)));
        assert_eq!(config.render_target, RenderTarget::Texture(3));
        assert_eq!(config.opaque_sort, SortMode::FrontToBack);
        assert_eq!(config.max_retained_nodes, 8);
    }
}
