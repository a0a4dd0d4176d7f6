use crate::context::{ClearMask, DrawCall, GraphicsContext, RenderTarget, Viewport};
use crate::id::{GeometryId, ProgramId};
use crate::program::{Program, UniformLocation};
use crate::state_set::StateAttribute;

/// A device call as captured by [`RecordingContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    SetRenderTarget(RenderTarget),
    SetViewport(Viewport),
    Clear {
        mask: ClearMask,
        color: wgpu::Color,
        depth: f32,
    },
    UseProgram(ProgramId),
    SetAttribute(StateAttribute),
    UploadUniform {
        location: UniformLocation,
        data: Vec<u8>,
    },
    Draw(DrawCall),
}

/// Headless context that records every device call in issue order.
///
/// Used for tests, benchmarks and for diffing the command stream of two
/// frames while debugging redundant state changes.
#[derive(Debug, Default)]
pub struct RecordingContext {
    commands: Vec<DeviceCommand>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drops the recorded commands, keeping the allocation.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn drawn_geometries(&self) -> Vec<GeometryId> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw(call) => Some(call.geometry),
                _ => None,
            })
            .collect()
    }

    pub fn uploads_to(&self, location: UniformLocation) -> usize {
        self.commands
            .iter()
            .filter(|command| {
                matches!(command, DeviceCommand::UploadUniform { location: uploaded, .. } if *uploaded == location)
            })
            .count()
    }

    /// Number of state-changing commands (program binds and attributes).
    pub fn state_changes(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    DeviceCommand::UseProgram(_) | DeviceCommand::SetAttribute(_)
                )
            })
            .count()
    }
}

impl GraphicsContext for RecordingContext {
    fn set_render_target(&mut self, target: RenderTarget) {
        self.commands.push(DeviceCommand::SetRenderTarget(target));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::SetViewport(viewport));
    }

    fn clear(&mut self, mask: ClearMask, color: wgpu::Color, depth: f32) {
        self.commands
            .push(DeviceCommand::Clear { mask, color, depth });
    }

    fn use_program(&mut self, program: &Program) {
        self.commands.push(DeviceCommand::UseProgram(program.id()));
    }

    fn set_attribute(&mut self, attribute: &StateAttribute) {
        self.commands
            .push(DeviceCommand::SetAttribute(attribute.clone()));
    }

    fn upload_uniform(&mut self, location: UniformLocation, data: &[u8]) {
        self.commands.push(DeviceCommand::UploadUniform {
            location,
            data: data.to_vec(),
        });
    }

    fn draw(&mut self, call: &DrawCall) {
        self.commands.push(DeviceCommand::Draw(call.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::{DeviceCommand, RecordingContext};
    use crate::context::{DrawCall, GraphicsContext};
    use crate::id::GeometryId;
    use crate::program::UniformLocation;
    use crate::state_set::StateAttribute;

    #[test]
    fn records_in_issue_order() {
        let mut context = RecordingContext::new();
        context.set_attribute(&StateAttribute::DepthWrite(false));
        context.upload_uniform(UniformLocation(2), &[0, 1, 2, 3]);
        context.draw(&DrawCall {
            geometry: GeometryId(9),
            topology: wgpu::PrimitiveTopology::TriangleList,
            vertices: 0..3,
            instances: 0..1,
        });

        assert_eq!(context.commands().len(), 3);
        assert_eq!(
            context.commands()[0],
            DeviceCommand::SetAttribute(StateAttribute::DepthWrite(false))
        );
        assert_eq!(context.uploads_to(UniformLocation(2)), 1);
        assert_eq!(context.drawn_geometries(), vec![GeometryId(9)]);
        assert_eq!(context.state_changes(), 1);

        let taken = context.take_commands();
        assert_eq!(taken.len(), 3);
        assert!(context.commands().is_empty());
    }
}
