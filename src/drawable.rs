use std::fmt;
use std::ops::Range;

use crate::context::{DrawCall, GraphicsContext};
use crate::id::GeometryId;
use crate::state::State;

/// Something a render leaf can issue once its state and matrices are bound.
///
/// Implementations may reach into the [`State`] (for instance through
/// [`State::insert_state_set`]); such out-of-band changes are picked up by
/// the next leaf.
pub trait Drawable: fmt::Debug {
    fn draw_implementation(&self, state: &mut State, context: &mut dyn GraphicsContext);
}

/// Plain geometry: one draw call over a vertex and instance range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    id: GeometryId,
    topology: wgpu::PrimitiveTopology,
    vertices: Range<u32>,
    instances: Range<u32>,
}

impl Geometry {
    pub fn new(id: GeometryId, vertex_count: u32) -> Self {
        Self {
            id,
            topology: wgpu::PrimitiveTopology::TriangleList,
            vertices: 0..vertex_count,
            instances: 0..1,
        }
    }

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_instances(mut self, instances: Range<u32>) -> Self {
        self.instances = instances;
        self
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn draw_call(&self) -> DrawCall {
        DrawCall {
            geometry: self.id,
            topology: self.topology,
            vertices: self.vertices.clone(),
            instances: self.instances.clone(),
        }
    }
}

impl Drawable for Geometry {
    fn draw_implementation(&self, state: &mut State, context: &mut dyn GraphicsContext) {
        state.draw(context, &self.draw_call());
    }
}
