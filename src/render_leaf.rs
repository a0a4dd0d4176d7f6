use std::fmt;
use std::sync::Arc;

use glam::Mat4;
use tracing::trace;

use crate::context::GraphicsContext;
use crate::drawable::Drawable;
use crate::error::DrawError;
use crate::state::State;
use crate::state_graph::StateGraph;

/// Which pass of a stage a leaf is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderBin {
    #[default]
    Opaque,
    Transparent,
}

/// Matrices a leaf was culled with. Filled completely before the leaf is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafTransforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
    pub model_view: Mat4,
}

impl LeafTransforms {
    pub fn new(projection: Mat4, view: Mat4, model: Mat4) -> Self {
        Self {
            projection,
            view,
            model,
            model_view: view * model,
        }
    }

    /// Distance of the model origin in front of the eye. Larger is farther.
    pub fn view_depth(&self) -> f32 {
        -self.model_view.w_axis.z
    }
}

impl Default for LeafTransforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// What the previous leaf of the draw loop left behind.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LeafCursor {
    previous: Option<usize>,
    draw_id: u64,
    stack_size: usize,
}

#[cfg(test)]
impl LeafCursor {
    pub(crate) fn previous_node(&self) -> Option<usize> {
        self.previous
    }
}

/// One drawable instance scheduled under one state graph node.
pub struct RenderLeaf {
    parent: usize,
    drawable: Arc<dyn Drawable>,
    transforms: LeafTransforms,
    depth: f32,
    bin: RenderBin,
}

impl RenderLeaf {
    pub(crate) fn new(
        parent: usize,
        drawable: Arc<dyn Drawable>,
        transforms: LeafTransforms,
        depth: f32,
        bin: RenderBin,
    ) -> Self {
        Self {
            parent,
            drawable,
            transforms,
            depth,
            bin,
        }
    }

    /// State graph node that owns this leaf.
    pub fn parent(&self) -> usize {
        self.parent
    }

    pub fn drawable(&self) -> &Arc<dyn Drawable> {
        &self.drawable
    }

    pub fn transforms(&self) -> &LeafTransforms {
        &self.transforms
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn bin(&self) -> RenderBin {
        self.bin
    }

    /// Brings the device from the previous leaf's state to this one's, then
    /// draws.
    ///
    /// Only the difference between the two owning nodes is applied:
    /// - first leaf of the loop: push the whole parent chain, apply the node;
    /// - different parent node: pop to the common ancestor, push down to the
    ///   new parent, apply the node;
    /// - sibling node under the same parent: apply the node;
    /// - same node: nothing, unless the state set stack was changed behind
    ///   the graph's back since the previous draw.
    pub(crate) fn render(
        &self,
        graph: &StateGraph,
        state: &mut State,
        context: &mut dyn GraphicsContext,
        cursor: &mut LeafCursor,
    ) -> Result<(), DrawError> {
        let current = self.parent;
        let node = graph.node(current)?;
        let current_parent = graph.parent(current);

        match cursor.previous {
            None => {
                trace!(node = current, "first leaf, entering state graph");
                graph.move_state_graph(state, None, current_parent)?;
                state.apply_state_set(context, node.state_set());
            }
            Some(previous) => {
                let previous_parent = graph.parent(previous);
                if previous_parent != current_parent {
                    trace!(from = previous, to = current, "moving state graph");
                    graph.move_state_graph(state, previous_parent, current_parent)?;
                    state.apply_state_set(context, node.state_set());
                } else if previous != current {
                    trace!(from = previous, to = current, "sibling state set");
                    state.apply_state_set(context, node.state_set());
                } else if state.state_set_stack_changed(cursor.draw_id, cursor.stack_size) {
                    trace!(node = current, "state set stack changed since last draw");
                    state.apply_state_set(context, node.state_set());
                } else {
                    state.note_elided_transition();
                }
            }
        }

        cursor.previous = Some(current);
        cursor.draw_id = state.stamp_draw_id();
        cursor.stack_size = state.state_set_stack_size();

        self.draw_geometry(state, context);
        Ok(())
    }

    /// Uploads this leaf's matrices to the bound program and issues the
    /// drawable.
    pub fn draw_geometry(&self, state: &mut State, context: &mut dyn GraphicsContext) {
        match state.uniform_apply_for_current_program() {
            Some(uniforms) => uniforms.apply(
                state,
                context,
                &self.transforms.model_view,
                &self.transforms.model,
                &self.transforms.view,
                &self.transforms.projection,
            ),
            None => trace!("no program bound, drawing without matrix uniforms"),
        }
        self.drawable.draw_implementation(state, context);
    }
}

impl fmt::Debug for RenderLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderLeaf")
            .field("parent", &self.parent)
            .field("drawable", &self.drawable)
            .field("depth", &self.depth)
            .field("bin", &self.bin)
            .finish()
    }
}
