pub use glam;
pub use wgpu;

mod context;
mod drawable;
mod error;
mod id;
mod metrics;
mod program;
mod recording;
mod render_leaf;
mod render_stage;
mod state;
mod state_graph;
mod state_set;
mod util;

pub use context::{ClearMask, DrawCall, GraphicsContext, RenderTarget, Viewport};
pub use drawable::{Drawable, Geometry};
pub use error::DrawError;
pub use id::{GeometryId, ProgramId, StateSetId};
#[cfg(feature = "render_metrics")]
pub use metrics::PhaseTimings;
pub use metrics::{FrameStats, TransitionCounts};
pub use program::{Program, UniformLocation, UniformNames};
pub use recording::{DeviceCommand, RecordingContext};
pub use render_leaf::{LeafTransforms, RenderBin, RenderLeaf};
pub use render_stage::{RenderStage, RenderStageConfig, SortMode, DEFAULT_MAX_RETAINED_NODES};
pub use state::{State, Transition, UniformApply, UniformApplyCache};
pub use state_graph::{
    bin_for_chain, LeafRef, StateGraph, StateGraphNode, DEFAULT_MAX_RETAINED_LEAF_CAPACITY,
};
pub use state_set::{AttributeType, Priority, RenderingHint, StateAttribute, StateSet};
