#[cfg(feature = "render_metrics")]
use std::time::Duration;

/// Running counts of the work the state tracker did, for diagnosing
/// redundant state changes.
///
/// The tracker only ever increments these, for as long as it lives, so every
/// counter wraps instead of overflowing. Take a snapshot before a stage and
/// use [`TransitionCounts::since`] to get the stage's share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionCounts {
    /// `apply_state_set` calls, including those that changed nothing.
    pub state_set_applies: u64,
    pub state_set_pushes: u64,
    pub state_set_pops: u64,
    /// Programs actually bound on the device.
    pub program_binds: u64,
    /// Non-program attributes actually sent to the device.
    pub attribute_changes: u64,
    pub model_uploads: u64,
    pub view_uploads: u64,
    pub projection_uploads: u64,
    pub model_view_uploads: u64,
    pub normal_uploads: u64,
    /// Leaves drawn without touching state because they shared the
    /// previous leaf's node.
    pub elided_transitions: u64,
    /// Draws whose model-view matrix was already bound.
    pub elided_matrix_updates: u64,
    pub draws: u64,
}

impl TransitionCounts {
    /// Merge another frame's counts into this accumulator.
    pub fn accumulate(&mut self, other: &Self) {
        self.state_set_applies = self.state_set_applies.wrapping_add(other.state_set_applies);
        self.state_set_pushes = self.state_set_pushes.wrapping_add(other.state_set_pushes);
        self.state_set_pops = self.state_set_pops.wrapping_add(other.state_set_pops);
        self.program_binds = self.program_binds.wrapping_add(other.program_binds);
        self.attribute_changes = self.attribute_changes.wrapping_add(other.attribute_changes);
        self.model_uploads = self.model_uploads.wrapping_add(other.model_uploads);
        self.view_uploads = self.view_uploads.wrapping_add(other.view_uploads);
        self.projection_uploads = self.projection_uploads.wrapping_add(other.projection_uploads);
        self.model_view_uploads = self.model_view_uploads.wrapping_add(other.model_view_uploads);
        self.normal_uploads = self.normal_uploads.wrapping_add(other.normal_uploads);
        self.elided_transitions = self.elided_transitions.wrapping_add(other.elided_transitions);
        self.elided_matrix_updates = self.elided_matrix_updates.wrapping_add(other.elided_matrix_updates);
        self.draws = self.draws.wrapping_add(other.draws);
    }

    /// Counts accumulated after `earlier` was taken.
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            state_set_applies: self.state_set_applies.wrapping_sub(earlier.state_set_applies),
            state_set_pushes: self.state_set_pushes.wrapping_sub(earlier.state_set_pushes),
            state_set_pops: self.state_set_pops.wrapping_sub(earlier.state_set_pops),
            program_binds: self.program_binds.wrapping_sub(earlier.program_binds),
            attribute_changes: self.attribute_changes.wrapping_sub(earlier.attribute_changes),
            model_uploads: self.model_uploads.wrapping_sub(earlier.model_uploads),
            view_uploads: self.view_uploads.wrapping_sub(earlier.view_uploads),
            projection_uploads: self
                .projection_uploads
                .wrapping_sub(earlier.projection_uploads),
            model_view_uploads: self
                .model_view_uploads
                .wrapping_sub(earlier.model_view_uploads),
            normal_uploads: self.normal_uploads.wrapping_sub(earlier.normal_uploads),
            elided_transitions: self
                .elided_transitions
                .wrapping_sub(earlier.elided_transitions),
            elided_matrix_updates: self
                .elided_matrix_updates
                .wrapping_sub(earlier.elided_matrix_updates),
            draws: self.draws.wrapping_sub(earlier.draws),
        }
    }

    /// Device calls that changed state (program binds plus attributes).
    pub fn device_state_changes(&self) -> u64 {
        self.program_binds.wrapping_add(self.attribute_changes)
    }
}

/// Per-phase timing breakdown for one stage draw.
///
/// Available when the `render_metrics` feature is enabled.
#[cfg(feature = "render_metrics")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    /// Time spent building the ordered leaf sequence (flatten plus sort).
    pub flatten: Duration,
    /// Time spent in the draw loop.
    pub draw: Duration,
    /// Wall-clock time of the whole stage, child stages included.
    pub total: Duration,
}

/// Summary of one [`crate::RenderStage::draw`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub opaque_leaves: usize,
    pub transparent_leaves: usize,
    pub counts: TransitionCounts,
    #[cfg(feature = "render_metrics")]
    pub timings: PhaseTimings,
}

impl FrameStats {
    pub fn leaves(&self) -> usize {
        self.opaque_leaves + self.transparent_leaves
    }
}
