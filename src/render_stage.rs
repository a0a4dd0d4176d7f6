use std::sync::Arc;

use tracing::{debug, error};

use crate::context::GraphicsContext;
use crate::drawable::Drawable;
use crate::error::DrawError;
use crate::metrics::FrameStats;
use crate::render_leaf::{LeafCursor, LeafTransforms, RenderBin};
use crate::state::State;
use crate::state_graph::{bin_for_chain, LeafRef, StateGraph};
use crate::state_set::StateSet;
use crate::util::trim_vector_if_needed;

mod config;

pub use config::{RenderStageConfig, SortMode, DEFAULT_MAX_RETAINED_NODES};

/// One output target: clears it, then issues every leaf attached this frame
/// with as few state transitions as the leaf order allows.
///
/// Per frame the driver calls [`RenderStage::reset`], attaches leaves while
/// culling, then calls [`RenderStage::draw`] once.
pub struct RenderStage {
    config: RenderStageConfig,
    graph: StateGraph,
    state_set: Option<Arc<StateSet>>,
    pre_stages: Vec<RenderStage>,
    post_stages: Vec<RenderStage>,
    opaque: Vec<LeafRef>,
    transparent: Vec<LeafRef>,
    order: Vec<LeafRef>,
    depth_keys: Vec<(f32, LeafRef)>,
}

impl RenderStage {
    pub fn new(config: RenderStageConfig) -> Self {
        Self {
            config,
            graph: StateGraph::new(),
            state_set: None,
            pre_stages: Vec::new(),
            post_stages: Vec::new(),
            opaque: Vec::new(),
            transparent: Vec::new(),
            order: Vec::new(),
            depth_keys: Vec::new(),
        }
    }

    pub fn config(&self) -> &RenderStageConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RenderStageConfig {
        &mut self.config
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    /// State set pushed under every leaf of this stage, e.g. a shadow-map
    /// depth-only program.
    pub fn set_state_set(&mut self, state_set: Option<Arc<StateSet>>) {
        self.state_set = state_set;
    }

    pub fn with_state_set(mut self, state_set: Arc<StateSet>) -> Self {
        self.state_set = Some(state_set);
        self
    }

    pub fn state_set(&self) -> Option<&Arc<StateSet>> {
        self.state_set.as_ref()
    }

    /// Adds a stage drawn before this one, returning its index.
    pub fn add_pre_render_stage(&mut self, stage: RenderStage) -> usize {
        self.pre_stages.push(stage);
        self.pre_stages.len() - 1
    }

    /// Adds a stage drawn after this one, returning its index.
    pub fn add_post_render_stage(&mut self, stage: RenderStage) -> usize {
        self.post_stages.push(stage);
        self.post_stages.len() - 1
    }

    pub fn pre_render_stage_mut(&mut self, index: usize) -> Option<&mut RenderStage> {
        self.pre_stages.get_mut(index)
    }

    pub fn post_render_stage_mut(&mut self, index: usize) -> Option<&mut RenderStage> {
        self.post_stages.get_mut(index)
    }

    /// Leaves attached since the last reset, child stages excluded.
    pub fn leaf_count(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Starts a new frame: drops every leaf here and in child stages while
    /// keeping the state graph for reuse, unless it outgrew
    /// `max_retained_nodes`.
    pub fn reset(&mut self) {
        self.graph.reset_with_policy(self.config.max_leaf_capacity);
        self.graph.trim_to_policy(self.config.max_retained_nodes);

        self.opaque.clear();
        self.transparent.clear();
        self.order.clear();
        self.depth_keys.clear();
        trim_vector_if_needed(&mut self.opaque, self.config.max_leaf_capacity);
        trim_vector_if_needed(&mut self.transparent, self.config.max_leaf_capacity);
        trim_vector_if_needed(&mut self.order, self.config.max_leaf_capacity);
        trim_vector_if_needed(&mut self.depth_keys, self.config.max_leaf_capacity);

        for stage in self.pre_stages.iter_mut().chain(self.post_stages.iter_mut()) {
            stage.reset();
        }
    }

    /// Schedules `drawable` under the state sets of `chain`, outermost
    /// first. Equal state sets must be passed as the same `Arc` to share a
    /// node.
    pub fn attach(
        &mut self,
        chain: &[Arc<StateSet>],
        drawable: Arc<dyn Drawable>,
        transforms: LeafTransforms,
        depth: f32,
    ) -> Result<LeafRef, DrawError> {
        let bin = bin_for_chain(chain);
        let node = self.graph.find_or_insert(chain)?;
        let leaf = self
            .graph
            .attach_leaf(node, drawable, transforms, depth, bin)?;

        match bin {
            RenderBin::Opaque => self.opaque.push(leaf),
            RenderBin::Transparent => self.transparent.push(leaf),
        }
        Ok(leaf)
    }

    /// [`RenderStage::attach`] with the depth taken from the model-view
    /// translation.
    pub fn attach_with_view_depth(
        &mut self,
        chain: &[Arc<StateSet>],
        drawable: Arc<dyn Drawable>,
        transforms: LeafTransforms,
    ) -> Result<LeafRef, DrawError> {
        let depth = transforms.view_depth();
        self.attach(chain, drawable, transforms, depth)
    }

    /// Draws pre stages, this stage, then post stages.
    ///
    /// The state set stack is rewound to the size it had on entry, also when
    /// a structural error aborts the frame. Counts in the returned stats
    /// include child stages.
    pub fn draw(
        &mut self,
        state: &mut State,
        context: &mut dyn GraphicsContext,
    ) -> Result<FrameStats, DrawError> {
        #[cfg(feature = "performance_measurement")]
        let _span = tracing::info_span!(
            "render_stage",
            render_target = ?self.config.render_target,
            leaves = self.leaf_count()
        )
        .entered();
        #[cfg(feature = "render_metrics")]
        let started_at = std::time::Instant::now();

        let counts_before = state.counts();
        let mut stats = FrameStats::default();

        for stage in &mut self.pre_stages {
            stage.draw(state, context)?;
        }

        context.set_render_target(self.config.render_target);
        if let Some(viewport) = self.config.viewport {
            context.set_viewport(viewport);
        }
        if !self.config.clear_mask.is_empty() {
            context.clear(
                self.config.clear_mask,
                self.config.clear_color,
                self.config.clear_depth,
            );
        }

        let entry_stack_size = state.state_set_stack_size();
        if let Some(state_set) = &self.state_set {
            state.push_state_set(Arc::clone(state_set));
        }

        let drawn = self.draw_bins(state, context, &mut stats);
        let rewound = state.pop_state_sets_to(entry_stack_size);
        if let Err(error) = drawn.and(rewound) {
            error!(%error, "aborting render stage");
            return Err(error);
        }

        for stage in &mut self.post_stages {
            stage.draw(state, context)?;
        }

        stats.counts = state.counts().since(&counts_before);
        #[cfg(feature = "render_metrics")]
        {
            stats.timings.total = started_at.elapsed();
        }

        debug!(
            opaque = stats.opaque_leaves,
            transparent = stats.transparent_leaves,
            state_changes = stats.counts.device_state_changes(),
            draws = stats.counts.draws,
            "render stage drawn"
        );
        Ok(stats)
    }

    fn draw_bins(
        &mut self,
        state: &mut State,
        context: &mut dyn GraphicsContext,
        stats: &mut FrameStats,
    ) -> Result<(), DrawError> {
        let mut cursor = LeafCursor::default();

        for bin in [RenderBin::Opaque, RenderBin::Transparent] {
            #[cfg(feature = "render_metrics")]
            let flatten_started_at = std::time::Instant::now();

            let (attached, mode) = match bin {
                RenderBin::Opaque => (&self.opaque, self.config.opaque_sort),
                RenderBin::Transparent => (&self.transparent, self.config.transparent_sort),
            };
            self.order.clear();
            order_bin(
                &self.graph,
                bin,
                attached,
                mode,
                &mut self.depth_keys,
                &mut self.order,
            )?;
            match bin {
                RenderBin::Opaque => stats.opaque_leaves = self.order.len(),
                RenderBin::Transparent => stats.transparent_leaves = self.order.len(),
            }

            #[cfg(feature = "render_metrics")]
            let draw_started_at = std::time::Instant::now();
            #[cfg(feature = "render_metrics")]
            {
                stats.timings.flatten += draw_started_at.duration_since(flatten_started_at);
            }

            for leaf in &self.order {
                self.graph
                    .leaf(*leaf)?
                    .render(&self.graph, state, context, &mut cursor)?;
            }

            #[cfg(feature = "render_metrics")]
            {
                stats.timings.draw += draw_started_at.elapsed();
            }
        }

        Ok(())
    }
}

impl Default for RenderStage {
    fn default() -> Self {
        Self::new(RenderStageConfig::default())
    }
}

/// Builds the draw order of one bin into `out`.
fn order_bin(
    graph: &StateGraph,
    bin: RenderBin,
    attached: &[LeafRef],
    mode: SortMode,
    depth_keys: &mut Vec<(f32, LeafRef)>,
    out: &mut Vec<LeafRef>,
) -> Result<(), DrawError> {
    match mode {
        SortMode::StateSorted => graph.flatten_into(bin, out),
        SortMode::Unsorted => {
            out.extend_from_slice(attached);
            Ok(())
        }
        SortMode::BackToFront | SortMode::FrontToBack => {
            depth_keys.clear();
            for leaf in attached {
                depth_keys.push((graph.leaf(*leaf)?.depth(), *leaf));
            }
            if mode == SortMode::BackToFront {
                depth_keys.sort_by(|a, b| b.0.total_cmp(&a.0));
            } else {
                depth_keys.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
            out.extend(depth_keys.iter().map(|(_, leaf)| *leaf));
            Ok(())
        }
    }
}
