use std::sync::Arc;

use glam::Mat4;
use tracing::trace;

use crate::context::{DrawCall, GraphicsContext};
use crate::error::DrawError;
use crate::id::{GeometryId, StateSetId};
use crate::metrics::TransitionCounts;
use crate::program::{Program, UniformLocation, UniformNames};
use crate::state_set::{AttributeType, StateAttribute, StateSet};

mod attribute_stack;
mod matrices;
mod uniform_cache;

use attribute_stack::AttributeStack;
use matrices::AppliedMatrices;
pub use uniform_cache::{UniformApply, UniformApplyCache};

/// Draw id the tracker holds after an out-of-band change to the state set
/// stack. Stamped ids start at 1, so no render leaf ever records this value.
const INVALID_DRAW_ID: u64 = 0;

/// One entry of the optional transition journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Push(StateSetId),
    Pop(StateSetId),
    /// `None` when the stack was applied without a local state set.
    Apply(Option<StateSetId>),
    Draw(GeometryId),
}

/// Record of the device state currently bound for one frame loop.
///
/// The tracker owns the stack of pushed state sets and, per attribute type,
/// the value the device was last told about. Every `apply_*` call compares
/// the requested state against that record and only talks to the
/// [`GraphicsContext`] when they differ.
///
/// The device is assumed to start in its default state (see
/// [`StateAttribute::default_for`]). Call [`State::invalidate`] when code
/// outside this crate touched the device.
pub struct State {
    state_set_stack: Vec<Arc<StateSet>>,
    attribute_stacks: [AttributeStack; AttributeType::COUNT],
    last_program: Option<Arc<Program>>,
    uniform_names: UniformNames,
    uniform_cache: UniformApplyCache,
    matrices: AppliedMatrices,
    state_set_draw_id: u64,
    last_stamped_draw_id: u64,
    counts: TransitionCounts,
    journal: Option<Vec<Transition>>,
}

impl State {
    pub fn new() -> Self {
        Self::with_uniform_names(UniformNames::default())
    }

    pub fn with_uniform_names(uniform_names: UniformNames) -> Self {
        Self {
            state_set_stack: Vec::new(),
            attribute_stacks: std::array::from_fn(|index| {
                AttributeStack::with_default(AttributeType::ALL[index])
            }),
            last_program: None,
            uniform_names,
            uniform_cache: UniformApplyCache::default(),
            matrices: AppliedMatrices::default(),
            state_set_draw_id: INVALID_DRAW_ID,
            last_stamped_draw_id: INVALID_DRAW_ID,
            counts: TransitionCounts::default(),
            journal: None,
        }
    }

    pub fn uniform_names(&self) -> &UniformNames {
        &self.uniform_names
    }

    pub fn uniform_cache(&self) -> &UniformApplyCache {
        &self.uniform_cache
    }

    pub fn counts(&self) -> TransitionCounts {
        self.counts
    }

    /// Turns the transition journal on or off. Turning it off drops the
    /// recorded entries.
    ///
    /// The journal lives on the tracker, not on a stage, so nothing clears it
    /// between frames. Drain it with [`State::take_journal`] once per frame
    /// while it is enabled.
    pub fn set_journal_enabled(&mut self, enabled: bool) {
        if enabled {
            self.journal.get_or_insert_with(Vec::new);
        } else {
            self.journal = None;
        }
    }

    pub fn journal(&self) -> &[Transition] {
        self.journal.as_deref().unwrap_or(&[])
    }

    /// Returns the recorded entries and leaves an empty journal behind. The
    /// journal stays enabled.
    pub fn take_journal(&mut self) -> Vec<Transition> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn record(&mut self, transition: Transition) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(transition);
        }
    }

    pub fn last_program_applied(&self) -> Option<Arc<Program>> {
        self.last_program.clone()
    }

    pub fn state_set_stack_size(&self) -> usize {
        self.state_set_stack.len()
    }

    pub fn state_set_stack(&self) -> &[Arc<StateSet>] {
        &self.state_set_stack
    }

    pub fn state_set_draw_id(&self) -> u64 {
        self.state_set_draw_id
    }

    /// Stamps a fresh draw id on the tracker and returns it.
    pub fn stamp_draw_id(&mut self) -> u64 {
        self.last_stamped_draw_id += 1;
        self.state_set_draw_id = self.last_stamped_draw_id;
        self.state_set_draw_id
    }

    /// `true` when the state set stack changed since a leaf recorded
    /// `draw_id` and `stack_size`, either through a push/pop that altered
    /// its size or through [`State::insert_state_set`] /
    /// [`State::remove_state_set`].
    pub fn state_set_stack_changed(&self, draw_id: u64, stack_size: usize) -> bool {
        self.state_set_draw_id != draw_id || self.state_set_stack.len() != stack_size
    }

    pub fn push_state_set(&mut self, state_set: Arc<StateSet>) {
        for (attribute, priority) in state_set.attributes() {
            self.attribute_stacks[attribute.attribute_type().index()].push(attribute, priority);
        }
        self.counts.state_set_pushes = self.counts.state_set_pushes.wrapping_add(1);
        self.record(Transition::Push(state_set.id()));
        self.state_set_stack.push(state_set);
    }

    pub fn pop_state_set(&mut self) -> Result<Arc<StateSet>, DrawError> {
        let state_set = self.state_set_stack.pop().ok_or(DrawError::StackUnderflow)?;
        for (attribute, _) in state_set.attributes() {
            self.attribute_stacks[attribute.attribute_type().index()].pop();
        }
        self.counts.state_set_pops = self.counts.state_set_pops.wrapping_add(1);
        self.record(Transition::Pop(state_set.id()));
        Ok(state_set)
    }

    /// Pops until the stack holds `size` entries.
    pub fn pop_state_sets_to(&mut self, size: usize) -> Result<(), DrawError> {
        while self.state_set_stack.len() > size {
            self.pop_state_set()?;
        }
        Ok(())
    }

    /// Inserts a state set below the top of the stack.
    ///
    /// This bypasses the state graph, so the draw id is invalidated and the
    /// next render leaf re-applies its state even if it shares a node with
    /// the previous one.
    pub fn insert_state_set(
        &mut self,
        index: usize,
        state_set: Arc<StateSet>,
    ) -> Result<(), DrawError> {
        let len = self.state_set_stack.len();
        if index > len {
            return Err(DrawError::StackIndexOutOfBounds { index, len });
        }
        self.state_set_stack.insert(index, state_set);
        self.rebuild_attribute_stacks();
        self.state_set_draw_id = INVALID_DRAW_ID;
        Ok(())
    }

    /// Removes a state set from anywhere in the stack. Invalidates the draw
    /// id like [`State::insert_state_set`].
    pub fn remove_state_set(&mut self, index: usize) -> Result<Arc<StateSet>, DrawError> {
        let len = self.state_set_stack.len();
        if index >= len {
            return Err(DrawError::StackIndexOutOfBounds { index, len });
        }
        let removed = self.state_set_stack.remove(index);
        self.rebuild_attribute_stacks();
        self.state_set_draw_id = INVALID_DRAW_ID;
        Ok(removed)
    }

    fn rebuild_attribute_stacks(&mut self) {
        for stack in &mut self.attribute_stacks {
            stack.clear_entries();
        }
        for state_set in &self.state_set_stack {
            for (attribute, priority) in state_set.attributes() {
                self.attribute_stacks[attribute.attribute_type().index()].push(attribute, priority);
            }
        }
    }

    /// Brings the device in line with the pushed stack combined with
    /// `state_set`, which is applied on top without being pushed.
    pub fn apply_state_set(
        &mut self,
        context: &mut dyn GraphicsContext,
        state_set: Option<&StateSet>,
    ) {
        self.counts.state_set_applies = self.counts.state_set_applies.wrapping_add(1);
        self.record(Transition::Apply(state_set.map(StateSet::id)));

        for attribute_type in AttributeType::ALL {
            let stack = &self.attribute_stacks[attribute_type.index()];
            let local = state_set.and_then(|state_set| state_set.attribute(attribute_type));
            let Some(desired) = stack.resolve(local) else {
                continue;
            };
            if stack.applied() == Some(desired) {
                continue;
            }
            let desired = desired.clone();
            self.issue_attribute(context, desired);
        }
    }

    pub(crate) fn note_elided_transition(&mut self) {
        self.counts.elided_transitions = self.counts.elided_transitions.wrapping_add(1);
    }

    /// Applies the pushed stack with no local overrides.
    pub fn apply(&mut self, context: &mut dyn GraphicsContext) {
        self.apply_state_set(context, None);
    }

    fn issue_attribute(&mut self, context: &mut dyn GraphicsContext, attribute: StateAttribute) {
        let attribute_type = attribute.attribute_type();
        match &attribute {
            StateAttribute::Program(program) => {
                trace!(program = %program.id(), "binding program");
                context.use_program(program);
                self.last_program = Some(Arc::clone(program));
                self.matrices.invalidate();
                self.counts.program_binds = self.counts.program_binds.wrapping_add(1);
            }
            other => {
                context.set_attribute(other);
                self.counts.attribute_changes = self.counts.attribute_changes.wrapping_add(1);
            }
        }
        self.attribute_stacks[attribute_type.index()].set_applied(Some(attribute));
    }

    /// Forgets what the device holds, so the next apply re-sends every
    /// attribute and matrix.
    pub fn invalidate(&mut self) {
        for stack in &mut self.attribute_stacks {
            stack.set_applied(None);
        }
        self.last_program = None;
        self.matrices.invalidate();
        self.state_set_draw_id = INVALID_DRAW_ID;
    }

    /// Issues a draw call under whatever state is currently bound.
    pub fn draw(&mut self, context: &mut dyn GraphicsContext, call: &DrawCall) {
        self.counts.draws = self.counts.draws.wrapping_add(1);
        self.record(Transition::Draw(call.geometry));
        context.draw(call);
    }

    /// Returns the uniform-apply entry of the bound program, creating it on
    /// first use.
    pub fn uniform_apply_for_current_program(&mut self) -> Option<UniformApply> {
        let program = self.last_program.as_ref()?;
        Some(
            self.uniform_cache
                .get_or_create(program, &self.uniform_names),
        )
    }

    pub fn apply_model_view_matrix(
        &mut self,
        context: &mut dyn GraphicsContext,
        model_view: &Mat4,
    ) -> bool {
        match self.uniform_apply_for_current_program() {
            Some(uniforms) => self.apply_model_view_matrix_with(context, &uniforms, model_view),
            None => false,
        }
    }

    pub fn apply_projection_matrix(
        &mut self,
        context: &mut dyn GraphicsContext,
        projection: &Mat4,
    ) {
        if let Some(uniforms) = self.uniform_apply_for_current_program() {
            self.apply_projection_matrix_with(context, &uniforms, projection);
        }
    }

    fn upload_matrix(
        context: &mut dyn GraphicsContext,
        location: UniformLocation,
        matrix: &Mat4,
    ) {
        context.upload_uniform(location, bytemuck::bytes_of(matrix));
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
