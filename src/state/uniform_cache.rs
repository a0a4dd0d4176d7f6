use ahash::{HashMap, HashMapExt};
use glam::Mat4;

use super::State;
use crate::context::GraphicsContext;
use crate::id::ProgramId;
use crate::program::{Program, UniformLocation, UniformNames};

/// Matrix uniform slots of one program, resolved once by name.
///
/// A slot the program does not declare stays `None` and the matching upload
/// is skipped. Entries never change after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformApply {
    program: ProgramId,
    model: Option<UniformLocation>,
    view: Option<UniformLocation>,
    projection: Option<UniformLocation>,
    model_view: Option<UniformLocation>,
    normal: Option<UniformLocation>,
}

impl UniformApply {
    fn resolve(program: &Program, names: &UniformNames) -> Self {
        Self {
            program: program.id(),
            model: program.uniform_location(&names.model),
            view: program.uniform_location(&names.view),
            projection: program.uniform_location(&names.projection),
            model_view: program.uniform_location(&names.model_view),
            normal: program.uniform_location(&names.normal),
        }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn model(&self) -> Option<UniformLocation> {
        self.model
    }

    pub fn view(&self) -> Option<UniformLocation> {
        self.view
    }

    pub fn projection(&self) -> Option<UniformLocation> {
        self.projection
    }

    pub fn model_view(&self) -> Option<UniformLocation> {
        self.model_view
    }

    pub fn normal(&self) -> Option<UniformLocation> {
        self.normal
    }

    /// Sends the matrices of one draw to the bound program.
    ///
    /// Model and view only go out when the model-view product changed, and
    /// then only the ones that differ from what the program already holds.
    pub fn apply(
        &self,
        state: &mut State,
        context: &mut dyn GraphicsContext,
        model_view: &Mat4,
        model: &Mat4,
        view: &Mat4,
        projection: &Mat4,
    ) {
        let model_view_changed = state.apply_model_view_matrix_with(context, self, model_view);
        state.apply_projection_matrix_with(context, self, projection);

        if !model_view_changed {
            return;
        }
        if let Some(location) = self.model {
            state.upload_model_matrix(context, location, model);
        }
        if let Some(location) = self.view {
            state.upload_view_matrix(context, location, view);
        }
    }
}

/// One [`UniformApply`] per program, for the lifetime of the tracker.
#[derive(Debug, Default)]
pub struct UniformApplyCache {
    entries: HashMap<ProgramId, UniformApply>,
    misses: u64,
}

impl UniformApplyCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            misses: 0,
        }
    }

    pub fn get_or_create(&mut self, program: &Program, names: &UniformNames) -> UniformApply {
        if let Some(entry) = self.entries.get(&program.id()) {
            return *entry;
        }
        self.misses += 1;
        let entry = UniformApply::resolve(program, names);
        self.entries.insert(program.id(), entry);
        entry
    }

    pub fn get(&self, program: ProgramId) -> Option<UniformApply> {
        self.entries.get(&program).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries built by querying a program's uniform table.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
