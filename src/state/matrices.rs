use glam::Mat4;

use super::{State, UniformApply};
use crate::context::GraphicsContext;
use crate::id::ProgramId;
use crate::program::UniformLocation;

/// Matrix values last uploaded to the bound program.
#[derive(Debug, Default)]
pub(super) struct AppliedMatrices {
    program: Option<ProgramId>,
    model_view: Option<Mat4>,
    model: Option<Mat4>,
    view: Option<Mat4>,
}

impl AppliedMatrices {
    pub(super) fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Uniform values live in the program object, so a different program
    /// starts from nothing.
    fn track_program(&mut self, program: ProgramId) {
        if self.program != Some(program) {
            *self = Self {
                program: Some(program),
                ..Self::default()
            };
        }
    }
}

impl State {
    /// Uploads the model-view (and normal) matrix when it differs from what
    /// the bound program holds. Returns whether it changed.
    pub(crate) fn apply_model_view_matrix_with(
        &mut self,
        context: &mut dyn GraphicsContext,
        uniforms: &UniformApply,
        model_view: &Mat4,
    ) -> bool {
        self.matrices.track_program(uniforms.program());

        if self.matrices.model_view.as_ref() == Some(model_view) {
            self.counts.elided_matrix_updates = self.counts.elided_matrix_updates.wrapping_add(1);
            return false;
        }

        if let Some(location) = uniforms.model_view() {
            Self::upload_matrix(context, location, model_view);
            self.counts.model_view_uploads = self.counts.model_view_uploads.wrapping_add(1);
        }
        if let Some(location) = uniforms.normal() {
            let normal = model_view.inverse().transpose();
            Self::upload_matrix(context, location, &normal);
            self.counts.normal_uploads = self.counts.normal_uploads.wrapping_add(1);
        }

        self.matrices.model_view = Some(*model_view);
        true
    }

    /// Projection is cheap to send and program dependent, so it goes out on
    /// every draw whenever the program declares it.
    pub(crate) fn apply_projection_matrix_with(
        &mut self,
        context: &mut dyn GraphicsContext,
        uniforms: &UniformApply,
        projection: &Mat4,
    ) {
        if let Some(location) = uniforms.projection() {
            Self::upload_matrix(context, location, projection);
            self.counts.projection_uploads = self.counts.projection_uploads.wrapping_add(1);
        }
    }

    pub(crate) fn upload_model_matrix(
        &mut self,
        context: &mut dyn GraphicsContext,
        location: UniformLocation,
        model: &Mat4,
    ) {
        if self.matrices.model.as_ref() == Some(model) {
            return;
        }
        Self::upload_matrix(context, location, model);
        self.matrices.model = Some(*model);
        self.counts.model_uploads = self.counts.model_uploads.wrapping_add(1);
    }

    pub(crate) fn upload_view_matrix(
        &mut self,
        context: &mut dyn GraphicsContext,
        location: UniformLocation,
        view: &Mat4,
    ) {
        if self.matrices.view.as_ref() == Some(view) {
            return;
        }
        Self::upload_matrix(context, location, view);
        self.matrices.view = Some(*view);
        self.counts.view_uploads = self.counts.view_uploads.wrapping_add(1);
    }
}
