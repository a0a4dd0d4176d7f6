use std::sync::Arc;

use statesort::glam::{Mat4, Vec3};
use statesort::{
    ClearMask, Geometry, GeometryId, LeafTransforms, Priority, RecordingContext, RenderStage,
    RenderStageConfig, RenderTarget, State, StateAttribute, StateSet, Viewport,
};
use statesort_test_scenes::build_material_grid;
use statesort_test_scenes::scene::lit_program;
use tracing_subscriber::EnvFilter;

const SHADOW_MAP: u64 = 1;

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("statesort=debug")),
        )
        .init();

    let viewport = Viewport::new(0, 0, 1280, 720);
    let mut stage = RenderStage::new(RenderStageConfig::default().with_viewport(viewport));

    // Depth-only pass into a shadow map, drawn before the main stage.
    let depth_only = Arc::new(
        StateSet::new()
            .with_attribute(StateAttribute::Program(lit_program("shadow_depth")))
            .with_attribute_and_priority(
                StateAttribute::ColorWrites(statesort::wgpu::ColorWrites::empty()),
                Priority::Override,
            ),
    );
    let shadow_stage = RenderStage::new(
        RenderStageConfig::default()
            .with_render_target(RenderTarget::Texture(SHADOW_MAP))
            .with_viewport(Viewport::new(0, 0, 2048, 2048))
            .with_clear_mask(ClearMask {
                color: false,
                depth: true,
                stencil: false,
            }),
    )
    .with_state_set(depth_only);
    let shadow = stage.add_pre_render_stage(shadow_stage);

    let mut state = State::new();
    let mut context = RecordingContext::new();

    for frame in 0..2 {
        stage.reset();

        let grid = match build_material_grid(&mut stage, 24, 8) {
            Ok(grid) => grid,
            Err(error) => {
                eprintln!("cull failed: {error}");
                return;
            }
        };

        if let Some(shadow_stage) = stage.pre_render_stage_mut(shadow) {
            let caster = Arc::new(StateSet::new());
            let light_view = Mat4::look_at_rh(Vec3::new(10.0, 20.0, 10.0), Vec3::ZERO, Vec3::Y);
            let light_projection = Mat4::orthographic_rh(-20.0, 20.0, -20.0, 20.0, 0.1, 60.0);
            for index in 0..grid.materials.len() as u64 {
                let model = Mat4::from_translation(Vec3::new(index as f32 * 2.0, 0.0, 0.0));
                if let Err(error) = shadow_stage.attach_with_view_depth(
                    &[Arc::clone(&caster)],
                    Arc::new(Geometry::new(GeometryId(10_000 + index), 36)),
                    LeafTransforms::new(light_projection, light_view, model),
                ) {
                    eprintln!("shadow cull failed: {error}");
                    return;
                }
            }
        }

        context.clear();
        match stage.draw(&mut state, &mut context) {
            Ok(stats) => {
                tracing::info!(
                    frame,
                    leaves = stats.leaves(),
                    draws = stats.counts.draws,
                    program_binds = stats.counts.program_binds,
                    attribute_changes = stats.counts.attribute_changes,
                    elided = stats.counts.elided_transitions,
                    device_commands = context.commands().len(),
                    "frame submitted"
                );
            }
            Err(error) => {
                eprintln!("frame dropped: {error}");
                return;
            }
        }
    }
}
