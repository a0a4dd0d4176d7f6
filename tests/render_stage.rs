/// Full frames over the material grid, driven through the headless
/// recording context.
///
/// Run with:   cargo test --test render_stage
use statesort::{
    ClearMask, DeviceCommand, FrameStats, RecordingContext, RenderStage, RenderStageConfig,
    RenderTarget, SortMode, State, Viewport,
};
use statesort_test_scenes::build_material_grid;
use tracing_subscriber::EnvFilter;

const MATERIALS: usize = 32;
const INSTANCES: usize = 4;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn draw_grid(config: RenderStageConfig) -> (FrameStats, RecordingContext) {
    let mut stage = RenderStage::new(config);
    let grid = build_material_grid(&mut stage, MATERIALS, INSTANCES).unwrap();
    assert_eq!(stage.leaf_count(), grid.leaves());

    let mut state = State::new();
    let mut context = RecordingContext::new();
    let stats = stage.draw(&mut state, &mut context).unwrap();
    assert_eq!(stats.opaque_leaves, grid.opaque_leaves);
    assert_eq!(stats.transparent_leaves, grid.transparent_leaves);
    (stats, context)
}

#[test]
fn state_sorting_issues_fewer_state_changes_than_attach_order() {
    init_tracing();

    let (sorted, sorted_context) = draw_grid(RenderStageConfig::default());
    let (unsorted, unsorted_context) =
        draw_grid(RenderStageConfig::default().with_opaque_sort(SortMode::Unsorted));

    assert_eq!(sorted.counts.draws, unsorted.counts.draws);
    assert_eq!(
        sorted_context.drawn_geometries().len(),
        unsorted_context.drawn_geometries().len()
    );
    assert!(
        sorted.counts.program_binds < unsorted.counts.program_binds,
        "sorted binds {} vs unsorted {}",
        sorted.counts.program_binds,
        unsorted.counts.program_binds,
    );
    assert!(sorted_context.state_changes() < unsorted_context.state_changes());
    assert!(sorted.counts.elided_transitions > unsorted.counts.elided_transitions);
}

#[test]
fn every_leaf_is_drawn_exactly_once() {
    let (stats, context) = draw_grid(RenderStageConfig::default());

    let mut drawn: Vec<u64> = context
        .drawn_geometries()
        .into_iter()
        .map(|geometry| geometry.0)
        .collect();
    drawn.sort_unstable();
    let expected: Vec<u64> = (0..(MATERIALS * INSTANCES) as u64).collect();

    assert_eq!(drawn, expected);
    assert_eq!(stats.counts.draws as usize, MATERIALS * INSTANCES);
}

#[test]
fn stage_prologue_sets_target_viewport_and_clear() {
    let viewport = Viewport::new(0, 0, 1280, 720);
    let config = RenderStageConfig::default()
        .with_render_target(RenderTarget::Texture(7))
        .with_viewport(viewport)
        .with_clear_color(statesort::wgpu::Color::WHITE)
        .with_clear_depth(0.0);
    let (_, context) = draw_grid(config);

    assert_eq!(
        &context.commands()[..3],
        &[
            DeviceCommand::SetRenderTarget(RenderTarget::Texture(7)),
            DeviceCommand::SetViewport(viewport),
            DeviceCommand::Clear {
                mask: ClearMask::COLOR_DEPTH,
                color: statesort::wgpu::Color::WHITE,
                depth: 0.0,
            },
        ]
    );
}

#[test]
fn empty_frame_clears_and_draws_nothing() {
    let mut stage = RenderStage::default();
    let mut state = State::new();
    let mut context = RecordingContext::new();

    let stats = stage.draw(&mut state, &mut context).unwrap();

    assert_eq!(stats.leaves(), 0);
    assert!(context.drawn_geometries().is_empty());
    assert_eq!(context.state_changes(), 0);
}

#[test]
fn reset_between_frames_drops_previous_leaves() {
    let mut stage = RenderStage::default();
    build_material_grid(&mut stage, 4, 1).unwrap();
    let mut state = State::new();
    let mut context = RecordingContext::new();
    stage.draw(&mut state, &mut context).unwrap();

    stage.reset();
    build_material_grid(&mut stage, 2, 1).unwrap();
    context.clear();
    let stats = stage.draw(&mut state, &mut context).unwrap();

    assert_eq!(stats.leaves(), 2);
    assert_eq!(context.drawn_geometries().len(), 2);
}

#[cfg(feature = "render_metrics")]
#[test]
fn phase_timings_fit_inside_the_total() {
    let (stats, _) = draw_grid(RenderStageConfig::default());
    assert!(stats.timings.flatten + stats.timings.draw <= stats.timings.total);
}
