use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::{State, Transition};
use crate::drawable::Geometry;
use crate::error::DrawError;
use crate::id::GeometryId;
use crate::program::{Program, UniformLocation};
use crate::recording::{DeviceCommand, RecordingContext};
use crate::state_set::{Priority, StateAttribute, StateSet};

fn depth_write(enabled: bool) -> Arc<StateSet> {
    Arc::new(StateSet::new().with_attribute(StateAttribute::DepthWrite(enabled)))
}

fn lit_program() -> Arc<Program> {
    Arc::new(
        Program::new(Some("lit"))
            .with_uniform("uModelMatrix", UniformLocation(0))
            .with_uniform("uViewMatrix", UniformLocation(1))
            .with_uniform("uProjectionMatrix", UniformLocation(2))
            .with_uniform("uModelViewMatrix", UniformLocation(3))
            .with_uniform("uModelViewNormalMatrix", UniformLocation(4)),
    )
}

fn program_set(program: &Arc<Program>) -> Arc<StateSet> {
    Arc::new(StateSet::new().with_attribute(StateAttribute::Program(Arc::clone(program))))
}

#[test]
fn push_and_pop_are_journaled() {
    let mut state = State::new();
    state.set_journal_enabled(true);
    let outer = depth_write(false);

    state.push_state_set(Arc::clone(&outer));
    assert_eq!(state.state_set_stack_size(), 1);
    let popped = state.pop_state_set().unwrap();

    assert_eq!(popped.id(), outer.id());
    assert_eq!(
        state.journal(),
        &[Transition::Push(outer.id()), Transition::Pop(outer.id())]
    );
    assert_eq!(state.counts().state_set_pushes, 1);
    assert_eq!(state.counts().state_set_pops, 1);
}

#[test]
fn pop_on_empty_stack_is_an_error() {
    let mut state = State::new();
    assert_eq!(state.pop_state_set().err(), Some(DrawError::StackUnderflow));
}

#[test]
fn journal_is_off_by_default() {
    let mut state = State::new();
    state.push_state_set(depth_write(false));
    assert!(state.journal().is_empty());
    assert!(state.take_journal().is_empty());
}

#[test]
fn take_journal_drains_and_keeps_recording() {
    let mut state = State::new();
    state.set_journal_enabled(true);
    let mut context = RecordingContext::new();
    let call = Geometry::new(GeometryId(4), 3).draw_call();

    state.draw(&mut context, &call);
    assert_eq!(state.take_journal(), vec![Transition::Draw(GeometryId(4))]);
    assert!(state.journal().is_empty());

    state.draw(&mut context, &call);
    assert_eq!(state.journal(), &[Transition::Draw(GeometryId(4))]);
}

#[test]
fn draw_counter_wraps_instead_of_overflowing() {
    let mut state = State::new();
    let mut context = RecordingContext::new();
    let call = Geometry::new(GeometryId(1), 3).draw_call();
    state.counts.draws = u64::MAX;
    let before = state.counts();

    state.draw(&mut context, &call);
    state.draw(&mut context, &call);

    assert_eq!(state.counts().draws, 1);
    assert_eq!(state.counts().since(&before).draws, 2);
    assert_eq!(context.drawn_geometries(), vec![GeometryId(1), GeometryId(1)]);
}

#[test]
fn applying_the_same_state_twice_touches_the_device_once() {
    let mut state = State::new();
    let mut context = RecordingContext::new();
    let material = depth_write(false);

    state.apply_state_set(&mut context, Some(&*material));
    state.apply_state_set(&mut context, Some(&*material));

    assert_eq!(
        context.commands(),
        &[DeviceCommand::SetAttribute(StateAttribute::DepthWrite(false))]
    );
    assert_eq!(state.counts().state_set_applies, 2);
    assert_eq!(state.counts().attribute_changes, 1);
}

#[test]
fn device_defaults_are_not_resent() {
    let mut state = State::new();
    let mut context = RecordingContext::new();

    state.apply(&mut context);
    state.apply_state_set(&mut context, Some(&*depth_write(true)));

    assert!(context.commands().is_empty());
}

#[test]
fn popping_restores_the_default() {
    let mut state = State::new();
    let mut context = RecordingContext::new();
    let blended = Arc::new(
        StateSet::new().with_attribute(StateAttribute::Blend(Some(
            wgpu::BlendState::ALPHA_BLENDING,
        ))),
    );

    state.push_state_set(blended);
    state.apply(&mut context);
    state.pop_state_set().unwrap();
    state.apply(&mut context);

    assert_eq!(
        context.commands(),
        &[
            DeviceCommand::SetAttribute(StateAttribute::Blend(Some(
                wgpu::BlendState::ALPHA_BLENDING
            ))),
            DeviceCommand::SetAttribute(StateAttribute::Blend(None)),
        ]
    );
}

#[test]
fn override_wins_over_descendant_unless_protected() {
    let mut state = State::new();
    let mut context = RecordingContext::new();
    let forced = Arc::new(StateSet::new().with_attribute_and_priority(
        StateAttribute::CullFace(None),
        Priority::Override,
    ));
    let normal = StateSet::new().with_attribute(StateAttribute::CullFace(Some(wgpu::Face::Front)));
    let protected = StateSet::new().with_attribute_and_priority(
        StateAttribute::CullFace(Some(wgpu::Face::Front)),
        Priority::Protected,
    );

    state.push_state_set(forced);
    state.apply_state_set(&mut context, Some(&normal));
    assert_eq!(
        context.take_commands(),
        vec![DeviceCommand::SetAttribute(StateAttribute::CullFace(None))]
    );

    state.apply_state_set(&mut context, Some(&protected));
    assert_eq!(
        context.take_commands(),
        vec![DeviceCommand::SetAttribute(StateAttribute::CullFace(Some(
            wgpu::Face::Front
        )))]
    );
}

#[test]
fn draw_id_detects_out_of_band_insert() {
    let mut state = State::new();
    state.push_state_set(depth_write(false));
    let draw_id = state.stamp_draw_id();
    let size = state.state_set_stack_size();
    assert!(!state.state_set_stack_changed(draw_id, size));

    state.insert_state_set(0, depth_write(true)).unwrap();

    assert!(state.state_set_stack_changed(draw_id, size));
    assert_eq!(state.state_set_stack_size(), 2);
}

#[test]
fn draw_id_detects_out_of_band_remove() {
    let mut state = State::new();
    let kept = depth_write(false);
    state.push_state_set(depth_write(true));
    state.push_state_set(Arc::clone(&kept));
    let draw_id = state.stamp_draw_id();

    state.remove_state_set(0).unwrap();

    assert!(state.state_set_stack_changed(draw_id, 2));
    assert_eq!(state.state_set_stack()[0].id(), kept.id());
}

#[test]
fn insert_and_remove_check_bounds() {
    let mut state = State::new();
    assert_eq!(
        state.insert_state_set(1, depth_write(false)),
        Err(DrawError::StackIndexOutOfBounds { index: 1, len: 0 })
    );
    assert_eq!(
        state.remove_state_set(0).err(),
        Some(DrawError::StackIndexOutOfBounds { index: 0, len: 0 })
    );
}

#[test]
fn stack_change_by_push_is_detected() {
    let mut state = State::new();
    let draw_id = state.stamp_draw_id();
    state.push_state_set(depth_write(false));
    assert!(state.state_set_stack_changed(draw_id, 0));
}

#[test]
fn inserted_set_takes_part_in_resolution() {
    let mut state = State::new();
    let mut context = RecordingContext::new();
    state.push_state_set(Arc::new(StateSet::new()));

    state
        .insert_state_set(
            0,
            Arc::new(StateSet::new().with_attribute_and_priority(
                StateAttribute::DepthWrite(false),
                Priority::Override,
            )),
        )
        .unwrap();
    state.apply_state_set(&mut context, Some(&*depth_write(true)));

    assert_eq!(
        context.commands(),
        &[DeviceCommand::SetAttribute(StateAttribute::DepthWrite(false))]
    );
}

#[test]
fn model_view_upload_is_elided_when_unchanged() {
    let program = lit_program();
    let mut state = State::new();
    let mut context = RecordingContext::new();
    state.apply_state_set(&mut context, Some(&*program_set(&program)));
    let model_view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));

    assert!(state.apply_model_view_matrix(&mut context, &model_view));
    assert!(!state.apply_model_view_matrix(&mut context, &model_view));

    assert_eq!(context.uploads_to(UniformLocation(3)), 1);
    assert_eq!(context.uploads_to(UniformLocation(4)), 1);
    assert_eq!(state.counts().elided_matrix_updates, 1);
}

#[test]
fn normal_matrix_is_inverse_transpose_of_model_view() {
    let program = lit_program();
    let mut state = State::new();
    let mut context = RecordingContext::new();
    state.apply_state_set(&mut context, Some(&*program_set(&program)));
    let model_view = Mat4::from_scale(Vec3::new(2.0, 4.0, 1.0));

    state.apply_model_view_matrix(&mut context, &model_view);

    let expected = model_view.inverse().transpose();
    let uploaded = context.commands().iter().find_map(|command| match command {
        DeviceCommand::UploadUniform { location, data } if *location == UniformLocation(4) => {
            Some(data.clone())
        }
        _ => None,
    });
    assert_eq!(uploaded, Some(bytemuck::bytes_of(&expected).to_vec()));
}

#[test]
fn program_switch_forces_matrix_reupload() {
    let first = lit_program();
    let second = lit_program();
    let mut state = State::new();
    let mut context = RecordingContext::new();
    let model_view = Mat4::IDENTITY;

    state.apply_state_set(&mut context, Some(&*program_set(&first)));
    assert!(state.apply_model_view_matrix(&mut context, &model_view));

    state.apply_state_set(&mut context, Some(&*program_set(&second)));
    assert!(state.apply_model_view_matrix(&mut context, &model_view));

    state.apply_state_set(&mut context, Some(&*program_set(&first)));
    assert!(state.apply_model_view_matrix(&mut context, &model_view));

    assert_eq!(state.counts().program_binds, 3);
    assert_eq!(context.uploads_to(UniformLocation(3)), 3);
    assert_eq!(state.uniform_cache().len(), 2);
    assert_eq!(state.uniform_cache().misses(), 2);
}

#[test]
fn projection_goes_out_on_every_call() {
    let program = lit_program();
    let mut state = State::new();
    let mut context = RecordingContext::new();
    state.apply_state_set(&mut context, Some(&*program_set(&program)));

    state.apply_projection_matrix(&mut context, &Mat4::IDENTITY);
    state.apply_projection_matrix(&mut context, &Mat4::IDENTITY);

    assert_eq!(context.uploads_to(UniformLocation(2)), 2);
}

#[test]
fn matrices_are_skipped_without_a_program() {
    let mut state = State::new();
    let mut context = RecordingContext::new();

    assert!(!state.apply_model_view_matrix(&mut context, &Mat4::IDENTITY));
    state.apply_projection_matrix(&mut context, &Mat4::IDENTITY);

    assert!(context.commands().is_empty());
    assert!(state.last_program_applied().is_none());
}

#[test]
fn invalidate_resends_everything() {
    let program = lit_program();
    let material = Arc::new(
        StateSet::new()
            .with_attribute(StateAttribute::Program(Arc::clone(&program)))
            .with_attribute(StateAttribute::DepthWrite(true)),
    );
    let mut state = State::new();
    let mut context = RecordingContext::new();

    state.apply_state_set(&mut context, Some(&*material));
    state.apply_model_view_matrix(&mut context, &Mat4::IDENTITY);
    context.clear();

    state.invalidate();
    state.apply_state_set(&mut context, Some(&*material));
    assert!(state.apply_model_view_matrix(&mut context, &Mat4::IDENTITY));

    assert_eq!(context.commands()[0], DeviceCommand::UseProgram(program.id()));
    assert!(context
        .commands()
        .contains(&DeviceCommand::SetAttribute(StateAttribute::DepthWrite(true))));
    assert_eq!(context.uploads_to(UniformLocation(3)), 1);
}
