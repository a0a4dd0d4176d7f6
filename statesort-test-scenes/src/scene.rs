use std::sync::Arc;

use statesort::glam::{Mat4, Vec3};
use statesort::wgpu;
use statesort::{
    DrawError, Geometry, GeometryId, LeafTransforms, Program, RenderStage, RenderingHint,
    StateAttribute, StateSet, Transition, UniformLocation, UniformNames,
};

/// Leaves per row of the material grid.
pub const GRID_COLUMNS: usize = 16;

const PROGRAM_COUNT: usize = 4;
const TRANSPARENT_EVERY: usize = 8;

fn geometry(id: u64) -> Arc<Geometry> {
    Arc::new(Geometry::new(GeometryId(id), 36))
}

/// Program declaring every matrix uniform the state tracker knows about.
pub fn lit_program(label: &str) -> Arc<Program> {
    let names = UniformNames::default();
    Arc::new(
        Program::new(Some(label))
            .with_uniform(&names.model, UniformLocation(0))
            .with_uniform(&names.view, UniformLocation(1))
            .with_uniform(&names.projection, UniformLocation(2))
            .with_uniform(&names.model_view, UniformLocation(3))
            .with_uniform(&names.normal, UniformLocation(4)),
    )
}

// ── Two siblings under the root ─────────────────────────────────────────────

/// Root with two children, one blending and one not, each holding one leaf.
pub struct BlendScene {
    pub blend_off: Arc<StateSet>,
    pub blend_on: Arc<StateSet>,
    pub l1: GeometryId,
    pub l2: GeometryId,
}

pub fn build_blend_scene() -> BlendScene {
    BlendScene {
        blend_off: Arc::new(StateSet::new().with_attribute(StateAttribute::Blend(None))),
        blend_on: Arc::new(StateSet::new().with_attribute(StateAttribute::Blend(Some(
            wgpu::BlendState::ALPHA_BLENDING,
        )))),
        l1: GeometryId(1),
        l2: GeometryId(2),
    }
}

impl BlendScene {
    pub fn attach_l1(&self, stage: &mut RenderStage) -> Result<(), DrawError> {
        stage.attach(
            &[Arc::clone(&self.blend_off)],
            geometry(self.l1.0),
            LeafTransforms::default(),
            1.0,
        )?;
        Ok(())
    }

    pub fn attach_l2(&self, stage: &mut RenderStage) -> Result<(), DrawError> {
        stage.attach(
            &[Arc::clone(&self.blend_on)],
            geometry(self.l2.0),
            LeafTransforms::default(),
            2.0,
        )?;
        Ok(())
    }

    /// Journal of drawing L1 then L2. Moving from one sibling to the other
    /// applies the second sibling on top of the root.
    pub fn expected_l1_l2(&self) -> Vec<Transition> {
        vec![
            Transition::Apply(Some(self.blend_off.id())),
            Transition::Draw(self.l1),
            Transition::Apply(Some(self.blend_on.id())),
            Transition::Draw(self.l2),
        ]
    }

    /// Journal of drawing L2 twice: the second draw needs no transition.
    pub fn expected_l2_l2(&self) -> Vec<Transition> {
        vec![
            Transition::Apply(Some(self.blend_on.id())),
            Transition::Draw(self.l2),
            Transition::Draw(self.l2),
        ]
    }
}

// ── Cousins two levels below a shared ancestor ──────────────────────────────

/// `A -> B1 -> B` and `A -> C1 -> C`, one leaf under `B` and one under `C`.
pub struct NestedScene {
    pub a: Arc<StateSet>,
    pub b1: Arc<StateSet>,
    pub b: Arc<StateSet>,
    pub c1: Arc<StateSet>,
    pub c: Arc<StateSet>,
    pub under_b: GeometryId,
    pub under_c: GeometryId,
}

pub fn build_nested_scene(stage: &mut RenderStage) -> Result<NestedScene, DrawError> {
    let state_set = |attribute| Arc::new(StateSet::new().with_attribute(attribute));
    let scene = NestedScene {
        a: state_set(StateAttribute::DepthTest(Some(wgpu::CompareFunction::LessEqual))),
        b1: state_set(StateAttribute::CullFace(None)),
        b: state_set(StateAttribute::DepthWrite(false)),
        c1: state_set(StateAttribute::FrontFace(wgpu::FrontFace::Cw)),
        c: state_set(StateAttribute::ColorWrites(wgpu::ColorWrites::COLOR)),
        under_b: GeometryId(10),
        under_c: GeometryId(20),
    };

    stage.attach(
        &[scene.a.clone(), scene.b1.clone(), scene.b.clone()],
        geometry(scene.under_b.0),
        LeafTransforms::default(),
        0.0,
    )?;
    stage.attach(
        &[scene.a.clone(), scene.c1.clone(), scene.c.clone()],
        geometry(scene.under_c.0),
        LeafTransforms::default(),
        0.0,
    )?;

    Ok(scene)
}

impl NestedScene {
    /// Full journal of one stage draw, including the final rewind.
    pub fn expected_journal(&self) -> Vec<Transition> {
        vec![
            Transition::Push(self.a.id()),
            Transition::Push(self.b1.id()),
            Transition::Apply(Some(self.b.id())),
            Transition::Draw(self.under_b),
            Transition::Pop(self.b1.id()),
            Transition::Push(self.c1.id()),
            Transition::Apply(Some(self.c.id())),
            Transition::Draw(self.under_c),
            Transition::Pop(self.c1.id()),
            Transition::Pop(self.a.id()),
        ]
    }
}

// ── Many materials, few programs ────────────────────────────────────────────

/// `materials` distinct materials spread over a few programs, each drawn
/// `instances` times. Leaves are attached instance-major, so attach order
/// alternates materials on every leaf.
pub struct MaterialGrid {
    pub programs: Vec<Arc<Program>>,
    pub materials: Vec<Arc<StateSet>>,
    pub opaque_leaves: usize,
    pub transparent_leaves: usize,
}

impl MaterialGrid {
    pub fn leaves(&self) -> usize {
        self.opaque_leaves + self.transparent_leaves
    }
}

pub fn build_material_grid(
    stage: &mut RenderStage,
    materials: usize,
    instances: usize,
) -> Result<MaterialGrid, DrawError> {
    let programs: Vec<_> = (0..PROGRAM_COUNT)
        .map(|index| lit_program(&format!("grid_{index}")))
        .collect();
    let groups: Vec<_> = programs
        .iter()
        .map(|program| {
            Arc::new(StateSet::new().with_attribute(StateAttribute::Program(Arc::clone(program))))
        })
        .collect();
    let scene_root = Arc::new(
        StateSet::new().with_attribute(StateAttribute::DepthTest(Some(
            wgpu::CompareFunction::LessEqual,
        ))),
    );

    let material_sets: Vec<_> = (0..materials)
        .map(|index| {
            let material = if index % TRANSPARENT_EVERY == TRANSPARENT_EVERY - 1 {
                StateSet::new()
                    .with_attribute(StateAttribute::Blend(Some(
                        wgpu::BlendState::ALPHA_BLENDING,
                    )))
                    .with_attribute(StateAttribute::DepthWrite(false))
                    .with_rendering_hint(RenderingHint::Transparent)
            } else if index % 2 == 0 {
                StateSet::new().with_attribute(StateAttribute::CullFace(Some(wgpu::Face::Back)))
            } else {
                StateSet::new().with_attribute(StateAttribute::CullFace(None))
            };
            Arc::new(material)
        })
        .collect();

    let projection = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 4.0, 8.0), Vec3::ZERO, Vec3::Y);

    let mut opaque_leaves = 0;
    let mut transparent_leaves = 0;
    for instance in 0..instances {
        for (index, material) in material_sets.iter().enumerate() {
            let slot = instance * materials + index;
            let column = (slot % GRID_COLUMNS) as f32;
            let row = (slot / GRID_COLUMNS) as f32;
            let model = Mat4::from_translation(Vec3::new(column * 2.0, 0.0, -row * 2.0));

            stage.attach_with_view_depth(
                &[
                    Arc::clone(&scene_root),
                    Arc::clone(&groups[index % PROGRAM_COUNT]),
                    Arc::clone(material),
                ],
                geometry(slot as u64),
                LeafTransforms::new(projection, view, model),
            )?;

            if material.rendering_hint() == RenderingHint::Transparent {
                transparent_leaves += 1;
            } else {
                opaque_leaves += 1;
            }
        }
    }

    Ok(MaterialGrid {
        programs,
        materials: material_sets,
        opaque_leaves,
        transparent_leaves,
    })
}
