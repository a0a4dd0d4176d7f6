pub mod expectations;
pub mod scene;

pub use expectations::{check_commands, check_counts, check_journal, CountExpectation, Counter};
pub use scene::{
    build_blend_scene, build_material_grid, build_nested_scene, BlendScene, MaterialGrid,
    NestedScene, GRID_COLUMNS,
};
