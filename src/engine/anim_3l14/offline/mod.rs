//! Editable skeleton and animation descriptions, and the builders that turn them into runtime data

mod raw_skeleton;
pub use raw_skeleton::*;

mod skeleton_builder;
pub use skeleton_builder::*;

mod raw_animation;
pub use raw_animation::*;

mod animation_builder;
pub use animation_builder::*;
