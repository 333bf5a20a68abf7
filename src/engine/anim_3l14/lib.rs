mod skeleton;
pub use skeleton::*;

mod animation;
pub use animation::*;

mod sampling_job;
pub use sampling_job::*;

mod local_to_model_job;
pub use local_to_model_job::*;

mod blending_job;
pub use blending_job::*;

pub mod skeleton_utils;

mod playback_controller;
pub use playback_controller::*;

pub mod offline;
