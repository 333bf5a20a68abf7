mod skinning_job;
pub use skinning_job::*;

mod skinning_matrices;
pub use skinning_matrices::*;
