mod soa_float;
pub use soa_float::*;

mod soa_quaternion;
pub use soa_quaternion::*;

mod soa_transform;
pub use soa_transform::*;

mod soa_float4x4;
pub use soa_float4x4::*;

mod transform;
pub use transform::*;

mod nquat48;
pub use nquat48::*;

mod aabb;
pub use aabb::*;

mod lerp;
pub use lerp::*;
