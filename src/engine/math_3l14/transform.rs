use approx::AbsDiffEq;
use bitcode::{Decode, Encode};
use glam::{Mat4, Quat, Vec3};

/// An affine translation/rotation/scale transform, applied scale first
#[derive(Debug, PartialEq, Clone, Copy, Encode, Decode)]
pub struct Transform
{
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}
impl Default for Transform
{
    fn default() -> Self { Self::IDENTITY }
}
impl Transform
{
    pub const IDENTITY: Self = Self
    {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline] #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self
    {
        Self { translation, rotation, scale }
    }

    #[inline] #[must_use]
    pub fn from_translation(translation: Vec3) -> Self { Self { translation, ..Self::IDENTITY } }
    #[inline] #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self { Self { rotation, ..Self::IDENTITY } }

    #[inline] #[must_use]
    pub fn to_matrix(&self) -> Mat4 { Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation) }
}

impl From<(Vec3, Quat, Vec3)> for Transform
{
    fn from((translation, rotation, scale): (Vec3, Quat, Vec3)) -> Self
    {
        Transform { translation, rotation, scale }
    }
}
impl From<Transform> for Mat4
{
    fn from(t: Transform) -> Self { t.to_matrix() }
}
impl From<Mat4> for Transform
{
    fn from(m: Mat4) -> Self
    {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Transform { translation, rotation, scale }
    }
}

impl AbsDiffEq for Transform
{
    type Epsilon = f32;
    fn default_epsilon() -> f32 { f32::EPSILON }
    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool
    {
        self.translation.abs_diff_eq(other.translation, epsilon) &&
        self.rotation.abs_diff_eq(other.rotation, epsilon) &&
        self.scale.abs_diff_eq(other.scale, epsilon)
    }
}
