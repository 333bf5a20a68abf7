use approx::AbsDiffEq;
use bitcode::{Decode, Encode};
use crate::{SoaFloat3, SoaQuaternion, Transform};

/// Four `Transform`s, one per lane. The unit of work of all the animation jobs
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct SoaTransform
{
    pub translation: SoaFloat3,
    pub rotation: SoaQuaternion,
    pub scale: SoaFloat3,
}
impl Default for SoaTransform
{
    fn default() -> Self { Self::IDENTITY }
}
impl SoaTransform
{
    pub const IDENTITY: Self = Self
    {
        translation: SoaFloat3::ZERO,
        rotation: SoaQuaternion::IDENTITY,
        scale: SoaFloat3::ONE,
    };

    #[inline] #[must_use]
    pub fn splat(transform: Transform) -> Self
    {
        Self
        {
            translation: SoaFloat3::splat(transform.translation),
            rotation: SoaQuaternion::splat(transform.rotation),
            scale: SoaFloat3::splat(transform.scale),
        }
    }

    #[must_use]
    pub fn from_transforms(lanes: [Transform; 4]) -> Self
    {
        Self
        {
            translation: SoaFloat3::from_vec3s(lanes.map(|t| t.translation)),
            rotation: SoaQuaternion::from_quats(lanes.map(|t| t.rotation)),
            scale: SoaFloat3::from_vec3s(lanes.map(|t| t.scale)),
        }
    }

    #[must_use]
    pub fn to_transforms(&self) -> [Transform; 4]
    {
        let translations = self.translation.to_vec3s();
        let rotations = self.rotation.to_quats();
        let scales = self.scale.to_vec3s();
        std::array::from_fn(|i| Transform::new(translations[i], rotations[i], scales[i]))
    }

    #[inline] #[must_use]
    pub fn lane(&self, lane: usize) -> Transform
    {
        Transform::new(self.translation.lane(lane), self.rotation.lane(lane), self.scale.lane(lane))
    }
    #[inline]
    pub fn set_lane(&mut self, lane: usize, transform: Transform)
    {
        self.translation.set_lane(lane, transform.translation);
        self.rotation.set_lane(lane, transform.rotation);
        self.scale.set_lane(lane, transform.scale);
    }
}
impl AbsDiffEq for SoaTransform
{
    type Epsilon = f32;
    fn default_epsilon() -> f32 { f32::EPSILON }
    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool
    {
        self.translation.abs_diff_eq(&other.translation, epsilon) &&
        self.rotation.abs_diff_eq(&other.rotation, epsilon) &&
        self.scale.abs_diff_eq(&other.scale, epsilon)
    }
}
