use std::ops::{Add, Mul, Neg};
use approx::AbsDiffEq;
use bitcode::{Decode, Encode};
use glam::{BVec4A, Quat, Vec4};
use crate::{sqrt4, transpose4x4, SoaFloat3};

/// Four quaternions, one per lane
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct SoaQuaternion
{
    pub x: Vec4,
    pub y: Vec4,
    pub z: Vec4,
    pub w: Vec4,
}
impl Default for SoaQuaternion
{
    fn default() -> Self { Self::IDENTITY }
}
impl SoaQuaternion
{
    pub const IDENTITY: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ZERO, w: Vec4::ONE };
    pub const ZERO: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ZERO, w: Vec4::ZERO };

    #[inline] #[must_use] pub const fn new(x: Vec4, y: Vec4, z: Vec4, w: Vec4) -> Self { Self { x, y, z, w } }

    #[inline] #[must_use]
    pub fn splat(q: Quat) -> Self
    {
        Self { x: Vec4::splat(q.x), y: Vec4::splat(q.y), z: Vec4::splat(q.z), w: Vec4::splat(q.w) }
    }

    #[inline] #[must_use]
    pub fn from_quats(lanes: [Quat; 4]) -> Self
    {
        let [x, y, z, w] = transpose4x4(lanes.map(Vec4::from));
        Self { x, y, z, w }
    }
    #[inline] #[must_use]
    pub fn to_quats(&self) -> [Quat; 4]
    {
        transpose4x4([self.x, self.y, self.z, self.w]).map(Quat::from_vec4)
    }

    #[inline] #[must_use]
    pub fn lane(&self, lane: usize) -> Quat
    {
        Quat::from_xyzw(self.x[lane], self.y[lane], self.z[lane], self.w[lane])
    }
    #[inline]
    pub fn set_lane(&mut self, lane: usize, q: Quat)
    {
        self.x[lane] = q.x;
        self.y[lane] = q.y;
        self.z[lane] = q.z;
        self.w[lane] = q.w;
    }

    #[inline] #[must_use]
    pub fn conjugate(self) -> Self { Self { x: -self.x, y: -self.y, z: -self.z, w: self.w } }

    #[inline] #[must_use]
    pub fn dot(self, rhs: Self) -> Vec4 { self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w }

    #[inline] #[must_use] pub fn length_squared(self) -> Vec4 { self.dot(self) }

    #[inline] #[must_use]
    pub fn normalize(self) -> Self { self * sqrt4(self.length_squared()).recip() }

    // Lanes with a zero length take the fallback value
    #[inline] #[must_use]
    pub fn normalize_or(self, fallback: Self) -> Self
    {
        let len_sq = self.length_squared();
        let valid = len_sq.cmpgt(Vec4::ZERO);
        let inv_len = sqrt4(Vec4::select(valid, len_sq, Vec4::ONE)).recip();
        Self::select(valid, self * inv_len, fallback)
    }

    #[inline] #[must_use]
    pub fn is_normalized_est(self) -> BVec4A
    {
        (self.length_squared() - Vec4::ONE).abs().cmplt(Vec4::splat(2e-3))
    }

    // negates the lanes set in mask, representing the same rotation
    #[inline] #[must_use]
    pub fn negate_lanes(self, mask: BVec4A) -> Self { Self::select(mask, -self, self) }

    // Lerp + renormalize. Inputs are expected in the same hemisphere
    #[inline] #[must_use]
    pub fn nlerp(self, to: Self, alpha: Vec4) -> Self
    {
        Self
        {
            x: (to.x - self.x) * alpha + self.x,
            y: (to.y - self.y) * alpha + self.y,
            z: (to.z - self.z) * alpha + self.z,
            w: (to.w - self.w) * alpha + self.w,
        }.normalize()
    }

    #[inline] #[must_use]
    pub fn select(mask: BVec4A, if_true: Self, if_false: Self) -> Self
    {
        Self
        {
            x: Vec4::select(mask, if_true.x, if_false.x),
            y: Vec4::select(mask, if_true.y, if_false.y),
            z: Vec4::select(mask, if_true.z, if_false.z),
            w: Vec4::select(mask, if_true.w, if_false.w),
        }
    }

    // rotate a vector by each lane
    #[must_use]
    pub fn transform_vector(self, v: SoaFloat3) -> SoaFloat3
    {
        let axis = SoaFloat3::new(self.x, self.y, self.z);
        let t = axis.cross(v) * Vec4::splat(2.0);
        v + t * self.w + axis.cross(t)
    }
}
impl Add for SoaQuaternion
{
    type Output = Self;
    #[inline] fn add(self, rhs: Self) -> Self { Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z, w: self.w + rhs.w } }
}
impl Neg for SoaQuaternion
{
    type Output = Self;
    #[inline] fn neg(self) -> Self { Self { x: -self.x, y: -self.y, z: -self.z, w: -self.w } }
}
impl Mul<Vec4> for SoaQuaternion
{
    type Output = Self;
    #[inline] fn mul(self, rhs: Vec4) -> Self { Self { x: self.x * rhs, y: self.y * rhs, z: self.z * rhs, w: self.w * rhs } }
}
// Hamilton product, same convention as glam::Quat
impl Mul for SoaQuaternion
{
    type Output = Self;
    fn mul(self, rhs: Self) -> Self
    {
        Self
        {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y + self.y * rhs.w + self.z * rhs.x - self.x * rhs.z,
            z: self.w * rhs.z + self.z * rhs.w + self.x * rhs.y - self.y * rhs.x,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}
impl AbsDiffEq for SoaQuaternion
{
    type Epsilon = f32;
    fn default_epsilon() -> f32 { f32::EPSILON }
    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool
    {
        self.x.abs_diff_eq(other.x, epsilon) &&
        self.y.abs_diff_eq(other.y, epsilon) &&
        self.z.abs_diff_eq(other.z, epsilon) &&
        self.w.abs_diff_eq(other.w, epsilon)
    }
}
