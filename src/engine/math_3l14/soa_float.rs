use std::ops::{Add, Mul, Neg, Sub};
use approx::AbsDiffEq;
use bitcode::{Decode, Encode};
use glam::{BVec4A, Mat4, Vec3, Vec4};

// Lane-wise sqrt, glam only provides horizontal ops for this
#[inline] #[must_use]
pub fn sqrt4(v: Vec4) -> Vec4
{
    Vec4::new(v.x.sqrt(), v.y.sqrt(), v.z.sqrt(), v.w.sqrt())
}

#[inline] #[must_use]
pub fn lane_mask(mask: BVec4A, lane: usize) -> bool
{
    debug_assert!(lane < 4);
    (mask.bitmask() >> lane) & 1 == 1
}

// 4 AoS vectors <-> 4 SoA components
#[inline] #[must_use]
pub fn transpose4x4(input: [Vec4; 4]) -> [Vec4; 4]
{
    let m = Mat4::from_cols(input[0], input[1], input[2], input[3]).transpose();
    [m.x_axis, m.y_axis, m.z_axis, m.w_axis]
}

// 3 SoA components -> 4 AoS vectors
#[inline] #[must_use]
pub fn transpose3x4(input: [Vec4; 3]) -> [Vec3; 4]
{
    let t = transpose4x4([input[0], input[1], input[2], Vec4::ZERO]);
    [t[0].truncate(), t[1].truncate(), t[2].truncate(), t[3].truncate()]
}

// 4 AoS vectors -> 3 SoA components
#[inline] #[must_use]
pub fn transpose4x3(input: [Vec3; 4]) -> [Vec4; 3]
{
    let t = transpose4x4(input.map(|v| v.extend(0.0)));
    [t[0], t[1], t[2]]
}

/// Four `Vec3`s, one per lane
#[derive(Debug, Default, Clone, Copy, PartialEq, Encode, Decode)]
pub struct SoaFloat3
{
    pub x: Vec4,
    pub y: Vec4,
    pub z: Vec4,
}
impl SoaFloat3
{
    pub const ZERO: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ZERO };
    pub const ONE: Self = Self { x: Vec4::ONE, y: Vec4::ONE, z: Vec4::ONE };
    pub const X_AXIS: Self = Self { x: Vec4::ONE, y: Vec4::ZERO, z: Vec4::ZERO };
    pub const Y_AXIS: Self = Self { x: Vec4::ZERO, y: Vec4::ONE, z: Vec4::ZERO };
    pub const Z_AXIS: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ONE };

    #[inline] #[must_use] pub const fn new(x: Vec4, y: Vec4, z: Vec4) -> Self { Self { x, y, z } }

    #[inline] #[must_use]
    pub fn splat(v: Vec3) -> Self
    {
        Self { x: Vec4::splat(v.x), y: Vec4::splat(v.y), z: Vec4::splat(v.z) }
    }

    #[inline] #[must_use]
    pub fn from_vec3s(lanes: [Vec3; 4]) -> Self
    {
        let [x, y, z] = transpose4x3(lanes);
        Self { x, y, z }
    }
    #[inline] #[must_use]
    pub fn to_vec3s(&self) -> [Vec3; 4] { transpose3x4([self.x, self.y, self.z]) }

    #[inline] #[must_use]
    pub fn lane(&self, lane: usize) -> Vec3
    {
        Vec3::new(self.x[lane], self.y[lane], self.z[lane])
    }
    #[inline]
    pub fn set_lane(&mut self, lane: usize, v: Vec3)
    {
        self.x[lane] = v.x;
        self.y[lane] = v.y;
        self.z[lane] = v.z;
    }

    #[inline] #[must_use]
    pub fn dot(self, rhs: Self) -> Vec4 { self.x * rhs.x + self.y * rhs.y + self.z * rhs.z }

    #[inline] #[must_use]
    pub fn cross(self, rhs: Self) -> Self
    {
        Self
        {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    #[inline] #[must_use] pub fn length_squared(self) -> Vec4 { self.dot(self) }
    #[inline] #[must_use] pub fn length(self) -> Vec4 { sqrt4(self.length_squared()) }

    // Lanes of length 0 produce non-finite values, see normalize_or
    #[inline] #[must_use]
    pub fn normalize(self) -> Self { self * self.length().recip() }

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

    // alpha is per-lane
    #[inline] #[must_use]
    pub fn lerp(self, to: Self, alpha: Vec4) -> Self
    {
        Self
        {
            x: (to.x - self.x) * alpha + self.x,
            y: (to.y - self.y) * alpha + self.y,
            z: (to.z - self.z) * alpha + self.z,
        }
    }

    #[inline] #[must_use]
    pub fn min(self, rhs: Self) -> Self { Self { x: self.x.min(rhs.x), y: self.y.min(rhs.y), z: self.z.min(rhs.z) } }
    #[inline] #[must_use]
    pub fn max(self, rhs: Self) -> Self { Self { x: self.x.max(rhs.x), y: self.y.max(rhs.y), z: self.z.max(rhs.z) } }

    #[inline] #[must_use]
    pub fn select(mask: BVec4A, if_true: Self, if_false: Self) -> Self
    {
        Self
        {
            x: Vec4::select(mask, if_true.x, if_false.x),
            y: Vec4::select(mask, if_true.y, if_false.y),
            z: Vec4::select(mask, if_true.z, if_false.z),
        }
    }
}
impl Add for SoaFloat3
{
    type Output = Self;
    #[inline] fn add(self, rhs: Self) -> Self { Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z } }
}
impl Sub for SoaFloat3
{
    type Output = Self;
    #[inline] fn sub(self, rhs: Self) -> Self { Self { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z } }
}
impl Neg for SoaFloat3
{
    type Output = Self;
    #[inline] fn neg(self) -> Self { Self { x: -self.x, y: -self.y, z: -self.z } }
}
impl Mul for SoaFloat3
{
    type Output = Self;
    #[inline] fn mul(self, rhs: Self) -> Self { Self { x: self.x * rhs.x, y: self.y * rhs.y, z: self.z * rhs.z } }
}
// per-lane scalar
impl Mul<Vec4> for SoaFloat3
{
    type Output = Self;
    #[inline] fn mul(self, rhs: Vec4) -> Self { Self { x: self.x * rhs, y: self.y * rhs, z: self.z * rhs } }
}
impl AbsDiffEq for SoaFloat3
{
    type Epsilon = f32;
    fn default_epsilon() -> f32 { f32::EPSILON }
    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool
    {
        self.x.abs_diff_eq(other.x, epsilon) &&
        self.y.abs_diff_eq(other.y, epsilon) &&
        self.z.abs_diff_eq(other.z, epsilon)
    }
}

/// Four `Vec4`s, one per lane
#[derive(Debug, Default, Clone, Copy, PartialEq, Encode, Decode)]
pub struct SoaFloat4
{
    pub x: Vec4,
    pub y: Vec4,
    pub z: Vec4,
    pub w: Vec4,
}
impl SoaFloat4
{
    pub const ZERO: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ZERO, w: Vec4::ZERO };
    pub const X_AXIS: Self = Self { x: Vec4::ONE, y: Vec4::ZERO, z: Vec4::ZERO, w: Vec4::ZERO };
    pub const Y_AXIS: Self = Self { x: Vec4::ZERO, y: Vec4::ONE, z: Vec4::ZERO, w: Vec4::ZERO };
    pub const Z_AXIS: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ONE, w: Vec4::ZERO };
    pub const W_AXIS: Self = Self { x: Vec4::ZERO, y: Vec4::ZERO, z: Vec4::ZERO, w: Vec4::ONE };

    #[inline] #[must_use] pub const fn new(x: Vec4, y: Vec4, z: Vec4, w: Vec4) -> Self { Self { x, y, z, w } }

    #[inline] #[must_use]
    pub fn from_soa_float3(v: SoaFloat3, w: Vec4) -> Self { Self { x: v.x, y: v.y, z: v.z, w } }

    #[inline] #[must_use]
    pub fn from_vec4s(lanes: [Vec4; 4]) -> Self
    {
        let [x, y, z, w] = transpose4x4(lanes);
        Self { x, y, z, w }
    }
    #[inline] #[must_use]
    pub fn to_vec4s(&self) -> [Vec4; 4] { transpose4x4([self.x, self.y, self.z, self.w]) }

    #[inline] #[must_use]
    pub fn lane(&self, lane: usize) -> Vec4
    {
        Vec4::new(self.x[lane], self.y[lane], self.z[lane], self.w[lane])
    }

    #[inline] #[must_use]
    pub fn xyz(self) -> SoaFloat3 { SoaFloat3 { x: self.x, y: self.y, z: self.z } }

    #[inline] #[must_use]
    pub fn dot(self, rhs: Self) -> Vec4 { self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w }

    #[inline] #[must_use]
    pub fn lerp(self, to: Self, alpha: Vec4) -> Self
    {
        Self
        {
            x: (to.x - self.x) * alpha + self.x,
            y: (to.y - self.y) * alpha + self.y,
            z: (to.z - self.z) * alpha + self.z,
            w: (to.w - self.w) * alpha + self.w,
        }
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
}
impl Add for SoaFloat4
{
    type Output = Self;
    #[inline] fn add(self, rhs: Self) -> Self { Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z, w: self.w + rhs.w } }
}
impl Sub for SoaFloat4
{
    type Output = Self;
    #[inline] fn sub(self, rhs: Self) -> Self { Self { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z, w: self.w - rhs.w } }
}
impl Neg for SoaFloat4
{
    type Output = Self;
    #[inline] fn neg(self) -> Self { Self { x: -self.x, y: -self.y, z: -self.z, w: -self.w } }
}
impl Mul<Vec4> for SoaFloat4
{
    type Output = Self;
    #[inline] fn mul(self, rhs: Vec4) -> Self { Self { x: self.x * rhs, y: self.y * rhs, z: self.z * rhs, w: self.w * rhs } }
}
impl AbsDiffEq for SoaFloat4
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
