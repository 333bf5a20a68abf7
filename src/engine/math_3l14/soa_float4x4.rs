use std::ops::{Add, Mul, Sub};
use approx::AbsDiffEq;
use glam::{BVec4A, Mat4, Vec4};
use crate::{SoaFloat3, SoaFloat4, SoaQuaternion};

/// Four column-major 4x4 matrices, one per lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoaFloat4x4
{
    pub cols: [SoaFloat4; 4],
}
impl Default for SoaFloat4x4
{
    fn default() -> Self { Self::IDENTITY }
}
impl SoaFloat4x4
{
    pub const IDENTITY: Self = Self { cols: [SoaFloat4::X_AXIS, SoaFloat4::Y_AXIS, SoaFloat4::Z_AXIS, SoaFloat4::W_AXIS] };

    #[inline] #[must_use]
    pub fn from_translation(translation: SoaFloat3) -> Self
    {
        Self { cols: [SoaFloat4::X_AXIS, SoaFloat4::Y_AXIS, SoaFloat4::Z_AXIS, SoaFloat4::from_soa_float3(translation, Vec4::ONE)] }
    }

    #[inline] #[must_use]
    pub fn from_scale(scale: SoaFloat3) -> Self
    {
        Self
        {
            cols:
            [
                SoaFloat4::new(scale.x, Vec4::ZERO, Vec4::ZERO, Vec4::ZERO),
                SoaFloat4::new(Vec4::ZERO, scale.y, Vec4::ZERO, Vec4::ZERO),
                SoaFloat4::new(Vec4::ZERO, Vec4::ZERO, scale.z, Vec4::ZERO),
                SoaFloat4::W_AXIS,
            ]
        }
    }

    #[inline] #[must_use]
    pub fn from_quaternion(rotation: SoaQuaternion) -> Self { Self::from_affine(SoaFloat3::ZERO, rotation, SoaFloat3::ONE) }

    /// Scale, then rotate, then translate. Rotations are expected to be normalized
    #[must_use]
    pub fn from_affine(translation: SoaFloat3, rotation: SoaQuaternion, scale: SoaFloat3) -> Self
    {
        let two = Vec4::splat(2.0);
        let q = rotation;
        let (xx, xy, xz, xw) = (q.x * q.x, q.x * q.y, q.x * q.z, q.x * q.w);
        let (yy, yz, yw) = (q.y * q.y, q.y * q.z, q.y * q.w);
        let (zz, zw) = (q.z * q.z, q.z * q.w);

        Self
        {
            cols:
            [
                SoaFloat4::new(
                    scale.x * (Vec4::ONE - two * (yy + zz)),
                    scale.x * (two * (xy + zw)),
                    scale.x * (two * (xz - yw)),
                    Vec4::ZERO),
                SoaFloat4::new(
                    scale.y * (two * (xy - zw)),
                    scale.y * (Vec4::ONE - two * (xx + zz)),
                    scale.y * (two * (yz + xw)),
                    Vec4::ZERO),
                SoaFloat4::new(
                    scale.z * (two * (xz + yw)),
                    scale.z * (two * (yz - xw)),
                    scale.z * (Vec4::ONE - two * (xx + yy)),
                    Vec4::ZERO),
                SoaFloat4::from_soa_float3(translation, Vec4::ONE),
            ]
        }
    }

    #[must_use]
    pub fn from_mat4s(lanes: [Mat4; 4]) -> Self
    {
        Self
        {
            cols: std::array::from_fn(|c| SoaFloat4::from_vec4s(lanes.map(|m| m.col(c))))
        }
    }

    #[must_use]
    pub fn to_mat4s(&self) -> [Mat4; 4]
    {
        let cols = self.cols.map(|c| c.to_vec4s());
        std::array::from_fn(|lane| Mat4::from_cols(cols[0][lane], cols[1][lane], cols[2][lane], cols[3][lane]))
    }

    #[inline] #[must_use]
    pub fn lane(&self, lane: usize) -> Mat4
    {
        Mat4::from_cols(self.cols[0].lane(lane), self.cols[1].lane(lane), self.cols[2].lane(lane), self.cols[3].lane(lane))
    }

    #[must_use]
    pub fn transpose(&self) -> Self
    {
        let [c0, c1, c2, c3] = self.cols;
        Self
        {
            cols:
            [
                SoaFloat4::new(c0.x, c1.x, c2.x, c3.x),
                SoaFloat4::new(c0.y, c1.y, c2.y, c3.y),
                SoaFloat4::new(c0.z, c1.z, c2.z, c3.z),
                SoaFloat4::new(c0.w, c1.w, c2.w, c3.w),
            ]
        }
    }

    /// Inverts every lane. Lanes with a zero determinant are not invertible:
    /// they are cleared in the returned mask and come back as identity
    #[must_use]
    pub fn inverse(&self) -> (Self, BVec4A)
    {
        let a = self.cols.map(|c| [c.x, c.y, c.z, c.w]);

        // 2x2 sub-determinants of the first and last two columns
        let s0 = a[0][0] * a[1][1] - a[1][0] * a[0][1];
        let s1 = a[0][0] * a[1][2] - a[1][0] * a[0][2];
        let s2 = a[0][0] * a[1][3] - a[1][0] * a[0][3];
        let s3 = a[0][1] * a[1][2] - a[1][1] * a[0][2];
        let s4 = a[0][1] * a[1][3] - a[1][1] * a[0][3];
        let s5 = a[0][2] * a[1][3] - a[1][2] * a[0][3];

        let c5 = a[2][2] * a[3][3] - a[3][2] * a[2][3];
        let c4 = a[2][1] * a[3][3] - a[3][1] * a[2][3];
        let c3 = a[2][1] * a[3][2] - a[3][1] * a[2][2];
        let c2 = a[2][0] * a[3][3] - a[3][0] * a[2][3];
        let c1 = a[2][0] * a[3][2] - a[3][0] * a[2][2];
        let c0 = a[2][0] * a[3][1] - a[3][0] * a[2][1];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        let invertible = det.cmpne(Vec4::ZERO);
        let inv_det = Vec4::select(invertible, det, Vec4::ONE).recip();

        let inverse = Self
        {
            cols:
            [
                SoaFloat4::new(
                    (a[1][1] * c5 - a[1][2] * c4 + a[1][3] * c3) * inv_det,
                    (-a[0][1] * c5 + a[0][2] * c4 - a[0][3] * c3) * inv_det,
                    (a[3][1] * s5 - a[3][2] * s4 + a[3][3] * s3) * inv_det,
                    (-a[2][1] * s5 + a[2][2] * s4 - a[2][3] * s3) * inv_det),
                SoaFloat4::new(
                    (-a[1][0] * c5 + a[1][2] * c2 - a[1][3] * c1) * inv_det,
                    (a[0][0] * c5 - a[0][2] * c2 + a[0][3] * c1) * inv_det,
                    (-a[3][0] * s5 + a[3][2] * s2 - a[3][3] * s1) * inv_det,
                    (a[2][0] * s5 - a[2][2] * s2 + a[2][3] * s1) * inv_det),
                SoaFloat4::new(
                    (a[1][0] * c4 - a[1][1] * c2 + a[1][3] * c0) * inv_det,
                    (-a[0][0] * c4 + a[0][1] * c2 - a[0][3] * c0) * inv_det,
                    (a[3][0] * s4 - a[3][1] * s2 + a[3][3] * s0) * inv_det,
                    (-a[2][0] * s4 + a[2][1] * s2 - a[2][3] * s0) * inv_det),
                SoaFloat4::new(
                    (-a[1][0] * c3 + a[1][1] * c1 - a[1][2] * c0) * inv_det,
                    (a[0][0] * c3 - a[0][1] * c1 + a[0][2] * c0) * inv_det,
                    (-a[3][0] * s3 + a[3][1] * s1 - a[3][2] * s0) * inv_det,
                    (a[2][0] * s3 - a[2][1] * s1 + a[2][2] * s0) * inv_det),
            ]
        };

        (Self::select(invertible, inverse, Self::IDENTITY), invertible)
    }

    #[inline] #[must_use]
    pub fn select(mask: BVec4A, if_true: Self, if_false: Self) -> Self
    {
        Self { cols: std::array::from_fn(|c| SoaFloat4::select(mask, if_true.cols[c], if_false.cols[c])) }
    }

    #[inline] #[must_use]
    pub fn mul_soa_float4(&self, v: SoaFloat4) -> SoaFloat4
    {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z + self.cols[3] * v.w
    }

    #[inline] #[must_use]
    pub fn transform_point3(&self, p: SoaFloat3) -> SoaFloat3
    {
        (self.cols[0] * p.x + self.cols[1] * p.y + self.cols[2] * p.z + self.cols[3]).xyz()
    }

    #[inline] #[must_use]
    pub fn transform_vector3(&self, v: SoaFloat3) -> SoaFloat3
    {
        (self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z).xyz()
    }
}
impl Mul for SoaFloat4x4
{
    type Output = Self;
    fn mul(self, rhs: Self) -> Self
    {
        Self { cols: rhs.cols.map(|c| self.mul_soa_float4(c)) }
    }
}
impl Add for SoaFloat4x4
{
    type Output = Self;
    fn add(self, rhs: Self) -> Self { Self { cols: std::array::from_fn(|c| self.cols[c] + rhs.cols[c]) } }
}
impl Sub for SoaFloat4x4
{
    type Output = Self;
    fn sub(self, rhs: Self) -> Self { Self { cols: std::array::from_fn(|c| self.cols[c] - rhs.cols[c]) } }
}
impl AbsDiffEq for SoaFloat4x4
{
    type Epsilon = f32;
    fn default_epsilon() -> f32 { f32::EPSILON }
    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool
    {
        self.cols.iter().zip(other.cols.iter()).all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use crate::Transform;
    use super::*;

    fn random_transforms(rng: &mut StdRng) -> [Transform; 4]
    {
        std::array::from_fn(|_|
        {
            let axis = Vec3::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0), rng.random_range(0.1..1.0)).normalize();
            Transform
            {
                translation: Vec3::new(rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)),
                rotation: Quat::from_axis_angle(axis, rng.random_range(-3.0..3.0)),
                scale: Vec3::new(rng.random_range(0.1..3.0), rng.random_range(0.1..3.0), rng.random_range(0.1..3.0)),
            }
        })
    }

    #[test]
    fn identity()
    {
        assert_eq!(SoaFloat4x4::IDENTITY.to_mat4s(), [Mat4::IDENTITY; 4]);
        assert_eq!(SoaFloat4x4::default().lane(2), Mat4::IDENTITY);
    }

    #[test]
    fn load_store()
    {
        let mats = [
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            Mat4::from_rotation_y(1.0),
            Mat4::from_cols_array(&std::array::from_fn(|i| i as f32)),
        ];
        let soa = SoaFloat4x4::from_mat4s(mats);
        assert_eq!(soa.to_mat4s(), mats);
        assert_eq!(soa.lane(3), mats[3]);
    }

    #[test]
    fn from_affine_matches_aos()
    {
        let mut rng = StdRng::seed_from_u64(0x3114);
        for _ in 0..16
        {
            let transforms = random_transforms(&mut rng);
            let translations = SoaFloat3::from_vec3s(transforms.map(|t| t.translation));
            let rotations = SoaQuaternion::from_quats(transforms.map(|t| t.rotation));
            let scales = SoaFloat3::from_vec3s(transforms.map(|t| t.scale));

            let soa = SoaFloat4x4::from_affine(translations, rotations, scales);
            for (lane, m) in soa.to_mat4s().iter().enumerate()
            {
                assert_relative_eq!(*m, transforms[lane].to_matrix(), epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn constructors()
    {
        let t = SoaFloat3::from_vec3s([Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE]);
        let q = SoaQuaternion::from_quats([Quat::IDENTITY, Quat::from_rotation_x(1.0), Quat::from_rotation_y(2.0), Quat::from_rotation_z(3.0)]);
        let s = SoaFloat3::from_vec3s([Vec3::ONE, Vec3::splat(2.0), Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5)]);

        let composed = SoaFloat4x4::from_translation(t) * SoaFloat4x4::from_quaternion(q) * SoaFloat4x4::from_scale(s);
        let affine = SoaFloat4x4::from_affine(t, q, s);
        approx::assert_abs_diff_eq!(composed, affine, epsilon = 1e-5);

        let summed = affine + SoaFloat4x4::IDENTITY - SoaFloat4x4::IDENTITY;
        approx::assert_abs_diff_eq!(summed, affine, epsilon = 1e-6);
    }

    #[test]
    fn transpose()
    {
        let mats = [
            Mat4::from_cols_array(&std::array::from_fn(|i| i as f32)),
            Mat4::from_rotation_x(0.3),
            Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0)),
            Mat4::IDENTITY,
        ];
        let transposed = SoaFloat4x4::from_mat4s(mats).transpose();
        for lane in 0..4
        {
            assert_eq!(transposed.lane(lane), mats[lane].transpose());
        }
    }

    #[test]
    fn inverse()
    {
        let mut rng = StdRng::seed_from_u64(77);
        let mut mats = random_transforms(&mut rng).map(|t| t.to_matrix());
        mats[2] = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));

        let (inverse, invertible) = SoaFloat4x4::from_mat4s(mats).inverse();
        assert_eq!(invertible.bitmask(), 0b1011);
        assert_eq!(inverse.lane(2), Mat4::IDENTITY);
        for lane in [0, 1, 3]
        {
            assert_relative_eq!(inverse.lane(lane), mats[lane].inverse(), epsilon = 1e-3);
            assert_relative_eq!(inverse.lane(lane) * mats[lane], Mat4::IDENTITY, epsilon = 1e-3);
        }
    }

    #[test]
    fn multiply_and_transform()
    {
        let mut rng = StdRng::seed_from_u64(8);
        let a = random_transforms(&mut rng).map(|t| t.to_matrix());
        let b = random_transforms(&mut rng).map(|t| t.to_matrix());
        let product = SoaFloat4x4::from_mat4s(a) * SoaFloat4x4::from_mat4s(b);
        for lane in 0..4
        {
            assert_relative_eq!(product.lane(lane), a[lane] * b[lane], epsilon = 1e-3);
        }

        let points = [Vec3::X, Vec3::Y, Vec3::new(1.0, -2.0, 3.0), Vec3::ZERO];
        let soa_a = SoaFloat4x4::from_mat4s(a);
        let moved = soa_a.transform_point3(SoaFloat3::from_vec3s(points));
        let turned = soa_a.transform_vector3(SoaFloat3::from_vec3s(points));
        for lane in 0..4
        {
            assert_relative_eq!(moved.lane(lane), a[lane].transform_point3(points[lane]), epsilon = 1e-4);
            assert_relative_eq!(turned.lane(lane), a[lane].transform_vector3(points[lane]), epsilon = 1e-4);
        }
    }
}
