use bitcode::{Decode, Encode};
use glam::{Mat4, Vec3};

#[derive(Default, Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct AABB
{
    pub min: Vec3,
    pub max: Vec3,
}
impl AABB
{
    pub const MAX_MIN: Self = Self { min: Vec3::MAX, max: Vec3::MIN }; // for finding min volume

    #[inline] #[must_use] pub const fn new(min: Vec3, max: Vec3) -> Self { Self { min, max } }

    /// The smallest box containing every point, `MAX_MIN` if there are none
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self
    {
        let mut aabb = Self::MAX_MIN;
        for point in points
        {
            aabb.expand_to(point);
        }
        aabb
    }

    /// Min is less or equal to max on every axis. `MAX_MIN` is not valid
    #[inline] #[must_use] pub fn is_valid(self) -> bool { self.min.cmple(self.max).all() }

    #[inline] #[must_use] pub fn size(self) -> Vec3 { self.max - self.min }
    #[inline] #[must_use] pub fn center(self) -> Vec3 { (self.min + self.max) / 2.0 }

    #[inline]
    pub fn expand_to(&mut self, point: Vec3)
    {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[inline]
    pub fn union_with(&mut self, other: Self)
    {
        *self = self.unioned_with(other);
    }

    #[inline] #[must_use]
    pub fn unioned_with(self, rhs: Self) -> Self
    {
        Self
        {
            min: self.min.min(rhs.min),
            max: self.max.max(rhs.max),
        }
    }

    #[must_use]
    pub fn contains_point(self, point: Vec3) -> bool
    {
        self.min.cmple(point).all() &&
        self.max.cmpge(point).all()
    }

    /// The box bounding all eight transformed corners
    #[must_use]
    pub fn transformed(self, matrix: &Mat4) -> Self
    {
        if !self.is_valid() { return self; }

        Self::from_points((0..8).map(|i|
        {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z });
            matrix.transform_point3(corner)
        }))
    }
}
