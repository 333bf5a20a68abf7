use math_3l14::Transform;
use crate::MAX_JOINTS;
use super::SkeletonBuildError;

/// An editable joint and its children
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawJoint
{
    pub name: String,
    /// Relative to the parent joint
    pub transform: Transform,
    pub children: Vec<RawJoint>,
}
impl RawJoint
{
    pub fn new(name: impl Into<String>, transform: Transform, children: Vec<RawJoint>) -> Self
    {
        Self { name: name.into(), transform, children }
    }
}

/// An editable joint hierarchy, stored as a tree
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawSkeleton
{
    pub roots: Vec<RawJoint>,
}
impl RawSkeleton
{
    #[must_use]
    pub fn num_joints(&self) -> usize
    {
        fn count(joints: &[RawJoint]) -> usize
        {
            joints.iter().map(|j| 1 + count(&j.children)).sum()
        }
        count(&self.roots)
    }

    pub fn validate(&self) -> Result<(), SkeletonBuildError>
    {
        let num_joints = self.num_joints();
        if num_joints > MAX_JOINTS
        {
            return Err(SkeletonBuildError::TooManyJoints(num_joints));
        }
        Ok(())
    }
}
