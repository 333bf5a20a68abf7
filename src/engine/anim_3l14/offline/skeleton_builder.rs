use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use nab_3l14::warn_err;
use crate::{Skeleton, SkeletonError, NO_PARENT};
use super::{RawJoint, RawSkeleton};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonBuildError
{
    TooManyJoints(usize),
    Skeleton(SkeletonError),
}
impl Display for SkeletonBuildError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for SkeletonBuildError { }
impl From<SkeletonError> for SkeletonBuildError
{
    fn from(err: SkeletonError) -> Self { Self::Skeleton(err) }
}

/// Flattens a [`RawSkeleton`] into a runtime [`Skeleton`].
///
/// Joints are laid out breadth-first: roots first, then each joint's children
/// together, so parents precede their children and siblings are contiguous.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkeletonBuilder;
impl SkeletonBuilder
{
    pub fn build(&self, raw: &RawSkeleton) -> Result<Skeleton, SkeletonBuildError>
    {
        raw.validate().map_err(|err| warn_err!(err, "Rejected raw skeleton"))?;

        let num_joints = raw.num_joints();
        let mut parents = Vec::with_capacity(num_joints);
        let mut names = Vec::with_capacity(num_joints);
        let mut bind_pose = Vec::with_capacity(num_joints);

        let mut queue: VecDeque<(&RawJoint, i16)> = raw.roots.iter().map(|root| (root, NO_PARENT)).collect();
        while let Some((joint, parent)) = queue.pop_front()
        {
            let index = parents.len() as i16;
            parents.push(parent);
            names.push(joint.name.clone());
            bind_pose.push(joint.transform);
            queue.extend(joint.children.iter().map(|child| (child, index)));
        }

        let skeleton = Skeleton::new(&parents, names.into_boxed_slice(), &bind_pose)?;
        log::debug!("Built skeleton with {} joints ({} SoA)", skeleton.num_joints(), skeleton.num_soa_joints());
        Ok(skeleton)
    }
}

#[cfg(test)]
mod tests
{
    use glam::Vec3;
    use math_3l14::Transform;
    use crate::MAX_JOINTS;
    use crate::skeleton_utils::{iterate_joints_df, joint_bind_pose};
    use super::*;

    fn joint(name: &str, children: Vec<RawJoint>) -> RawJoint
    {
        let x = name.as_bytes()[0] as f32;
        RawJoint::new(name, Transform::from_translation(Vec3::new(x, 0.0, 0.0)), children)
    }

    //     a        f
    //   / | \
    //  b  c  d
    //  |     |
    //  e     g
    //        |
    //        h
    fn raw() -> RawSkeleton
    {
        RawSkeleton
        {
            roots: vec![
                joint("a", vec![
                    joint("b", vec![joint("e", Vec::new())]),
                    joint("c", Vec::new()),
                    joint("d", vec![joint("g", vec![joint("h", Vec::new())])]),
                ]),
                joint("f", Vec::new()),
            ],
        }
    }

    #[test]
    fn empty()
    {
        let skeleton = SkeletonBuilder.build(&RawSkeleton::default()).unwrap();
        assert_eq!(skeleton.num_joints(), 0);
        assert!(skeleton.bind_pose().is_empty());
    }

    #[test]
    fn breadth_first_layout()
    {
        let skeleton = SkeletonBuilder.build(&raw()).unwrap();
        assert_eq!(skeleton.num_joints(), 8);
        assert_eq!(skeleton.num_soa_joints(), 2);
        assert_eq!(skeleton.joint_names(), ["a", "f", "b", "c", "d", "e", "g", "h"]);

        let parents: Vec<_> = skeleton.joint_properties().iter().map(|p| p.parent).collect();
        assert_eq!(parents, [NO_PARENT, NO_PARENT, 0, 0, 0, 2, 4, 6]);

        let leaves: Vec<_> = (0..8).filter(|&j| skeleton.is_leaf(j)).map(|j| skeleton.joint_names()[j].as_str()).collect();
        assert_eq!(leaves, ["f", "c", "e", "h"]);

        for j in 0..8
        {
            let x = skeleton.joint_names()[j].as_bytes()[0] as f32;
            assert_eq!(joint_bind_pose(&skeleton, j).translation, Vec3::new(x, 0.0, 0.0));
        }
    }

    #[test]
    fn depth_first_order_matches_the_tree()
    {
        let skeleton = SkeletonBuilder.build(&raw()).unwrap();
        let mut names = Vec::new();
        iterate_joints_df(&skeleton, None, |joint, _| names.push(skeleton.joint_names()[joint].clone()));
        assert_eq!(names, ["a", "b", "e", "c", "d", "g", "h", "f"]);
    }

    #[test]
    fn too_many_joints()
    {
        let raw = RawSkeleton { roots: vec![RawJoint::default(); MAX_JOINTS + 1] };
        assert_eq!(SkeletonBuilder.build(&raw), Err(SkeletonBuildError::TooManyJoints(MAX_JOINTS + 1)));

        let raw = RawSkeleton { roots: vec![RawJoint::default(); MAX_JOINTS] };
        assert_eq!(SkeletonBuilder.build(&raw).map(|s| s.num_joints()), Ok(MAX_JOINTS));
    }
}
