use arrayvec::ArrayVec;
use glam::Mat4;
use math_3l14::{Transform, AABB};
use crate::{LocalToModelJob, Skeleton, MAX_JOINTS, NO_PARENT};

/// The local-space bind pose of a single joint
#[must_use]
pub fn joint_bind_pose(skeleton: &Skeleton, joint: usize) -> Transform
{
    debug_assert!(joint < skeleton.num_joints(), "Joint {joint} out of range of {}", skeleton.num_joints());
    skeleton.bind_pose()[joint / 4].lane(joint % 4)
}

/// Visit every joint parents-first, each subtree completely before its next sibling.
/// `from` limits the walk to one joint and its descendants.
/// `visit` gets the joint and its parent
pub fn iterate_joints_df(skeleton: &Skeleton, from: Option<usize>, mut visit: impl FnMut(usize, Option<usize>))
{
    let properties = skeleton.joint_properties();
    let num_joints = properties.len();

    // siblings are contiguous, so the lowest index with a given parent is its first child
    let mut first_child = [NO_CHILD; MAX_JOINTS];
    for (joint, props) in properties.iter().enumerate().rev()
    {
        if props.parent != NO_PARENT
        {
            first_child[props.parent as usize] = joint as u16;
        }
    }

    // (joint, has a later sibling)
    let mut stack = ArrayVec::<(usize, bool), MAX_JOINTS>::new();
    match from
    {
        None =>
        {
            if num_joints == 0 { return; }
            stack.push((0, has_next_sibling(skeleton, 0)));
        },
        Some(from) if from < num_joints => stack.push((from, false)),
        Some(from) =>
        {
            nab_3l14::debug_panic!("Joint {from} out of range of {num_joints}");
            return;
        },
    }

    while let Some((joint, has_sibling)) = stack.pop()
    {
        visit(joint, skeleton.parent(joint));

        if has_sibling
        {
            let next = joint + 1;
            stack.push((next, has_next_sibling(skeleton, next)));
        }

        if first_child[joint] != NO_CHILD
        {
            let child = first_child[joint] as usize;
            stack.push((child, has_next_sibling(skeleton, child)));
        }
    }
}

const NO_CHILD: u16 = u16::MAX;

#[inline]
fn has_next_sibling(skeleton: &Skeleton, joint: usize) -> bool
{
    let properties = skeleton.joint_properties();
    joint + 1 < properties.len() && properties[joint + 1].parent == properties[joint].parent
}

/// Bounds of the translation of each model-space matrix. Invalid if there are no matrices
#[must_use]
pub fn compute_posture_bounds(models: &[Mat4]) -> AABB
{
    AABB::from_points(models.iter().map(|m| m.w_axis.truncate()))
}

/// Bounds of the skeleton's joints in its model-space bind pose
#[must_use]
pub fn compute_skeleton_bounds(skeleton: &Skeleton) -> AABB
{
    let mut models = vec![Mat4::IDENTITY; skeleton.num_joints()];
    let mut job = LocalToModelJob
    {
        skeleton: Some(skeleton),
        input: skeleton.bind_pose(),
        output: &mut models,
        ..Default::default()
    };
    match job.run()
    {
        Ok(()) => compute_posture_bounds(&models),
        Err(err) =>
        {
            log::warn!("Failed to compute skeleton bounds: {err}");
            AABB::MAX_MIN
        }
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use super::*;

    //      0       1
    //    / | \
    //   2  3  4
    //  / \    |
    // 5   6   7
    //         |
    //         8
    fn skeleton() -> Skeleton
    {
        let parents = [NO_PARENT, NO_PARENT, 0, 0, 0, 2, 2, 4, 7];
        let names = (0..parents.len()).map(|i| format!("j{i}")).collect();
        let bind_pose: Vec<_> = (0..parents.len()).map(|i| Transform::from_translation(Vec3::new(i as f32, 1.0, 0.0))).collect();
        Skeleton::new(&parents, names, &bind_pose).unwrap()
    }

    fn collect(skeleton: &Skeleton, from: Option<usize>) -> Vec<(usize, Option<usize>)>
    {
        let mut visited = Vec::new();
        iterate_joints_df(skeleton, from, |joint, parent| visited.push((joint, parent)));
        visited
    }

    #[test]
    fn bind_pose()
    {
        let skeleton = skeleton();
        assert_eq!(joint_bind_pose(&skeleton, 0), Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(joint_bind_pose(&skeleton, 6), Transform::from_translation(Vec3::new(6.0, 1.0, 0.0)));
        assert_eq!(joint_bind_pose(&skeleton, 8).rotation, Quat::IDENTITY);
    }

    #[test]
    fn depth_first()
    {
        let skeleton = skeleton();
        let order: Vec<_> = collect(&skeleton, None).into_iter().map(|(j, _)| j).collect();
        assert_eq!(order, [0, 2, 5, 6, 3, 4, 7, 8, 1]);

        let visited = collect(&skeleton, None);
        assert_eq!(visited[0], (0, None));
        assert_eq!(visited[2], (5, Some(2)));
        assert_eq!(visited[8], (1, None));
    }

    #[test]
    fn subtrees()
    {
        let skeleton = skeleton();
        let order = |from| collect(&skeleton, Some(from)).into_iter().map(|(j, _)| j).collect::<Vec<_>>();
        assert_eq!(order(0), [0, 2, 5, 6, 3, 4, 7, 8]);
        assert_eq!(order(2), [2, 5, 6]);
        assert_eq!(order(4), [4, 7, 8]);
        assert_eq!(order(6), [6]);
        assert_eq!(order(1), [1]);
    }

    #[test]
    fn depth_first_storage()
    {
        // 0 -> 1 -> 2, 0 -> 3 -> 4, stored depth-first rather than breadth-first
        let parents = [NO_PARENT, 0, 1, 0, 3];
        let skeleton = Skeleton::new(&parents, (0..5).map(|i| format!("j{i}")).collect(), &[Transform::IDENTITY; 5]).unwrap();
        let order: Vec<_> = collect(&skeleton, None).into_iter().map(|(j, _)| j).collect();
        assert_eq!(order, [0, 1, 2, 3, 4]);
        assert_eq!(collect(&skeleton, Some(3)), [(3, Some(0)), (4, Some(3))]);
    }

    #[test]
    fn full_binary_tree()
    {
        // breadth-first: joint i has children 2i+1 and 2i+2
        let parents: Vec<_> = (0..MAX_JOINTS).map(|i| if i == 0 { NO_PARENT } else { ((i - 1) / 2) as i16 }).collect();
        let names = (0..MAX_JOINTS).map(|i| format!("j{i}")).collect();
        let skeleton = Skeleton::new(&parents, names, &vec![Transform::IDENTITY; MAX_JOINTS]).unwrap();

        let visited = collect(&skeleton, None);
        assert_eq!(visited.len(), MAX_JOINTS);
        let mut seen = vec![false; MAX_JOINTS];
        for &(joint, parent) in &visited
        {
            assert!(!seen[joint]);
            assert!(parent.is_none_or(|p| seen[p]));
            seen[joint] = true;
        }
        assert_eq!(&visited[..4], [(0, None), (1, Some(0)), (3, Some(1)), (7, Some(3))]);
        assert_eq!(collect(&skeleton, Some(2)).len(), 511);
    }

    #[test]
    fn empty()
    {
        let skeleton = Skeleton::default();
        assert!(collect(&skeleton, None).is_empty());
        assert!(!compute_skeleton_bounds(&skeleton).is_valid());
    }

    #[test]
    fn posture_bounds()
    {
        assert!(!compute_posture_bounds(&[]).is_valid());

        let models =
        [
            Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0)),
            Mat4::from_scale_rotation_translation(Vec3::splat(5.0), Quat::from_rotation_x(1.0), Vec3::new(-4.0, 0.0, 1.0)),
            Mat4::from_translation(Vec3::new(0.0, 6.0, -1.0)),
        ];
        let bounds = compute_posture_bounds(&models);
        assert_eq!(bounds.min, Vec3::new(-4.0, -2.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 6.0, 3.0));
    }

    #[test]
    fn skeleton_bounds()
    {
        let bounds = compute_skeleton_bounds(&skeleton());
        // joint 8 is at the end of the 0 > 4 > 7 > 8 chain
        assert_relative_eq!(bounds.min, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(bounds.max, Vec3::new(19.0, 4.0, 0.0));
    }
}
