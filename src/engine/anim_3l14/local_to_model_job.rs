use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::Mat4;
use math_3l14::{SoaFloat4x4, SoaTransform};
use nab_3l14::utils::ShortTypeName;
use crate::{Skeleton, MAX_JOINTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalToModelJobError
{
    MissingSkeleton,
    InputTooSmall { required: usize, provided: usize },
    OutputTooSmall { required: usize, provided: usize },
    InvalidFrom { from: usize, num_joints: usize },
}
impl Display for LocalToModelJobError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for LocalToModelJobError { }

/// Converts local-space SoA transforms into model-space matrices, walking the skeleton parents-first
pub struct LocalToModelJob<'a>
{
    pub skeleton: Option<&'a Skeleton>,
    /// Applied to every root joint
    pub root: Mat4,
    /// Only update this joint and its descendants.
    /// Its parent's matrix in `output` must already be up to date
    pub from: Option<usize>,
    /// At least `num_soa_joints` long
    pub input: &'a [SoaTransform],
    /// At least `num_joints` long
    pub output: &'a mut [Mat4],
}
impl Default for LocalToModelJob<'_>
{
    fn default() -> Self
    {
        Self
        {
            skeleton: None,
            root: Mat4::IDENTITY,
            from: None,
            input: &[],
            output: &mut [],
        }
    }
}
impl LocalToModelJob<'_>
{
    pub fn validate(&self) -> Result<(), LocalToModelJobError>
    {
        let Some(skeleton) = self.skeleton else { return Err(LocalToModelJobError::MissingSkeleton) };

        if self.input.len() < skeleton.num_soa_joints()
        {
            return Err(LocalToModelJobError::InputTooSmall { required: skeleton.num_soa_joints(), provided: self.input.len() });
        }
        if self.output.len() < skeleton.num_joints()
        {
            return Err(LocalToModelJobError::OutputTooSmall { required: skeleton.num_joints(), provided: self.output.len() });
        }
        if let Some(from) = self.from
        {
            if from >= skeleton.num_joints()
            {
                return Err(LocalToModelJobError::InvalidFrom { from, num_joints: skeleton.num_joints() });
            }
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), LocalToModelJobError>
    {
        if let Err(err) = self.validate()
        {
            log::debug!("Rejected {}: {err:?}", Self::short_type_name());
            return Err(err);
        }
        let Some(skeleton) = self.skeleton else { return Err(LocalToModelJobError::MissingSkeleton) };

        let num_joints = skeleton.num_joints();
        let properties = skeleton.joint_properties();
        let begin = self.from.unwrap_or(0);

        // joints updated so far, only needed when updating a subtree
        let mut updated = [0u64; MAX_JOINTS / 64];
        let is_updated = |bits: &[u64], joint: usize| bits[joint / 64] & (1 << (joint % 64)) != 0;

        for soa_joint in (begin / 4)..skeleton.num_soa_joints()
        {
            let local = &self.input[soa_joint];
            let locals = SoaFloat4x4::from_affine(local.translation, local.rotation, local.scale).to_mat4s();

            let first = soa_joint * 4;
            for joint in first.max(begin)..(first + 4).min(num_joints)
            {
                let parent = properties[joint].parent;
                if self.from.is_some()
                {
                    let in_subtree = joint == begin || (parent >= 0 && is_updated(&updated, parent as usize));
                    if !in_subtree { continue; }
                    updated[joint / 64] |= 1 << (joint % 64);
                }

                let parent_matrix = if parent < 0 { self.root } else { self.output[parent as usize] };
                self.output[joint] = parent_matrix * locals[joint - first];
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use math_3l14::Transform;
    use crate::NO_PARENT;
    use super::*;

    //   0       1
    //  / \
    // 2   3
    //     |
    //     4
    //     |
    //     5
    fn skeleton() -> Skeleton
    {
        let parents = [NO_PARENT, NO_PARENT, 0, 0, 3, 4];
        let names = (0..6).map(|i| format!("j{i}")).collect();
        Skeleton::new(&parents, names, &[Transform::IDENTITY; 6]).unwrap()
    }

    fn locals() -> [SoaTransform; 2]
    {
        let mut input = [SoaTransform::IDENTITY; 2];
        input[0].set_lane(0, Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0)));
        input[0].set_lane(1, Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)));
        input[0].set_lane(2, Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        input[0].set_lane(3, Transform::from_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)));
        input[1].set_lane(0, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        input[1].set_lane(1, Transform::new(Vec3::new(0.0, 0.0, 1.0), Quat::IDENTITY, Vec3::new(1.0, 3.0, 1.0)));
        input
    }

    #[test]
    fn validity()
    {
        let skeleton = skeleton();
        let input = [SoaTransform::IDENTITY; 2];
        let mut output = [Mat4::IDENTITY; 6];

        assert_eq!(LocalToModelJob::default().validate(), Err(LocalToModelJobError::MissingSkeleton));
        assert_eq!(
            LocalToModelJob { skeleton: Some(&skeleton), input: &input[..1], output: &mut output, ..Default::default() }.validate(),
            Err(LocalToModelJobError::InputTooSmall { required: 2, provided: 1 }));
        assert_eq!(
            LocalToModelJob { skeleton: Some(&skeleton), input: &input, output: &mut output[..5], ..Default::default() }.run(),
            Err(LocalToModelJobError::OutputTooSmall { required: 6, provided: 5 }));
        assert_eq!(
            LocalToModelJob { skeleton: Some(&skeleton), from: Some(6), input: &input, output: &mut output, ..Default::default() }.run(),
            Err(LocalToModelJobError::InvalidFrom { from: 6, num_joints: 6 }));
        assert_eq!(
            LocalToModelJob { skeleton: Some(&skeleton), input: &input, output: &mut output, ..Default::default() }.run(),
            Ok(()));

        let empty = Skeleton::default();
        assert_eq!(LocalToModelJob { skeleton: Some(&empty), ..Default::default() }.run(), Ok(()));
    }

    #[test]
    fn propagation()
    {
        let skeleton = skeleton();
        let input = locals();
        let mut output = [Mat4::ZERO; 8];
        LocalToModelJob { skeleton: Some(&skeleton), input: &input, output: &mut output, ..Default::default() }.run().unwrap();

        let local = |joint: usize| input[joint / 4].lane(joint % 4).to_matrix();
        for joint in 0..6
        {
            let expected = match skeleton.parent(joint)
            {
                None => local(joint),
                Some(parent) => output[parent] * local(joint),
            };
            assert_relative_eq!(output[joint], expected, epsilon = 1e-5);
        }

        // scale of 2 at the root, rotation of 90 degrees at joint 3
        assert_relative_eq!(output[2].w_axis.truncate(), Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(output[4].w_axis.truncate(), Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(output[5].w_axis.truncate(), Vec3::new(1.0, 2.0, 2.0), epsilon = 1e-5);
        assert_relative_eq!(output[1].w_axis.truncate(), Vec3::new(0.0, 0.0, 5.0), epsilon = 1e-5);

        // untouched past the skeleton
        assert_eq!(output[6], Mat4::ZERO);
    }

    #[test]
    fn root_transform()
    {
        let skeleton = skeleton();
        let input = locals();
        let mut plain = [Mat4::IDENTITY; 6];
        let mut rooted = [Mat4::IDENTITY; 6];
        let root = Mat4::from_translation(Vec3::new(10.0, 20.0, 30.0)) * Mat4::from_rotation_y(0.5);

        LocalToModelJob { skeleton: Some(&skeleton), input: &input, output: &mut plain, ..Default::default() }.run().unwrap();
        LocalToModelJob { skeleton: Some(&skeleton), root, input: &input, output: &mut rooted, ..Default::default() }.run().unwrap();

        for joint in 0..6
        {
            assert_relative_eq!(rooted[joint], root * plain[joint], epsilon = 1e-4);
        }
    }

    #[test]
    fn partial_update()
    {
        let skeleton = skeleton();
        let mut input = locals();
        let mut output = [Mat4::IDENTITY; 6];
        LocalToModelJob { skeleton: Some(&skeleton), input: &input, output: &mut output, ..Default::default() }.run().unwrap();

        // move joint 3 and every joint in its subtree follows, nothing else changes
        input[0].set_lane(3, Transform::from_translation(Vec3::new(0.0, -4.0, 0.0)));
        // not in the subtree, must be ignored
        input[0].set_lane(1, Transform::from_translation(Vec3::splat(100.0)));
        input[0].set_lane(2, Transform::from_translation(Vec3::splat(100.0)));

        let before = output;
        LocalToModelJob { skeleton: Some(&skeleton), from: Some(3), input: &input, output: &mut output, ..Default::default() }.run().unwrap();

        for joint in [0, 1, 2]
        {
            assert_eq!(output[joint], before[joint]);
        }
        for joint in [3, 4, 5]
        {
            assert_ne!(output[joint], before[joint]);
        }
        assert_relative_eq!(output[3].w_axis.truncate(), Vec3::new(1.0, -8.0, 0.0), epsilon = 1e-5);

        // matches a full update of the joints in the subtree
        let mut full = [Mat4::IDENTITY; 6];
        LocalToModelJob { skeleton: Some(&skeleton), input: &input, output: &mut full, ..Default::default() }.run().unwrap();
        for joint in [3, 4, 5]
        {
            assert_relative_eq!(output[joint], full[joint], epsilon = 1e-5);
        }
    }

    #[test]
    fn partial_update_of_a_root()
    {
        let skeleton = skeleton();
        let input = locals();
        let root = Mat4::from_translation(Vec3::Y);
        let mut output = [Mat4::ZERO; 6];
        LocalToModelJob { skeleton: Some(&skeleton), root, from: Some(1), input: &input, output: &mut output }.run().unwrap();

        assert_relative_eq!(output[1], root * input[0].lane(1).to_matrix(), epsilon = 1e-5);
        assert_eq!(output[5], Mat4::ZERO);
        assert_eq!(output[0], Mat4::ZERO);
    }
}
