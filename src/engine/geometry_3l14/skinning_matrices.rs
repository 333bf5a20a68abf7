use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::Mat4;
use anim_3l14::{LocalToModelJob, Skeleton};
use math_3l14::{lane_mask, SoaFloat4x4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinningMatricesError
{
    ModelsTooSmall { required: usize, provided: usize },
}
impl Display for SkinningMatricesError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for SkinningMatricesError { }

/// Per-joint skinning matrices for a skeleton: model-space pose times the inverse model-space bind pose
pub struct SkinningMatrices
{
    inverse_bind_pose: Box<[Mat4]>,
    matrices: Box<[Mat4]>,
    inverse_transpose: Box<[Mat4]>,
}
impl SkinningMatrices
{
    pub fn new(skeleton: &Skeleton) -> Self
    {
        let mut bind_models = vec![Mat4::IDENTITY; skeleton.num_joints()];
        let mut job = LocalToModelJob
        {
            skeleton: Some(skeleton),
            input: skeleton.bind_pose(),
            output: &mut bind_models,
            ..Default::default()
        };
        if let Err(err) = job.run()
        {
            nab_3l14::debug_panic!("Failed to compute the model-space bind pose: {err}");
        }

        let mut inverse_bind_pose = bind_models.into_boxed_slice();
        let singular = invert_in_place(&mut inverse_bind_pose);
        if singular > 0
        {
            log::warn!("{singular} joint(s) have a non-invertible bind pose, using identity instead");
        }

        Self
        {
            inverse_bind_pose,
            matrices: vec![Mat4::IDENTITY; skeleton.num_joints()].into_boxed_slice(),
            inverse_transpose: vec![Mat4::IDENTITY; skeleton.num_joints()].into_boxed_slice(),
        }
    }

    #[inline] #[must_use] pub fn num_joints(&self) -> usize { self.inverse_bind_pose.len() }
    #[inline] #[must_use] pub fn inverse_bind_pose(&self) -> &[Mat4] { &self.inverse_bind_pose }
    #[inline] #[must_use] pub fn matrices(&self) -> &[Mat4] { &self.matrices }
    /// Only current after [`Self::update_inverse_transpose`]
    #[inline] #[must_use] pub fn inverse_transpose_matrices(&self) -> &[Mat4] { &self.inverse_transpose }

    /// Recompute the skinning matrices from model-space joint matrices
    pub fn update(&mut self, models: &[Mat4]) -> Result<(), SkinningMatricesError>
    {
        if models.len() < self.num_joints()
        {
            return Err(SkinningMatricesError::ModelsTooSmall { required: self.num_joints(), provided: models.len() });
        }

        for ((skinning, model), inverse_bind) in self.matrices.iter_mut().zip(models).zip(self.inverse_bind_pose.iter())
        {
            *skinning = *model * *inverse_bind;
        }
        Ok(())
    }

    /// Recompute the inverse transposes of the current skinning matrices, for skinning normals and tangents.
    /// Non-invertible matrices get identity
    pub fn update_inverse_transpose(&mut self)
    {
        self.inverse_transpose.copy_from_slice(&self.matrices);
        invert_in_place(&mut self.inverse_transpose);
        for group in self.inverse_transpose.chunks_mut(4)
        {
            let transposed = SoaFloat4x4::from_mat4s(padded(group)).transpose().to_mat4s();
            group.copy_from_slice(&transposed[..group.len()]);
        }
    }
}

fn padded(group: &[Mat4]) -> [Mat4; 4]
{
    std::array::from_fn(|lane| group.get(lane).copied().unwrap_or(Mat4::IDENTITY))
}

// Returns the number of non-invertible matrices, which are replaced with identity
fn invert_in_place(matrices: &mut [Mat4]) -> usize
{
    let mut singular = 0;
    for group in matrices.chunks_mut(4)
    {
        let (inverse, invertible) = SoaFloat4x4::from_mat4s(padded(group)).inverse();
        let inverse = inverse.to_mat4s();
        group.copy_from_slice(&inverse[..group.len()]);
        singular += (0..group.len()).filter(|&lane| !lane_mask(invertible, lane)).count();
    }
    singular
}

#[cfg(test)]
mod tests
{
    use approx::assert_abs_diff_eq;
    use glam::{Quat, Vec3};
    use anim_3l14::NO_PARENT;
    use math_3l14::Transform;
    use super::*;

    fn skeleton(scale: Vec3) -> Skeleton
    {
        let bind_pose: Vec<_> = (0..5).map(|j| Transform
        {
            translation: Vec3::new(1.0, j as f32, 0.0),
            rotation: Quat::from_rotation_z(0.3 * j as f32),
            scale,
        }).collect();
        let names = (0..5).map(|j| format!("j{j}")).collect();
        Skeleton::new(&[NO_PARENT, 0, 1, 1, 3], names, &bind_pose).unwrap()
    }

    fn bind_models(skeleton: &Skeleton) -> Vec<Mat4>
    {
        let mut models = vec![Mat4::IDENTITY; skeleton.num_joints()];
        LocalToModelJob { skeleton: Some(skeleton), input: skeleton.bind_pose(), output: &mut models, ..Default::default() }
            .run().unwrap();
        models
    }

    #[test]
    fn bind_pose_is_identity()
    {
        let skeleton = skeleton(Vec3::ONE);
        let mut skinning = SkinningMatrices::new(&skeleton);
        assert_eq!(skinning.num_joints(), 5);

        let models = bind_models(&skeleton);
        for (model, inverse) in models.iter().zip(skinning.inverse_bind_pose())
        {
            assert_abs_diff_eq!(*model * *inverse, Mat4::IDENTITY, epsilon = 1e-5);
        }

        skinning.update(&models).unwrap();
        for matrix in skinning.matrices()
        {
            assert_abs_diff_eq!(*matrix, Mat4::IDENTITY, epsilon = 1e-5);
        }
    }

    #[test]
    fn update()
    {
        let skeleton = skeleton(Vec3::ONE);
        let mut skinning = SkinningMatrices::new(&skeleton);
        let offset = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let models: Vec<_> = bind_models(&skeleton).iter().map(|m| offset * *m).collect();

        skinning.update(&models).unwrap();
        for matrix in skinning.matrices()
        {
            assert_abs_diff_eq!(*matrix, offset, epsilon = 1e-5);
        }

        assert_eq!(skinning.update(&models[..4]), Err(SkinningMatricesError::ModelsTooSmall { required: 5, provided: 4 }));
    }

    #[test]
    fn inverse_transpose()
    {
        let skeleton = skeleton(Vec3::new(1.0, 2.0, 0.5));
        let mut skinning = SkinningMatrices::new(&skeleton);
        let models: Vec<_> = bind_models(&skeleton).iter()
            .map(|m| Mat4::from_scale(Vec3::new(3.0, 1.0, 2.0)) * *m)
            .collect();
        skinning.update(&models).unwrap();
        skinning.update_inverse_transpose();

        for (matrix, it) in skinning.matrices().iter().zip(skinning.inverse_transpose_matrices())
        {
            assert_abs_diff_eq!(*it, matrix.inverse().transpose(), epsilon = 1e-4);
        }
    }

    #[test]
    fn singular_bind_pose()
    {
        let mut bind_pose = vec![Transform::IDENTITY; 2];
        bind_pose[1].scale = Vec3::new(1.0, 0.0, 1.0);
        let skeleton = Skeleton::new(&[NO_PARENT, 0], vec!["a".into(), "b".into()].into_boxed_slice(), &bind_pose).unwrap();

        let skinning = SkinningMatrices::new(&skeleton);
        assert_eq!(skinning.inverse_bind_pose()[0], Mat4::IDENTITY);
        assert_eq!(skinning.inverse_bind_pose()[1], Mat4::IDENTITY);
    }
}
