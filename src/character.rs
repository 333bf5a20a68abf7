use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::Mat4;
use anim_3l14::{BlendingJob, BlendingJobError, BlendingLayer, LocalToModelJob, LocalToModelJobError, PlaybackController, SamplingCache, SamplingJob, SamplingJobError};
use geometry_3l14::{SkinningJob, SkinningJobError, SkinningMatrices, SkinningMatricesError, VertexStream, VertexStreamMut};
use math_3l14::SoaTransform;
use nab_3l14::timing::FSeconds;
use crate::millipede::{JointBoxes, Millipede};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacterError
{
    Sampling(SamplingJobError),
    Blending(BlendingJobError),
    LocalToModel(LocalToModelJobError),
    SkinningMatrices(SkinningMatricesError),
    Skinning(SkinningJobError),
}
impl Display for CharacterError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for CharacterError { }
impl From<SamplingJobError> for CharacterError { fn from(err: SamplingJobError) -> Self { Self::Sampling(err) } }
impl From<BlendingJobError> for CharacterError { fn from(err: BlendingJobError) -> Self { Self::Blending(err) } }
impl From<LocalToModelJobError> for CharacterError { fn from(err: LocalToModelJobError) -> Self { Self::LocalToModel(err) } }
impl From<SkinningMatricesError> for CharacterError { fn from(err: SkinningMatricesError) -> Self { Self::SkinningMatrices(err) } }
impl From<SkinningJobError> for CharacterError { fn from(err: SkinningJobError) -> Self { Self::Skinning(err) } }

/// Everything one animated instance owns. The rig and mesh are shared and read-only
pub struct Character
{
    pub controller: PlaybackController,
    /// Blend between the bind pose (0) and the walk (1)
    pub walk_weight: f32,
    pub root: Mat4,

    cache: SamplingCache,
    sampled: Box<[SoaTransform]>,
    locals: Box<[SoaTransform]>,
    models: Box<[Mat4]>,
    skinning: SkinningMatrices,
    positions: Box<[f32]>,
    normals: Box<[f32]>,
}
impl Character
{
    pub fn new(millipede: &Millipede, mesh: &JointBoxes) -> Self
    {
        let skeleton = &millipede.skeleton;
        Self
        {
            controller: PlaybackController::default(),
            walk_weight: 1.0,
            root: Mat4::IDENTITY,

            cache: SamplingCache::new(millipede.walk.num_tracks()),
            sampled: vec![SoaTransform::IDENTITY; skeleton.num_soa_joints()].into_boxed_slice(),
            locals: vec![SoaTransform::IDENTITY; skeleton.num_soa_joints()].into_boxed_slice(),
            models: vec![Mat4::IDENTITY; skeleton.num_joints()].into_boxed_slice(),
            skinning: SkinningMatrices::new(skeleton),
            positions: vec![0.0; mesh.positions.len()].into_boxed_slice(),
            normals: vec![0.0; mesh.normals.len()].into_boxed_slice(),
        }
    }

    #[inline] #[must_use] pub fn models(&self) -> &[Mat4] { &self.models }
    #[inline] #[must_use] pub fn skinned_positions(&self) -> &[f32] { &self.positions }
    #[inline] #[must_use] pub fn skinned_normals(&self) -> &[f32] { &self.normals }

    /// Advance playback and run sampling, blending, local-to-model, and skinning
    pub fn update(&mut self, millipede: &Millipede, mesh: &JointBoxes, delta_time: FSeconds) -> Result<(), CharacterError>
    {
        let skeleton = &millipede.skeleton;
        self.controller.update(&millipede.walk, delta_time);

        SamplingJob
        {
            time: self.controller.time.0,
            animation: Some(&millipede.walk),
            cache: Some(&mut self.cache),
            output: &mut self.sampled,
        }.run()?;

        let layers =
        [
            BlendingLayer { weight: self.walk_weight, transform: &self.sampled, joint_weights: None },
            BlendingLayer { weight: 1.0 - self.walk_weight, transform: skeleton.bind_pose(), joint_weights: None },
        ];
        BlendingJob
        {
            layers: &layers,
            bind_pose: skeleton.bind_pose(),
            output: &mut self.locals,
            ..Default::default()
        }.run()?;

        LocalToModelJob
        {
            skeleton: Some(skeleton),
            root: self.root,
            input: &self.locals,
            output: &mut self.models,
            ..Default::default()
        }.run()?;

        self.skinning.update(&self.models)?;
        SkinningJob
        {
            vertex_count: mesh.vertex_count,
            influences_count: JointBoxes::INFLUENCES,
            joint_matrices: self.skinning.matrices(),
            joint_indices: &mesh.joint_indices,
            joint_indices_stride: JointBoxes::INFLUENCES,
            joint_weights: &mesh.joint_weights,
            joint_weights_stride: JointBoxes::INFLUENCES - 1,
            in_positions: Some(VertexStream::packed(&mesh.positions)),
            out_positions: Some(VertexStreamMut::packed(&mut self.positions)),
            in_normals: Some(VertexStream::packed(&mesh.normals)),
            out_normals: Some(VertexStreamMut::packed(&mut self.normals)),
            ..Default::default()
        }.run()?;

        Ok(())
    }
}
