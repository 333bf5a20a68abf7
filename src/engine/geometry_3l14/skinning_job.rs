use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::{Mat4, Vec3};
use nab_3l14::utils::ShortTypeName;

/// Read-only per-vertex `[f32; 3]` elements, `stride` floats apart
#[derive(Debug, Clone, Copy)]
pub struct VertexStream<'a>
{
    pub data: &'a [f32],
    pub stride: usize,
}
impl<'a> VertexStream<'a>
{
    /// Tightly packed
    pub fn packed(data: &'a [f32]) -> Self { Self { data, stride: 3 } }

    #[inline]
    fn get(&self, vertex: usize) -> Vec3 { Vec3::from_slice(&self.data[vertex * self.stride..]) }
}

/// Writable per-vertex `[f32; 3]` elements, `stride` floats apart
#[derive(Debug)]
pub struct VertexStreamMut<'a>
{
    pub data: &'a mut [f32],
    pub stride: usize,
}
impl<'a> VertexStreamMut<'a>
{
    /// Tightly packed
    pub fn packed(data: &'a mut [f32]) -> Self { Self { data, stride: 3 } }

    #[inline]
    fn set(&mut self, vertex: usize, value: Vec3) { value.write_to_slice(&mut self.data[vertex * self.stride..]) }
}

// Floats needed to hold `count` elements of `width` floats, `stride` apart. None if that overflows
#[inline]
fn required_len(count: usize, stride: usize, width: usize) -> Option<usize>
{
    match count
    {
        0 => Some(0),
        _ => (count - 1).checked_mul(stride)?.checked_add(width),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexStreamKind
{
    JointIndices,
    JointWeights,
    InPositions,
    OutPositions,
    InNormals,
    OutNormals,
    InTangents,
    OutTangents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinningJobError
{
    NoInfluences,
    MissingPositions,
    UnpairedNormals,
    UnpairedTangents,
    TangentsWithoutNormals,
    JointIndicesTooSmall { required: usize, provided: usize },
    JointWeightsTooSmall { required: usize, provided: usize },
    InverseTransposeTooSmall { required: usize, provided: usize },
    StreamTooSmall { stream: VertexStreamKind, required: usize, provided: usize },
    JointIndexOutOfRange { vertex: usize, index: u16, num_joints: usize },
    /// `vertex_count` elements at this stride do not fit in memory
    StrideOverflow { stream: VertexStreamKind, stride: usize },
}
impl Display for SkinningJobError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for SkinningJobError { }

/// Deforms vertices by a weighted blend of joint matrices.
///
/// Each vertex has `influences_count` joint indices and `influences_count - 1` weights.
/// The last weight is implied so that weights always sum to 1.
/// Normals and tangents are transformed by `joint_inverse_transpose_matrices` if provided,
/// otherwise by `joint_matrices` (correct as long as they have no non-uniform scale).
#[derive(Default)]
pub struct SkinningJob<'a>
{
    pub vertex_count: usize,
    pub influences_count: usize,

    pub joint_matrices: &'a [Mat4],
    pub joint_inverse_transpose_matrices: Option<&'a [Mat4]>,

    pub joint_indices: &'a [u16],
    pub joint_indices_stride: usize,
    /// Unused with a single influence
    pub joint_weights: &'a [f32],
    pub joint_weights_stride: usize,

    pub in_positions: Option<VertexStream<'a>>,
    pub out_positions: Option<VertexStreamMut<'a>>,
    pub in_normals: Option<VertexStream<'a>>,
    pub out_normals: Option<VertexStreamMut<'a>>,
    pub in_tangents: Option<VertexStream<'a>>,
    pub out_tangents: Option<VertexStreamMut<'a>>,
}
impl SkinningJob<'_>
{
    pub fn validate(&self) -> Result<(), SkinningJobError>
    {
        if self.influences_count == 0
        {
            return Err(SkinningJobError::NoInfluences);
        }
        let (Some(in_positions), Some(out_positions)) = (&self.in_positions, &self.out_positions)
            else { return Err(SkinningJobError::MissingPositions) };
        if self.in_normals.is_some() != self.out_normals.is_some()
        {
            return Err(SkinningJobError::UnpairedNormals);
        }
        if self.in_tangents.is_some() != self.out_tangents.is_some()
        {
            return Err(SkinningJobError::UnpairedTangents);
        }
        if self.in_tangents.is_some() && self.in_normals.is_none()
        {
            return Err(SkinningJobError::TangentsWithoutNormals);
        }

        let required = required_len(self.vertex_count, self.joint_indices_stride, self.influences_count)
            .ok_or(SkinningJobError::StrideOverflow { stream: VertexStreamKind::JointIndices, stride: self.joint_indices_stride })?;
        if self.joint_indices.len() < required
        {
            return Err(SkinningJobError::JointIndicesTooSmall { required, provided: self.joint_indices.len() });
        }
        if self.influences_count > 1
        {
            let required = required_len(self.vertex_count, self.joint_weights_stride, self.influences_count - 1)
                .ok_or(SkinningJobError::StrideOverflow { stream: VertexStreamKind::JointWeights, stride: self.joint_weights_stride })?;
            if self.joint_weights.len() < required
            {
                return Err(SkinningJobError::JointWeightsTooSmall { required, provided: self.joint_weights.len() });
            }
        }
        if let Some(inverse_transposes) = self.joint_inverse_transpose_matrices
        {
            if inverse_transposes.len() < self.joint_matrices.len()
            {
                return Err(SkinningJobError::InverseTransposeTooSmall { required: self.joint_matrices.len(), provided: inverse_transposes.len() });
            }
        }

        let check_stream = |stream: VertexStreamKind, data: &[f32], stride: usize| -> Result<(), SkinningJobError>
        {
            let required = required_len(self.vertex_count, stride, 3)
                .ok_or(SkinningJobError::StrideOverflow { stream, stride })?;
            match data.len() < required
            {
                true => Err(SkinningJobError::StreamTooSmall { stream, required, provided: data.len() }),
                false => Ok(()),
            }
        };
        check_stream(VertexStreamKind::InPositions, in_positions.data, in_positions.stride)?;
        check_stream(VertexStreamKind::OutPositions, out_positions.data, out_positions.stride)?;
        if let (Some(input), Some(output)) = (&self.in_normals, &self.out_normals)
        {
            check_stream(VertexStreamKind::InNormals, input.data, input.stride)?;
            check_stream(VertexStreamKind::OutNormals, output.data, output.stride)?;
        }
        if let (Some(input), Some(output)) = (&self.in_tangents, &self.out_tangents)
        {
            check_stream(VertexStreamKind::InTangents, input.data, input.stride)?;
            check_stream(VertexStreamKind::OutTangents, output.data, output.stride)?;
        }

        let num_joints = self.joint_matrices.len();
        for vertex in 0..self.vertex_count
        {
            let first = vertex * self.joint_indices_stride;
            let indices = &self.joint_indices[first..first + self.influences_count];
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= num_joints)
            {
                return Err(SkinningJobError::JointIndexOutOfRange { vertex, index, num_joints });
            }
        }

        Ok(())
    }

    pub fn run(&mut self) -> Result<(), SkinningJobError>
    {
        if let Err(err) = self.validate()
        {
            log::debug!("Rejected {}: {err:?}", Self::short_type_name());
            return Err(err);
        }

        match self.influences_count
        {
            1 => self.skin::<1>(),
            2 => self.skin::<2>(),
            3 => self.skin::<3>(),
            4 => self.skin::<4>(),
            _ => self.skin::<0>(),
        }
        Ok(())
    }

    // INFLUENCES of 0 reads the count from the job
    fn skin<const INFLUENCES: usize>(&mut self)
    {
        let Self
        {
            vertex_count,
            influences_count,
            joint_matrices,
            joint_inverse_transpose_matrices,
            joint_indices,
            joint_indices_stride,
            joint_weights,
            joint_weights_stride,
            in_positions,
            out_positions,
            in_normals,
            out_normals,
            in_tangents,
            out_tangents,
        } = self;

        let influences = if INFLUENCES == 0 { *influences_count } else { INFLUENCES };
        let (Some(in_positions), Some(out_positions)) = (in_positions, out_positions.as_mut()) else { return };
        let mut normals = in_normals.zip(out_normals.as_mut());
        let mut tangents = in_tangents.zip(out_tangents.as_mut());

        for vertex in 0..*vertex_count
        {
            let first_index = vertex * *joint_indices_stride;
            let indices = &joint_indices[first_index..first_index + influences];

            let (transform, inverse_transpose) = match influences
            {
                1 =>
                {
                    let joint = indices[0] as usize;
                    (joint_matrices[joint], joint_inverse_transpose_matrices.map(|m| m[joint]))
                },
                _ =>
                {
                    let first_weight = vertex * *joint_weights_stride;
                    let weights = &joint_weights[first_weight..first_weight + influences - 1];

                    let mut transform = Mat4::ZERO;
                    let mut inverse_transpose = joint_inverse_transpose_matrices.map(|_| Mat4::ZERO);
                    let mut weight_sum = 0.0;
                    for (influence, &joint) in indices.iter().enumerate()
                    {
                        let weight = match weights.get(influence)
                        {
                            Some(&weight) => { weight_sum += weight; weight },
                            None => 1.0 - weight_sum,
                        };
                        let joint = joint as usize;
                        transform += joint_matrices[joint] * weight;
                        if let (Some(blended), Some(matrices)) = (&mut inverse_transpose, *joint_inverse_transpose_matrices)
                        {
                            *blended += matrices[joint] * weight;
                        }
                    }
                    (transform, inverse_transpose)
                },
            };

            out_positions.set(vertex, transform.transform_point3(in_positions.get(vertex)));

            let vector_transform = inverse_transpose.unwrap_or(transform);
            if let Some((input, output)) = &mut normals
            {
                output.set(vertex, vector_transform.transform_vector3(input.get(vertex)));
            }
            if let Some((input, output)) = &mut tangents
            {
                output.set(vertex, vector_transform.transform_vector3(input.get(vertex)));
            }
        }
    }
}
