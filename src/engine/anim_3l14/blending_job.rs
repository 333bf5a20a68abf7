use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::Vec4;
use math_3l14::{SoaFloat3, SoaQuaternion, SoaTransform};
use nab_3l14::utils::ShortTypeName;

/// A weighted local-space posture
#[derive(Debug, Clone, Copy)]
pub struct BlendingLayer<'a>
{
    /// Negative weights count as 0
    pub weight: f32,
    pub transform: &'a [SoaTransform],
    /// Optional per-joint weights, multiplied with `weight`. Negative values count as 0
    pub joint_weights: Option<&'a [Vec4]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendingJobError
{
    InvalidThreshold(f32),
    LayerTooSmall { layer: usize, required: usize, provided: usize },
    JointWeightsTooSmall { layer: usize, required: usize, provided: usize },
    OutputTooSmall { required: usize, provided: usize },
}
impl Display for BlendingJobError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for BlendingJobError { }

/// Blends any number of layers into a single local-space posture.
///
/// Joints whose total weight is below `threshold` take the bind pose instead.
/// The bind pose also defines how many SoA joints are processed.
pub struct BlendingJob<'a>
{
    pub threshold: f32,
    pub layers: &'a [BlendingLayer<'a>],
    pub bind_pose: &'a [SoaTransform],
    pub output: &'a mut [SoaTransform],
}
impl BlendingJob<'_>
{
    pub const DEFAULT_THRESHOLD: f32 = 0.1;
}
impl Default for BlendingJob<'_>
{
    fn default() -> Self
    {
        Self
        {
            threshold: Self::DEFAULT_THRESHOLD,
            layers: &[],
            bind_pose: &[],
            output: &mut [],
        }
    }
}
impl BlendingJob<'_>
{
    pub fn validate(&self) -> Result<(), BlendingJobError>
    {
        // rejects NaN too
        if !(self.threshold > 0.0)
        {
            return Err(BlendingJobError::InvalidThreshold(self.threshold));
        }

        let required = self.bind_pose.len();
        for (i, layer) in self.layers.iter().enumerate()
        {
            if layer.transform.len() < required
            {
                return Err(BlendingJobError::LayerTooSmall { layer: i, required, provided: layer.transform.len() });
            }
            if let Some(joint_weights) = layer.joint_weights
            {
                if joint_weights.len() < required
                {
                    return Err(BlendingJobError::JointWeightsTooSmall { layer: i, required, provided: joint_weights.len() });
                }
            }
        }

        if self.output.len() < required
        {
            return Err(BlendingJobError::OutputTooSmall { required, provided: self.output.len() });
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), BlendingJobError>
    {
        if let Err(err) = self.validate()
        {
            log::debug!("Rejected {}: {err:?}", Self::short_type_name());
            return Err(err);
        }

        let threshold = Vec4::splat(self.threshold);
        for (i, (bind_pose, output)) in self.bind_pose.iter().zip(self.output.iter_mut()).enumerate()
        {
            let mut translation = SoaFloat3::ZERO;
            let mut rotation = SoaQuaternion::ZERO;
            let mut scale = SoaFloat3::ZERO;
            let mut total_weight = Vec4::ZERO;

            for layer in self.layers
            {
                if !(layer.weight > 0.0) { continue; }

                let weight = match layer.joint_weights
                {
                    Some(joint_weights) => joint_weights[i].max(Vec4::ZERO) * layer.weight,
                    None => Vec4::splat(layer.weight),
                };

                let input = &layer.transform[i];
                translation = translation + input.translation * weight;
                // keep every contribution in the accumulator's hemisphere so they can't cancel out
                let aligned = input.rotation.negate_lanes(rotation.dot(input.rotation).cmplt(Vec4::ZERO));
                rotation = rotation + aligned * weight;
                scale = scale + input.scale * weight;
                total_weight += weight;
            }

            let use_blended = total_weight.cmpge(threshold);
            // lanes under the threshold may divide by zero, but are replaced by the bind pose
            let inv_weight = total_weight.recip();
            output.translation = SoaFloat3::select(use_blended, translation * inv_weight, bind_pose.translation);
            output.rotation = SoaQuaternion::select(use_blended, rotation.normalize_or(SoaQuaternion::IDENTITY), bind_pose.rotation);
            output.scale = SoaFloat3::select(use_blended, scale * inv_weight, bind_pose.scale);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use glam::{Quat, Vec3};
    use math_3l14::Transform;
    use super::*;

    fn soa(lanes: [(Vec3, Quat, Vec3); 4]) -> SoaTransform
    {
        SoaTransform::from_transforms(lanes.map(Transform::from))
    }

    fn bind_pose() -> [SoaTransform; 1]
    {
        [SoaTransform::splat(Transform::new(Vec3::new(-1.0, -2.0, -3.0), Quat::from_rotation_x(1.0), Vec3::splat(0.5)))]
    }

    fn layer_a() -> [SoaTransform; 1]
    {
        [soa([
            (Vec3::new(0.0, 4.0, 8.0), Quat::IDENTITY, Vec3::splat(1.0)),
            (Vec3::new(1.0, 5.0, 9.0), Quat::from_rotation_y(0.5), Vec3::splat(2.0)),
            (Vec3::new(2.0, 6.0, 10.0), Quat::from_rotation_z(-0.5), Vec3::splat(3.0)),
            (Vec3::new(3.0, 7.0, 11.0), Quat::IDENTITY, Vec3::splat(4.0)),
        ])]
    }

    fn layer_b() -> [SoaTransform; 1]
    {
        [soa([
            (Vec3::new(-4.0, 0.0, 4.0), Quat::from_rotation_x(1.0), Vec3::splat(5.0)),
            (Vec3::new(-5.0, 1.0, 5.0), Quat::IDENTITY, Vec3::splat(6.0)),
            (Vec3::new(-6.0, 2.0, 6.0), Quat::from_rotation_z(0.5), Vec3::splat(7.0)),
            (Vec3::new(-7.0, 3.0, 7.0), Quat::from_rotation_y(-1.0), Vec3::splat(8.0)),
        ])]
    }

    fn blend(threshold: f32, layers: &[BlendingLayer], bind_pose: &[SoaTransform]) -> SoaTransform
    {
        let mut output = [SoaTransform::IDENTITY];
        BlendingJob { threshold, layers, bind_pose, output: &mut output }.run().unwrap();
        output[0]
    }

    #[test]
    fn validity()
    {
        let bind_pose = [SoaTransform::IDENTITY; 2];
        let input = [SoaTransform::IDENTITY; 3];
        let weights = [Vec4::ONE; 3];
        let mut output = [SoaTransform::IDENTITY; 3];

        assert_eq!(BlendingJob::default().validate(), Ok(()));
        assert_eq!(BlendingJob { threshold: 0.0, ..Default::default() }.validate(), Err(BlendingJobError::InvalidThreshold(0.0)));
        assert_eq!(BlendingJob { threshold: -1.0, ..Default::default() }.run(), Err(BlendingJobError::InvalidThreshold(-1.0)));
        assert!(BlendingJob { threshold: f32::NAN, ..Default::default() }.validate().is_err());

        let layers = [BlendingLayer { weight: 1.0, transform: &input[..1], joint_weights: None }];
        assert_eq!(
            BlendingJob { layers: &layers, bind_pose: &bind_pose, output: &mut output, ..Default::default() }.validate(),
            Err(BlendingJobError::LayerTooSmall { layer: 0, required: 2, provided: 1 }));

        let layers =
        [
            BlendingLayer { weight: 1.0, transform: &input, joint_weights: None },
            BlendingLayer { weight: 1.0, transform: &input, joint_weights: Some(&weights[..1]) },
        ];
        assert_eq!(
            BlendingJob { layers: &layers, bind_pose: &bind_pose, output: &mut output, ..Default::default() }.run(),
            Err(BlendingJobError::JointWeightsTooSmall { layer: 1, required: 2, provided: 1 }));

        let layers = [BlendingLayer { weight: 1.0, transform: &input, joint_weights: Some(&weights) }];
        assert_eq!(
            BlendingJob { layers: &layers, bind_pose: &bind_pose, output: &mut output[..1], ..Default::default() }.validate(),
            Err(BlendingJobError::OutputTooSmall { required: 2, provided: 1 }));
        assert_eq!(
            BlendingJob { layers: &layers, bind_pose: &bind_pose, output: &mut output, ..Default::default() }.run(),
            Ok(()));

        // no layers
        assert_eq!(BlendingJob { bind_pose: &bind_pose, output: &mut output, ..Default::default() }.run(), Ok(()));
    }

    #[test]
    fn no_layers_is_bind_pose()
    {
        let bind_pose = bind_pose();
        assert_eq!(blend(0.1, &[], &bind_pose), bind_pose[0]);
    }

    #[test]
    fn rejected_job_writes_nothing()
    {
        let bind_pose = bind_pose();
        let layer_a = layer_a();
        let layers = [BlendingLayer { weight: 1.0, transform: &layer_a, joint_weights: None }];
        let mut output = [SoaTransform::IDENTITY];
        assert!(BlendingJob { threshold: 0.0, layers: &layers, bind_pose: &bind_pose, output: &mut output }.run().is_err());
        assert_eq!(output[0], SoaTransform::IDENTITY);
    }

    #[test]
    fn single_layer()
    {
        let bind_pose = bind_pose();
        let layer_a = layer_a();
        let output = blend(0.1, &[BlendingLayer { weight: 1.0, transform: &layer_a, joint_weights: None }], &bind_pose);
        assert_abs_diff_eq!(output, layer_a[0], epsilon = 1e-6);

        // normalized, so any weight over the threshold gives the same result
        let output = blend(0.1, &[BlendingLayer { weight: 0.3, transform: &layer_a, joint_weights: None }], &bind_pose);
        assert_abs_diff_eq!(output, layer_a[0], epsilon = 1e-6);
    }

    #[test]
    fn weighted_average()
    {
        let bind_pose = bind_pose();
        let (layer_a, layer_b) = (layer_a(), layer_b());
        let output = blend(0.1, &[
            BlendingLayer { weight: 0.25, transform: &layer_a, joint_weights: None },
            BlendingLayer { weight: 0.75, transform: &layer_b, joint_weights: None },
        ], &bind_pose);

        for lane in 0..4
        {
            let (a, b) = (layer_a[0].lane(lane), layer_b[0].lane(lane));
            assert_relative_eq!(output.translation.lane(lane), a.translation * 0.25 + b.translation * 0.75, epsilon = 1e-5);
            assert_relative_eq!(output.scale.lane(lane), a.scale * 0.25 + b.scale * 0.75, epsilon = 1e-5);
            assert_relative_eq!(output.rotation.lane(lane), (a.rotation * 0.25 + b.rotation * 0.75).normalize(), epsilon = 1e-5);
        }
    }

    #[test]
    fn negative_weights_are_ignored()
    {
        let bind_pose = bind_pose();
        let (layer_a, layer_b) = (layer_a(), layer_b());
        let output = blend(0.1, &[
            BlendingLayer { weight: -1.0, transform: &layer_a, joint_weights: None },
            BlendingLayer { weight: 1.0, transform: &layer_b, joint_weights: None },
        ], &bind_pose);
        assert_abs_diff_eq!(output, layer_b[0], epsilon = 1e-6);
    }

    #[test]
    fn threshold_fallback()
    {
        let bind_pose = bind_pose();
        let layer_a = layer_a();
        let layers = [BlendingLayer { weight: 0.05, transform: &layer_a, joint_weights: None }];

        assert_eq!(blend(0.1, &layers, &bind_pose), bind_pose[0]);
        assert_abs_diff_eq!(blend(0.01, &layers, &bind_pose), layer_a[0], epsilon = 1e-6);

        let layers = [BlendingLayer { weight: 0.0, transform: &layer_a, joint_weights: None }];
        assert_eq!(blend(0.1, &layers, &bind_pose), bind_pose[0]);
    }

    #[test]
    fn joint_weights()
    {
        let bind_pose = bind_pose();
        let (layer_a, layer_b) = (layer_a(), layer_b());
        let weights = [Vec4::new(1.0, 0.0, 0.5, -1.0)];
        let output = blend(0.1, &[
            BlendingLayer { weight: 1.0, transform: &layer_a, joint_weights: Some(&weights) },
            BlendingLayer { weight: 1.0, transform: &layer_b, joint_weights: None },
        ], &bind_pose);

        let (a, b) = (layer_a[0].lane(0), layer_b[0].lane(0));
        assert_relative_eq!(output.translation.lane(0), (a.translation + b.translation) / 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(output.lane(1), layer_b[0].lane(1), epsilon = 1e-5);
        let (a, b) = (layer_a[0].lane(2), layer_b[0].lane(2));
        assert_relative_eq!(output.translation.lane(2), (a.translation * 0.5 + b.translation) / 1.5, epsilon = 1e-5);
        assert_relative_eq!(output.scale.lane(2), (a.scale * 0.5 + b.scale) / 1.5, epsilon = 1e-5);
        assert_abs_diff_eq!(output.lane(3), layer_b[0].lane(3), epsilon = 1e-5);

        // a masked-out joint with no other layer falls back to the bind pose
        let output = blend(0.1, &[BlendingLayer { weight: 1.0, transform: &layer_a, joint_weights: Some(&weights) }], &bind_pose);
        assert_eq!(output.lane(1), bind_pose[0].lane(1));
        assert_eq!(output.lane(3), bind_pose[0].lane(3));
        assert_abs_diff_eq!(output.lane(0), layer_a[0].lane(0), epsilon = 1e-5);
    }

    #[test]
    fn joint_weights_above_one()
    {
        let bind_pose = bind_pose();
        let (layer_a, layer_b) = (layer_a(), layer_b());
        let weights_a = [Vec4::splat(3.0)];
        let weights_b = [Vec4::splat(1.0)];
        let output = blend(0.1, &[
            BlendingLayer { weight: 1.0, transform: &layer_a, joint_weights: Some(&weights_a) },
            BlendingLayer { weight: 1.0, transform: &layer_b, joint_weights: Some(&weights_b) },
        ], &bind_pose);

        for lane in 0..4
        {
            let (a, b) = (layer_a[0].lane(lane), layer_b[0].lane(lane));
            assert_relative_eq!(output.translation.lane(lane), (a.translation * 3.0 + b.translation) / 4.0, epsilon = 1e-5);
        }

        // a lone layer with a joint weight of 2 is accepted and normalized
        let weights = [Vec4::splat(2.0)];
        let output = blend(0.1, &[BlendingLayer { weight: 1.0, transform: &layer_a, joint_weights: Some(&weights) }], &bind_pose);
        assert_abs_diff_eq!(output, layer_a[0], epsilon = 1e-5);
    }

    #[test]
    fn opposite_hemispheres()
    {
        let bind_pose = bind_pose();
        let rotation = Quat::from_rotation_y(0.7);
        let a = [SoaTransform::splat(Transform::from_rotation(rotation))];
        let b = [SoaTransform::splat(Transform::from_rotation(-rotation))];
        let output = blend(0.1, &[
            BlendingLayer { weight: 0.5, transform: &a, joint_weights: None },
            BlendingLayer { weight: 0.5, transform: &b, joint_weights: None },
        ], &bind_pose);

        for lane in 0..4
        {
            assert_relative_eq!(output.rotation.lane(lane), rotation, epsilon = 1e-5);
        }
    }
}
