use std::f32::consts::FRAC_PI_2;
use approx::{assert_abs_diff_eq, assert_relative_eq};
use glam::{Mat4, Quat, Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use anim_3l14::offline::{AnimationBuilder, RawAnimation, RawJoint, RawJointTrack, RawKey, RawSkeleton, SkeletonBuilder};
use anim_3l14::{Animation, BlendingJob, BlendingLayer, LocalToModelJob, SamplingCache, SamplingJob, Skeleton};
use animrt_3l14::millipede::Millipede;
use geometry_3l14::{SkinningJob, SkinningMatrices, VertexStream, VertexStreamMut};
use math_3l14::{SoaTransform, Transform};

// root -> arm -> hand, each one unit along x
fn arm_skeleton() -> Skeleton
{
    let raw = RawSkeleton
    {
        roots: vec![RawJoint::new("root", Transform::IDENTITY, vec![
            RawJoint::new("arm", Transform::from_translation(Vec3::X), vec![
                RawJoint::new("hand", Transform::from_translation(Vec3::X), Vec::new()),
            ]),
        ])],
    };
    SkeletonBuilder.build(&raw).unwrap()
}

// rotates the arm 90 degrees about z over one second
fn arm_raise() -> Animation
{
    let mut raw = RawAnimation { duration: 1.0, tracks: vec![RawJointTrack::default(); 3] };
    raw.tracks[1].translations = vec![RawKey { time: 0.0, value: Vec3::X }];
    raw.tracks[1].rotations = vec![
        RawKey { time: 0.0, value: Quat::IDENTITY },
        RawKey { time: 1.0, value: Quat::from_rotation_z(FRAC_PI_2) },
    ];
    raw.tracks[2].translations = vec![RawKey { time: 0.0, value: Vec3::X }];
    AnimationBuilder.build(&raw).unwrap()
}

fn sample(animation: &Animation, cache: &mut SamplingCache, time: f32) -> Vec<SoaTransform>
{
    let mut output = vec![SoaTransform::IDENTITY; animation.num_soa_tracks()];
    SamplingJob { time, animation: Some(animation), cache: Some(cache), output: &mut output }.run().unwrap();
    output
}

fn to_model(skeleton: &Skeleton, locals: &[SoaTransform]) -> Vec<Mat4>
{
    let mut models = vec![Mat4::IDENTITY; skeleton.num_joints()];
    LocalToModelJob { skeleton: Some(skeleton), input: locals, output: &mut models, ..Default::default() }.run().unwrap();
    models
}

#[test]
fn sample_propagate_skin()
{
    let skeleton = arm_skeleton();
    let animation = arm_raise();
    let mut cache = SamplingCache::new(animation.num_tracks());

    let locals = sample(&animation, &mut cache, 1.0);
    let models = to_model(&skeleton, &locals);
    assert_abs_diff_eq!(models[2].w_axis, Vec4::new(1.0, 1.0, 0.0, 1.0), epsilon = 1e-3);

    let mut skinning = SkinningMatrices::new(&skeleton);
    skinning.update(&models).unwrap();
    skinning.update_inverse_transpose();

    // a vertex at the hand, half weighted to the arm; a vertex on the arm with a normal along +y
    let positions = [2.0, 0.0, 0.0, 1.5, 0.0, 0.0];
    let normals = [0.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    let mut out_positions = [0.0; 6];
    let mut out_normals = [0.0; 6];
    SkinningJob
    {
        vertex_count: 2,
        influences_count: 2,
        joint_matrices: skinning.matrices(),
        joint_inverse_transpose_matrices: Some(skinning.inverse_transpose_matrices()),
        joint_indices: &[2, 1, 1, 1],
        joint_indices_stride: 2,
        joint_weights: &[0.5, 1.0],
        joint_weights_stride: 1,
        in_positions: Some(VertexStream::packed(&positions)),
        out_positions: Some(VertexStreamMut::packed(&mut out_positions)),
        in_normals: Some(VertexStream::packed(&normals)),
        out_normals: Some(VertexStreamMut::packed(&mut out_normals)),
        ..Default::default()
    }.run().unwrap();

    for (actual, expected) in out_positions.iter().zip([1.0, 1.0, 0.0, 1.0, 0.5, 0.0])
    {
        assert_relative_eq!(*actual, expected, epsilon = 1e-3);
    }
    for (actual, expected) in out_normals.iter().zip([-1.0, 0.0, 0.0, -1.0, 0.0, 0.0])
    {
        assert_relative_eq!(*actual, expected, epsilon = 1e-3);
    }
}

#[test]
fn blend_sampled_poses()
{
    let skeleton = arm_skeleton();
    let animation = arm_raise();
    let mut cache = SamplingCache::new(animation.num_tracks());
    let start = sample(&animation, &mut cache, 0.0);
    let end = sample(&animation, &mut cache, 1.0);

    let layers =
    [
        BlendingLayer { weight: 0.5, transform: &start, joint_weights: None },
        BlendingLayer { weight: 0.5, transform: &end, joint_weights: None },
    ];
    let mut blended = vec![SoaTransform::IDENTITY; skeleton.num_soa_joints()];
    BlendingJob { layers: &layers, bind_pose: skeleton.bind_pose(), output: &mut blended, ..Default::default() }.run().unwrap();

    let halfway = sample(&animation, &mut cache, 0.5);
    assert_abs_diff_eq!(blended[0], halfway[0], epsilon = 1e-3);

    // masking out the arm leaves it in the first pose
    let mask = [Vec4::new(1.0, 0.0, 1.0, 1.0)];
    let layers =
    [
        BlendingLayer { weight: 1.0, transform: &start, joint_weights: None },
        BlendingLayer { weight: 1.0, transform: &end, joint_weights: Some(&mask) },
    ];
    BlendingJob { layers: &layers, bind_pose: skeleton.bind_pose(), output: &mut blended, ..Default::default() }.run().unwrap();
    assert_abs_diff_eq!(blended[0].lane(1), start[0].lane(1), epsilon = 1e-4);
}

#[test]
fn sampling_is_deterministic()
{
    let millipede = Millipede::build(8).unwrap();
    let walk = &millipede.walk;
    let mut cache = SamplingCache::new(walk.num_tracks());

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20
    {
        let time = rng.random_range(0.0..walk.duration());
        cache.invalidate();
        let first = sample(walk, &mut cache, time);
        cache.invalidate();
        let second = sample(walk, &mut cache, time);
        assert_eq!(first, second);
    }
}

#[test]
fn warm_and_cold_caches_agree()
{
    let millipede = Millipede::build(8).unwrap();
    let walk = &millipede.walk;
    let mut warm = SamplingCache::new(walk.num_tracks());
    let mut cold = SamplingCache::new(walk.num_tracks());

    let mut rng = StdRng::seed_from_u64(0xca5e);
    let mut time = 0.0;
    for step in 0..200
    {
        // mostly small steps forward, with the occasional jump
        time = match step % 17
        {
            0 => rng.random_range(0.0..walk.duration()),
            _ => (time + rng.random_range(0.0..0.1)) % walk.duration(),
        };
        cold.invalidate();
        assert_eq!(sample(walk, &mut warm, time), sample(walk, &mut cold, time), "time {time}");
    }
}

#[test]
fn out_of_range_times_clamp()
{
    let millipede = Millipede::build(3).unwrap();
    let walk = &millipede.walk;
    let mut cache = SamplingCache::new(walk.num_tracks());

    assert_eq!(sample(walk, &mut cache, -1.0), sample(walk, &mut cache, 0.0));
    assert_eq!(sample(walk, &mut cache, walk.duration() + 3.0), sample(walk, &mut cache, walk.duration()));
}

#[test]
fn root_transform_offsets_every_joint()
{
    let skeleton = arm_skeleton();
    let offset = Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0));
    let mut models = vec![Mat4::IDENTITY; skeleton.num_joints()];
    LocalToModelJob { skeleton: Some(&skeleton), root: offset, input: skeleton.bind_pose(), output: &mut models, ..Default::default() }
        .run().unwrap();

    for (joint, model) in to_model(&skeleton, skeleton.bind_pose()).iter().enumerate()
    {
        assert_abs_diff_eq!(models[joint], offset * *model, epsilon = 1e-5);
    }
}
