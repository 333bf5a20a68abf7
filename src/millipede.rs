//! A procedural millipede: a chain of spine slices, each with two three-joint legs,
//! and a looping walk cycle that ripples down the spine.
//! Also generates a small skinned mesh around the joints.

use std::error::Error;
use std::f32::consts::FRAC_PI_2;
use std::fmt::{Debug, Display, Formatter};
use glam::{Mat4, Quat, Vec3};
use anim_3l14::offline::{AnimationBuildError, AnimationBuilder, RawAnimation, RawJoint, RawJointTrack, RawKey, RawSkeleton, RawTranslationKey, SkeletonBuildError, SkeletonBuilder};
use anim_3l14::{Animation, LocalToModelJob, Skeleton, MAX_JOINTS};
use math_3l14::Transform;

pub const JOINTS_PER_SLICE: usize = 7;
pub const MAX_SLICES: usize = (MAX_JOINTS - 1) / JOINTS_PER_SLICE;

pub const DURATION: f32 = 6.0;
const SPINE_LENGTH: f32 = 0.5;
const WALK_CYCLE_LENGTH: f32 = 2.0;
const WALK_CYCLE_COUNT: usize = 4;
const SPINE_LOOP: f32 = 2.0 * WALK_CYCLE_COUNT as f32 * WALK_CYCLE_LENGTH / SPINE_LENGTH;

const UPPER_LEG_OFFSET: Vec3 = Vec3::ZERO;
const LOWER_LEG_OFFSET: Vec3 = Vec3::new(0.0, 0.0, 1.0);
const FOOT_OFFSET: Vec3 = Vec3::X;

fn left_up() -> Quat { Quat::from_axis_angle(Vec3::Y, -FRAC_PI_2) }
fn right_up() -> Quat { Quat::from_axis_angle(Vec3::Y, FRAC_PI_2) }
fn leg_down() -> Quat { Quat::from_axis_angle(Vec3::X, FRAC_PI_2) * Quat::from_axis_angle(Vec3::Y, -FRAC_PI_2) }

// (time relative to the duration, foot offset relative to the walk cycle)
const STEP_KEYS: [(f32, f32, f32); 16] =
[
    (0.0, 0.25, 0.0), (0.125, -0.25, 0.0), (0.145, -0.17, 0.3), (0.23, 0.17, 0.3),
    (0.25, 0.25, 0.0), (0.375, -0.25, 0.0), (0.395, -0.17, 0.3), (0.48, 0.17, 0.3),
    (0.5, 0.25, 0.0), (0.625, -0.25, 0.0), (0.645, -0.17, 0.3), (0.73, 0.17, 0.3),
    (0.75, 0.25, 0.0), (0.875, -0.25, 0.0), (0.895, -0.17, 0.3), (0.98, 0.17, 0.3),
];

#[derive(Debug, Clone, PartialEq)]
pub enum MillipedeError
{
    TooManySlices(usize),
    Skeleton(SkeletonBuildError),
    Animation(AnimationBuildError),
}
impl Display for MillipedeError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for MillipedeError { }
impl From<SkeletonBuildError> for MillipedeError
{
    fn from(err: SkeletonBuildError) -> Self { Self::Skeleton(err) }
}
impl From<AnimationBuildError> for MillipedeError
{
    fn from(err: AnimationBuildError) -> Self { Self::Animation(err) }
}

pub struct Millipede
{
    pub slices: usize,
    pub skeleton: Skeleton,
    pub walk: Animation,
}
impl Millipede
{
    pub fn build(slices: usize) -> Result<Self, MillipedeError>
    {
        if slices > MAX_SLICES
        {
            return Err(MillipedeError::TooManySlices(slices));
        }

        let skeleton = SkeletonBuilder.build(&raw_skeleton(slices))?;
        let walk = AnimationBuilder.build(&raw_walk(&skeleton, slices))?;
        log::debug!("Built a {slices} slice millipede with {} joints", skeleton.num_joints());
        Ok(Self { slices, skeleton, walk })
    }
}

fn joint(name: String, translation: Vec3, rotation: Quat, children: Vec<RawJoint>) -> RawJoint
{
    RawJoint::new(name, Transform::new(translation, rotation, Vec3::ONE), children)
}

/// `1 + 7 * slices` joints. Each slice's spine joint parents the next slice
#[must_use]
pub fn raw_skeleton(slices: usize) -> RawSkeleton
{
    let mut tail = Vec::new();
    for slice in (0..slices).rev()
    {
        let spine = joint(format!("sp{slice}"), Vec3::new(0.0, 0.0, SPINE_LENGTH), Quat::IDENTITY, tail);
        tail = vec![
            joint(format!("lu{slice}"), UPPER_LEG_OFFSET, left_up(), vec![
                joint(format!("ld{slice}"), LOWER_LEG_OFFSET, leg_down(), vec![
                    joint(format!("lf{slice}"), FOOT_OFFSET, Quat::IDENTITY, Vec::new()),
                ]),
            ]),
            joint(format!("ru{slice}"), UPPER_LEG_OFFSET, right_up(), vec![
                joint(format!("rd{slice}"), LOWER_LEG_OFFSET, leg_down(), vec![
                    joint(format!("rf{slice}"), FOOT_OFFSET, Quat::IDENTITY, Vec::new()),
                ]),
            ]),
            spine,
        ];
    }

    let root = joint("root".to_string(), root_start(slices), Quat::IDENTITY, tail);
    RawSkeleton { roots: vec![root] }
}

fn root_start(slices: usize) -> Vec3 { Vec3::new(0.0, 1.0, -(slices as f32) * SPINE_LENGTH) }

/// One track per joint of `skeleton`, which must come from [`raw_skeleton`]
#[must_use]
pub fn raw_walk(skeleton: &Skeleton, slices: usize) -> RawAnimation
{
    let tracks = skeleton.joint_names().iter().map(|name|
    {
        let mut track = RawJointTrack::default();
        let (kind, slice) = name.split_at(name.len().min(2));
        match kind
        {
            "ld" | "rd" =>
            {
                let slice: usize = slice.parse().unwrap_or(0);
                track.translations = step_keys(kind == "ld", slices.saturating_sub(slice));
                track.rotations.push(RawKey { time: 0.0, value: leg_down() });
            },
            "lu" =>
            {
                track.translations.push(RawKey { time: 0.0, value: UPPER_LEG_OFFSET });
                track.rotations.push(RawKey { time: 0.0, value: left_up() });
            },
            "ru" =>
            {
                track.translations.push(RawKey { time: 0.0, value: UPPER_LEG_OFFSET });
                track.rotations.push(RawKey { time: 0.0, value: right_up() });
            },
            "lf" | "rf" => track.translations.push(RawKey { time: 0.0, value: FOOT_OFFSET }),
            "sp" =>
            {
                track.translations.push(RawKey { time: 0.0, value: Vec3::new(0.0, 0.0, SPINE_LENGTH) });
                track.rotations.push(RawKey { time: 0.0, value: Quat::IDENTITY });
            },
            _ =>
            {
                let start = root_start(slices);
                track.translations.push(RawKey { time: 0.0, value: start });
                track.translations.push(RawKey
                {
                    time: DURATION,
                    value: Vec3::new(0.0, 1.0, start.z + WALK_CYCLE_COUNT as f32 * WALK_CYCLE_LENGTH),
                });
            },
        }
        track
    }).collect();

    RawAnimation { duration: DURATION, tracks }
}

// The step cycle, phase shifted by the slice's distance from the head, looping at both ends
fn step_keys(left: bool, slices_from_head: usize) -> Vec<RawTranslationKey>
{
    let phase = (DURATION * slices_from_head as f32 / SPINE_LOOP) % DURATION;
    let first = STEP_KEYS.iter().position(|k| k.0 * DURATION >= phase).unwrap_or(STEP_KEYS.len());

    let mut keys: Vec<_> = (first..first + STEP_KEYS.len()).map(|i|
    {
        let (rel_time, x, y) = STEP_KEYS[i % STEP_KEYS.len()];
        let time = rel_time * DURATION - phase;
        let time = if time < 0.0 { DURATION + time } else { time };
        let x = if left { x } else { -x };
        RawKey { time, value: LOWER_LEG_OFFSET + Vec3::new(x * WALK_CYCLE_LENGTH, y, 0.0) }
    }).collect();

    let (Some(&front), Some(&back)) = (keys.first(), keys.last()) else { return keys };
    let wrap_span = front.time + DURATION - back.time;
    if front.time > 0.0
    {
        let value = back.value.lerp(front.value, (DURATION - back.time) / wrap_span);
        keys.insert(0, RawKey { time: 0.0, value });
    }
    if back.time < DURATION
    {
        let value = back.value.lerp(front.value, (DURATION - back.time) / wrap_span);
        keys.push(RawKey { time: DURATION, value });
    }
    keys
}

/// A skinned box around every joint's bind pose, weighted between the joint and its parent
pub struct JointBoxes
{
    pub vertex_count: usize,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub joint_indices: Vec<u16>,
    pub joint_weights: Vec<f32>,
}
impl JointBoxes
{
    pub const INFLUENCES: usize = 2;
    const CORNERS: usize = 8;
    const HALF_SIZE: f32 = 0.1;

    pub fn new(skeleton: &Skeleton) -> Self
    {
        let mut models = vec![Mat4::IDENTITY; skeleton.num_joints()];
        let mut job = LocalToModelJob
        {
            skeleton: Some(skeleton),
            input: skeleton.bind_pose(),
            output: &mut models,
            ..Default::default()
        };
        if let Err(err) = job.run()
        {
            log::warn!("Failed to pose the joint boxes: {err}");
        }

        let vertex_count = skeleton.num_joints() * Self::CORNERS;
        let mut boxes = Self
        {
            vertex_count,
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            joint_indices: Vec::with_capacity(vertex_count * Self::INFLUENCES),
            joint_weights: Vec::with_capacity(vertex_count * (Self::INFLUENCES - 1)),
        };

        for (joint, model) in models.iter().enumerate()
        {
            let parent = skeleton.parent(joint).unwrap_or(joint);
            let center = model.w_axis.truncate();
            for corner in 0..Self::CORNERS
            {
                let direction = Vec3::new(
                    if corner & 1 == 0 { -1.0 } else { 1.0 },
                    if corner & 2 == 0 { -1.0 } else { 1.0 },
                    if corner & 4 == 0 { -1.0 } else { 1.0 });
                boxes.positions.extend_from_slice(&(center + direction * Self::HALF_SIZE).to_array());
                boxes.normals.extend_from_slice(&direction.normalize().to_array());
                boxes.joint_indices.extend_from_slice(&[joint as u16, parent as u16]);
                // the far half of the box follows the parent less
                boxes.joint_weights.push(if corner & 4 == 0 { 0.6 } else { 0.9 });
            }
        }
        boxes
    }
}
