use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::{Quat, Vec3, Vec4};
use math_3l14::{inv_lerp, SoaFloat3, SoaQuaternion, SoaTransform};
use nab_3l14::utils::ShortTypeName;
use crate::{soa_count, Animation, Keyframe};

// cursor steps tried before falling back to a binary search
const LINEAR_SEEK_STEPS: usize = 4;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TrackCursors
{
    translation: u32,
    rotation: u32,
    scale: u32,
}

/// Per-track key cursors for one playback slot (e.g. one character).
///
/// Cursors remember where the last sample landed in each track so that sampling
/// nearby times does not need to search. They are only hints: every cursor is
/// re-validated against the keys before use, so a stale cursor costs a search
/// but never produces a wrong result.
///
/// The cache remembers which animation it last sampled and resets itself when
/// that changes. A cache must not be shared between concurrent jobs.
#[derive(Debug)]
pub struct SamplingCache
{
    bound_animation: Option<(usize, usize)>, // (address, num_tracks)
    cursors: Box<[TrackCursors]>,
}
impl SamplingCache
{
    /// Capacity is rounded up to a whole number of SoA groups
    pub fn new(max_tracks: usize) -> Self
    {
        Self
        {
            bound_animation: None,
            cursors: vec![TrackCursors::default(); soa_count(max_tracks) * 4].into_boxed_slice(),
        }
    }

    #[inline] #[must_use] pub fn max_tracks(&self) -> usize { self.cursors.len() }
    #[inline] #[must_use] pub fn max_soa_tracks(&self) -> usize { self.cursors.len() / 4 }

    /// Reset all cursors. Useful before a large time jump
    pub fn invalidate(&mut self)
    {
        self.bound_animation = None;
        self.cursors.fill(TrackCursors::default());
    }

    fn bind(&mut self, animation: &Animation)
    {
        let id = (animation as *const Animation as usize, animation.num_tracks());
        if self.bound_animation != Some(id)
        {
            log::trace!("Rebinding sampling cache to animation with {} tracks", animation.num_tracks());
            self.invalidate();
            self.bound_animation = Some(id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingJobError
{
    MissingAnimation,
    MissingCache,
    CacheTooSmall { required: usize, provided: usize },
    OutputTooSmall { required: usize, provided: usize },
}
impl Display for SamplingJobError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for SamplingJobError { }

/// Samples an animation at a time into local-space SoA transforms, one per group of 4 tracks.
/// Times outside of `[0, duration]` are clamped. Tracks without keys produce identity
#[derive(Default)]
pub struct SamplingJob<'a>
{
    pub time: f32,
    pub animation: Option<&'a Animation>,
    pub cache: Option<&'a mut SamplingCache>,
    /// At least `animation.num_soa_tracks()` long. Anything after that is untouched
    pub output: &'a mut [SoaTransform],
}
impl SamplingJob<'_>
{
    pub fn validate(&self) -> Result<(), SamplingJobError>
    {
        let Some(animation) = self.animation else { return Err(SamplingJobError::MissingAnimation) };
        let Some(cache) = self.cache.as_deref() else { return Err(SamplingJobError::MissingCache) };

        if cache.max_tracks() < animation.num_tracks()
        {
            return Err(SamplingJobError::CacheTooSmall { required: animation.num_tracks(), provided: cache.max_tracks() });
        }
        if self.output.len() < animation.num_soa_tracks()
        {
            return Err(SamplingJobError::OutputTooSmall { required: animation.num_soa_tracks(), provided: self.output.len() });
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), SamplingJobError>
    {
        if let Err(err) = self.validate()
        {
            log::debug!("Rejected {}: {err:?}", Self::short_type_name());
            return Err(err);
        }
        let (Some(animation), Some(cache)) = (self.animation, self.cache.as_deref_mut())
            else { return Err(SamplingJobError::MissingAnimation) };

        cache.bind(animation);

        // NaN samples the start
        let time = if self.time > 0.0 { self.time.min(animation.duration()) } else { 0.0 };

        let num_tracks = animation.num_tracks();
        for (soa_track, output) in self.output[..animation.num_soa_tracks()].iter_mut().enumerate()
        {
            let mut translations = ([Vec3::ZERO; 4], [Vec3::ZERO; 4], [0.0; 4]);
            let mut rotations = ([Quat::IDENTITY; 4], [Quat::IDENTITY; 4], [0.0; 4]);
            let mut scales = ([Vec3::ONE; 4], [Vec3::ONE; 4], [0.0; 4]);

            for lane in 0..4
            {
                let track = soa_track * 4 + lane;
                if track >= num_tracks { break; }

                let cursors = &mut cache.cursors[track];
                (translations.0[lane], translations.1[lane], translations.2[lane]) =
                    sample_track(animation.translation_keys(track), &mut cursors.translation, time);
                (rotations.0[lane], rotations.1[lane], rotations.2[lane]) =
                    sample_track(animation.rotation_keys(track), &mut cursors.rotation, time);
                (scales.0[lane], scales.1[lane], scales.2[lane]) =
                    sample_track(animation.scale_keys(track), &mut cursors.scale, time);
            }

            output.translation = SoaFloat3::from_vec3s(translations.0)
                .lerp(SoaFloat3::from_vec3s(translations.1), Vec4::from_array(translations.2));
            // keys are stored hemisphere-aligned with their predecessor, so nlerp takes the short path
            output.rotation = SoaQuaternion::from_quats(rotations.0)
                .nlerp(SoaQuaternion::from_quats(rotations.1), Vec4::from_array(rotations.2));
            output.scale = SoaFloat3::from_vec3s(scales.0)
                .lerp(SoaFloat3::from_vec3s(scales.1), Vec4::from_array(scales.2));
        }

        Ok(())
    }
}

// The keys bracketing time and the interpolation factor between them
#[inline]
fn sample_track<K: Keyframe>(keys: &[K], cursor: &mut u32, time: f32) -> (K::Value, K::Value, f32)
{
    match keys
    {
        [] => (K::IDENTITY, K::IDENTITY, 0.0),
        [only] => (only.value(), only.value(), 0.0),
        _ =>
        {
            let i = seek(keys, *cursor as usize, time);
            *cursor = i as u32;

            let (k0, k1) = (&keys[i], &keys[i + 1]);
            let alpha = inv_lerp(k0.time(), k1.time(), time).clamp(0.0, 1.0);
            (k0.value(), k1.value(), alpha)
        }
    }
}

// The last key at or before time, capped so that a following key exists (0 if all keys are after time).
// The result does not depend on the hint, only the cost does
fn seek<K: Keyframe>(keys: &[K], hint: usize, time: f32) -> usize
{
    debug_assert!(keys.len() >= 2);
    let last = keys.len() - 2;
    let mut i = hint.min(last);

    if keys[i].time() <= time
    {
        for _ in 0..LINEAR_SEEK_STEPS
        {
            if i == last || keys[i + 1].time() > time { return i; }
            i += 1;
        }
        i + keys[i..=last].partition_point(|k| k.time() <= time) - 1
    }
    else
    {
        for _ in 0..LINEAR_SEEK_STEPS
        {
            if i == 0 { return 0; }
            i -= 1;
            if keys[i].time() <= time { return i; }
        }
        keys[..i].partition_point(|k| k.time() <= time).saturating_sub(1)
    }
}
