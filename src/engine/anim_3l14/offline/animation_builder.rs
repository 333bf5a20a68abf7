use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use glam::Quat;
use math_3l14::NQuat48;
use nab_3l14::warn_err;
use crate::{Animation, AnimationError, RotationKey, ScaleKey, TranslationKey};
use super::{RawAnimation, RawKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationBuildError
{
    InvalidDuration(f32),
    TooManyTracks(usize),
    KeyTimeOutOfRange { track: usize, time: f32 },
    UnsortedKeys { track: usize, time: f32 },
    InvalidRotation { track: usize, time: f32 },
    Animation(AnimationError),
}
impl Display for AnimationBuildError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for AnimationBuildError { }
impl From<AnimationError> for AnimationBuildError
{
    fn from(err: AnimationError) -> Self { Self::Animation(err) }
}

/// Converts a [`RawAnimation`] into a runtime [`Animation`].
///
/// Non-empty tracks get keys at exactly 0 and the duration, holding their first and last values.
/// Rotations are normalized, kept in the hemisphere of the previous key (the first key in the identity's), then quantized.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnimationBuilder;
impl AnimationBuilder
{
    pub fn build(&self, raw: &RawAnimation) -> Result<Animation, AnimationBuildError>
    {
        raw.validate().map_err(|err| warn_err!(err, "Rejected raw animation"))?;

        let mut translations = Vec::new();
        let mut rotations = Vec::new();
        let mut scales = Vec::new();

        for (track, raw_track) in raw.tracks.iter().enumerate()
        {
            let track = track as u16;

            for key in with_boundaries(&raw_track.translations, raw.duration)
            {
                translations.push(TranslationKey { time: key.time, track, value: key.value });
            }

            let mut prev = Quat::IDENTITY;
            for key in with_boundaries(&raw_track.rotations, raw.duration)
            {
                let mut rotation = key.value.normalize();
                if prev.dot(rotation) < 0.0
                {
                    rotation = -rotation;
                }
                prev = rotation;
                rotations.push(RotationKey { time: key.time, track, value: NQuat48::from(rotation) });
            }

            for key in with_boundaries(&raw_track.scales, raw.duration)
            {
                scales.push(ScaleKey { time: key.time, track, value: key.value });
            }
        }

        let animation = Animation::new(
            raw.duration,
            raw.num_tracks(),
            translations.into_boxed_slice(),
            rotations.into_boxed_slice(),
            scales.into_boxed_slice())?;

        log::debug!("Built animation of {}s with {} tracks ({} translation, {} rotation, {} scale keys) in {:.2}",
            animation.duration(),
            animation.num_tracks(),
            animation.translations().len(),
            animation.rotations().len(),
            animation.scales().len(),
            nab_3l14::format_binary!(animation.size()));
        Ok(animation)
    }
}

// Keys, plus copies of the first/last keys at 0 and duration if missing
fn with_boundaries<T: Copy>(keys: &[RawKey<T>], duration: f32) -> impl Iterator<Item = RawKey<T>> + '_
{
    let head = keys.first().filter(|k| k.time > 0.0).map(|k| RawKey { time: 0.0, value: k.value });
    let tail = keys.last().filter(|k| k.time < duration).map(|k| RawKey { time: duration, value: k.value });
    head.into_iter().chain(keys.iter().copied()).chain(tail)
}
