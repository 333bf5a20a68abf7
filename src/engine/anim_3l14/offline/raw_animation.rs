use glam::{Quat, Vec3};
use crate::MAX_JOINTS;
use super::AnimationBuildError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawKey<T>
{
    pub time: f32,
    pub value: T,
}
pub type RawTranslationKey = RawKey<Vec3>;
pub type RawRotationKey = RawKey<Quat>;
pub type RawScaleKey = RawKey<Vec3>;

/// Keys for one joint. Each property may have any number of keys, including none
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawJointTrack
{
    pub translations: Vec<RawTranslationKey>,
    pub rotations: Vec<RawRotationKey>,
    pub scales: Vec<RawScaleKey>,
}

/// An editable animation, one track per joint
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawAnimation
{
    pub duration: f32,
    pub tracks: Vec<RawJointTrack>,
}
impl RawAnimation
{
    #[inline] #[must_use] pub fn num_tracks(&self) -> usize { self.tracks.len() }

    /// Duration must be positive, and keys strictly increasing and within `[0, duration]`
    pub fn validate(&self) -> Result<(), AnimationBuildError>
    {
        if !(self.duration > 0.0 && self.duration.is_finite())
        {
            return Err(AnimationBuildError::InvalidDuration(self.duration));
        }
        if self.tracks.len() > MAX_JOINTS
        {
            return Err(AnimationBuildError::TooManyTracks(self.tracks.len()));
        }

        for (track, keys) in self.tracks.iter().enumerate()
        {
            Self::validate_keys(track, &keys.translations, self.duration)?;
            Self::validate_keys(track, &keys.rotations, self.duration)?;
            Self::validate_keys(track, &keys.scales, self.duration)?;

            if let Some(key) = keys.rotations.iter().find(|k| !k.value.is_finite() || k.value.length_squared() == 0.0)
            {
                return Err(AnimationBuildError::InvalidRotation { track, time: key.time });
            }
        }
        Ok(())
    }

    fn validate_keys<T>(track: usize, keys: &[RawKey<T>], duration: f32) -> Result<(), AnimationBuildError>
    {
        let mut prev_time = -1.0;
        for key in keys
        {
            if !(key.time >= 0.0 && key.time <= duration)
            {
                return Err(AnimationBuildError::KeyTimeOutOfRange { track, time: key.time });
            }
            if key.time <= prev_time
            {
                return Err(AnimationBuildError::UnsortedKeys { track, time: key.time });
            }
            prev_time = key.time;
        }
        Ok(())
    }
}
