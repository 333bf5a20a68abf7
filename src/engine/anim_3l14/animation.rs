use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use bitcode::{Decode, Encode};
use glam::{Quat, Vec3};
use math_3l14::NQuat48;
use crate::{soa_count, MAX_JOINTS};

/// A single key of one track
pub trait Keyframe: Copy
{
    type Value: Copy;
    /// The value used by tracks without any keys
    const IDENTITY: Self::Value;

    fn time(&self) -> f32;
    fn track(&self) -> u16;
    fn value(&self) -> Self::Value;
}

macro_rules! keyframe_type
{
    ($name:ident, $stored:ty, $value:ty, $identity:expr, $decode:expr) =>
    {
        #[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
        pub struct $name
        {
            pub time: f32,
            pub track: u16,
            pub value: $stored,
        }
        impl Keyframe for $name
        {
            type Value = $value;
            const IDENTITY: $value = $identity;

            #[inline] fn time(&self) -> f32 { self.time }
            #[inline] fn track(&self) -> u16 { self.track }
            #[inline] fn value(&self) -> $value { $decode(self.value) }
        }
    };
}
keyframe_type!(TranslationKey, Vec3, Vec3, Vec3::ZERO, std::convert::identity);
keyframe_type!(RotationKey, NQuat48, Quat, Quat::IDENTITY, Quat::from);
keyframe_type!(ScaleKey, Vec3, Vec3, Vec3::ONE, std::convert::identity);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationError
{
    InvalidDuration(f32),
    TooManyTracks(usize),
    TrackOutOfRange { track: u16, num_tracks: usize },
    KeyTimeOutOfRange { track: u16, time: f32 },
    UnsortedKeys { track: u16 },
    MalformedArchive,
}
impl Display for AnimationError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for AnimationError { }

// Stored form of an animation; track offsets are rebuilt by `Animation::new` on load
#[derive(Encode, Decode)]
struct AnimationArchive
{
    duration: f32,
    num_tracks: u32,
    translations: Box<[TranslationKey]>,
    rotations: Box<[RotationKey]>,
    scales: Box<[ScaleKey]>,
}

/// Immutable keyframe tracks, one per joint.
/// Keys are sorted by track, then by time, so each track's keys are a contiguous slice
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Animation
{
    duration: f32,
    num_tracks: u32,
    translations: Box<[TranslationKey]>,
    rotations: Box<[RotationKey]>,
    scales: Box<[ScaleKey]>,

    // num_tracks + 1 entries (or none for a default animation)
    translation_offsets: Box<[u32]>,
    rotation_offsets: Box<[u32]>,
    scale_offsets: Box<[u32]>,
}
impl Animation
{
    pub fn new(
        duration: f32,
        num_tracks: usize,
        translations: Box<[TranslationKey]>,
        rotations: Box<[RotationKey]>,
        scales: Box<[ScaleKey]>) -> Result<Self, AnimationError>
    {
        if !duration.is_finite() || duration < 0.0
        {
            return Err(AnimationError::InvalidDuration(duration));
        }
        if num_tracks > MAX_JOINTS
        {
            return Err(AnimationError::TooManyTracks(num_tracks));
        }

        let translation_offsets = Self::track_offsets(&translations, duration, num_tracks)?;
        let rotation_offsets = Self::track_offsets(&rotations, duration, num_tracks)?;
        let scale_offsets = Self::track_offsets(&scales, duration, num_tracks)?;

        Ok(Self
        {
            duration,
            num_tracks: num_tracks as u32,
            translations,
            rotations,
            scales,
            translation_offsets,
            rotation_offsets,
            scale_offsets,
        })
    }

    // validate ordering and compute where each track starts
    fn track_offsets<K: Keyframe>(keys: &[K], duration: f32, num_tracks: usize) -> Result<Box<[u32]>, AnimationError>
    {
        let mut offsets = vec![0u32; num_tracks + 1];
        let mut prev: Option<&K> = None;
        for (i, key) in keys.iter().enumerate()
        {
            let track = key.track();
            if track as usize >= num_tracks
            {
                return Err(AnimationError::TrackOutOfRange { track, num_tracks });
            }
            if !(key.time() >= 0.0 && key.time() <= duration)
            {
                return Err(AnimationError::KeyTimeOutOfRange { track, time: key.time() });
            }
            if let Some(prev) = prev
            {
                if track < prev.track() || (track == prev.track() && key.time() < prev.time())
                {
                    return Err(AnimationError::UnsortedKeys { track });
                }
            }
            prev = Some(key);

            // every track up to and including this one ends at or after this key
            offsets[track as usize + 1] = (i + 1) as u32;
        }

        // tracks without keys start and end where the previous one ended
        for t in 1..offsets.len()
        {
            offsets[t] = offsets[t].max(offsets[t - 1]);
        }
        Ok(offsets.into_boxed_slice())
    }

    #[inline] #[must_use] pub fn duration(&self) -> f32 { self.duration }
    #[inline] #[must_use] pub fn num_tracks(&self) -> usize { self.num_tracks as usize }
    #[inline] #[must_use] pub fn num_soa_tracks(&self) -> usize { soa_count(self.num_tracks()) }

    #[inline] #[must_use] pub fn translations(&self) -> &[TranslationKey] { &self.translations }
    #[inline] #[must_use] pub fn rotations(&self) -> &[RotationKey] { &self.rotations }
    #[inline] #[must_use] pub fn scales(&self) -> &[ScaleKey] { &self.scales }

    #[inline] #[must_use]
    pub fn translation_keys(&self, track: usize) -> &[TranslationKey] { Self::track_keys(&self.translations, &self.translation_offsets, track) }
    #[inline] #[must_use]
    pub fn rotation_keys(&self, track: usize) -> &[RotationKey] { Self::track_keys(&self.rotations, &self.rotation_offsets, track) }
    #[inline] #[must_use]
    pub fn scale_keys(&self, track: usize) -> &[ScaleKey] { Self::track_keys(&self.scales, &self.scale_offsets, track) }

    #[inline]
    fn track_keys<'k, K>(keys: &'k [K], offsets: &[u32], track: usize) -> &'k [K]
    {
        match (offsets.get(track), offsets.get(track + 1))
        {
            (Some(&begin), Some(&end)) => &keys[begin as usize..end as usize],
            _ => &[],
        }
    }

    #[must_use]
    pub fn to_archive(&self) -> Vec<u8>
    {
        let archive = AnimationArchive
        {
            duration: self.duration,
            num_tracks: self.num_tracks,
            translations: self.translations.clone(),
            rotations: self.rotations.clone(),
            scales: self.scales.clone(),
        };
        bitcode::encode(&archive)
    }

    /// Decode an animation written by [`Self::to_archive`]. Keys are checked exactly as [`Self::new`] checks them
    pub fn from_archive(bytes: &[u8]) -> Result<Self, AnimationError>
    {
        let archive: AnimationArchive = bitcode::decode(bytes).map_err(|err|
        {
            log::debug!("Failed to decode animation archive: {err}");
            AnimationError::MalformedArchive
        })?;
        Self::new(archive.duration, archive.num_tracks as usize, archive.translations, archive.rotations, archive.scales)
    }

    /// Approximate memory used, in bytes
    #[must_use]
    pub fn size(&self) -> usize
    {
        size_of::<Self>() +
        size_of_val(&*self.translations) +
        size_of_val(&*self.rotations) +
        size_of_val(&*self.scales) +
        size_of_val(&*self.translation_offsets) +
        size_of_val(&*self.rotation_offsets) +
        size_of_val(&*self.scale_offsets)
    }
}
