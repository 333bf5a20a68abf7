use nab_3l14::timing::FSeconds;
use crate::Animation;

/// Tracks the playback time of one animation. Looping wraps time into `[0, duration)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackController
{
    pub time: FSeconds,
    /// Negative plays backwards
    pub speed: f32,
    pub play: bool,
    /// Clamp to `[0, duration]` when not looping
    pub looping: bool,
}
impl Default for PlaybackController
{
    fn default() -> Self
    {
        Self
        {
            time: FSeconds::ZERO,
            speed: 1.0,
            play: true,
            looping: true,
        }
    }
}
impl PlaybackController
{
    /// Advance by `delta_time` scaled by `speed`
    pub fn update(&mut self, animation: &Animation, delta_time: FSeconds)
    {
        let duration = animation.duration();
        if !(duration > 0.0)
        {
            self.time = FSeconds::ZERO;
            return;
        }

        let new_time = if self.play { self.time.0 + delta_time.0 * self.speed } else { self.time.0 };
        self.time = FSeconds(match self.looping
        {
            true =>
            {
                // tiny negative times round up to exactly `duration`
                let wrapped = new_time.rem_euclid(duration);
                if wrapped < duration { wrapped } else { 0.0 }
            },
            false => new_time.clamp(0.0, duration),
        });
    }

    /// Rewind, and play forward at normal speed
    pub fn reset(&mut self)
    {
        *self = Self { looping: self.looping, ..Self::default() };
    }

    /// Time relative to the animation's duration, in `[0, 1]`
    #[must_use]
    pub fn time_ratio(&self, animation: &Animation) -> f32
    {
        let duration = animation.duration();
        if duration > 0.0 { (self.time.0 / duration).clamp(0.0, 1.0) } else { 0.0 }
    }
}
