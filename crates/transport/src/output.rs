use crate::AudioArc;

/// Number of simultaneous strike voices an output keeps ready.
pub const MAX_STRIKE_VOICES: usize = 40;

/// Messages from the control thread to the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Seek { seconds: f64 },
    Strike { volume: f32 },
    SetVolume(f32),
}

/// Messages from the audio callback back to the control thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Position(f64),
}

/// Loudness of one cue standing in for `count` simultaneous notes.
///
/// A single note plays at 0.3, each extra note adds 0.2, capped at full volume.
pub fn batch_volume(count: usize) -> f32 {
    if count == 0 {
        return 0.0;
    }
    (0.3 + (count - 1) as f32 * 0.2).min(1.0)
}

/// The audio service the playback scanner drives.
///
/// Implemented by the cpal engine and by [`NullOutput`] for headless use.
pub trait AudioOutput {
    /// Replace the music stream. Playback is paused at the start.
    fn load_stream(&mut self, music: AudioArc);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, seconds: f64);

    fn set_volume(&mut self, volume: f32);

    /// Fire one strike cue for `count` notes crossing the trigger line together.
    fn play_batch(&mut self, count: usize);

    fn play_one_shot(&mut self) {
        self.play_batch(1);
    }
}

/// Output that discards everything but remembers where it is.
#[derive(Debug, Default)]
pub struct NullOutput {
    pub playing: bool,
    pub position: f64,
    pub strikes: usize,
}

impl AudioOutput for NullOutput {
    fn load_stream(&mut self, _music: AudioArc) {
        self.playing = false;
        self.position = 0.0;
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn play_batch(&mut self, count: usize) {
        if count > 0 {
            self.strikes += 1;
        }
    }
}
