use basedrop::Shared;
use cpal::{FromSample, SizedSample};
use kbm_transport::{AudioArc, Command, MAX_STRIKE_VOICES};

#[derive(Debug, Clone, Copy, Default)]
struct Voice {
    frame: usize,
    volume: f32,
    active: bool,
}

/// Everything the audio callback owns. Kept free of device handles so the
/// mixing can be driven from tests.
///
/// Both the music and the strike sample must already be at `sample_rate`.
pub struct Mixer {
    sample_rate: u32,
    music: Option<Shared<AudioArc>>,
    strike: Option<AudioArc>,
    voices: [Voice; MAX_STRIKE_VOICES],
    playing: bool,
    frame: usize,
    volume: f32,
}

impl Mixer {
    pub fn new(sample_rate: u32, strike: Option<AudioArc>) -> Self {
        Self {
            sample_rate,
            music: None,
            strike,
            voices: [Voice::default(); MAX_STRIKE_VOICES],
            playing: false,
            frame: 0,
            volume: 1.0,
        }
    }

    /// Swap the music stream and rewind, paused.
    pub fn set_music(&mut self, music: Shared<AudioArc>) {
        self.music = Some(music);
        self.frame = 0;
        self.playing = false;
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Play => self.playing = true,
            Command::Pause => self.playing = false,
            Command::Seek { seconds } => {
                self.frame = match &self.music {
                    Some(music) => music.frame_at(seconds),
                    None => (seconds.max(0.0) * self.sample_rate as f64) as usize,
                };
            }
            Command::Strike { volume } => self.trigger(volume),
            Command::SetVolume(volume) => self.volume = volume.clamp(0.0, 1.0),
        }
    }

    fn trigger(&mut self, volume: f32) {
        if self.strike.is_none() || volume <= 0.0 {
            return;
        }
        // steal the voice that has played the longest when all are busy
        let slot = self
            .voices
            .iter()
            .position(|v| !v.active)
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, v)| v.frame)
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);

        self.voices[slot] = Voice {
            frame: 0,
            volume,
            active: true,
        };
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_secs(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Fill an interleaved output buffer with `channels` channels.
    pub fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        for frame in data.chunks_mut(channels.max(1)) {
            for (ch, out) in frame.iter_mut().enumerate() {
                let mut value = 0.0;

                if self.playing {
                    if let Some(music) = &self.music {
                        value += music.sample(self.frame, ch) * self.volume;
                    }
                }

                if let Some(strike) = &self.strike {
                    for voice in self.voices.iter().filter(|v| v.active) {
                        value += strike.sample(voice.frame, ch) * voice.volume;
                    }
                }

                *out = T::from_sample(value);
            }
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.playing {
            match &self.music {
                Some(music) if self.frame >= music.frames() => self.playing = false,
                _ => self.frame += 1,
            }
        }

        let strike_frames = self.strike.as_ref().map_or(0, |s| s.frames());
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            voice.frame += 1;
            if voice.frame >= strike_frames {
                voice.active = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Collector;

    fn mixer_with_music(music: Vec<f32>, strike: Option<AudioArc>) -> (Mixer, Collector) {
        let collector = Collector::new();
        let mut mixer = Mixer::new(4, strike);
        mixer.set_music(Shared::new(&collector.handle(), AudioArc::new(music, 4, 1)));
        (mixer, collector)
    }

    #[test]
    fn test_paused_mixer_is_silent() {
        let (mut mixer, _collector) = mixer_with_music(vec![0.5; 8], None);
        let mut out = [1.0f32; 4];

        mixer.render(&mut out, 2);

        assert_eq!(out, [0.0; 4]);
        assert_eq!(mixer.position_secs(), 0.0);
    }

    #[test]
    fn test_mono_music_fills_every_channel() {
        let (mut mixer, _collector) = mixer_with_music(vec![0.5, 0.25, 0.0, 0.0], None);
        mixer.apply(Command::Play);

        let mut out = [0.0f32; 4];
        mixer.render(&mut out, 2);

        assert_eq!(out, [0.5, 0.5, 0.25, 0.25]);
        assert!((mixer.position_secs() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_seek_and_volume() {
        let (mut mixer, _collector) = mixer_with_music(vec![0.0, 0.0, 0.0, 0.0, 0.8, 0.8], None);
        mixer.apply(Command::Seek { seconds: 1.0 });
        mixer.apply(Command::SetVolume(0.5));
        mixer.apply(Command::Play);

        let mut out = [0.0f32; 1];
        mixer.render(&mut out, 1);
        assert!((out[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_playback_stops_at_end_of_music() {
        let (mut mixer, _collector) = mixer_with_music(vec![0.1, 0.1], None);
        mixer.apply(Command::Play);

        let mut out = [0.0f32; 4];
        mixer.render(&mut out, 1);

        assert!(!mixer.is_playing());
        assert_eq!(out, [0.1, 0.1, 0.0, 0.0]);
    }

    #[test]
    fn test_strike_plays_while_paused() {
        let strike = AudioArc::new(vec![1.0, 1.0], 4, 1);
        let (mut mixer, _collector) = mixer_with_music(vec![0.0; 8], Some(strike));
        mixer.apply(Command::Strike { volume: 0.3 });

        let mut out = [0.0f32; 3];
        mixer.render(&mut out, 1);

        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.3).abs() < 1e-6);
        assert_eq!(out[2], 0.0);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_strike_without_sample_is_ignored() {
        let mut mixer = Mixer::new(44100, None);
        mixer.apply(Command::Strike { volume: 1.0 });
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_voices_are_stolen_when_full() {
        let strike = AudioArc::new(vec![0.0; 100], 4, 1);
        let mut mixer = Mixer::new(4, Some(strike));

        for _ in 0..MAX_STRIKE_VOICES + 5 {
            mixer.apply(Command::Strike { volume: 0.5 });
            let mut out = [0.0f32; 1];
            mixer.render(&mut out, 1);
        }

        assert_eq!(mixer.active_voices(), MAX_STRIKE_VOICES);
    }
}
