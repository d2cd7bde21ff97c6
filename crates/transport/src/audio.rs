use std::sync::Arc;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Shared, immutable interleaved sample data.
///
/// The music track and the strike cue are decoded once and then handed to the
/// output engine and the analysis worker. Cloning only bumps the refcount of the
/// sample slice, so both sides can hold the same buffer.
///
/// # Examples
///
/// ```
/// use kbm_transport::AudioArc;
///
/// let audio = AudioArc::new(vec![0.0, 0.5, 1.0, 0.5], 44100, 2);
/// let shared = audio.clone();
/// assert_eq!(shared.frames(), 2);
/// ```
#[derive(Clone)]
pub struct AudioArc {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioArc {
    /// Wrap interleaved samples (`[L, R, L, R, ...]` for stereo).
    ///
    /// # Panics
    ///
    /// Panics if `channels` is 0 or if `samples.len()` is not a whole number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples: Arc::from(samples),
            sample_rate,
            channels,
        }
    }

    /// One second of silence, used when a project has no playable stream yet.
    pub fn silence(sample_rate: u32, channels: u16) -> Self {
        Self::new(
            vec![0.0; sample_rate as usize * channels as usize],
            sample_rate,
            channels,
        )
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_arc(&self) -> &Arc<[f32]> {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel.
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame index at `seconds`, clamped to the buffer end.
    pub fn frame_at(&self, seconds: f64) -> usize {
        let frame = (seconds.max(0.0) * self.sample_rate as f64) as usize;
        frame.min(self.frames())
    }

    /// Sample of `channel` at `frame`, folding extra output channels onto the
    /// channels this buffer has. Out-of-range frames read as silence.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        self.samples
            .get(frame * channels + channel % channels)
            .copied()
            .unwrap_or(0.0)
    }

    /// Resample to `target_sample_rate`. Returns a cheap clone if the rate
    /// already matches.
    pub fn resample(&self, target_sample_rate: u32) -> anyhow::Result<Self> {
        if self.sample_rate == target_sample_rate {
            return Ok(self.clone());
        }

        resample_audio(self, target_sample_rate)
    }
}

impl std::fmt::Debug for AudioArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArc")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_secs", &self.duration_secs())
            .finish()
    }
}

/// Sinc-interpolated resampling of a whole buffer.
///
/// # Examples
///
/// ```
/// use kbm_transport::{AudioArc, resample_audio};
///
/// let audio = AudioArc::new(vec![0.0; 44100], 44100, 1);
/// let resampled = resample_audio(&audio, 48000).unwrap();
/// assert_eq!(resampled.sample_rate(), 48000);
/// ```
pub fn resample_audio(audio: &AudioArc, target_sample_rate: u32) -> anyhow::Result<AudioArc> {
    if audio.sample_rate == target_sample_rate {
        return Ok(audio.clone());
    }
    if audio.is_empty() {
        return Ok(AudioArc::new(Vec::new(), target_sample_rate, audio.channels));
    }

    let channels = audio.channels as usize;
    let input_frames = audio.frames();
    let ratio = target_sample_rate as f64 / audio.sample_rate as f64;

    // rubato works on planar buffers
    let mut planar = vec![Vec::with_capacity(input_frames); channels];
    for frame in audio.samples().chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_frames, channels)?;
    let output = resampler.process(&planar, None)?;

    let output_frames = output[0].len();
    let mut interleaved = Vec::with_capacity(output_frames * channels);
    for frame in 0..output_frames {
        for plane in &output {
            interleaved.push(plane[frame]);
        }
    }

    Ok(AudioArc::new(interleaved, target_sample_rate, audio.channels))
}
