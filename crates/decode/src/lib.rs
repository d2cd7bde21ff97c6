mod bpm;

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use kbm_transport::AudioArc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

pub use bpm::{BpmAnalyzer, BpmJob, OnsetBpmAnalyzer, spawn_bpm_analysis};

const SAMPLES_ROOT: &str = "samples";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported audio format '{0}', expected .wav or .mp3")]
    UnsupportedFormat(String),

    #[error("no playable track in audio stream")]
    NoTrack,

    #[error("audio decode failed: {0}")]
    Codec(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Containers a chart's music may come in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Accepts `.wav`/`.mp3` with or without the dot, in any case.
    pub fn from_extension(ext: &str) -> Result<Self, DecodeError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            _ => Err(DecodeError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, DecodeError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    /// Extension with the leading dot, as stored in project metadata.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => ".wav",
            AudioFormat::Mp3 => ".mp3",
        }
    }

    fn hint(&self) -> Hint {
        let mut hint = Hint::new();
        hint.with_extension(&self.extension()[1..]);
        hint
    }
}

/// What probing a music file tells us without keeping the samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
}

/// Resolve a sample path to an existing file.
/// Accepts paths as given or relative to the `samples` directory.
pub fn resolve_sample_path(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }

    let with_root = Path::new(SAMPLES_ROOT).join(path);
    if with_root.exists() {
        return Some(with_root);
    }

    None
}

fn open_reader(bytes: &[u8], format: AudioFormat) -> Result<Box<dyn FormatReader>, DecodeError> {
    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let probed = symphonia::default::get_probe().format(
        &format.hint(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    Ok(probed.format)
}

/// Read stream parameters and length. Falls back to a full decode when the
/// container does not carry a frame count.
pub fn probe_bytes(bytes: &[u8], format: AudioFormat) -> Result<AudioInfo, DecodeError> {
    let reader = open_reader(bytes, format)?;
    let track = reader.default_track().ok_or(DecodeError::NoTrack)?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2) as u16;

    let duration_secs = match track.codec_params.n_frames {
        Some(frames) => frames as f64 / sample_rate as f64,
        None => decode_bytes(bytes, format)?.duration_secs(),
    };

    Ok(AudioInfo {
        format,
        sample_rate,
        channels,
        duration_secs,
    })
}

/// Decode a whole in-memory file to interleaved f32 samples.
pub fn decode_bytes(bytes: &[u8], format: AudioFormat) -> Result<AudioArc, DecodeError> {
    let mut reader = open_reader(bytes, format)?;
    let track = reader.default_track().ok_or(DecodeError::NoTrack)?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2) as u16;
    let track_id = track.id;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(reason)) => {
                log::warn!("skipping corrupt packet: {reason}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    log::debug!(
        "decoded {} samples ({} Hz, {} ch) from {:?}",
        samples.len(),
        sample_rate,
        channels,
        format
    );

    // a truncated stream may end mid-frame
    let whole = samples.len() - samples.len() % channels.max(1) as usize;
    samples.truncate(whole);

    Ok(AudioArc::new(samples, sample_rate, channels.max(1)))
}

/// Decode a file on disk, picking the format from its extension.
pub fn decode_file(path: &Path) -> Result<AudioArc, DecodeError> {
    let format = AudioFormat::from_path(path)?;
    let bytes = fs::read(path)?;
    decode_bytes(&bytes, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            for i in 0..frames {
                let value = ((i % 100) as i16 - 50) * 200;
                for _ in 0..channels {
                    writer.write_sample(value).expect("write sample");
                }
            }
            writer.finalize().expect("finalize");
        }
        cursor.into_inner()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(AudioFormat::from_extension(".wav").unwrap(), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_extension("MP3").unwrap(), AudioFormat::Mp3);
        assert!(matches!(
            AudioFormat::from_extension(".ogg"),
            Err(DecodeError::UnsupportedFormat(ext)) if ext == ".ogg"
        ));
        assert!(AudioFormat::from_extension("").is_err());
    }

    #[test]
    fn test_format_extension_has_dot() {
        assert_eq!(AudioFormat::Wav.extension(), ".wav");
        assert_eq!(AudioFormat::Mp3.extension(), ".mp3");
    }

    #[test]
    fn test_probe_wav_bytes() {
        let bytes = wav_bytes(22050, 2, 22050);
        let info = probe_bytes(&bytes, AudioFormat::Wav).expect("probe");

        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.channels, 2);
        assert!((info.duration_secs - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_decode_wav_bytes() {
        let bytes = wav_bytes(8000, 1, 4000);
        let audio = decode_bytes(&bytes, AudioFormat::Wav).expect("decode");

        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.frames(), 4000);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_bytes(b"definitely not audio", AudioFormat::Wav);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_file_checks_extension() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("music.flac");
        fs::write(&path, wav_bytes(8000, 1, 10)).expect("write");

        assert!(matches!(
            decode_file(&path),
            Err(DecodeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_decode_file_wav() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("strike.wav");
        fs::write(&path, wav_bytes(8000, 2, 800)).expect("write");

        let audio = decode_file(&path).expect("decode");
        assert_eq!(audio.frames(), 800);
        assert_eq!(audio.channels(), 2);
    }

    #[test]
    fn test_resolve_sample_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("hit.wav");
        fs::write(&path, b"x").expect("write");

        assert_eq!(resolve_sample_path(&path), Some(path.clone()));
        assert_eq!(resolve_sample_path(&dir.path().join("missing.wav")), None);
    }
}
