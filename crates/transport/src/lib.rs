mod audio;
mod output;

pub use audio::{AudioArc, resample_audio};
pub use output::{AudioOutput, Command, MAX_STRIKE_VOICES, NullOutput, Status, batch_volume};

/// Rows per beat. Every sheet position, quantization step and export time is
/// expressed in these ticks.
pub const TICKS_PER_BEAT: i32 = 96;

/// Seconds covered by one row at `bpm`.
pub fn seconds_per_row(bpm: f64) -> f64 {
    60.0 / (bpm * TICKS_PER_BEAT as f64)
}
