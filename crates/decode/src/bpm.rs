use std::thread::{self, JoinHandle};

use kbm_transport::AudioArc;

/// Tempo estimation for a music track. The result is only a suggestion shown
/// next to the bpm field; nothing depends on it being right.
pub trait BpmAnalyzer: Send {
    fn analyze(&self, audio: &AudioArc) -> Option<f32>;
}

/// Onset-envelope autocorrelation over a 10 ms hop.
#[derive(Debug, Clone, Copy)]
pub struct OnsetBpmAnalyzer {
    pub min_bpm: f32,
    pub max_bpm: f32,
}

impl Default for OnsetBpmAnalyzer {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 200.0,
        }
    }
}

impl OnsetBpmAnalyzer {
    fn onset_envelope(audio: &AudioArc, hop: usize) -> Vec<f32> {
        let channels = audio.channels() as usize;
        let energies: Vec<f32> = audio
            .samples()
            .chunks(hop * channels)
            .map(|block| block.iter().map(|s| s * s).sum::<f32>())
            .collect();

        let mut envelope = Vec::with_capacity(energies.len());
        let mut previous = 0.0;
        for energy in energies {
            envelope.push((energy - previous).max(0.0));
            previous = energy;
        }
        envelope
    }
}

impl BpmAnalyzer for OnsetBpmAnalyzer {
    fn analyze(&self, audio: &AudioArc) -> Option<f32> {
        let hop = (audio.sample_rate() as usize / 100).max(1);
        let hop_secs = hop as f32 / audio.sample_rate() as f32;
        let envelope = Self::onset_envelope(audio, hop);

        let min_lag = (60.0 / (self.max_bpm * hop_secs)).ceil().max(1.0) as usize;
        let max_lag = (60.0 / (self.min_bpm * hop_secs)).floor() as usize;
        if envelope.len() <= max_lag || min_lag > max_lag {
            return None;
        }

        let mut best: Option<(usize, f32)> = None;
        for lag in min_lag..=max_lag {
            let score: f32 = envelope
                .iter()
                .zip(&envelope[lag..])
                .map(|(a, b)| a * b)
                .sum();
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((lag, score));
            }
        }

        best.map(|(lag, _)| 60.0 / (lag as f32 * hop_secs))
    }
}

/// A tempo estimate running on its own thread.
pub struct BpmJob {
    handle: JoinHandle<Option<f32>>,
}

impl BpmJob {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the estimate. A panicked analyzer counts as no estimate.
    pub fn join(self) -> Option<f32> {
        self.handle.join().unwrap_or_else(|_| {
            log::warn!("bpm analysis thread panicked");
            None
        })
    }
}

pub fn spawn_bpm_analysis<A>(analyzer: A, audio: AudioArc) -> BpmJob
where
    A: BpmAnalyzer + 'static,
{
    let handle = thread::spawn(move || {
        let bpm = analyzer.analyze(&audio);
        log::info!("bpm analysis finished: {bpm:?}");
        bpm
    });
    BpmJob { handle }
}
