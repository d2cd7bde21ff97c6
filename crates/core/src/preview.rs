use crossbeam_channel::Receiver;
use kbm_sheet::{Position, Sheet};
use kbm_transport::TICKS_PER_BEAT;

use crate::events::SheetChange;

/// Beats counted together in one density window.
pub const WINDOW_BEATS: i32 = 4;
pub const WINDOW_ROWS: i32 = WINDOW_BEATS * TICKS_PER_BEAT;

/// Note counts per window over the length of the song, kept in step with the
/// sheet through its change events. Drives the scrolling minimap.
#[derive(Debug, Clone, Default)]
pub struct DensityPreview {
    counts: Vec<usize>,
    length_seconds: f64,
    bpm: f64,
}

impl DensityPreview {
    pub fn new(length_seconds: f64, bpm: f64) -> Self {
        let rows = (length_seconds.max(0.0) * bpm / 60.0 * TICKS_PER_BEAT as f64).ceil();
        let windows = (rows / WINDOW_ROWS as f64).ceil().max(1.0) as usize;
        Self {
            counts: vec![0; windows],
            length_seconds,
            bpm,
        }
    }

    pub fn from_sheet(sheet: &Sheet, length_seconds: f64, bpm: f64) -> Self {
        let mut preview = Self::new(length_seconds, bpm);
        preview.rebuild(sheet);
        preview
    }

    pub fn rebuild(&mut self, sheet: &Sheet) {
        self.counts.fill(0);
        for note in sheet.values() {
            self.add(note.base_position(), 1);
        }
    }

    fn window_of(&self, position: Position) -> Option<usize> {
        let index = usize::try_from(position.row.div_euclid(WINDOW_ROWS)).ok()?;
        (index < self.counts.len()).then_some(index)
    }

    fn add(&mut self, position: Position, delta: isize) {
        // notes past the end of the song are not drawn
        if let Some(index) = self.window_of(position) {
            self.counts[index] = self.counts[index].saturating_add_signed(delta);
        }
    }

    pub fn apply(&mut self, change: &SheetChange) {
        match change {
            SheetChange::Put(positions) => positions.iter().for_each(|p| self.add(*p, 1)),
            SheetChange::Delete(positions) => positions.iter().for_each(|p| self.add(*p, -1)),
            SheetChange::Clear => self.counts.fill(0),
        }
    }

    /// Apply every pending change. Returns how many were applied.
    pub fn drain(&mut self, changes: &Receiver<SheetChange>) -> usize {
        let mut applied = 0;
        for change in changes.try_iter() {
            self.apply(&change);
            applied += 1;
        }
        applied
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn max(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Scale of the minimap's count axis.
    pub fn top(&self) -> usize {
        let max = self.max();
        if max % 5 == 0 {
            max.max(10)
        } else {
            (max / 5 + 1) * 5
        }
    }

    pub fn window_seconds(&self) -> f64 {
        WINDOW_BEATS as f64 * 60.0 / self.bpm
    }

    /// Where the playback line sits, as a fraction of the song.
    pub fn line_fraction(&self, seconds: f64) -> f64 {
        if self.length_seconds <= 0.0 {
            return 0.0;
        }
        (seconds / self.length_seconds).clamp(0.0, 1.0)
    }

    /// Playback time at a fraction of the song, for seeking from the minimap.
    pub fn seconds_at_fraction(&self, fraction: f64) -> f64 {
        fraction.clamp(0.0, 1.0) * self.length_seconds
    }
}
