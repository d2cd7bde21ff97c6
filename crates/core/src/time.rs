use kbm_transport::TICKS_PER_BEAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.numerator
    }

    pub fn rows_per_bar(&self) -> i32 {
        TICKS_PER_BEAT * self.numerator as i32
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl From<(u32, u32)> for TimeSignature {
    fn from((numerator, denominator): (u32, u32)) -> Self {
        Self::new(numerator, denominator)
    }
}

/// Converts sheet rows to beats, bars and seconds at a fixed tempo.
#[derive(Debug, Clone, Copy)]
pub struct TimeContext {
    pub bpm: f64,
    pub time_signature: TimeSignature,
}

impl TimeContext {
    pub fn new(bpm: f64, time_signature: impl Into<TimeSignature>) -> Self {
        Self {
            bpm,
            time_signature: time_signature.into(),
        }
    }

    pub fn rows_to_beats(&self, rows: i32) -> f64 {
        rows as f64 / TICKS_PER_BEAT as f64
    }

    pub fn beats_to_rows(&self, beats: f64) -> i32 {
        (beats * TICKS_PER_BEAT as f64).floor() as i32
    }

    pub fn rows_to_seconds(&self, rows: i32) -> f64 {
        self.rows_to_beats(rows) * 60.0 / self.bpm
    }

    pub fn seconds_to_rows(&self, seconds: f64) -> i32 {
        self.beats_to_rows(seconds * self.bpm / 60.0)
    }

    pub fn format_position(&self, row: i32) -> MusicalPosition {
        let row = row.max(0);
        let beats_per_bar = self.time_signature.beats_per_bar().max(1) as i32;
        let beat = row / TICKS_PER_BEAT;

        MusicalPosition {
            bar: (beat / beats_per_bar) as u32 + 1,
            beat: (beat % beats_per_bar) as u32 + 1,
            tick: (row % TICKS_PER_BEAT) as u32,
        }
    }
}

impl Default for TimeContext {
    fn default() -> Self {
        Self::new(120.0, TimeSignature::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalPosition {
    pub bar: u32,
    pub beat: u32,
    pub tick: u32,
}

impl std::fmt::Display for MusicalPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{:02}", self.bar, self.beat, self.tick)
    }
}

/// Formats seconds as `m:ss.mmm`.
pub fn format_seconds(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    format!("{}:{:02}.{:03}", millis / 60_000, millis / 1000 % 60, millis % 1000)
}
