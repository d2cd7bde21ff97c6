use std::time::Instant;

use kbm_render::Viewport;
use kbm_sheet::Sheet;
use kbm_transport::{AudioArc, AudioOutput, NullOutput};
use rayon::prelude::*;

/// Lanes the scanner keeps high-water marks for.
pub const MAX_LANES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Playback clock: a start offset in seconds plus the time spent running.
#[derive(Debug, Clone, Default)]
pub struct StopwatchTimer {
    base: f64,
    started: Option<Instant>,
}

impl StopwatchTimer {
    /// Stop the clock and set it to `seconds`.
    pub fn reset(&mut self, seconds: f64) {
        self.base = seconds;
        self.started = None;
    }

    pub fn start(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    pub fn stop(&mut self, now: Instant) {
        if let Some(started) = self.started.take() {
            self.base += now.saturating_duration_since(started).as_secs_f64();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn seconds_at(&self, now: Instant) -> f64 {
        self.base
            + self
                .started
                .map_or(0.0, |started| now.saturating_duration_since(started).as_secs_f64())
    }
}

/// Moves the trigger line with the music and fires a strike for every note
/// it crosses.
pub struct SheetPlayer {
    output: Box<dyn AudioOutput>,
    timer: StopwatchTimer,
    marks: [i32; MAX_LANES],
    /// Trigger row of the last sweep driven by the clock.
    swept_row: Option<i32>,
    state: PlaybackState,
    volume: f32,
    loaded: bool,
}

impl SheetPlayer {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            timer: StopwatchTimer::default(),
            marks: [-1; MAX_LANES],
            swept_row: None,
            state: PlaybackState::Stopped,
            volume: 1.0,
            loaded: false,
        }
    }

    /// A player with no audio device, for headless use.
    pub fn silent() -> Self {
        Self::new(Box::new(NullOutput::default()))
    }

    /// Swap in the music of a newly opened project. Playback stops.
    pub fn load(&mut self, music: AudioArc) {
        self.output.pause();
        self.output.load_stream(music);
        self.output.set_volume(self.volume);
        self.timer.reset(0.0);
        self.swept_row = None;
        self.state = PlaybackState::Stopped;
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.output.set_volume(self.volume);
    }

    pub fn marks(&self) -> &[i32; MAX_LANES] {
        &self.marks
    }

    pub fn play(&mut self, viewport: &mut Viewport, bpm: f64) {
        self.play_at(viewport, bpm, Instant::now());
    }

    /// Start from wherever the trigger line is. Notes on the trigger row
    /// itself fire on the first update, unless playback is resuming on the
    /// row it paused at, in which case the sweep carries on.
    pub fn play_at(&mut self, viewport: &mut Viewport, bpm: f64, now: Instant) {
        if self.is_playing() {
            return;
        }
        let row = viewport.trigger_line_row();
        let resuming = self.state == PlaybackState::Paused && self.swept_row == Some(row);
        if !resuming {
            self.marks = [row - 1; MAX_LANES];
        }
        if viewport.trigger_absolute_y() < 0.0 {
            viewport.set_trigger_absolute_y(0.0);
        }

        let seconds = viewport.trigger_line_seconds(bpm);
        self.output.seek(seconds);
        self.timer.reset(seconds);
        self.timer.start(now);
        self.output.play();
        self.state = PlaybackState::Playing;
        log::debug!("playback started at {seconds:.3}s");
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        if !self.is_playing() {
            return;
        }
        self.timer.stop(now);
        self.output.pause();
        self.state = PlaybackState::Paused;
        log::debug!("playback paused at {:.3}s", self.timer.seconds_at(now));
    }

    pub fn seconds_at(&self, now: Instant) -> f64 {
        self.timer.seconds_at(now)
    }

    pub fn update(&mut self, sheet: &Sheet, viewport: &mut Viewport, bpm: f64) -> usize {
        self.update_at(sheet, viewport, bpm, Instant::now())
    }

    /// Advance the trigger line to the playback clock and strike the notes it
    /// crossed, all of them with a single cue.
    pub fn update_at(
        &mut self,
        sheet: &Sheet,
        viewport: &mut Viewport,
        bpm: f64,
        now: Instant,
    ) -> usize {
        if !self.is_playing() {
            return 0;
        }
        viewport.set_trigger_line_seconds(self.timer.seconds_at(now), bpm);

        let row = viewport.trigger_line_row();
        self.swept_row = Some(row);
        let fired = self.sweep(sheet, row);
        if fired > 0 {
            log::trace!("striking {fired} notes");
            self.output.play_batch(fired);
        }
        fired
    }

    /// Count notes whose start row lies above their lane's mark and at or
    /// below `trigger_row`, and raise the marks past them.
    pub fn sweep(&mut self, sheet: &Sheet, trigger_row: i32) -> usize {
        let marks = self.marks;
        let crossing: Vec<(usize, i32)> = sheet
            .values()
            .into_par_iter()
            .filter_map(|note| {
                let lane = usize::try_from(note.lane()).ok()?;
                let mark = *marks.get(lane)?;
                let row = note.start_row();
                (mark < row && row <= trigger_row).then_some((lane, row))
            })
            .collect();

        for &(lane, row) in &crossing {
            self.marks[lane] = self.marks[lane].max(row);
        }
        crossing.len()
    }
}

impl std::fmt::Debug for SheetPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetPlayer")
            .field("timer", &self.timer)
            .field("marks", &self.marks)
            .field("state", &self.state)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}
