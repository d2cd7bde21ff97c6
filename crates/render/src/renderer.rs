use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use kbm_sheet::{Note, Position, Sheet};

use crate::frame::{DrawCommand, Frame, SheetRenderStyle};
use crate::strategy::LineClass;
use crate::{Point, RenderStrategyType, Viewport};

/// Skips passes that come sooner than the configured frame rate allows.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    interval: Option<Duration>,
    last: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(fps: Option<NonZeroU32>) -> Self {
        Self {
            interval: fps.map(|fps| Duration::from_millis(1000 / fps.get() as u64)),
            last: None,
        }
    }

    pub fn uncapped() -> Self {
        Self::new(None)
    }

    pub fn set_fps(&mut self, fps: Option<NonZeroU32>) {
        self.interval = fps.map(|fps| Duration::from_millis(1000 / fps.get() as u64));
    }

    /// Minimum milliseconds between passes, 0 when uncapped.
    pub fn interval_ms(&self) -> u64 {
        self.interval.map_or(0, |d| d.as_millis() as u64)
    }

    /// Whether a pass may run at `now`. Records the pass if so.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match (self.interval, self.last) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Everything one pass looks at. Borrowed, so a pass never outlives the state
/// it was asked to draw.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub sheet: Option<&'a Sheet>,
    pub viewport: &'a Viewport,
    pub strategy: RenderStrategyType,
    pub selector: Option<Position>,
    /// Selected notes at their (possibly dragged) positions.
    pub selected: &'a [Note],
    /// Base positions of sheet notes hidden because they are being dragged.
    pub hidden: &'a [Position],
    pub hold_start: Option<Position>,
}

impl<'a> RenderInput<'a> {
    pub fn new(sheet: Option<&'a Sheet>, viewport: &'a Viewport) -> Self {
        Self {
            sheet,
            viewport,
            strategy: RenderStrategyType::default(),
            selector: None,
            selected: &[],
            hidden: &[],
            hold_start: None,
        }
    }
}

/// Draws sheets into frames. Shareable between threads; passes run one at a
/// time.
#[derive(Debug)]
pub struct SheetRenderer {
    style: SheetRenderStyle,
    limiter: Mutex<FrameLimiter>,
    pass: Mutex<()>,
}

impl SheetRenderer {
    pub fn new(style: SheetRenderStyle, fps: Option<NonZeroU32>) -> Self {
        Self {
            style,
            limiter: Mutex::new(FrameLimiter::new(fps)),
            pass: Mutex::new(()),
        }
    }

    pub fn style(&self) -> &SheetRenderStyle {
        &self.style
    }

    pub fn set_fps(&self, fps: Option<NonZeroU32>) {
        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_fps(fps);
    }

    /// Run a pass unless the frame limiter says it is too early.
    pub fn render(&self, input: &RenderInput<'_>) -> Option<Frame> {
        let ready = self
            .limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ready(Instant::now());
        ready.then(|| self.render_forced(input))
    }

    /// Run a pass regardless of the frame limiter.
    pub fn render_forced(&self, input: &RenderInput<'_>) -> Frame {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);
        let vp = input.viewport;

        let Some(sheet) = input.sheet else {
            let mut frame = Frame::new(vp.bitmap_width(), vp.bitmap_height());
            self.draw_background(&mut frame, vp);
            return frame;
        };

        let rows = vp.visible_rows();
        let (mut frame, mut notes) = rayon::join(
            || {
                let mut frame = Frame::new(vp.bitmap_width(), vp.bitmap_height());
                self.draw_background(&mut frame, vp);
                self.draw_lanes(&mut frame, vp);
                self.draw_grid(&mut frame, vp, input.strategy);
                frame
            },
            || sheet.notes_intersecting(rows.from, rows.to),
        );

        self.draw_trigger_line(&mut frame, vp);

        if let Some(selector) = input.selector {
            frame.push(DrawCommand::FillRect {
                rect: self.style.note_rect(vp.cell_center(selector)),
                color: self.style.selector_fill,
            });
        }

        notes.sort_by_key(|note| note.base_position());
        for note in notes
            .iter()
            .filter(|note| !input.hidden.contains(&note.base_position()))
        {
            self.draw_note(&mut frame, vp, note, false);
        }

        for note in input
            .selected
            .iter()
            .filter(|note| note.intersects_rows(rows.from, rows.to))
        {
            self.draw_note(&mut frame, vp, note, true);
        }

        if let Some(start) = input.hold_start {
            frame.push(DrawCommand::FillRect {
                rect: self.style.note_rect(vp.cell_center(start)),
                color: self.style.hold_start_fill,
            });
        }

        log::trace!("rendered frame with {} commands", frame.len());
        frame
    }

    fn draw_background(&self, frame: &mut Frame, vp: &Viewport) {
        frame.push(DrawCommand::FillRect {
            rect: crate::Rect::new(0.0, 0.0, vp.bitmap_width(), vp.bitmap_height()),
            color: self.style.background,
        });
    }

    fn draw_lanes(&self, frame: &mut Frame, vp: &Viewport) {
        let height = vp.bitmap_height();
        let vertical = |x: f64| (Point::new(x, 0.0), Point::new(x, height));

        let (from, to) = vertical(0.0);
        frame.push(DrawCommand::Line {
            from,
            to,
            pen: self.style.separator_pen,
        });

        for i in 1..=vp.columns() {
            let (from, to) = vertical(vp.lane_left(i));
            let pen = if i == vp.left_size() {
                self.style.border_pen
            } else {
                self.style.separator_pen
            };
            frame.push(DrawCommand::Line { from, to, pen });
        }
    }

    fn draw_grid(&self, frame: &mut Frame, vp: &Viewport, strategy: RenderStrategyType) {
        let column_width = vp.column_width();

        for line in strategy.grid_lines(vp) {
            let (pen, percentage) = match line.class {
                LineClass::Beat => (self.style.beat_pen, self.style.full_note_percentage),
                LineClass::Secondary(level) => (
                    self.style.grid_pens[level.min(self.style.grid_pens.len() - 1)],
                    self.style.not_full_note_percentage,
                ),
            };
            let half = column_width / 2.0 * percentage;

            for lane in 0..vp.columns() {
                let center = vp.lane_center(lane);
                frame.push(DrawCommand::Line {
                    from: Point::new(center - half, line.y),
                    to: Point::new(center + half, line.y),
                    pen,
                });
            }

            if let Some(beat) = line.beat_label(strategy.subdivision()) {
                frame.push(DrawCommand::Text {
                    at: Point::new(4.0, line.y - self.style.beat_text_size as f64),
                    text: beat.to_string(),
                    color: self.style.beat_text_color,
                    size: self.style.beat_text_size,
                });
            }
        }
    }

    fn draw_trigger_line(&self, frame: &mut Frame, vp: &Viewport) {
        let y = vp.bitmap_height() - vp.trigger_line_y();
        frame.push(DrawCommand::Line {
            from: Point::new(0.0, y),
            to: Point::new(vp.bitmap_width(), y),
            pen: self.style.trigger_line_pen,
        });
    }

    fn draw_note(&self, frame: &mut Frame, vp: &Viewport, note: &Note, selected: bool) {
        let rect = match note {
            Note::Hit { position } => self.style.note_rect(vp.cell_center(*position)),
            Note::Hold(hold) => {
                let start = self.style.note_rect(vp.cell_center(hold.start()));
                let end = self.style.note_rect(vp.cell_center(hold.end()));
                start.union(&end)
            }
        };
        let (fill, stroke) = if selected {
            (self.style.selected_note_fill, self.style.selected_note_pen)
        } else {
            (self.style.note_fill, self.style.note_pen)
        };
        frame.push(DrawCommand::Box { rect, fill, stroke });
    }
}

impl Default for SheetRenderer {
    fn default() -> Self {
        Self::new(SheetRenderStyle::default(), None)
    }
}
