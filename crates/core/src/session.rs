use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use kbm_decode::DecodeError;
use kbm_project::{Project, ProjectError, load_project, save_package, save_project};
use kbm_render::{
    Frame, InteractionAgent, Point, RenderInput, RenderStrategyType, SheetRenderStyle,
    SheetRenderer, Viewport,
};
use kbm_sheet::{Note, Position, Sheet};
use kbm_transport::AudioOutput;

use crate::editor::{EditError, HoldPlacement, SheetEditor};
use crate::events::SheetChange;
use crate::player::{PlaybackState, SheetPlayer};
use crate::preview::DensityPreview;
use crate::time::{MusicalPosition, TimeContext, format_seconds};
use crate::undo::DEFAULT_MAX_HISTORY;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no project is open")]
    NoProject,

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("failed to decode music: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// What a primary click does at the hovered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Clicks only select.
    #[default]
    View,
    Hit,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Nothing,
    Selected(Note),
    Deselected,
    PutHit,
    Hold(HoldPlacement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    Selecting { from: Position },
    Moving { last: Position },
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub bitmap_width: f64,
    pub bitmap_height: f64,
    pub fps_limit: Option<NonZeroU32>,
    pub history_limit: usize,
    pub strategy: RenderStrategyType,
    /// Bitmap pixels scrolled per wheel notch.
    pub scroll_sensitivity: f64,
    /// Zoom change per wheel notch.
    pub zoom_sensitivity: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            bitmap_width: 600.0,
            bitmap_height: 960.0,
            fps_limit: NonZeroU32::new(60),
            history_limit: DEFAULT_MAX_HISTORY,
            strategy: RenderStrategyType::default(),
            scroll_sensitivity: 40.0,
            zoom_sensitivity: 0.1,
        }
    }
}

/// Everything one open editor window works on: the project, the editor over
/// its sheet, the view, playback and the minimap.
#[derive(Debug)]
pub struct Session {
    project: Option<Project>,
    editor: SheetEditor,
    viewport: Viewport,
    strategy: RenderStrategyType,
    renderer: SheetRenderer,
    player: SheetPlayer,
    preview: DensityPreview,
    preview_events: Receiver<SheetChange>,
    mode: EditMode,
    hover: Option<Position>,
    drag: Option<DragState>,
    options: SessionOptions,
}

impl Session {
    pub fn new(options: SessionOptions, output: Box<dyn AudioOutput>) -> Self {
        let editor = SheetEditor::with_history_limit(options.history_limit);
        let preview_events = editor.subscribe();
        Self {
            project: None,
            editor,
            viewport: Viewport::new(options.bitmap_width, options.bitmap_height),
            strategy: options.strategy,
            renderer: SheetRenderer::new(SheetRenderStyle::default(), options.fps_limit),
            player: SheetPlayer::new(output),
            preview: DensityPreview::default(),
            preview_events,
            mode: EditMode::default(),
            hover: None,
            drag: None,
            options,
        }
    }

    /// A session without an audio device.
    pub fn headless(options: SessionOptions) -> Self {
        Self::new(options, Box::new(kbm_transport::NullOutput::default()))
    }

    pub fn open(&mut self, path: &Path) -> Result<(), SessionError> {
        let project = load_project(path)?;
        self.replace_project(project)
    }

    pub fn new_project(&mut self, project: Project) -> Result<(), SessionError> {
        self.replace_project(project)
    }

    /// Make `project` current. Nothing changes if its music cannot be decoded.
    pub fn replace_project(&mut self, project: Project) -> Result<(), SessionError> {
        let music = project.decode_music()?;

        self.player.pause();
        self.player.load(music);
        self.editor.attach(project.sheet().clone());
        self.viewport
            .set_lanes(project.sheet().column(), project.sheet().left_size());
        self.viewport.set_trigger_line_row(0);
        self.editor.set_visible_rows(self.viewport.visible_rows());

        // changes from the previous sheet are stale
        self.preview_events.try_iter().for_each(drop);
        self.preview = DensityPreview::from_sheet(
            project.sheet(),
            project.length_seconds(),
            project.bpm(),
        );
        self.hover = None;
        self.drag = None;

        log::info!(
            "opened '{}' ({} lanes, {} bpm, {} notes)",
            project.meta().name,
            project.sheet().column(),
            project.bpm(),
            project.sheet().len()
        );
        self.project = Some(project);
        Ok(())
    }

    pub fn close_project(&mut self) {
        self.player.pause();
        self.editor.detach();
        self.preview = DensityPreview::default();
        self.project = None;
    }

    pub fn save(&mut self) -> Result<(), SessionError> {
        let project = self.project.as_ref().ok_or(SessionError::NoProject)?;
        let path = project
            .saving_path()
            .cloned()
            .ok_or(ProjectError::NoSavePath)?;
        self.editor.flush_selection_moving()?;
        save_project(&path, project)?;
        Ok(())
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let project = self.project.as_mut().ok_or(SessionError::NoProject)?;
        project.set_saving_path(path);
        self.save()
    }

    pub fn export_package(&mut self, dir: &Path) -> Result<(), SessionError> {
        self.editor.flush_selection_moving()?;
        let project = self.project.as_ref().ok_or(SessionError::NoProject)?;
        save_package(project, dir)?;
        Ok(())
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    fn sheet(&self) -> Option<Arc<Sheet>> {
        self.project.as_ref().map(|p| p.sheet().clone())
    }

    pub fn editor(&self) -> &SheetEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut SheetEditor {
        &mut self.editor
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn player(&self) -> &SheetPlayer {
        &self.player
    }

    pub fn preview(&self) -> &DensityPreview {
        &self.preview
    }

    pub fn strategy(&self) -> RenderStrategyType {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: RenderStrategyType) {
        self.strategy = strategy;
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        if mode != EditMode::Hold {
            self.editor.cancel_hold();
        }
        self.mode = mode;
    }

    pub fn hover_cell(&self) -> Option<Position> {
        self.hover
    }

    pub fn time_context(&self) -> Option<TimeContext> {
        self.project
            .as_ref()
            .map(|p| TimeContext::new(p.bpm(), (4, 4)))
    }

    fn sync_visible_rows(&mut self) {
        self.editor.set_visible_rows(self.viewport.visible_rows());
    }

    /// Track the pointer over the displayed image. Drives the hover
    /// selector and any drag in progress.
    pub fn hover(&mut self, screen: Point) -> Option<Position> {
        let cell = InteractionAgent::new(&self.viewport, self.strategy).position(screen);
        self.hover = cell;

        if let (Some(DragState::Moving { last }), Some(cell)) = (self.drag, cell) {
            let delta = cell - last;
            if delta != Position::ORIGIN {
                self.editor.move_selection_shadow(delta);
                self.drag = Some(DragState::Moving { last: cell });
            }
        }
        cell
    }

    pub fn primary_click(&mut self) -> Result<ClickOutcome, SessionError> {
        let Some(cell) = self.hover else {
            return Ok(ClickOutcome::Nothing);
        };
        if self.project.is_none() {
            return Err(SessionError::NoProject);
        }

        let pending_hold = self.editor.hold_start().is_some();
        if let Some(note) = self.editor.note_at(cell).filter(|_| !pending_hold) {
            self.editor.select_single(note)?;
            return Ok(ClickOutcome::Selected(note));
        }

        match self.mode {
            EditMode::View => {
                self.editor.clear_selection()?;
                Ok(ClickOutcome::Deselected)
            }
            EditMode::Hit => Ok(if self.editor.put_hit(cell)? {
                ClickOutcome::PutHit
            } else {
                ClickOutcome::Nothing
            }),
            EditMode::Hold => Ok(ClickOutcome::Hold(self.editor.put_hold(cell)?)),
        }
    }

    /// Cancel a pending hold, or remove the note under the pointer.
    pub fn secondary_click(&mut self) -> Result<Option<Note>, SessionError> {
        if self.editor.hold_start().is_some() {
            self.editor.cancel_hold();
            return Ok(None);
        }
        let Some(cell) = self.hover else {
            return Ok(None);
        };
        Ok(self.editor.remove_note(cell)?)
    }

    /// Start dragging at the hovered cell: moves the selection when the
    /// pointer is on a selected note, otherwise starts a selection box.
    pub fn begin_drag(&mut self) {
        let Some(cell) = self.hover else {
            return;
        };
        self.drag = Some(if self.editor.selection_contains(cell) {
            DragState::Moving { last: cell }
        } else {
            DragState::Selecting { from: cell }
        });
    }

    /// Finish a drag. Returns how many notes were selected or moved.
    pub fn end_drag(&mut self) -> Result<usize, SessionError> {
        match self.drag.take() {
            Some(DragState::Selecting { from }) => {
                let to = self.hover.unwrap_or(from);
                Ok(self.editor.select_by_dragging(from, to)?)
            }
            Some(DragState::Moving { .. }) => {
                let moved = self.editor.flush_selection_moving()?;
                Ok(if moved {
                    self.editor.selected_notes().len()
                } else {
                    0
                })
            }
            None => Ok(0),
        }
    }

    /// Scroll by wheel notches; positive moves toward later rows.
    pub fn scroll(&mut self, notches: f64) {
        if self.player.is_playing() {
            return;
        }
        self.viewport
            .scroll_by(notches * self.options.scroll_sensitivity);
        self.sync_visible_rows();
    }

    pub fn zoom_by(&mut self, notches: f64) {
        self.viewport
            .zoom_by(notches * self.options.zoom_sensitivity);
        self.sync_visible_rows();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize_display(width, height);
    }

    pub fn toggle_playback(&mut self) -> Result<PlaybackState, SessionError> {
        let bpm = self.project.as_ref().ok_or(SessionError::NoProject)?.bpm();
        if self.player.is_playing() {
            self.player.pause();
        } else {
            self.editor.flush_selection_moving()?;
            self.player.play(&mut self.viewport, bpm);
        }
        self.sync_visible_rows();
        Ok(self.player.state())
    }

    /// Jump the trigger line to a fraction of the song, as when dragging on
    /// the minimap. Playback continues from there if it was running.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<(), SessionError> {
        let bpm = self.project.as_ref().ok_or(SessionError::NoProject)?.bpm();
        let was_playing = self.player.is_playing();
        self.player.pause();
        let seconds = self.preview.seconds_at_fraction(fraction);
        self.viewport.set_trigger_line_seconds(seconds, bpm);
        if was_playing {
            self.player.play(&mut self.viewport, bpm);
        }
        self.sync_visible_rows();
        Ok(())
    }

    pub fn undo(&mut self) -> Result<bool, SessionError> {
        Ok(self.editor.undo()?)
    }

    pub fn redo(&mut self) -> Result<bool, SessionError> {
        Ok(self.editor.redo()?)
    }

    pub fn copy(&mut self) -> Result<usize, SessionError> {
        Ok(self.editor.copy_selected_notes()?)
    }

    pub fn cut(&mut self) -> Result<usize, SessionError> {
        Ok(self.editor.cut_selected_notes()?)
    }

    /// Paste so the clipboard's first note lands on the hovered cell.
    pub fn paste(&mut self) -> Result<usize, SessionError> {
        let Some(cell) = self.hover else {
            return Ok(0);
        };
        Ok(self.editor.paste_selected_notes(cell)?)
    }

    pub fn delete_selected(&mut self) -> Result<usize, SessionError> {
        Ok(self.editor.delete_selected_notes()?)
    }

    pub fn clear_sheet(&mut self) -> Result<usize, SessionError> {
        Ok(self.editor.clear_sheet()?)
    }

    /// One frame of time: advance playback, strike crossed notes and fold
    /// sheet changes into the minimap. Returns the notes struck.
    pub fn tick(&mut self) -> usize {
        self.preview.drain(&self.preview_events);
        let Some(project) = self.project.as_ref() else {
            return 0;
        };
        let (sheet, bpm, length) = (project.sheet().clone(), project.bpm(), project.length_seconds());

        let struck = self.player.update(&sheet, &mut self.viewport, bpm);
        if self.player.is_playing() && self.viewport.trigger_line_seconds(bpm) >= length {
            log::info!("reached the end of the song");
            self.player.pause();
        }
        self.sync_visible_rows();
        struck
    }

    fn render_input<'a>(
        &'a self,
        sheet: Option<&'a Sheet>,
        hidden: &'a [Position],
    ) -> RenderInput<'a> {
        let selector = self.hover.filter(|_| self.mode != EditMode::View);
        RenderInput {
            sheet,
            viewport: &self.viewport,
            strategy: self.strategy,
            selector,
            selected: self.editor.selected_notes(),
            hidden,
            hold_start: self.editor.hold_start(),
        }
    }

    /// Draw a frame, unless the frame limiter says it is too soon.
    pub fn render(&self) -> Option<Frame> {
        let sheet = self.sheet();
        let hidden = self.editor.selection_origins();
        self.renderer
            .render(&self.render_input(sheet.as_deref(), &hidden))
    }

    pub fn render_forced(&self) -> Frame {
        let sheet = self.sheet();
        let hidden = self.editor.selection_origins();
        self.renderer
            .render_forced(&self.render_input(sheet.as_deref(), &hidden))
    }

    /// Position of the trigger line as `bar.beat.tick`.
    pub fn trigger_position(&self) -> Option<MusicalPosition> {
        self.time_context()
            .map(|ctx| ctx.format_position(self.viewport.trigger_line_row()))
    }

    /// One-line summary for a status bar.
    pub fn status(&self) -> String {
        let Some(project) = self.project.as_ref() else {
            return "no project".to_string();
        };
        let seconds = self.viewport.trigger_line_seconds(project.bpm());
        let position = self
            .trigger_position()
            .map(|p| p.to_string())
            .unwrap_or_default();
        format!(
            "{} | {} / {} | {} | zoom {:.1} | {:?}",
            position,
            format_seconds(seconds),
            format_seconds(project.length_seconds()),
            self.strategy,
            self.viewport.zoom(),
            self.mode
        )
    }
}
