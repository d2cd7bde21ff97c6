use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use kbm_render::RowRange;
use kbm_sheet::{GeometryError, Note, Position, Sheet, note_covering};

use crate::command::{EditCommand, EditTarget};
use crate::events::{SheetChange, SheetEvents};
use crate::undo::{CommandLog, DEFAULT_MAX_HISTORY};

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("no sheet is open")]
    NoSheet,

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Outcome of one click of the two-click hold protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPlacement {
    /// First click recorded as the hold's start.
    Started,
    /// Second click completed and inserted the hold.
    Placed,
    /// A note already starts at the hold's start cell; nothing inserted.
    Occupied,
    /// The clicked cell is outside the sheet.
    OutOfBounds,
}

/// Selected notes at their current (possibly dragged) positions, alongside
/// the notes they were taken from.
#[derive(Debug, Clone, Default)]
struct Selection {
    notes: Vec<Note>,
    origins: Vec<Note>,
}

impl Selection {
    fn from_notes(notes: Vec<Note>) -> Self {
        Self {
            origins: notes.clone(),
            notes,
        }
    }

    fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    fn is_moved(&self) -> bool {
        self.notes != self.origins
    }

    fn take(&mut self) -> Vec<Note> {
        self.origins.clear();
        std::mem::take(&mut self.notes)
    }

    fn remove_origin(&mut self, base: Position) {
        if let Some(i) = self.origins.iter().position(|n| n.base_position() == base) {
            self.origins.remove(i);
            self.notes.remove(i);
        }
    }
}

#[derive(Debug, Clone)]
struct Clipboard {
    notes: Vec<Note>,
    from_cut: bool,
}

/// All editing of the open sheet goes through here, so every change lands in
/// the undo log and on the event bus.
#[derive(Debug)]
pub struct SheetEditor {
    sheet: Option<Arc<Sheet>>,
    log: CommandLog<EditCommand>,
    selection: Selection,
    clipboard: Option<Clipboard>,
    hold_start: Option<Position>,
    visible_rows: RowRange,
    events: SheetEvents,
}

impl SheetEditor {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_MAX_HISTORY)
    }

    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            sheet: None,
            log: CommandLog::new(limit),
            selection: Selection::default(),
            clipboard: None,
            hold_start: None,
            visible_rows: RowRange::ALL,
            events: SheetEvents::new(),
        }
    }

    /// Start editing `sheet`. History, selection and any pending hold belong
    /// to the previous sheet and are dropped.
    pub fn attach(&mut self, sheet: Arc<Sheet>) {
        self.reset();
        self.sheet = Some(sheet);
    }

    pub fn detach(&mut self) {
        self.reset();
        self.sheet = None;
    }

    fn reset(&mut self) {
        self.log.clear();
        self.selection = Selection::default();
        self.clipboard = None;
        self.hold_start = None;
    }

    pub fn has_sheet(&self) -> bool {
        self.sheet.is_some()
    }

    pub fn sheet(&self) -> Option<&Arc<Sheet>> {
        self.sheet.as_ref()
    }

    pub fn subscribe(&self) -> Receiver<SheetChange> {
        self.events.subscribe()
    }

    pub fn set_visible_rows(&mut self, rows: RowRange) {
        self.visible_rows = rows;
    }

    pub fn visible_rows(&self) -> RowRange {
        self.visible_rows
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    fn require_sheet(&self) -> Result<Arc<Sheet>, EditError> {
        self.sheet.clone().ok_or(EditError::NoSheet)
    }

    fn in_bounds(sheet: &Sheet, note: &Note) -> bool {
        note.start_row() >= 0 && sheet.contains_lane(note.lane())
    }

    fn visible_notes(&self, sheet: &Sheet) -> Vec<Note> {
        sheet.notes_intersecting(self.visible_rows.from, self.visible_rows.to)
    }

    /// Place a hit note. `Ok(false)` when the cell is outside the sheet or
    /// already holds a note.
    pub fn put_hit(&mut self, selector: Position) -> Result<bool, EditError> {
        let sheet = self.require_sheet()?;
        let note = Note::hit(selector.row, selector.lane);
        if !Self::in_bounds(&sheet, &note) {
            return Ok(false);
        }

        let placed = EditTarget::new(&sheet, &self.events).put_all([&note]);
        if placed.is_empty() {
            return Ok(false);
        }
        log::debug!("put hit at {selector}");
        self.log.push(EditCommand::Put { notes: placed });
        Ok(true)
    }

    /// One click of hold placement: the first click marks the start, the
    /// second inserts the hold. A rejected second click keeps the start.
    pub fn put_hold(&mut self, selector: Position) -> Result<HoldPlacement, EditError> {
        let sheet = self.require_sheet()?;
        if selector.row < 0 || !sheet.contains_lane(selector.lane) {
            return Ok(HoldPlacement::OutOfBounds);
        }

        let Some(start) = self.hold_start.take() else {
            self.hold_start = Some(selector);
            return Ok(HoldPlacement::Started);
        };

        let note = match Note::hold(start, selector) {
            Ok(note) => note,
            Err(e) => {
                self.hold_start = Some(start);
                return Err(e.into());
            }
        };

        let placed = EditTarget::new(&sheet, &self.events).put_all([&note]);
        if placed.is_empty() {
            return Ok(HoldPlacement::Occupied);
        }
        log::debug!("put hold {note}");
        self.log.push(EditCommand::Put { notes: placed });
        Ok(HoldPlacement::Placed)
    }

    pub fn hold_start(&self) -> Option<Position> {
        self.hold_start
    }

    pub fn cancel_hold(&mut self) {
        self.hold_start = None;
    }

    /// The visible note covering `selector`, preferring hits over holds.
    pub fn note_at(&self, selector: Position) -> Option<Note> {
        let sheet = self.sheet.as_ref()?;
        note_covering(self.visible_notes(sheet), selector)
    }

    /// Delete the visible note under `selector`.
    pub fn remove_note(&mut self, selector: Position) -> Result<Option<Note>, EditError> {
        let sheet = self.require_sheet()?;
        let Some(note) = self.note_at(selector) else {
            return Ok(None);
        };

        let removed = EditTarget::new(&sheet, &self.events).delete_all([&note]);
        if removed.is_empty() {
            return Ok(None);
        }
        self.selection.remove_origin(note.base_position());
        log::debug!("removed {note}");
        self.log.push(EditCommand::Delete { notes: removed });
        Ok(Some(note))
    }

    /// Select every visible note with an endpoint inside the box spanned by
    /// `from` and `to`, replacing the current selection.
    pub fn select_by_dragging(&mut self, from: Position, to: Position) -> Result<usize, EditError> {
        let sheet = self.require_sheet()?;
        self.flush_selection_moving()?;

        let mut notes: Vec<Note> = self
            .visible_notes(&sheet)
            .into_iter()
            .filter(|note| note.endpoints().any(|p| p.within(from, to)))
            .collect();
        notes.sort_by_key(|note| note.base_position());

        let count = notes.len();
        self.selection = Selection::from_notes(notes);
        Ok(count)
    }

    pub fn select_single(&mut self, note: Note) -> Result<(), EditError> {
        self.flush_selection_moving()?;
        self.selection = Selection::from_notes(vec![note]);
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<(), EditError> {
        self.flush_selection_moving()?;
        self.selection = Selection::default();
        Ok(())
    }

    pub fn selected_notes(&self) -> &[Note] {
        &self.selection.notes
    }

    /// Sheet positions of the notes the selection was taken from.
    pub fn selection_origins(&self) -> Vec<Position> {
        self.selection
            .origins
            .iter()
            .map(Note::base_position)
            .collect()
    }

    pub fn selection_contains(&self, selector: Position) -> bool {
        self.selection.notes.iter().any(|note| note.occupies(selector))
    }

    pub fn has_pending_move(&self) -> bool {
        self.selection.is_moved()
    }

    /// Drag the selection by `delta` without touching the sheet.
    pub fn move_selection_shadow(&mut self, delta: Position) {
        for note in &mut self.selection.notes {
            note.translate(delta);
        }
    }

    /// Commit a dragged selection to the sheet as one move. Notes whose
    /// target is outside the sheet or taken by another note go back to where
    /// they were. Returns whether anything moved.
    pub fn flush_selection_moving(&mut self) -> Result<bool, EditError> {
        if !self.selection.is_moved() {
            return Ok(false);
        }
        let sheet = self.require_sheet()?;

        let pairs: Vec<(Note, Note)> = self
            .selection
            .origins
            .iter()
            .copied()
            .zip(self.selection.notes.iter().copied())
            .filter(|(before, after)| before != after)
            .collect();

        for (before, _) in &pairs {
            let base = before.base_position();
            sheet.delete_note(base.row, base.lane);
        }

        // Accept targets that fit, then bounce any accepted target that sits on
        // the origin of a rejected note until nothing changes.
        let mut accepted: Vec<bool> = Vec::with_capacity(pairs.len());
        let mut claimed = HashSet::new();
        for (_, after) in &pairs {
            let base = after.base_position();
            let fits = Self::in_bounds(&sheet, after)
                && sheet.get_note(base.row, base.lane).is_none()
                && claimed.insert(base);
            accepted.push(fits);
        }
        loop {
            let restored: HashSet<Position> = pairs
                .iter()
                .zip(&accepted)
                .filter(|(_, ok)| !**ok)
                .map(|((before, _), _)| before.base_position())
                .collect();
            let bounced = pairs
                .iter()
                .zip(accepted.iter_mut())
                .find(|((_, after), ok)| **ok && restored.contains(&after.base_position()));
            match bounced {
                Some((_, ok)) => *ok = false,
                None => break,
            }
        }

        let mut moves = Vec::new();
        let mut placed = Vec::with_capacity(pairs.len());
        for ((before, after), ok) in pairs.iter().zip(&accepted) {
            if *ok {
                sheet.insert(*after);
                moves.push((*before, *after));
                placed.push(*after);
            } else {
                sheet.insert(*before);
                placed.push(*before);
            }
        }

        let untouched = self
            .selection
            .origins
            .iter()
            .zip(&self.selection.notes)
            .filter(|(before, after)| before == after)
            .map(|(before, _)| *before);
        let mut notes: Vec<Note> = untouched.chain(placed).collect();
        notes.sort_by_key(|note| note.base_position());
        self.selection = Selection::from_notes(notes);

        if moves.is_empty() {
            log::debug!("selection move rejected, {} notes restored", pairs.len());
            return Ok(false);
        }
        self.events.emit(SheetChange::Delete(
            moves.iter().map(|(before, _)| before.base_position()).collect(),
        ));
        self.events.emit(SheetChange::Put(
            moves.iter().map(|(_, after)| after.base_position()).collect(),
        ));
        log::debug!(
            "moved {} notes, {} restored",
            moves.len(),
            pairs.len() - moves.len()
        );
        self.log.push(EditCommand::Move { moves });
        Ok(true)
    }

    pub fn delete_selected_notes(&mut self) -> Result<usize, EditError> {
        let sheet = self.require_sheet()?;
        self.flush_selection_moving()?;

        let selected = self.selection.take();
        let removed = EditTarget::new(&sheet, &self.events).delete_all(&selected);
        if removed.is_empty() {
            return Ok(0);
        }
        log::debug!("deleted {} selected notes", removed.len());
        let count = removed.len();
        self.log.push(EditCommand::Delete { notes: removed });
        Ok(count)
    }

    pub fn copy_selected_notes(&mut self) -> Result<usize, EditError> {
        self.flush_selection_moving()?;
        if self.selection.is_empty() {
            return Ok(0);
        }
        self.clipboard = Some(Clipboard {
            notes: self.selection.notes.clone(),
            from_cut: false,
        });
        Ok(self.selection.notes.len())
    }

    pub fn cut_selected_notes(&mut self) -> Result<usize, EditError> {
        let sheet = self.require_sheet()?;
        self.flush_selection_moving()?;
        if self.selection.is_empty() {
            return Ok(0);
        }

        let selected = self.selection.take();
        let removed = EditTarget::new(&sheet, &self.events).delete_all(&selected);
        self.clipboard = Some(Clipboard {
            notes: selected,
            from_cut: true,
        });
        if removed.is_empty() {
            return Ok(0);
        }
        let count = removed.len();
        self.log.push(EditCommand::Delete { notes: removed });
        Ok(count)
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.as_ref().is_some_and(|c| !c.notes.is_empty())
    }

    /// Paste the clipboard so its first note lands on `target`. The pasted
    /// notes become the selection. A cut clipboard can be pasted only once.
    pub fn paste_selected_notes(&mut self, target: Position) -> Result<usize, EditError> {
        let sheet = self.require_sheet()?;
        let Some(first) = self
            .clipboard
            .as_ref()
            .and_then(|c| c.notes.first())
            .copied()
        else {
            return Ok(0);
        };
        self.flush_selection_moving()?;

        let delta = target - first.base_position();
        let translated: Vec<Note> = self
            .clipboard
            .iter()
            .flat_map(|c| c.notes.iter())
            .map(|note| note.moved(delta))
            .filter(|note| Self::in_bounds(&sheet, note))
            .collect();

        let placed = EditTarget::new(&sheet, &self.events).put_all(&translated);
        if self.clipboard.as_ref().is_some_and(|c| c.from_cut) {
            self.clipboard = None;
        }
        self.selection = Selection::from_notes(placed.clone());
        if placed.is_empty() {
            return Ok(0);
        }
        log::debug!("pasted {} notes at {target}", placed.len());
        let count = placed.len();
        self.log.push(EditCommand::Put { notes: placed });
        Ok(count)
    }

    /// Remove every note as one undoable step.
    pub fn clear_sheet(&mut self) -> Result<usize, EditError> {
        let sheet = self.require_sheet()?;
        self.selection = Selection::default();
        self.hold_start = None;
        if sheet.is_empty() {
            return Ok(0);
        }
        let snapshot = EditTarget::new(&sheet, &self.events).clear();
        log::debug!("cleared {} notes", snapshot.len());
        let count = snapshot.len();
        self.log.push(EditCommand::Clear { snapshot });
        Ok(count)
    }

    pub fn undo(&mut self) -> Result<bool, EditError> {
        let sheet = self.require_sheet()?;
        self.flush_selection_moving()?;
        self.selection = Selection::default();
        Ok(self.log.undo(&EditTarget::new(&sheet, &self.events)))
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        let sheet = self.require_sheet()?;
        self.flush_selection_moving()?;
        self.selection = Selection::default();
        Ok(self.log.redo(&EditTarget::new(&sheet, &self.events)))
    }
}

impl Default for SheetEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> (SheetEditor, Arc<Sheet>) {
        let sheet = Arc::new(Sheet::new(4, 2, 2).expect("sheet"));
        let mut editor = SheetEditor::new();
        editor.attach(sheet.clone());
        (editor, sheet)
    }

    fn hold(start: (i32, i32), end: (i32, i32)) -> Note {
        Note::hold(start.into(), end.into()).expect("hold")
    }

    #[test]
    fn test_no_sheet() {
        let mut editor = SheetEditor::new();
        assert!(matches!(
            editor.put_hit(Position::new(0, 0)),
            Err(EditError::NoSheet)
        ));
        assert!(matches!(editor.undo(), Err(EditError::NoSheet)));
        assert!(!editor.has_sheet());
    }

    #[test]
    fn test_put_hit_and_undo() {
        let (mut editor, sheet) = editor();

        assert!(editor.put_hit(Position::new(24, 1)).expect("put"));
        assert_eq!(sheet.get_note(24, 1), Some(Note::hit(24, 1)));

        assert!(editor.undo().expect("undo"));
        assert!(sheet.is_empty());
        assert!(editor.redo().expect("redo"));
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_put_hit_rejections_push_nothing() {
        let (mut editor, sheet) = editor();
        editor.put_hit(Position::new(0, 0)).expect("put");

        assert!(!editor.put_hit(Position::new(0, 0)).expect("occupied"));
        assert!(!editor.put_hit(Position::new(-3, 0)).expect("negative row"));
        assert!(!editor.put_hit(Position::new(0, 4)).expect("bad lane"));

        assert_eq!(sheet.len(), 1);
        editor.undo().expect("undo");
        assert!(!editor.can_undo());
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_hold_two_clicks() {
        let (mut editor, sheet) = editor();

        assert_eq!(
            editor.put_hold(Position::new(0, 2)).expect("first"),
            HoldPlacement::Started
        );
        assert_eq!(editor.hold_start(), Some(Position::new(0, 2)));
        assert_eq!(
            editor.put_hold(Position::new(96, 2)).expect("second"),
            HoldPlacement::Placed
        );
        assert_eq!(editor.hold_start(), None);
        assert_eq!(sheet.get_note(0, 2), Some(hold((0, 2), (96, 2))));
    }

    #[test]
    fn test_hold_geometry_error_keeps_start() {
        let (mut editor, sheet) = editor();
        editor.put_hold(Position::new(48, 1)).expect("first");

        let err = editor.put_hold(Position::new(96, 2)).unwrap_err();
        assert!(matches!(
            err,
            EditError::Geometry(GeometryError::LaneMismatch { .. })
        ));
        assert!(matches!(
            editor.put_hold(Position::new(24, 1)),
            Err(EditError::Geometry(GeometryError::NonPositiveLength { .. }))
        ));
        assert_eq!(editor.hold_start(), Some(Position::new(48, 1)));
        assert!(sheet.is_empty());

        editor.cancel_hold();
        assert_eq!(editor.hold_start(), None);
    }

    #[test]
    fn test_hold_on_occupied_start() {
        let (mut editor, _sheet) = editor();
        editor.put_hit(Position::new(0, 0)).expect("hit");
        editor.put_hold(Position::new(0, 0)).expect("first");

        assert_eq!(
            editor.put_hold(Position::new(48, 0)).expect("second"),
            HoldPlacement::Occupied
        );
        assert_eq!(
            editor.put_hold(Position::new(0, 7)).expect("outside"),
            HoldPlacement::OutOfBounds
        );
    }

    #[test]
    fn test_remove_prefers_hit_over_hold() {
        let (mut editor, sheet) = editor();
        sheet.insert(hold((0, 1), (96, 1)));
        sheet.insert(Note::hit(48, 1));

        let removed = editor.remove_note(Position::new(48, 1)).expect("remove");
        assert_eq!(removed, Some(Note::hit(48, 1)));

        let removed = editor.remove_note(Position::new(48, 1)).expect("remove");
        assert_eq!(removed, Some(hold((0, 1), (96, 1))));
        assert!(sheet.is_empty());

        assert_eq!(editor.remove_note(Position::new(48, 1)).expect("empty"), None);
    }

    #[test]
    fn test_remove_respects_visible_rows() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(500, 0));
        editor.set_visible_rows(RowRange::new(0, 96));

        assert_eq!(editor.remove_note(Position::new(500, 0)).expect("remove"), None);
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_select_by_dragging_uses_endpoints() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(10, 0));
        sheet.insert(hold((0, 1), (200, 1)));
        sheet.insert(Note::hit(300, 2));

        // box covers rows 150..=250, lanes 0..=3: only the hold's end
        let count = editor
            .select_by_dragging(Position::new(250, 3), Position::new(150, 0))
            .expect("select");
        assert_eq!(count, 1);
        assert_eq!(editor.selected_notes(), &[hold((0, 1), (200, 1))]);
    }

    #[test]
    fn test_drag_move_and_undo() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(24, 1));
        editor
            .select_by_dragging(Position::new(0, 0), Position::new(24, 1))
            .expect("select");

        editor.move_selection_shadow(Position::new(48, 1));
        // shadow only
        assert_eq!(sheet.get_note(0, 0), Some(Note::hit(0, 0)));
        assert!(editor.selection_contains(Position::new(48, 1)));

        assert!(editor.flush_selection_moving().expect("flush"));
        assert_eq!(sheet.sorted_values(), vec![Note::hit(48, 1), Note::hit(72, 2)]);

        editor.undo().expect("undo");
        assert_eq!(sheet.sorted_values(), vec![Note::hit(0, 0), Note::hit(24, 1)]);
        editor.redo().expect("redo");
        assert_eq!(sheet.sorted_values(), vec![Note::hit(48, 1), Note::hit(72, 2)]);
    }

    #[test]
    fn test_move_onto_own_origin() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(24, 0));
        editor
            .select_by_dragging(Position::new(0, 0), Position::new(24, 0))
            .expect("select");

        editor.move_selection_shadow(Position::new(24, 0));
        assert!(editor.flush_selection_moving().expect("flush"));
        assert_eq!(sheet.sorted_values(), vec![Note::hit(24, 0), Note::hit(48, 0)]);

        editor.undo().expect("undo");
        assert_eq!(sheet.sorted_values(), vec![Note::hit(0, 0), Note::hit(24, 0)]);
    }

    #[test]
    fn test_blocked_move_restores_notes() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(0, 3));
        sheet.insert(Note::hit(48, 1));
        editor.select_single(Note::hit(0, 0)).expect("select");

        // onto an unselected note
        editor.move_selection_shadow(Position::new(48, 1));
        assert!(!editor.flush_selection_moving().expect("flush"));
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.get_note(0, 0), Some(Note::hit(0, 0)));

        // off the left edge
        editor.move_selection_shadow(Position::new(0, -1));
        assert!(!editor.flush_selection_moving().expect("flush"));
        assert_eq!(sheet.get_note(0, 0), Some(Note::hit(0, 0)));
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_partially_blocked_move() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(0, 3));
        editor
            .select_by_dragging(Position::new(0, 0), Position::new(0, 3))
            .expect("select");

        // lane 3 would leave the sheet, lane 0 lands on lane 1
        editor.move_selection_shadow(Position::new(0, 1));
        assert!(editor.flush_selection_moving().expect("flush"));
        assert_eq!(sheet.sorted_values(), vec![Note::hit(0, 1), Note::hit(0, 3)]);
        assert_eq!(editor.selected_notes().len(), 2);
    }

    #[test]
    fn test_delete_selected() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(0, 1));
        sheet.insert(Note::hit(500, 1));
        editor
            .select_by_dragging(Position::new(0, 0), Position::new(100, 3))
            .expect("select");

        assert_eq!(editor.delete_selected_notes().expect("delete"), 2);
        assert_eq!(sheet.len(), 1);
        assert!(editor.selected_notes().is_empty());

        editor.undo().expect("undo");
        assert_eq!(sheet.len(), 3);
    }

    #[test]
    fn test_copy_paste() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(hold((24, 1), (96, 1)));
        editor
            .select_by_dragging(Position::new(0, 0), Position::new(96, 3))
            .expect("select");

        assert_eq!(editor.copy_selected_notes().expect("copy"), 2);
        assert_eq!(editor.paste_selected_notes(Position::new(192, 2)).expect("paste"), 2);

        assert_eq!(sheet.get_note(192, 2), Some(Note::hit(192, 2)));
        assert_eq!(sheet.get_note(216, 3), Some(hold((216, 3), (288, 3))));
        assert_eq!(editor.selected_notes().len(), 2);

        // copy can be pasted again
        assert!(editor.has_clipboard());
        editor.undo().expect("undo");
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_paste_drops_out_of_bounds_notes() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(0, 2));
        editor
            .select_by_dragging(Position::new(0, 0), Position::new(0, 3))
            .expect("select");
        editor.copy_selected_notes().expect("copy");

        assert_eq!(editor.paste_selected_notes(Position::new(96, 2)).expect("paste"), 1);
        assert_eq!(sheet.get_note(96, 2), Some(Note::hit(96, 2)));
    }

    #[test]
    fn test_cut_paste_consumes_clipboard() {
        let (mut editor, sheet) = editor();
        sheet.insert(Note::hit(0, 0));
        editor.select_single(Note::hit(0, 0)).expect("select");

        assert_eq!(editor.cut_selected_notes().expect("cut"), 1);
        assert!(sheet.is_empty());
        assert!(editor.has_clipboard());

        assert_eq!(editor.paste_selected_notes(Position::new(48, 3)).expect("paste"), 1);
        assert!(!editor.has_clipboard());
        assert_eq!(editor.paste_selected_notes(Position::new(96, 3)).expect("paste"), 0);
        assert_eq!(sheet.sorted_values(), vec![Note::hit(48, 3)]);
    }

    #[test]
    fn test_paste_without_clipboard() {
        let (mut editor, sheet) = editor();
        assert_eq!(editor.paste_selected_notes(Position::new(0, 0)).expect("paste"), 0);
        assert!(sheet.is_empty());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_clear_sheet_is_undoable() {
        let (mut editor, sheet) = editor();
        editor.put_hit(Position::new(0, 0)).expect("put");
        editor.put_hit(Position::new(24, 1)).expect("put");

        assert_eq!(editor.clear_sheet().expect("clear"), 2);
        assert!(sheet.is_empty());

        editor.undo().expect("undo");
        assert_eq!(sheet.len(), 2);
        editor.undo().expect("undo");
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_undo_flushes_pending_move() {
        let (mut editor, sheet) = editor();
        editor.put_hit(Position::new(0, 0)).expect("put");
        editor.select_single(Note::hit(0, 0)).expect("select");
        editor.move_selection_shadow(Position::new(24, 0));

        // the move is committed, then undone
        editor.undo().expect("undo");
        assert_eq!(sheet.sorted_values(), vec![Note::hit(0, 0)]);
        editor.undo().expect("undo");
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_events_follow_edits() {
        let (mut editor, _sheet) = editor();
        let rx = editor.subscribe();

        editor.put_hit(Position::new(0, 0)).expect("put");
        editor.remove_note(Position::new(0, 0)).expect("remove");
        editor.undo().expect("undo");
        editor.put_hit(Position::new(96, 1)).expect("put");
        editor.clear_sheet().expect("clear");

        let changes: Vec<SheetChange> = rx.try_iter().collect();
        assert_eq!(
            changes,
            vec![
                SheetChange::Put(vec![Position::new(0, 0)]),
                SheetChange::Delete(vec![Position::new(0, 0)]),
                SheetChange::Put(vec![Position::new(0, 0)]),
                SheetChange::Put(vec![Position::new(96, 1)]),
                SheetChange::Clear,
            ]
        );
    }

    #[test]
    fn test_attach_resets_history() {
        let (mut editor, _sheet) = editor();
        editor.put_hit(Position::new(0, 0)).expect("put");
        editor.put_hold(Position::new(0, 1)).expect("start");

        editor.attach(Arc::new(Sheet::new(2, 1, 1).expect("sheet")));

        assert!(!editor.can_undo());
        assert_eq!(editor.hold_start(), None);
    }

    #[test]
    fn test_history_limit() {
        let sheet = Arc::new(Sheet::new(4, 2, 2).expect("sheet"));
        let mut editor = SheetEditor::with_history_limit(2);
        editor.attach(sheet.clone());
        for row in 0..4 {
            editor.put_hit(Position::new(row * 24, 0)).expect("put");
        }

        while editor.undo().expect("undo") {}
        assert_eq!(sheet.len(), 2);
    }
}
