use kbm_sheet::{Note, Sheet};

use crate::events::{SheetChange, SheetEvents};
use crate::undo::Reversible;

/// What an edit command acts on when it is undone or redone.
#[derive(Debug, Clone, Copy)]
pub struct EditTarget<'a> {
    pub sheet: &'a Sheet,
    pub events: &'a SheetEvents,
}

impl<'a> EditTarget<'a> {
    pub fn new(sheet: &'a Sheet, events: &'a SheetEvents) -> Self {
        Self { sheet, events }
    }

    /// Insert notes and announce the ones that landed.
    pub fn put_all<'n>(&self, notes: impl IntoIterator<Item = &'n Note>) -> Vec<Note> {
        let placed: Vec<Note> = notes
            .into_iter()
            .filter(|note| self.sheet.insert(**note))
            .copied()
            .collect();
        if !placed.is_empty() {
            self.events.emit(SheetChange::Put(
                placed.iter().map(Note::base_position).collect(),
            ));
        }
        placed
    }

    /// Remove notes by base position and announce the ones that were there.
    pub fn delete_all<'n>(&self, notes: impl IntoIterator<Item = &'n Note>) -> Vec<Note> {
        let removed: Vec<Note> = notes
            .into_iter()
            .filter_map(|note| {
                let base = note.base_position();
                self.sheet.take_note(base.row, base.lane)
            })
            .collect();
        if !removed.is_empty() {
            self.events.emit(SheetChange::Delete(
                removed.iter().map(Note::base_position).collect(),
            ));
        }
        removed
    }

    pub fn clear(&self) -> Vec<Note> {
        let snapshot = self.sheet.values();
        self.sheet.clear();
        self.events.emit(SheetChange::Clear);
        snapshot
    }
}

/// One undoable sheet edit, as plain note values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    Put { notes: Vec<Note> },
    Delete { notes: Vec<Note> },
    /// Pairs of `(before, after)`.
    Move { moves: Vec<(Note, Note)> },
    Clear { snapshot: Vec<Note> },
}

impl Reversible<EditTarget<'_>> for EditCommand {
    fn undo(&self, target: &EditTarget<'_>) {
        match self {
            EditCommand::Put { notes } => {
                target.delete_all(notes);
            }
            EditCommand::Delete { notes } => {
                target.put_all(notes);
            }
            EditCommand::Move { moves } => {
                target.delete_all(moves.iter().map(|(_, after)| after));
                target.put_all(moves.iter().map(|(before, _)| before));
            }
            EditCommand::Clear { snapshot } => {
                target.put_all(snapshot);
            }
        }
    }

    fn redo(&self, target: &EditTarget<'_>) {
        match self {
            EditCommand::Put { notes } => {
                target.put_all(notes);
            }
            EditCommand::Delete { notes } => {
                target.delete_all(notes);
            }
            EditCommand::Move { moves } => {
                target.delete_all(moves.iter().map(|(before, _)| before));
                target.put_all(moves.iter().map(|(_, after)| after));
            }
            EditCommand::Clear { .. } => {
                target.clear();
            }
        }
    }
}
