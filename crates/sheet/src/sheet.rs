use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Note, Position};

/// Upper bound on lanes a sheet can have.
pub const MAX_COLUMNS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
    #[error("column count must be between 1 and {MAX_COLUMNS}, got {0}")]
    InvalidColumn(i32),

    #[error("lane groups {left} + {right} do not add up to {column} columns")]
    LaneGroups { column: i32, left: i32, right: i32 },
}

/// Which hand a lane belongs to, with the lane index re-based inside that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneGroup {
    Left(i32),
    Right(i32),
}

/// The note grid of one chart.
///
/// Notes are keyed by their base position, so at most one note starts in any
/// cell. Reads and writes may come from the UI thread, the render pass and the
/// playback sweep at once; every access takes the inner lock for a single
/// operation and never holds it across calls.
#[derive(Debug)]
pub struct Sheet {
    column: i32,
    left_size: i32,
    right_size: i32,
    notes: RwLock<HashMap<Position, Note>>,
}

impl Sheet {
    pub fn new(column: i32, left_size: i32, right_size: i32) -> Result<Self, SheetError> {
        if column <= 0 || column > MAX_COLUMNS {
            return Err(SheetError::InvalidColumn(column));
        }
        if left_size < 0 || right_size < 0 || left_size + right_size != column {
            return Err(SheetError::LaneGroups {
                column,
                left: left_size,
                right: right_size,
            });
        }
        Ok(Self {
            column,
            left_size,
            right_size,
            notes: RwLock::new(HashMap::new()),
        })
    }

    pub fn column(&self) -> i32 {
        self.column
    }

    pub fn left_size(&self) -> i32 {
        self.left_size
    }

    pub fn right_size(&self) -> i32 {
        self.right_size
    }

    pub fn contains_lane(&self, lane: i32) -> bool {
        (0..self.column).contains(&lane)
    }

    pub fn lane_group(&self, lane: i32) -> LaneGroup {
        if lane < self.left_size {
            LaneGroup::Left(lane)
        } else {
            LaneGroup::Right(lane - self.left_size)
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Position, Note>> {
        self.notes.read().unwrap_or_else(|poisoned| {
            log::warn!("sheet lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Position, Note>> {
        self.notes.write().unwrap_or_else(|poisoned| {
            log::warn!("sheet lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// The note stored at `(row, lane)`.
    pub fn get_note(&self, row: i32, lane: i32) -> Option<Note> {
        self.read().get(&Position::new(row, lane)).copied()
    }

    /// Store `note` at `(row, lane)` if the cell is free. Returns `false` and
    /// leaves the sheet untouched when the cell is taken.
    pub fn put_note(&self, row: i32, lane: i32, note: Note) -> bool {
        use std::collections::hash_map::Entry;

        debug_assert_eq!(note.base_position(), Position::new(row, lane), "note keyed off its base");

        match self.write().entry(Position::new(row, lane)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(note);
                true
            }
        }
    }

    /// Store `note` under its own base position.
    pub fn insert(&self, note: Note) -> bool {
        let base = note.base_position();
        self.put_note(base.row, base.lane, note)
    }

    pub fn delete_note(&self, row: i32, lane: i32) -> bool {
        self.take_note(row, lane).is_some()
    }

    pub fn take_note(&self, row: i32, lane: i32) -> Option<Note> {
        self.write().remove(&Position::new(row, lane))
    }

    /// A snapshot of every note, in no particular order.
    pub fn values(&self) -> Vec<Note> {
        self.read().values().copied().collect()
    }

    /// Every note sorted by base position. Handy wherever order has to be stable.
    pub fn sorted_values(&self) -> Vec<Note> {
        let mut notes = self.values();
        notes.sort_by_key(|note| note.base_position());
        notes
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Notes covering any row in `from..=to`, holds that started earlier included.
    pub fn notes_intersecting(&self, from: i32, to: i32) -> Vec<Note> {
        self.read()
            .values()
            .filter(|note| note.intersects_rows(from, to))
            .copied()
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn sheet() -> Sheet {
        Sheet::new(4, 2, 2).unwrap()
    }

    fn hold(start_row: i32, end_row: i32, lane: i32) -> Note {
        Note::hold(Position::new(start_row, lane), Position::new(end_row, lane)).unwrap()
    }

    #[test]
    fn test_new_validates_columns() {
        assert_eq!(Sheet::new(0, 0, 0).unwrap_err(), SheetError::InvalidColumn(0));
        assert_eq!(
            Sheet::new(11, 6, 5).unwrap_err(),
            SheetError::InvalidColumn(11)
        );
        assert!(matches!(
            Sheet::new(4, 1, 2).unwrap_err(),
            SheetError::LaneGroups { .. }
        ));
        assert!(matches!(
            Sheet::new(4, -1, 5).unwrap_err(),
            SheetError::LaneGroups { .. }
        ));
        assert!(Sheet::new(10, 5, 5).is_ok());
        assert!(Sheet::new(3, 0, 3).is_ok());
    }

    #[test]
    fn test_put_then_get() {
        let sheet = sheet();
        assert!(sheet.put_note(0, 0, Note::hit(0, 0)));
        assert_eq!(sheet.get_note(0, 0), Some(Note::hit(0, 0)));
        assert_eq!(sheet.get_note(0, 1), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "note keyed off its base")]
    fn test_put_note_under_foreign_key() {
        sheet().put_note(4, 1, Note::hit(0, 0));
    }

    #[test]
    fn test_put_rejects_occupied_cell() {
        let sheet = sheet();
        assert!(sheet.insert(Note::hit(0, 0)));
        assert!(!sheet.insert(hold(0, 96, 0)));

        assert_eq!(sheet.get_note(0, 0), Some(Note::hit(0, 0)));
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_delete() {
        let sheet = sheet();
        sheet.insert(Note::hit(24, 1));

        assert!(sheet.delete_note(24, 1));
        assert!(!sheet.delete_note(24, 1));
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_values_are_snapshots() {
        let sheet = sheet();
        sheet.insert(Note::hit(0, 0));

        let mut snapshot = sheet.values();
        snapshot[0].translate(Position::new(96, 1));

        assert_eq!(sheet.get_note(0, 0), Some(Note::hit(0, 0)));
    }

    #[test]
    fn test_clear() {
        let sheet = sheet();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(hold(0, 48, 1));
        sheet.clear();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_notes_intersecting_includes_long_holds() {
        let sheet = sheet();
        sheet.insert(Note::hit(0, 0));
        sheet.insert(Note::hit(500, 1));
        sheet.insert(hold(10, 1000, 2));

        let mut visible = sheet.notes_intersecting(400, 600);
        visible.sort_by_key(|n| n.base_position());
        assert_eq!(visible, vec![hold(10, 1000, 2), Note::hit(500, 1)]);
    }

    #[test]
    fn test_lane_group() {
        let sheet = Sheet::new(5, 2, 3).unwrap();
        assert_eq!(sheet.lane_group(1), LaneGroup::Left(1));
        assert_eq!(sheet.lane_group(2), LaneGroup::Right(0));
        assert_eq!(sheet.lane_group(4), LaneGroup::Right(2));
        assert!(!sheet.contains_lane(5));
        assert!(!sheet.contains_lane(-1));
    }

    #[test]
    fn test_concurrent_puts_keep_one_note_per_cell() {
        let sheet = Arc::new(sheet());

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let sheet = Arc::clone(&sheet);
                thread::spawn(move || {
                    let mut placed = 0;
                    for row in 0..100 {
                        // every worker races for the same cells
                        if sheet.insert(Note::hit(row, i % 2)) {
                            placed += 1;
                        }
                    }
                    placed
                })
            })
            .collect();

        let placed: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(placed, 200);
        assert_eq!(sheet.len(), 200);
    }
}
