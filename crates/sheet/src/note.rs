use std::fmt;

use crate::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("hold must stay in one lane (start lane {start}, end lane {end})")]
    LaneMismatch { start: i32, end: i32 },

    #[error("hold must end after it starts (start row {start}, end row {end})")]
    NonPositiveLength { start: i32, end: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteKind {
    Hit,
    Hold,
}

impl NoteKind {
    /// Which note wins when several occupy the cell under the cursor.
    /// Lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            NoteKind::Hit => 1,
            NoteKind::Hold => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NoteKind::Hit => "Hit",
            NoteKind::Hold => "Hold",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sustained note. Start and end share a lane and the end is strictly later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hold {
    start: Position,
    end: Position,
}

impl Hold {
    pub fn new(start: Position, end: Position) -> Result<Self, GeometryError> {
        if start.lane != end.lane {
            return Err(GeometryError::LaneMismatch {
                start: start.lane,
                end: end.lane,
            });
        }
        if end.row <= start.row {
            return Err(GeometryError::NonPositiveLength {
                start: start.row,
                end: end.row,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn lane(&self) -> i32 {
        self.start.lane
    }

    /// Length in rows, always positive.
    pub fn length(&self) -> i32 {
        self.end.row - self.start.row
    }

    fn translate(&mut self, delta: Position) {
        self.start += delta;
        self.end += delta;
    }
}

/// A playable note. Notes are plain values: cloning one never aliases another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    Hit { position: Position },
    Hold(Hold),
}

impl Note {
    pub fn hit(row: i32, lane: i32) -> Self {
        Note::Hit {
            position: Position::new(row, lane),
        }
    }

    pub fn hold(start: Position, end: Position) -> Result<Self, GeometryError> {
        Hold::new(start, end).map(Note::Hold)
    }

    pub fn kind(&self) -> NoteKind {
        match self {
            Note::Hit { .. } => NoteKind::Hit,
            Note::Hold(_) => NoteKind::Hold,
        }
    }

    /// The cell the note is stored under: a hit's position or a hold's start.
    pub fn base_position(&self) -> Position {
        match self {
            Note::Hit { position } => *position,
            Note::Hold(hold) => hold.start,
        }
    }

    /// Re-anchor the note at `position`. Holds keep their length.
    pub fn set_base_position(&mut self, position: Position) {
        let delta = position - self.base_position();
        self.translate(delta);
    }

    pub fn translate(&mut self, delta: Position) {
        match self {
            Note::Hit { position } => *position += delta,
            Note::Hold(hold) => hold.translate(delta),
        }
    }

    pub fn moved(mut self, delta: Position) -> Self {
        self.translate(delta);
        self
    }

    pub fn lane(&self) -> i32 {
        self.base_position().lane
    }

    pub fn start_row(&self) -> i32 {
        self.base_position().row
    }

    pub fn end_row(&self) -> i32 {
        match self {
            Note::Hit { position } => position.row,
            Note::Hold(hold) => hold.end.row,
        }
    }

    /// Whether the note covers `cell`. A hold covers every row of its lane
    /// from start to end inclusive.
    pub fn occupies(&self, cell: Position) -> bool {
        match self {
            Note::Hit { position } => *position == cell,
            Note::Hold(hold) => {
                cell.lane == hold.start.lane && (hold.start.row..=hold.end.row).contains(&cell.row)
            }
        }
    }

    /// Positions that rectangle selection tests against.
    pub fn endpoints(&self) -> impl Iterator<Item = Position> + use<> {
        let (first, second) = match self {
            Note::Hit { position } => (*position, None),
            Note::Hold(hold) => (hold.start, Some(hold.end)),
        };
        std::iter::once(first).chain(second)
    }

    /// Whether any covered row falls in `from..=to`.
    pub fn intersects_rows(&self, from: i32, to: i32) -> bool {
        self.start_row() <= to && self.end_row() >= from
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Hit { position } => write!(f, "Hit({position})"),
            Note::Hold(hold) => write!(f, "Hold({} -> {})", hold.start, hold.end),
        }
    }
}

/// The note among `notes` covering `cell`. A hit wins over a hold running
/// through the same cell; ties break on base position.
pub fn note_covering(notes: impl IntoIterator<Item = Note>, cell: Position) -> Option<Note> {
    notes
        .into_iter()
        .filter(|note| note.occupies(cell))
        .min_by_key(|note| (note.kind().priority(), note.base_position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(start_row: i32, end_row: i32, lane: i32) -> Note {
        Note::hold(Position::new(start_row, lane), Position::new(end_row, lane)).unwrap()
    }

    #[test]
    fn test_hold_rejects_lane_change() {
        let err = Hold::new(Position::new(0, 1), Position::new(96, 2)).unwrap_err();
        assert_eq!(err, GeometryError::LaneMismatch { start: 1, end: 2 });
    }

    #[test]
    fn test_hold_rejects_non_positive_length() {
        let same = Hold::new(Position::new(48, 0), Position::new(48, 0)).unwrap_err();
        assert!(matches!(same, GeometryError::NonPositiveLength { .. }));

        let backwards = Hold::new(Position::new(96, 0), Position::new(0, 0)).unwrap_err();
        assert_eq!(
            backwards,
            GeometryError::NonPositiveLength { start: 96, end: 0 }
        );
    }

    #[test]
    fn test_base_position() {
        assert_eq!(Note::hit(24, 3).base_position(), Position::new(24, 3));
        assert_eq!(hold(48, 96, 1).base_position(), Position::new(48, 1));
    }

    #[test]
    fn test_set_base_position_keeps_hold_length() {
        let mut note = hold(0, 96, 0);
        note.set_base_position(Position::new(200, 3));

        let Note::Hold(h) = note else {
            panic!("expected hold");
        };
        assert_eq!(h.start(), Position::new(200, 3));
        assert_eq!(h.end(), Position::new(296, 3));
        assert_eq!(h.length(), 96);
    }

    #[test]
    fn test_moved_translates_both_ends() {
        let note = hold(0, 48, 2).moved(Position::new(24, -1));
        assert_eq!(note, hold(24, 72, 1));

        let hit = Note::hit(0, 0).moved(Position::new(-24, 5));
        assert_eq!(hit, Note::hit(-24, 5));
    }

    #[test]
    fn test_copy_does_not_alias() {
        let original = Note::hit(0, 0);
        let mut copy = original;
        copy.translate(Position::new(96, 1));

        assert_eq!(original, Note::hit(0, 0));
        assert_eq!(copy, Note::hit(96, 1));
    }

    #[test]
    fn test_occupies() {
        let h = hold(10, 20, 1);
        assert!(h.occupies(Position::new(10, 1)));
        assert!(h.occupies(Position::new(15, 1)));
        assert!(h.occupies(Position::new(20, 1)));
        assert!(!h.occupies(Position::new(21, 1)));
        assert!(!h.occupies(Position::new(15, 0)));

        let hit = Note::hit(10, 1);
        assert!(hit.occupies(Position::new(10, 1)));
        assert!(!hit.occupies(Position::new(11, 1)));
    }

    #[test]
    fn test_endpoints() {
        let hit: Vec<_> = Note::hit(5, 0).endpoints().collect();
        assert_eq!(hit, vec![Position::new(5, 0)]);

        let ends: Vec<_> = hold(5, 9, 2).endpoints().collect();
        assert_eq!(ends, vec![Position::new(5, 2), Position::new(9, 2)]);
    }

    #[test]
    fn test_intersects_rows() {
        let h = hold(100, 200, 0);
        assert!(h.intersects_rows(0, 100));
        assert!(h.intersects_rows(150, 160));
        assert!(h.intersects_rows(200, 400));
        assert!(!h.intersects_rows(201, 400));
        assert!(!h.intersects_rows(0, 99));
    }

    #[test]
    fn test_note_covering_prefers_hit() {
        let notes = [hold(0, 96, 0), Note::hit(48, 0), hold(24, 48, 1)];

        assert_eq!(note_covering(notes, Position::new(48, 0)), Some(Note::hit(48, 0)));
        assert_eq!(note_covering(notes, Position::new(60, 0)), Some(hold(0, 96, 0)));
        assert_eq!(note_covering(notes, Position::new(48, 1)), Some(hold(24, 48, 1)));
        assert_eq!(note_covering(notes, Position::new(60, 1)), None);
    }

    #[test]
    fn test_priority_prefers_hit() {
        assert!(NoteKind::Hit.priority() < NoteKind::Hold.priority());
        assert_eq!(NoteKind::Hold.to_string(), "Hold");
    }
}
