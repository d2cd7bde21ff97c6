use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use kbm_transport::TICKS_PER_BEAT;

/// A cell on the sheet: `row` in ticks (96 per beat) and a zero-based `lane`.
///
/// Positions double as deltas: subtracting two positions gives the offset a
/// selection was dragged by, and adding it back moves a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub row: i32,
    pub lane: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { row: 0, lane: 0 };

    pub const fn new(row: i32, lane: i32) -> Self {
        Self { row, lane }
    }

    /// Whole beats before this row.
    pub fn beat(&self) -> i32 {
        self.row.div_euclid(TICKS_PER_BEAT)
    }

    /// Ticks past the last full beat.
    pub fn tick_in_beat(&self) -> i32 {
        self.row.rem_euclid(TICKS_PER_BEAT)
    }

    /// True if `self` lies inside the box spanned by `a` and `b`, edges included.
    /// The corners may be given in any order.
    pub fn within(&self, a: Position, b: Position) -> bool {
        let (row_lo, row_hi) = (a.row.min(b.row), a.row.max(b.row));
        let (lane_lo, lane_hi) = (a.lane.min(b.lane), a.lane.max(b.lane));
        (row_lo..=row_hi).contains(&self.row) && (lane_lo..=lane_hi).contains(&self.lane)
    }
}

impl From<(i32, i32)> for Position {
    fn from((row, lane): (i32, i32)) -> Self {
        Self::new(row, lane)
    }
}

impl From<Position> for (i32, i32) {
    fn from(p: Position) -> Self {
        (p.row, p.lane)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.row + rhs.row, self.lane + rhs.lane)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.row - rhs.row, self.lane - rhs.lane)
    }
}

impl Neg for Position {
    type Output = Position;

    fn neg(self) -> Position {
        Position::new(-self.row, -self.lane)
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, rhs: Position) {
        self.row += rhs.row;
        self.lane += rhs.lane;
    }
}

impl SubAssign for Position {
    fn sub_assign(&mut self, rhs: Position) {
        self.row -= rhs.row;
        self.lane -= rhs.lane;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}@{}", self.beat(), self.tick_in_beat(), self.lane)
    }
}
