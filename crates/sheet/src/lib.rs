mod note;
mod position;
mod sheet;

pub use note::{GeometryError, Hold, Note, NoteKind, note_covering};
pub use position::Position;
pub use sheet::{LaneGroup, MAX_COLUMNS, Sheet, SheetError};
