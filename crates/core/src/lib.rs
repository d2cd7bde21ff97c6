pub mod command;
pub mod editor;
pub mod events;
pub mod player;
pub mod preview;
pub mod session;
pub mod time;
pub mod undo;

pub use command::{EditCommand, EditTarget};
pub use editor::{EditError, HoldPlacement, SheetEditor};
pub use events::{SheetChange, SheetEvents};
pub use player::{MAX_LANES, PlaybackState, SheetPlayer, StopwatchTimer};
pub use preview::{DensityPreview, WINDOW_BEATS, WINDOW_ROWS};
pub use session::{ClickOutcome, EditMode, Session, SessionError, SessionOptions};
pub use time::{MusicalPosition, TimeContext, TimeSignature, format_seconds};
pub use undo::{CommandLog, DEFAULT_MAX_HISTORY, Reversible};

pub use kbm_project::{Meta, MetaBuilder, Project, ProjectError};
pub use kbm_render::{Frame, RenderStrategyType, Viewport};
pub use kbm_sheet::{Note, Position, Sheet};
