//! Viewport geometry, grid strategies and display-list rendering for a sheet.

mod agent;
mod frame;
mod renderer;
mod strategy;
mod viewport;

pub use agent::{InteractionAgent, screen_to_grid, snap_row};
pub use frame::{Color, DrawCommand, Frame, Pen, SheetRenderStyle};
pub use renderer::{FrameLimiter, RenderInput, SheetRenderer};
pub use strategy::{GridLine, LineClass, RenderStrategyType, UnknownResolution};
pub use viewport::{DEFAULT_TRIGGER_LINE_Y, MAX_ZOOM, MIN_ZOOM, Point, Rect, RowRange, Viewport};
