use kbm_sheet::Position;

use crate::{Point, RenderStrategyType, Viewport};

/// Turns pointer positions into grid cells for one strategy.
#[derive(Debug, Clone, Copy)]
pub struct InteractionAgent<'a> {
    viewport: &'a Viewport,
    strategy: RenderStrategyType,
}

impl<'a> InteractionAgent<'a> {
    pub fn new(viewport: &'a Viewport, strategy: RenderStrategyType) -> Self {
        Self { viewport, strategy }
    }

    /// Cell under a point on the displayed image, snapped to the strategy's
    /// grid. `None` when the point falls outside the bitmap.
    pub fn position(&self, screen: Point) -> Option<Position> {
        let vp = self.viewport;
        let point = vp.display_to_bitmap(screen);
        if !vp.contains_bitmap_point(point) {
            return None;
        }

        let absolute_y = vp.y_to_absolute(point.y);
        let tick = (absolute_y / self.strategy.vertical_distance(vp)).round() as i32;
        let row = tick * self.strategy.rows_per_tick();

        // the right edge belongs to the last lane
        let lane = ((point.x / vp.column_width()).floor() as i32).min(vp.columns() - 1);

        Some(Position::new(row, lane))
    }

    /// Point on the displayed image at the center of `position`.
    pub fn screen_point(&self, position: Position) -> Point {
        self.viewport
            .bitmap_to_display(self.viewport.cell_center(position))
    }

    /// Round `row` to the nearest grid line of the strategy.
    pub fn snap_row(&self, row: i32) -> i32 {
        snap_row(row, self.strategy)
    }
}

pub fn snap_row(row: i32, strategy: RenderStrategyType) -> i32 {
    let step = strategy.rows_per_tick();
    ((row as f64 / step as f64).round() as i32) * step
}

/// Shorthand for a one-off lookup.
pub fn screen_to_grid(
    viewport: &Viewport,
    strategy: RenderStrategyType,
    screen: Point,
) -> Option<Position> {
    InteractionAgent::new(viewport, strategy).position(screen)
}
