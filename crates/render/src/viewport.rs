use kbm_sheet::Position;
use kbm_transport::TICKS_PER_BEAT;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 4.0;
/// Distance of the trigger line above the bitmap bottom, in pixels.
pub const DEFAULT_TRIGGER_LINE_Y: f64 = 50.0;

// absorbs float drift when a row is converted to pixels and back
const ROW_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// Smallest rect containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect::new(left, top, right - left, bottom - top)
    }

}

/// Inclusive row interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: i32,
    pub to: i32,
}

impl RowRange {
    pub const ALL: RowRange = RowRange {
        from: i32::MIN,
        to: i32::MAX,
    };

    pub const fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, row: i32) -> bool {
        (self.from..=self.to).contains(&row)
    }
}

/// Geometry shared by rendering, hit-testing and playback.
///
/// Pixel positions on the bitmap grow downwards; sheet rows grow upwards from
/// the bottom edge. `render_from_y` is how far (in bitmap pixels) the sheet is
/// scrolled, so the absolute y of a row is `row * row_distance()` and the
/// bitmap bottom sits at absolute y `render_from_y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    bitmap_width: f64,
    bitmap_height: f64,
    display_width: f64,
    display_height: f64,
    zoom: f64,
    render_from_y: f64,
    trigger_line_y: f64,
    columns: i32,
    left_size: i32,
}

impl Viewport {
    pub fn new(bitmap_width: f64, bitmap_height: f64) -> Self {
        let bitmap_width = bitmap_width.max(1.0);
        let bitmap_height = bitmap_height.max(1.0);
        Self {
            bitmap_width,
            bitmap_height,
            display_width: bitmap_width,
            display_height: bitmap_height,
            zoom: 1.0,
            render_from_y: -DEFAULT_TRIGGER_LINE_Y,
            trigger_line_y: DEFAULT_TRIGGER_LINE_Y,
            columns: 4,
            left_size: 2,
        }
    }

    pub fn with_lanes(mut self, columns: i32, left_size: i32) -> Self {
        self.set_lanes(columns, left_size);
        self
    }

    pub fn set_lanes(&mut self, columns: i32, left_size: i32) {
        self.columns = columns.max(1);
        self.left_size = left_size.clamp(0, self.columns);
    }

    pub fn columns(&self) -> i32 {
        self.columns
    }

    pub fn left_size(&self) -> i32 {
        self.left_size
    }

    pub fn bitmap_width(&self) -> f64 {
        self.bitmap_width
    }

    pub fn bitmap_height(&self) -> f64 {
        self.bitmap_height
    }

    pub fn display_width(&self) -> f64 {
        self.display_width
    }

    pub fn display_height(&self) -> f64 {
        self.display_height
    }

    /// Change the size of the on-screen image the bitmap is stretched into.
    pub fn resize_display(&mut self, width: f64, height: f64) {
        self.display_width = width.max(1.0);
        self.display_height = height.max(1.0);
    }

    /// Change the bitmap size, keeping the beat under the trigger line.
    pub fn resize_bitmap(&mut self, width: f64, height: f64) {
        let anchor = self.trigger_beat();
        self.bitmap_width = width.max(1.0);
        self.bitmap_height = height.max(1.0);
        self.set_trigger_beat(anchor);
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Clamp to `[MIN_ZOOM, MAX_ZOOM]` and re-anchor so the beat under the
    /// trigger line stays put, fractions of a row included.
    pub fn set_zoom(&mut self, zoom: f64) {
        let anchor = self.trigger_beat();
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.set_trigger_beat(anchor);
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.set_zoom(self.zoom + delta);
    }

    /// Pixels per row.
    pub fn row_distance(&self) -> f64 {
        self.bitmap_height / (TICKS_PER_BEAT as f64 * self.zoom)
    }

    pub fn height_per_beat(&self) -> f64 {
        self.bitmap_height / self.zoom
    }

    pub fn column_width(&self) -> f64 {
        self.bitmap_width / self.columns as f64
    }

    pub fn render_from_y(&self) -> f64 {
        self.render_from_y
    }

    pub fn set_render_from_y(&mut self, y: f64) {
        self.render_from_y = y;
    }

    /// Scroll by `dy` bitmap pixels (positive moves up the sheet). The trigger
    /// line never goes below row zero.
    pub fn scroll_by(&mut self, dy: f64) {
        self.render_from_y = (self.render_from_y + dy).max(-self.trigger_line_y);
    }

    pub fn render_from_row(&self) -> i32 {
        (self.render_from_y / self.row_distance()).ceil() as i32
    }

    pub fn render_to_row(&self) -> i32 {
        ((self.render_from_y + self.bitmap_height) / self.row_distance()).floor() as i32
    }

    pub fn visible_rows(&self) -> RowRange {
        RowRange::new(self.render_from_row(), self.render_to_row())
    }

    /// Bitmap y of `row`.
    pub fn row_to_y(&self, row: i32) -> f64 {
        self.absolute_to_y(row as f64 * self.row_distance())
    }

    pub fn absolute_to_y(&self, absolute_y: f64) -> f64 {
        self.bitmap_height - (absolute_y - self.render_from_y)
    }

    pub fn y_to_absolute(&self, y: f64) -> f64 {
        self.bitmap_height - y + self.render_from_y
    }

    /// Nearest row to a bitmap y.
    pub fn y_to_row(&self, y: f64) -> i32 {
        (self.y_to_absolute(y) / self.row_distance()).round() as i32
    }

    pub fn lane_left(&self, lane: i32) -> f64 {
        lane as f64 * self.column_width()
    }

    pub fn lane_center(&self, lane: i32) -> f64 {
        self.lane_left(lane) + self.column_width() / 2.0
    }

    /// Bitmap point at the center of a cell.
    pub fn cell_center(&self, position: Position) -> Point {
        Point::new(self.lane_center(position.lane), self.row_to_y(position.row))
    }

    /// Map a point on the displayed image to bitmap pixels.
    pub fn display_to_bitmap(&self, point: Point) -> Point {
        Point::new(
            point.x * self.bitmap_width / self.display_width,
            point.y * self.bitmap_height / self.display_height,
        )
    }

    pub fn bitmap_to_display(&self, point: Point) -> Point {
        Point::new(
            point.x * self.display_width / self.bitmap_width,
            point.y * self.display_height / self.bitmap_height,
        )
    }

    pub fn contains_bitmap_point(&self, point: Point) -> bool {
        (0.0..=self.bitmap_width).contains(&point.x) && (0.0..=self.bitmap_height).contains(&point.y)
    }

    /// Pixels between the trigger line and the bitmap bottom.
    pub fn trigger_line_y(&self) -> f64 {
        self.trigger_line_y
    }

    pub fn trigger_absolute_y(&self) -> f64 {
        self.render_from_y + self.trigger_line_y
    }

    pub fn set_trigger_absolute_y(&mut self, absolute_y: f64) {
        self.render_from_y = absolute_y - self.trigger_line_y;
    }

    /// Last row at or below the trigger line.
    pub fn trigger_line_row(&self) -> i32 {
        (self.trigger_absolute_y() / self.row_distance() + ROW_EPSILON).floor() as i32
    }

    pub fn set_trigger_line_row(&mut self, row: i32) {
        self.set_trigger_absolute_y(row as f64 * self.row_distance());
    }

    pub fn trigger_beat(&self) -> f64 {
        self.trigger_absolute_y() / self.height_per_beat()
    }

    fn set_trigger_beat(&mut self, beat: f64) {
        self.set_trigger_absolute_y(beat * self.height_per_beat());
    }

    pub fn trigger_line_seconds(&self, bpm: f64) -> f64 {
        self.trigger_beat() * 60.0 / bpm
    }

    pub fn set_trigger_line_seconds(&mut self, seconds: f64, bpm: f64) {
        self.set_trigger_beat(seconds * bpm / 60.0);
    }
}
