use std::fmt;
use std::str::FromStr;

use kbm_transport::TICKS_PER_BEAT;

use crate::Viewport;

/// Beat subdivision the grid is drawn and clicks are snapped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderStrategyType {
    R1_2,
    R1_3,
    #[default]
    R1_4,
    R1_6,
    R1_8,
    R1_12,
    R1_16,
    R1_24,
    R1_32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resolution '{0}', expected one of 1/2 1/3 1/4 1/6 1/8 1/12 1/16 1/24 1/32")]
pub struct UnknownResolution(pub String);

/// How strongly a grid line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Start of a beat, labeled with the beat number.
    Beat,
    /// Index into the strategy's secondary pens.
    Secondary(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub index: i32,
    pub row: i32,
    pub y: f64,
    pub class: LineClass,
}

impl GridLine {
    pub fn beat_label(&self, subdivision: i32) -> Option<i32> {
        match self.class {
            LineClass::Beat => Some(self.index / subdivision),
            LineClass::Secondary(_) => None,
        }
    }
}

impl RenderStrategyType {
    pub const ALL: [RenderStrategyType; 9] = [
        RenderStrategyType::R1_2,
        RenderStrategyType::R1_3,
        RenderStrategyType::R1_4,
        RenderStrategyType::R1_6,
        RenderStrategyType::R1_8,
        RenderStrategyType::R1_12,
        RenderStrategyType::R1_16,
        RenderStrategyType::R1_24,
        RenderStrategyType::R1_32,
    ];

    /// Grid lines per beat.
    pub fn subdivision(&self) -> i32 {
        match self {
            RenderStrategyType::R1_2 => 2,
            RenderStrategyType::R1_3 => 3,
            RenderStrategyType::R1_4 => 4,
            RenderStrategyType::R1_6 => 6,
            RenderStrategyType::R1_8 => 8,
            RenderStrategyType::R1_12 => 12,
            RenderStrategyType::R1_16 => 16,
            RenderStrategyType::R1_24 => 24,
            RenderStrategyType::R1_32 => 32,
        }
    }

    /// Rows between two grid lines: 48, 32, 24, 16, 12, 8, 6, 4 and 3.
    pub fn rows_per_tick(&self) -> i32 {
        TICKS_PER_BEAT / self.subdivision()
    }

    /// Number of secondary pens lines of this strategy cycle through.
    pub fn palette_size(&self) -> usize {
        match self {
            RenderStrategyType::R1_2 | RenderStrategyType::R1_3 => 1,
            RenderStrategyType::R1_4 | RenderStrategyType::R1_6 => 2,
            _ => 3,
        }
    }

    /// Pixels between two grid lines.
    pub fn vertical_distance(&self, viewport: &Viewport) -> f64 {
        viewport.bitmap_height() / (viewport.zoom() * self.subdivision() as f64)
    }

    /// Emphasis of the `index`-th grid line counted from row zero.
    ///
    /// Lines on half or third beats get the first secondary pen, quarter and
    /// sixth beats the second, anything finer the third.
    pub fn line_class(&self, index: i32) -> LineClass {
        let step = index.rem_euclid(self.subdivision());
        if step == 0 {
            return LineClass::Beat;
        }
        let row = step * self.rows_per_tick();
        let level = if row % 48 == 0 || row % 32 == 0 {
            0
        } else if row % 24 == 0 || row % 16 == 0 {
            1
        } else {
            2
        };
        LineClass::Secondary(level.min(self.palette_size() - 1))
    }

    /// Grid lines visible in the viewport, bottom to top.
    pub fn grid_lines(&self, viewport: &Viewport) -> Vec<GridLine> {
        let distance = self.vertical_distance(viewport);
        let first = ((viewport.render_from_y() / distance).ceil() as i32).max(0);
        let top = viewport.render_from_y() + viewport.bitmap_height();

        let mut lines = Vec::new();
        let mut index = first;
        while index as f64 * distance <= top {
            lines.push(GridLine {
                index,
                row: index * self.rows_per_tick(),
                y: viewport.absolute_to_y(index as f64 * distance),
                class: self.line_class(index),
            });
            index += 1;
        }
        lines
    }
}

impl fmt::Display for RenderStrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}", self.subdivision())
    }
}

impl FromStr for RenderStrategyType {
    type Err = UnknownResolution;

    /// Accepts `1/8` or just `8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let denominator = trimmed.strip_prefix("1/").unwrap_or(trimmed);
        denominator
            .parse::<i32>()
            .ok()
            .and_then(|d| Self::ALL.into_iter().find(|t| t.subdivision() == d))
            .ok_or_else(|| UnknownResolution(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_tick_table() {
        let rows: Vec<i32> = RenderStrategyType::ALL
            .iter()
            .map(|t| t.rows_per_tick())
            .collect();
        assert_eq!(rows, vec![48, 32, 24, 16, 12, 8, 6, 4, 3]);
    }

    #[test]
    fn test_vertical_distance() {
        let mut vp = Viewport::new(400.0, 960.0);
        assert_eq!(RenderStrategyType::R1_4.vertical_distance(&vp), 240.0);
        vp.set_zoom(2.0);
        assert_eq!(RenderStrategyType::R1_8.vertical_distance(&vp), 60.0);
    }

    #[test]
    fn test_line_class_quarter() {
        let s = RenderStrategyType::R1_4;
        assert_eq!(s.line_class(0), LineClass::Beat);
        assert_eq!(s.line_class(1), LineClass::Secondary(1));
        assert_eq!(s.line_class(2), LineClass::Secondary(0));
        assert_eq!(s.line_class(3), LineClass::Secondary(1));
        assert_eq!(s.line_class(4), LineClass::Beat);
    }

    #[test]
    fn test_line_class_eighth_uses_three_pens() {
        let s = RenderStrategyType::R1_8;
        assert_eq!(s.line_class(4), LineClass::Secondary(0));
        assert_eq!(s.line_class(2), LineClass::Secondary(1));
        assert_eq!(s.line_class(1), LineClass::Secondary(2));
    }

    #[test]
    fn test_line_class_is_clamped_to_palette() {
        for s in RenderStrategyType::ALL {
            for index in 0..s.subdivision() {
                if let LineClass::Secondary(level) = s.line_class(index) {
                    assert!(level < s.palette_size(), "{s} line {index}");
                }
            }
        }
    }

    #[test]
    fn test_grid_lines_cover_viewport() {
        let mut vp = Viewport::new(400.0, 960.0);
        vp.set_render_from_y(0.0);
        let lines = RenderStrategyType::R1_4.grid_lines(&vp);

        // 240 px apart over 960 px, both edges included
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].y, 960.0);
        assert_eq!(lines[4].y, 0.0);
        assert_eq!(lines[4].row, 96);
        assert_eq!(lines[4].beat_label(4), Some(1));
        assert_eq!(lines[1].beat_label(4), None);
    }

    #[test]
    fn test_grid_lines_skip_negative_rows() {
        let vp = Viewport::new(400.0, 960.0);
        let lines = RenderStrategyType::R1_2.grid_lines(&vp);
        assert_eq!(lines[0].index, 0);
        assert!(lines.iter().all(|l| l.y >= 0.0));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("1/12".parse::<RenderStrategyType>(), Ok(RenderStrategyType::R1_12));
        assert_eq!("32".parse::<RenderStrategyType>(), Ok(RenderStrategyType::R1_32));
        assert!("1/5".parse::<RenderStrategyType>().is_err());
        assert_eq!(RenderStrategyType::R1_6.to_string(), "1/6");
    }
}
