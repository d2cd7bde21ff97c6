use crate::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: f32,
}

impl Pen {
    pub const fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// One primitive in a rendered frame. Coordinates are bitmap pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    /// Filled and outlined rect, the way notes are drawn.
    Box {
        rect: Rect,
        fill: Color,
        stroke: Pen,
    },
    Line {
        from: Point,
        to: Point,
        pen: Pen,
    },
    Text {
        at: Point,
        text: String,
        color: Color,
        size: f32,
    },
}

/// What a render pass produced, in paint order. A front end replays it onto
/// whatever surface it owns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = DrawCommand>) {
        self.commands.extend(commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn boxes(&self) -> impl Iterator<Item = (&Rect, &Color)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Box { rect, fill, .. } => Some((rect, fill)),
            _ => None,
        })
    }

    pub fn lines_with(&self, color: Color) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { pen, .. } if pen.color == color))
            .count()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Colors and sizes of everything the renderer draws.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRenderStyle {
    pub background: Color,
    pub separator_pen: Pen,
    /// Between the left and right lane groups.
    pub border_pen: Pen,
    pub trigger_line_pen: Pen,
    pub beat_pen: Pen,
    /// Secondary grid pens, indexed by `LineClass::Secondary`.
    pub grid_pens: [Pen; 3],
    pub full_note_percentage: f64,
    pub not_full_note_percentage: f64,
    pub beat_text_color: Color,
    pub beat_text_size: f32,
    pub selector_fill: Color,
    pub note_fill: Color,
    pub note_pen: Pen,
    pub selected_note_fill: Color,
    pub selected_note_pen: Pen,
    pub hold_start_fill: Color,
    pub note_width: f64,
    pub note_height: f64,
}

impl Default for SheetRenderStyle {
    fn default() -> Self {
        Self {
            background: Color::rgb(5, 6, 2),
            separator_pen: Pen::new(Color::rgb(50, 51, 59), 1.0),
            border_pen: Pen::new(Color::rgb(80, 81, 89), 2.0),
            trigger_line_pen: Pen::new(Color::rgb(255, 46, 65), 2.0),
            beat_pen: Pen::new(Color::rgb(90, 91, 99), 2.0),
            grid_pens: [
                Pen::new(Color::rgb(85, 58, 89), 2.0),
                Pen::new(Color::rgb(41, 72, 78), 2.0),
                Pen::new(Color::rgb(30, 30, 30), 2.0),
            ],
            full_note_percentage: 1.0,
            not_full_note_percentage: 0.8,
            beat_text_color: Color::WHITE,
            beat_text_size: 30.0,
            selector_fill: Color::argb(90, 179, 234, 255),
            note_fill: Color::WHITE,
            note_pen: Pen::new(Color::rgb(208, 221, 234), 4.0),
            selected_note_fill: Color::rgb(255, 255, 102),
            selected_note_pen: Pen::new(Color::rgb(229, 232, 107), 4.0),
            hold_start_fill: Color::argb(160, 179, 234, 255),
            note_width: 80.0,
            note_height: 20.0,
        }
    }
}

impl SheetRenderStyle {
    /// Rect a note or the selector occupies around a cell center.
    pub fn note_rect(&self, center: Point) -> Rect {
        Rect::centered(center, self.note_width, self.note_height)
    }
}
