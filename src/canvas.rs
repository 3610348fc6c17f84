//! The drawing surface the overlay renders onto.
//!
//! [`Canvas`] is the seam between the overlay and whatever actually puts
//! pixels on screen. The viewer implements it on top of wgpu; tests use
//! [`RecordingCanvas`], which keeps every call as a [`DrawCmd`].

/// RGBA color, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque color from 8-bit channels.
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
}

/// How shapes and glyphs are rasterized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
    FillAndStroke,
}

/// Horizontal text anchoring relative to the draw position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Drawing state passed along with every canvas call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    pub stroke_width: f32,
    pub text_size: f32,
    pub text_align: TextAlign,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            style: PaintStyle::Fill,
            stroke_width: 1.0,
            text_size: 12.0,
            text_align: TextAlign::Left,
        }
    }
}

impl Paint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn style(mut self, style: PaintStyle) -> Self {
        self.style = style;
        self
    }

    pub fn stroke_width(mut self, width: f32) -> Self {
        self.stroke_width = width;
        self
    }

    pub fn text_size(mut self, size: f32) -> Self {
        self.text_size = size;
        self
    }

    pub fn text_align(mut self, align: TextAlign) -> Self {
        self.text_align = align;
        self
    }
}

/// A 2D immediate-mode drawing target in pixel coordinates, y pointing down.
pub trait Canvas {
    /// Width of the drawable area in pixels.
    fn width(&self) -> u32;

    /// Height of the drawable area in pixels.
    fn height(&self) -> u32;

    /// Draws independent line segments; `points` holds `x1, y1, x2, y2`
    /// groups. One call is one batch.
    fn draw_lines(&mut self, points: &[f32], paint: &Paint);

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, paint: &Paint) {
        self.draw_lines(&[x1, y1, x2, y2], paint);
    }

    fn draw_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint);

    /// Draws `text` with its baseline at `y`, anchored per `paint.text_align`.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint);

    /// Pushes the current transform.
    fn save(&mut self);

    /// Rotates subsequent drawing by `degrees` (clockwise on screen) about
    /// `(px, py)`.
    fn rotate(&mut self, degrees: f32, px: f32, py: f32);

    /// Pops the transform pushed by the matching [`Canvas::save`].
    fn restore(&mut self);
}

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    Lines { points: Vec<f32>, paint: Paint },
    Circle { cx: f32, cy: f32, radius: f32, paint: Paint },
    Text { text: String, x: f32, y: f32, paint: Paint },
    Save,
    Rotate { degrees: f32, px: f32, py: f32 },
    Restore,
}

/// A [`Canvas`] that records calls instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    commands: Vec<DrawCmd>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Recorded commands in call order.
    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }

    /// Forgets everything recorded so far.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of `draw_lines` batches issued.
    pub fn line_batches(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCmd::Lines { .. }))
            .count()
    }

    /// Total line segments drawn in the given color.
    pub fn segments_with_color(&self, color: Color) -> usize {
        self.commands
            .iter()
            .map(|cmd| match cmd {
                DrawCmd::Lines { points, paint } if paint.color == color => points.len() / 4,
                _ => 0,
            })
            .sum()
    }

    /// Text drawn in fill style, i.e. one entry per visible label.
    pub fn filled_texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCmd::Text { text, paint, .. } if paint.style == PaintStyle::Fill => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_lines(&mut self, points: &[f32], paint: &Paint) {
        self.commands.push(DrawCmd::Lines {
            points: points.to_vec(),
            paint: *paint,
        });
    }

    fn draw_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint) {
        self.commands.push(DrawCmd::Circle {
            cx,
            cy,
            radius,
            paint: *paint,
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint) {
        self.commands.push(DrawCmd::Text {
            text: text.to_string(),
            x,
            y,
            paint: *paint,
        });
    }

    fn save(&mut self) {
        self.commands.push(DrawCmd::Save);
    }

    fn rotate(&mut self, degrees: f32, px: f32, py: f32) {
        self.commands.push(DrawCmd::Rotate { degrees, px, py });
    }

    fn restore(&mut self) {
        self.commands.push(DrawCmd::Restore);
    }
}
