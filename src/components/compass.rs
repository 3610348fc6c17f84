//! The spherical compass grid.
//!
//! A unit sphere sampled as latitude rings around the viewer. The viewer sits
//! at the center, so after projection only samples with positive retained
//! depth (the hemisphere in front of the camera) are drawn.

use std::ops::Range;

use crate::canvas::{Canvas, Color, Paint, PaintStyle, TextAlign};
use crate::line_batch::LineBatch;
use crate::transform::Point3;

use super::{DrawParams, VertexBatch};

/// Longitude samples per latitude ring (every 5 degrees).
pub const POINTS_PER_RING: usize = 72;
/// Latitude rings, from 75 degrees below the horizon to 75 above.
pub const NUM_RINGS: usize = 11;
pub const NUM_POINTS: usize = POINTS_PER_RING * NUM_RINGS;
/// The equator ring, drawn as the horizon.
pub const HORIZON_RING: usize = 5;

const RING_STEP_DEGREES: i32 = 15;
const SAMPLE_STEP_DEGREES: i32 = 360 / POINTS_PER_RING as i32;
/// Every third sample gets a vertical line (every 15 degrees).
const MERIDIAN_STRIDE: usize = 3;
const LABEL_RINGS: [usize; 3] = [0, HORIZON_RING, NUM_RINGS - 1];

const DEGREES_TO_RADIANS: f32 = (std::f64::consts::PI / 180.0) as f32;

/// Grid line color.
pub const GRID_COLOR: Color = Color::rgb8(55, 181, 229);
const NORTH_COLOR: Color = Color::RED;
const HORIZON_COLOR: Color = Color::RED;
const LINE_WIDTH: f32 = 2.0;
const OUTLINE_EXTRA_WIDTH: f32 = 3.0;
const CARDINAL_SCALE: f32 = 3.0;
const DEGREE_SCALE: f32 = 1.3;

/// Degree labels indexed by `azimuth / 15`.
static DEGREE_LABELS: [&str; 24] = [
    " 0°", " 15°", " 30°", " 45°", " 60°", " 75°", " 90°", " 105°", " 120°", " 135°", " 150°",
    " 165°", " 180°", " 195°", " 210°", " 225°", " 240°", " 255°", " 270°", " 285°", " 300°",
    " 315°", " 330°", " 345°",
];

/// Elevation of ring `ring` in degrees.
pub fn ring_elevation(ring: usize) -> i32 {
    (ring as i32 - HORIZON_RING as i32) * RING_STEP_DEGREES
}

/// Azimuth of sample `sample` in degrees, clockwise from north.
pub fn sample_azimuth(sample: usize) -> i32 {
    sample as i32 * SAMPLE_STEP_DEGREES
}

/// How the compass labels its grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelStyle {
    pub enabled: bool,
    /// Base text size in pixels.
    pub size: f32,
    pub color: Color,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 20.0,
            color: Color::WHITE,
        }
    }
}

/// Update-side compass: the raw model-space grid.
#[derive(Debug, Clone)]
pub struct Compass {
    vertices: Vec<Point3>,
    span: Range<usize>,
    labels: LabelStyle,
}

impl Compass {
    pub fn new(labels: LabelStyle) -> Self {
        let mut compass = Self {
            vertices: vec![Point3::ZERO; NUM_POINTS],
            span: 0..0,
            labels,
        };
        compass.reset_points();
        compass
    }

    /// Rewrites every vertex to its original position on the sphere.
    ///
    /// Ring `j` sits at elevation `(j - 5) * 15` degrees, sample `i` at
    /// azimuth `i * 5` degrees. Vertices are stored ring-major.
    pub fn reset_points(&mut self) {
        for ring in 0..NUM_RINGS {
            let elevation = ring_elevation(ring);
            let ring_radius = (elevation as f32 * DEGREES_TO_RADIANS).cos();
            let height = ((90 - elevation) as f32 * DEGREES_TO_RADIANS).cos();

            for sample in 0..POINTS_PER_RING {
                let azimuth = sample_azimuth(sample) as f32 * DEGREES_TO_RADIANS;
                self.vertices[ring * POINTS_PER_RING + sample] = Point3::new(
                    azimuth.sin() * ring_radius,
                    -azimuth.cos() * ring_radius,
                    height,
                );
            }
        }
    }

    /// Raw vertices, ring-major.
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    pub fn add_to(&mut self, batch: &mut VertexBatch) {
        self.span = batch.extend_from_slice(&self.vertices);
    }

    pub fn prepare_draw(&self, batch: &VertexBatch, view: &mut CompassView) {
        view.points.clear();
        view.points.extend_from_slice(batch.span(self.span.clone()));
    }

    pub fn view(&self) -> CompassView {
        CompassView::new(self.labels)
    }
}

/// Draw-side compass: published screen-space points and the line batch used
/// to render them.
#[derive(Debug, Clone)]
pub struct CompassView {
    points: Vec<Point3>,
    lines: LineBatch,
    labels: LabelStyle,
}

impl CompassView {
    pub fn new(labels: LabelStyle) -> Self {
        Self {
            points: Vec::with_capacity(NUM_POINTS),
            lines: LineBatch::new(NUM_POINTS),
            labels,
        }
    }

    /// Published points; empty until the first frame is published.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn draw(&mut self, canvas: &mut dyn Canvas, params: &DrawParams) {
        // Nothing published yet, or a partial grid: draw nothing rather than
        // index past the end.
        if self.points.len() != NUM_POINTS {
            return;
        }

        let paint = Paint::new()
            .style(PaintStyle::Stroke)
            .stroke_width(LINE_WIDTH);

        for ring in 0..NUM_RINGS {
            trace_run(&self.points, ring_samples(ring), true, &mut self.lines);
        }
        for sample in (0..POINTS_PER_RING).step_by(MERIDIAN_STRIDE) {
            trace_run(&self.points, meridian_samples(sample), false, &mut self.lines);
        }
        self.lines.flush(canvas, &paint.color(GRID_COLOR));

        trace_run(&self.points, meridian_samples(0), false, &mut self.lines);
        self.lines.flush(canvas, &paint.color(NORTH_COLOR));

        trace_run(&self.points, ring_samples(HORIZON_RING), true, &mut self.lines);
        self.lines.flush(canvas, &paint.color(HORIZON_COLOR));

        if self.labels.enabled {
            self.draw_labels(canvas, params.text_rotation);
        }
    }

    fn draw_labels(&self, canvas: &mut dyn Canvas, text_rotation: f32) {
        let base = Paint::new()
            .color(self.labels.color)
            .stroke_width(LINE_WIDTH)
            .text_size(self.labels.size)
            .text_align(TextAlign::Center);

        for sample in 0..POINTS_PER_RING {
            let azimuth = sample_azimuth(sample);

            for ring in LABEL_RINGS {
                let increment = if ring == HORIZON_RING { 15 } else { 30 };
                let p = self.points[ring * POINTS_PER_RING + sample];
                if azimuth % increment != 0 || !is_visible(p) {
                    continue;
                }

                if text_rotation != 0.0 {
                    canvas.save();
                    canvas.rotate(text_rotation, p.x, p.y);
                }

                let cardinal = base.text_size(base.text_size * CARDINAL_SCALE);
                match azimuth {
                    0 => draw_outlined_text(canvas, "N", p.x, p.y, &cardinal.color(NORTH_COLOR)),
                    90 => draw_outlined_text(canvas, "E", p.x, p.y, &cardinal),
                    180 => draw_outlined_text(canvas, "S", p.x, p.y, &cardinal),
                    270 => draw_outlined_text(canvas, "W", p.x, p.y, &cardinal),
                    _ => {
                        let label = DEGREE_LABELS[(azimuth / 15) as usize];
                        let paint = base.text_size(base.text_size * DEGREE_SCALE);
                        draw_outlined_text(canvas, label, p.x, p.y, &paint);
                    }
                }

                if text_rotation != 0.0 {
                    canvas.restore();
                }
            }
        }
    }
}

/// A published point is drawn only if it lies in front of the viewer.
#[inline]
pub(crate) fn is_visible(p: Point3) -> bool {
    p.z > 0.0
}

fn ring_samples(ring: usize) -> impl ExactSizeIterator<Item = usize> {
    (0..POINTS_PER_RING).map(move |sample| ring * POINTS_PER_RING + sample)
}

fn meridian_samples(sample: usize) -> impl ExactSizeIterator<Item = usize> {
    (0..NUM_RINGS).map(move |ring| ring * POINTS_PER_RING + sample)
}

/// Adds segments between consecutive visible samples of one walk.
///
/// An invisible sample breaks the run. With `close_loop`, a walk whose first
/// sample is visible and whose last sample continues a run also gets the
/// segment joining last to first. Returns whether anything was added.
fn trace_run(
    points: &[Point3],
    samples: impl ExactSizeIterator<Item = usize>,
    close_loop: bool,
    lines: &mut LineBatch,
) -> bool {
    let last = samples.len().saturating_sub(1);
    let mut first: Option<Point3> = None;
    let mut previous: Option<Point3> = None;
    let mut drawn = false;

    for (step, index) in samples.enumerate() {
        let p = points[index];
        if !is_visible(p) {
            previous = None;
            continue;
        }

        if step == 0 {
            first = Some(p);
        }

        if let Some(prev) = previous {
            lines.add_line(p.x, p.y, prev.x, prev.y);
            drawn = true;

            if close_loop && step == last {
                if let Some(first) = first {
                    lines.add_line(first.x, first.y, p.x, p.y);
                }
            }
        }

        previous = Some(p);
    }

    drawn
}

/// Draws `text` with a dark outline pass under the fill pass.
fn draw_outlined_text(canvas: &mut dyn Canvas, text: &str, x: f32, y: f32, paint: &Paint) {
    let outline = paint
        .color(Color::BLACK)
        .style(PaintStyle::FillAndStroke)
        .stroke_width(paint.stroke_width + OUTLINE_EXTRA_WIDTH);
    canvas.draw_text(text, x, y, &outline);
    canvas.draw_text(text, x, y, &paint.style(PaintStyle::Fill));
}
