use crate::canvas::{Canvas, Color, Paint, PaintStyle};

use super::{DrawParams, VertexBatch};

const RING_FRACTION: f32 = 0.1;
const ARM_FRACTION: f32 = 0.15;

/// A fixed crosshair-in-circle at the center of the view.
///
/// Drawn in screen space, so it contributes nothing to projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reticle;

impl Reticle {
    pub fn add_to(&mut self, _batch: &mut VertexBatch) {}

    pub fn prepare_draw(&self, _batch: &VertexBatch, _view: &mut ReticleView) {}
}

/// Draw-side reticle. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReticleView;

impl ReticleView {
    pub fn draw(&mut self, canvas: &mut dyn Canvas, params: &DrawParams) {
        let paint = Paint::new()
            .color(Color::RED)
            .style(PaintStyle::Stroke)
            .stroke_width(2.0);

        let cx = 0.5 * params.width as f32;
        let cy = 0.5 * params.height as f32;
        let arm = ARM_FRACTION * params.draw_radius;

        canvas.draw_circle(cx, cy, RING_FRACTION * params.draw_radius, &paint);
        canvas.draw_line(cx, cy - arm, cx, cy + arm, &paint);
        canvas.draw_line(cx - arm, cy, cx + arm, cy, &paint);
    }
}
