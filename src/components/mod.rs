//! Things drawn on the overlay.
//!
//! Every component is split in two halves:
//! - [`Component`] lives on the update side. It owns the raw model-space
//!   vertices and contributes them to the per-frame [`VertexBatch`].
//! - [`ComponentView`] lives in the published frame behind the publishing
//!   lock. It owns the screen-space copy of those vertices and draws from it.
//!
//! [`Component::prepare_draw`] is the only point where data crosses from one
//! half to the other.
//!
//! Adding a component:
//! - add a module with the update-side and view types
//! - add a variant to both enums here
//! - forward the four operations in the `match` arms below

mod compass;
mod reticle;

use std::ops::Range;

use crate::canvas::Canvas;
use crate::transform::Point3;

pub use compass::{
    Compass, CompassView, GRID_COLOR, HORIZON_RING, LabelStyle, NUM_POINTS, NUM_RINGS,
    POINTS_PER_RING, ring_elevation, sample_azimuth,
};
pub use reticle::{Reticle, ReticleView};

/// Per-frame scratch list of vertices awaiting projection.
///
/// Components append their vertices and remember the span they occupy; the
/// pipeline transforms the whole batch in place.
#[derive(Debug, Default, Clone)]
pub struct VertexBatch {
    vertices: Vec<Point3>,
}

impl VertexBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
        }
    }

    /// Empties the batch, keeping its allocation.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Appends `points` and returns the span they occupy.
    pub fn extend_from_slice(&mut self, points: &[Point3]) -> Range<usize> {
        let start = self.vertices.len();
        self.vertices.extend_from_slice(points);
        start..self.vertices.len()
    }

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Point3] {
        &mut self.vertices
    }

    /// The vertices in `span`, or an empty slice if the span is stale.
    pub fn span(&self, span: Range<usize>) -> &[Point3] {
        self.vertices.get(span).unwrap_or(&[])
    }
}

/// Parameters handed to every component when drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawParams {
    /// Half the smaller viewport dimension.
    pub draw_radius: f32,
    /// Degrees to rotate text by so it stays level with the horizon.
    pub text_rotation: f32,
    pub width: u32,
    pub height: u32,
}

/// Update-side half of a drawable component.
#[derive(Debug, Clone)]
pub enum Component {
    Compass(Compass),
    Reticle(Reticle),
}

impl Component {
    /// Regenerates raw model points. Only the compass has any.
    pub fn reset_points(&mut self) {
        match self {
            Self::Compass(compass) => compass.reset_points(),
            Self::Reticle(_) => {}
        }
    }

    /// Appends this component's raw vertices to `batch`.
    pub fn add_to(&mut self, batch: &mut VertexBatch) {
        match self {
            Self::Compass(compass) => compass.add_to(batch),
            Self::Reticle(reticle) => reticle.add_to(batch),
        }
    }

    /// Copies the transformed vertices out of `batch` into the matching view.
    ///
    /// Must be called with the publishing lock held. A view of the wrong kind
    /// is left untouched.
    pub fn prepare_draw(&self, batch: &VertexBatch, view: &mut ComponentView) {
        match (self, view) {
            (Self::Compass(compass), ComponentView::Compass(view)) => {
                compass.prepare_draw(batch, view);
            }
            (Self::Reticle(reticle), ComponentView::Reticle(view)) => {
                reticle.prepare_draw(batch, view);
            }
            _ => log::warn!("component and published view kinds differ; skipping publish"),
        }
    }

    /// Creates the draw-side half for this component.
    pub fn view(&self) -> ComponentView {
        match self {
            Self::Compass(compass) => ComponentView::Compass(compass.view()),
            Self::Reticle(_) => ComponentView::Reticle(ReticleView),
        }
    }
}

/// Draw-side half of a component, owned by the published frame.
#[derive(Debug, Clone)]
pub enum ComponentView {
    Compass(CompassView),
    Reticle(ReticleView),
}

impl ComponentView {
    /// Renders from the published vertices.
    pub fn draw(&mut self, canvas: &mut dyn Canvas, params: &DrawParams) {
        match self {
            Self::Compass(view) => view.draw(canvas, params),
            Self::Reticle(view) => view.draw(canvas, params),
        }
    }

    /// Number of published screen-space vertices.
    pub fn published_len(&self) -> usize {
        match self {
            Self::Compass(view) => view.points().len(),
            Self::Reticle(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_track_each_contribution() {
        let mut batch = VertexBatch::new();
        let a = batch.extend_from_slice(&[Point3::X, Point3::Y]);
        let b = batch.extend_from_slice(&[Point3::Z]);

        assert_eq!(a, 0..2);
        assert_eq!(b, 2..3);
        assert_eq!(batch.span(b), &[Point3::Z]);

        batch.clear();
        assert!(batch.span(a).is_empty());
    }

    #[test]
    fn reticle_contributes_nothing() {
        let mut reticle = Component::Reticle(Reticle);
        let mut batch = VertexBatch::new();
        reticle.reset_points();
        reticle.add_to(&mut batch);
        assert!(batch.is_empty());
        assert_eq!(reticle.view().published_len(), 0);
    }

    #[test]
    fn mismatched_view_is_left_alone() {
        let compass = Component::Compass(Compass::new(LabelStyle::default()));
        let mut view = ComponentView::Reticle(ReticleView);
        compass.prepare_draw(&VertexBatch::new(), &mut view);
        assert!(matches!(view, ComponentView::Reticle(_)));
    }
}
