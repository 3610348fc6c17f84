//! Projection settings and the per-vertex transforms.
//!
//! The world is rotated around a fixed camera looking down -Z. Vertices are
//! flipped into camera convention (`y` and `z` negated), multiplied by
//! `projection * rotation`, then mapped to pixels. The depth left in `z`
//! after the transform is positive exactly for vertices in front of the
//! camera; the compass uses it as its visibility test.

use crate::config::{OverlayConfig, ProjectionMode};
use crate::display::DisplayRotation;
use crate::transform::{Point3, Point4, Transform};

/// Far plane of the perspective projection.
pub const FAR_PLANE: f32 = 1000.0;

/// Projection matrices plus the viewport and settings they derive from.
#[derive(Debug, Clone)]
pub struct Projection {
    mode: ProjectionMode,
    field_of_view: f32,
    orthographic_scale: f32,
    width: u32,
    height: u32,
    aspect: f32,
    draw_radius: f32,
    perspective: Transform,
    orthographic: Transform,
}

impl Projection {
    /// Settings from `config`; not usable until [`Projection::set_layout`]
    /// has been given a non-empty viewport.
    pub fn new(config: &OverlayConfig) -> Self {
        let mut orthographic = Transform::new();
        orthographic.set_orthographic_2d(0.0, 0.0, 1.0, -1.0);

        Self {
            mode: config.projection_mode,
            field_of_view: config.field_of_view,
            orthographic_scale: config.orthographic_scale,
            width: 0,
            height: 0,
            aspect: 0.0,
            draw_radius: 0.0,
            perspective: Transform::IDENTITY,
            orthographic,
        }
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn orthographic_scale(&self) -> f32 {
        self.orthographic_scale
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Half the smaller viewport dimension.
    pub fn draw_radius(&self) -> f32 {
        self.draw_radius
    }

    pub fn perspective(&self) -> &Transform {
        &self.perspective
    }

    pub fn orthographic(&self) -> &Transform {
        &self.orthographic
    }

    /// Whether a non-empty viewport has been set.
    pub fn is_laid_out(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Records the viewport and rebuilds the perspective matrix.
    ///
    /// Callers must pass non-zero dimensions.
    pub fn set_layout(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.aspect = width as f32 / height as f32;
        self.draw_radius = width.min(height) as f32 * 0.5;
        self.rebuild_perspective();
    }

    pub fn set_field_of_view(&mut self, degrees: f32) {
        self.field_of_view = degrees;
        self.rebuild_perspective();
    }

    /// The orthographic matrix is fixed; the scale is applied per vertex.
    pub fn set_orthographic_scale(&mut self, scale: f32) {
        self.orthographic_scale = scale;
    }

    pub fn set_mode(&mut self, mode: ProjectionMode) {
        self.mode = mode;
    }

    /// The near plane tracks the aspect ratio (`1 - aspect`).
    fn rebuild_perspective(&mut self) {
        if self.is_laid_out() {
            self.perspective.set_perspective(
                1.0 - self.aspect,
                FAR_PLANE,
                self.field_of_view,
                self.aspect,
            );
        }
    }

    /// `projection * rotation` for the given mode.
    pub fn model_view(&self, mode: ProjectionMode, rotation: &Transform) -> Transform {
        let mut model_view = match mode {
            ProjectionMode::Perspective => self.perspective,
            ProjectionMode::Orthographic => self.orthographic,
        };
        model_view.multiply(rotation);
        model_view
    }

    /// Projects model-space vertices to pixels in place with perspective.
    ///
    /// The half-turn display branch mirrors x and y after the divide and
    /// uses the projection matrix alone.
    pub fn project_perspective(
        &self,
        rotation: &Transform,
        display_rotation: DisplayRotation,
        vertices: &mut [Point3],
    ) {
        let width = self.width as f32;
        let height = self.height as f32;

        let (transform, mirror) = if display_rotation.is_mirrored() {
            (self.perspective, -1.0)
        } else {
            (self.model_view(ProjectionMode::Perspective, rotation), 1.0)
        };

        for v in vertices {
            let clip = transform.apply(camera_space(*v));
            v.x = (mirror * clip.x / clip.w + 1.0) * 0.5 * width;
            v.y = height - (mirror * clip.y / clip.w + 1.0) * 0.5 * height;
            v.z = clip.z;
        }
    }

    /// Projects model-space vertices to pixels in place orthographically.
    ///
    /// The unit of the projection is half the viewport width times the
    /// orthographic scale, centered on a square of the viewport's width that
    /// is itself centered vertically. The half-turn display branch mirrors x
    /// and y.
    pub fn project_orthographic(
        &self,
        rotation: &Transform,
        display_rotation: DisplayRotation,
        vertices: &mut [Point3],
    ) {
        let width = self.width as f32;
        let center_x = (self.width / 2) as f32;
        let offset_y = ((self.height as i64 - self.width as i64) / 2) as f32;
        let mirror = if display_rotation.is_mirrored() { -1.0 } else { 1.0 };

        let model_view = self.model_view(ProjectionMode::Orthographic, rotation);

        for v in vertices {
            let clip = model_view.apply(camera_space(*v));
            v.x = mirror * clip.x * 0.5 * width * self.orthographic_scale + center_x;
            v.y = mirror * clip.y * 0.5 * width * self.orthographic_scale + center_x + offset_y;
            v.z = clip.z * 0.5 * width * self.orthographic_scale;
        }
    }
}

/// Flips a model-space point into camera convention as a direction.
#[inline]
fn camera_space(v: Point3) -> Point4 {
    Point4::new(v.x, -v.y, -v.z, 0.0)
}
