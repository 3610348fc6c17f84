//! Points and the composable 4x4 transform used by the projection pipeline.
//!
//! Matrices are column-major and act on column vectors, matching glam and the
//! GL convention: `multiply` right-multiplies, so in a chain the matrix named
//! last is applied to the vector first.

use glam::{Mat4, Vec3, Vec4};

/// A 3D point. Model-space on input, screen-space (pixels plus a retained
/// depth value) after the pipeline transforms it in place.
pub type Point3 = Vec3;

/// A homogeneous point, only used as scratch during projection.
pub type Point4 = Vec4;

/// A mutable 4x4 transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    matrix: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Transform {
    fn from(matrix: Mat4) -> Self {
        Self { matrix }
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        matrix: Mat4::IDENTITY,
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a transform from 16 column-major values.
    pub fn from_cols_array(values: &[f32; 16]) -> Self {
        Self {
            matrix: Mat4::from_cols_array(values),
        }
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Resets to the identity.
    pub fn identity(&mut self) -> &mut Self {
        self.matrix = Mat4::IDENTITY;
        self
    }

    /// `self = self * other`.
    pub fn multiply(&mut self, other: &Transform) -> &mut Self {
        self.matrix *= other.matrix;
        self
    }

    /// Sets a GL-style perspective projection.
    ///
    /// No range checks: the overlay passes `1 - aspect` as `near`, which is
    /// zero or negative for square and landscape views, and relies on the
    /// resulting depth sign rather than on clipping.
    pub fn set_perspective(
        &mut self,
        near: f32,
        far: f32,
        vertical_fov_degrees: f32,
        aspect: f32,
    ) -> &mut Self {
        let focal = 1.0 / (vertical_fov_degrees.to_radians() / 2.0).tan();
        let depth_scale = (far + near) / (near - far);
        let depth_offset = (2.0 * far * near) / (near - far);

        self.matrix = Mat4::from_cols(
            Vec4::new(focal / aspect, 0.0, 0.0, 0.0),
            Vec4::new(0.0, focal, 0.0, 0.0),
            Vec4::new(0.0, 0.0, depth_scale, -1.0),
            Vec4::new(0.0, 0.0, depth_offset, 0.0),
        );
        self
    }

    /// Sets an orthographic projection over the given rectangle with depth
    /// range `[0, 1]`.
    pub fn set_orthographic_2d(
        &mut self,
        left: f32,
        bottom: f32,
        right: f32,
        top: f32,
    ) -> &mut Self {
        let (near, far) = (0.0, 1.0);
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        self.matrix = Mat4::from_cols(
            Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
            Vec4::new(0.0, 0.0, -2.0 / depth, 0.0),
            Vec4::new(
                -(right + left) / width,
                -(top + bottom) / height,
                -(far + near) / depth,
                1.0,
            ),
        );
        self
    }

    /// Applies the transform to a homogeneous point.
    #[inline]
    pub fn apply(&self, point: Point4) -> Point4 {
        self.matrix * point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn identity_resets() {
        let mut t = Transform::from(Mat4::from_scale(Vec3::splat(3.0)));
        t.identity();
        assert_eq!(t, Transform::IDENTITY);
    }

    #[test]
    fn multiply_applies_last_operand_first() {
        let mut t = Transform::from(Mat4::from_scale(Vec3::splat(2.0)));
        t.multiply(&Transform::from(Mat4::from_translation(Vec3::X)));

        // translate then scale: (0 + 1) * 2
        let p = t.apply(Point4::new(0.0, 0.0, 0.0, 1.0));
        assert!(close(p.x, 2.0));
    }

    #[test]
    fn perspective_layout_is_gl_style() {
        let mut t = Transform::new();
        t.set_perspective(1.0, 3.0, 90.0, 2.0);
        let m = t.matrix();

        assert!(close(m.x_axis.x, 0.5));
        assert!(close(m.y_axis.y, 1.0));
        assert!(close(m.z_axis.z, -2.0));
        assert!(close(m.z_axis.w, -1.0));
        assert!(close(m.w_axis.z, -3.0));
        assert!(close(m.w_axis.w, 0.0));
    }

    #[test]
    fn perspective_w_is_negated_view_depth() {
        let mut t = Transform::new();
        t.set_perspective(0.25, 1000.0, 60.0, 0.75);
        let p = t.apply(Point4::new(0.3, -0.2, -4.0, 0.0));
        assert!(close(p.w, 4.0));
    }

    #[test]
    fn orthographic_2d_flipped_unit_square() {
        let mut t = Transform::new();
        t.set_orthographic_2d(0.0, 0.0, 1.0, -1.0);
        let m = t.matrix();

        assert!(close(m.x_axis.x, 2.0));
        assert!(close(m.y_axis.y, -2.0));
        assert!(close(m.z_axis.z, -2.0));
        assert!(close(m.w_axis.x, -1.0));
        assert!(close(m.w_axis.y, -1.0));
        assert!(close(m.w_axis.z, -1.0));

        // w = 0 input ignores the translation column
        let p = t.apply(Point4::new(0.5, 0.5, 0.5, 0.0));
        assert!(close(p.x, 1.0));
        assert!(close(p.y, -1.0));
        assert!(close(p.z, -1.0));
    }
}
