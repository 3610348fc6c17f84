//! Deriving bearing, pitch and roll from the device rotation.
//!
//! The pipeline treats this as a pluggable capability: anything implementing
//! [`OrientationEstimator`] can be installed. [`LookDirectionEstimator`] is
//! the default and reads the orientation off the direction the back of the
//! device points at.

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::display::DisplayRotation;

/// Device orientation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Orientation {
    /// Clockwise from north, `[0, 360)`.
    pub bearing: f32,
    /// Elevation of the viewing direction above the horizon, `[-90, 90]`.
    pub pitch: f32,
    /// Clockwise tilt about the viewing direction, `(-180, 180]`.
    pub roll: f32,
}

impl Orientation {
    pub fn new(bearing: f32, pitch: f32, roll: f32) -> Self {
        Self {
            bearing,
            pitch,
            roll,
        }
    }

    /// `[bearing, pitch, roll]`.
    pub fn to_array(self) -> [f32; 3] {
        [self.bearing, self.pitch, self.roll]
    }

    /// World->device rotation of a device whose back faces `bearing` at
    /// `pitch`, rolled clockwise by `roll`.
    ///
    /// [`LookDirectionEstimator`] reads the same orientation back, outside
    /// the straight up/down singularity.
    pub fn to_rotation(self) -> Mat4 {
        // Device frame in world space before any turn: looking north, upright.
        let base = Mat4::from_cols(
            Vec3::X.extend(0.0),
            Vec3::Z.extend(0.0),
            (-Vec3::Y).extend(0.0),
            Vec4::W,
        );
        let turn = Quat::from_rotation_z(-self.bearing.to_radians())
            * Quat::from_rotation_x(self.pitch.to_radians())
            * Quat::from_rotation_y(self.roll.to_radians());
        (Mat4::from_quat(turn) * base).transpose()
    }
}

/// Derives an [`Orientation`] from a rotation matrix.
///
/// `rotation` maps world vectors (x east, y north, z up) into device
/// coordinates and must be orthonormal; implementations are not expected to
/// validate it. Implementations must be deterministic.
pub trait OrientationEstimator: Send {
    fn estimate(&self, rotation: &Mat4, display_rotation: DisplayRotation) -> Orientation;
}

/// Reads orientation from where the rear camera points.
///
/// The viewing direction is the device's -Z axis. Bearing and pitch come
/// from that direction; roll is the angle between the device's X axis and
/// the level horizontal through the view. Looking straight up or down the
/// bearing is taken from the device's top edge instead and roll is 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct LookDirectionEstimator;

const DEGENERATE_ELEVATION: f32 = 1.0 - 1e-6;

impl OrientationEstimator for LookDirectionEstimator {
    fn estimate(&self, rotation: &Mat4, display_rotation: DisplayRotation) -> Orientation {
        // Rows of the world->device matrix are the device axes in world space.
        let mut right = rotation.row(0).truncate();
        let up = rotation.row(1).truncate();
        let look = -rotation.row(2).truncate();

        // Half-turn displays are not remapped upstream, so the device's
        // horizontal axis is reversed.
        if display_rotation.is_mirrored() {
            right = -right;
        }

        let pitch = look.z.clamp(-1.0, 1.0).asin().to_degrees();

        if look.z.abs() >= DEGENERATE_ELEVATION {
            let heading = if look.z > 0.0 { -up } else { up };
            return Orientation::new(bearing_of(heading), pitch, 0.0);
        }

        let level_up = (Vec3::Z - look * look.z).normalize();
        let level_right = look.cross(level_up);
        let roll = (-right.dot(level_up))
            .atan2(right.dot(level_right))
            .to_degrees();

        Orientation::new(bearing_of(look), pitch, roll)
    }
}

/// Compass bearing of the horizontal part of `v`, clockwise from north.
fn bearing_of(v: Vec3) -> f32 {
    let degrees = v.x.atan2(v.y).to_degrees();
    if degrees < 0.0 { degrees + 360.0 } else { degrees }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn device(bearing: f32, pitch: f32, roll: f32) -> Mat4 {
        Orientation::new(bearing, pitch, roll).to_rotation()
    }

    #[test]
    fn upright_facing_north() {
        let o = LookDirectionEstimator.estimate(&device(0.0, 0.0, 0.0), DisplayRotation::Rotation0);
        assert!(close(o.bearing, 0.0), "{o:?}");
        assert!(close(o.pitch, 0.0), "{o:?}");
        assert!(close(o.roll, 0.0), "{o:?}");
    }

    #[test]
    fn bearing_increases_clockwise() {
        let east = LookDirectionEstimator.estimate(&device(90.0, 0.0, 0.0), DisplayRotation::Rotation0);
        assert!(close(east.bearing, 90.0), "{east:?}");

        let west = LookDirectionEstimator.estimate(&device(270.0, 0.0, 0.0), DisplayRotation::Rotation0);
        assert!(close(west.bearing, 270.0), "{west:?}");
    }

    #[test]
    fn pitch_is_elevation() {
        let o = LookDirectionEstimator.estimate(&device(45.0, 30.0, 0.0), DisplayRotation::Rotation0);
        assert!(close(o.bearing, 45.0), "{o:?}");
        assert!(close(o.pitch, 30.0), "{o:?}");
        assert!(close(o.roll, 0.0), "{o:?}");
    }

    #[test]
    fn roll_is_clockwise_tilt() {
        let o = LookDirectionEstimator.estimate(&device(0.0, 10.0, 20.0), DisplayRotation::Rotation0);
        assert!(close(o.roll, 20.0), "{o:?}");
        assert!(close(o.pitch, 10.0), "{o:?}");
    }

    #[test]
    fn half_turn_display_flips_roll() {
        let o = LookDirectionEstimator.estimate(&device(0.0, 0.0, 0.0), DisplayRotation::Rotation180);
        assert!(close(o.roll.abs(), 180.0), "{o:?}");
        assert!(close(o.bearing, 0.0), "{o:?}");
    }

    #[test]
    fn looking_straight_down_uses_top_edge() {
        let o = LookDirectionEstimator.estimate(&device(90.0, -90.0, 0.0), DisplayRotation::Rotation0);
        // asin is steep near -1, so allow for rounding in the quaternion
        assert!((o.pitch + 90.0).abs() < 0.1, "{o:?}");
        assert!(close(o.bearing, 90.0), "{o:?}");
        assert_eq!(o.roll, 0.0);
    }
}
