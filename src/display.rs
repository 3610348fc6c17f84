//! Display rotation and the sensor-matrix conventions tied to it.

use crate::transform::Transform;

/// How the physical display is turned relative to its natural orientation.
///
/// Read once from the host when the overlay is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DisplayRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl DisplayRotation {
    /// From a count of clockwise quarter turns; wraps modulo four.
    pub fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            0 => Self::Rotation0,
            1 => Self::Rotation90,
            2 => Self::Rotation180,
            _ => Self::Rotation270,
        }
    }

    /// From a multiple of 90 degrees (negative values wrap); `None` otherwise.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        let wrapped = degrees.rem_euclid(360);
        (wrapped % 90 == 0).then(|| Self::from_quarter_turns((wrapped / 90) as u32))
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation90 => 90,
            Self::Rotation180 => 180,
            Self::Rotation270 => 270,
        }
    }

    /// Whether the pipeline mirrors x and y for this rotation.
    ///
    /// 90 and 270 are handled by remapping the sensor axes before the matrix
    /// reaches the pipeline; 180 cannot be expressed that way and is mirrored
    /// after projection instead.
    pub fn is_mirrored(self) -> bool {
        self == Self::Rotation180
    }

    /// Remaps a row-major 4x4 sensor rotation matrix into the axis convention
    /// of this display rotation.
    ///
    /// 0 and 180 are returned unchanged. For 90 each row `(a, b, c)` becomes
    /// `(-b, a, c)`; 270 is the opposite quarter turn, `(b, -a, c)`. The
    /// fourth row and column are reset to those of a pure rotation.
    pub fn remap_row_major(self, values: &[f32; 16]) -> [f32; 16] {
        let (sign_x, sign_y) = match self {
            Self::Rotation0 | Self::Rotation180 => return *values,
            Self::Rotation90 => (-1.0, 1.0),
            Self::Rotation270 => (1.0, -1.0),
        };

        let mut out = [0.0; 16];
        for row in 0..3 {
            let at = row * 4;
            out[at] = sign_x * values[at + 1];
            out[at + 1] = sign_y * values[at];
            out[at + 2] = values[at + 2];
        }
        out[15] = 1.0;
        out
    }
}

/// Interprets a platform row-major sensor rotation matrix as the column-major
/// transform the pipeline consumes.
///
/// The values are taken in memory order, so the resulting transform is the
/// transpose of the sensor matrix: it maps world (east, north, up) vectors
/// into device coordinates.
pub fn rotation_from_row_major(values: &[f32; 16]) -> Transform {
    Transform::from_cols_array(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn degrees_round_trip() {
        for rotation in [
            DisplayRotation::Rotation0,
            DisplayRotation::Rotation90,
            DisplayRotation::Rotation180,
            DisplayRotation::Rotation270,
        ] {
            assert_eq!(DisplayRotation::from_degrees(rotation.degrees() as i32), Some(rotation));
        }
        assert_eq!(DisplayRotation::from_degrees(-90), Some(DisplayRotation::Rotation270));
        assert_eq!(DisplayRotation::from_degrees(45), None);
        assert_eq!(DisplayRotation::from_quarter_turns(6), DisplayRotation::Rotation180);
    }

    #[test]
    fn only_half_turn_is_mirrored() {
        assert!(DisplayRotation::Rotation180.is_mirrored());
        assert!(!DisplayRotation::Rotation90.is_mirrored());
    }

    #[rustfmt::skip]
    const SAMPLE: [f32; 16] = [
        1.0, 2.0, 3.0, 0.0,
        4.0, 5.0, 6.0, 0.0,
        7.0, 8.0, 9.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn quarter_turn_remaps_columns() {
        let out = DisplayRotation::Rotation90.remap_row_major(&SAMPLE);
        #[rustfmt::skip]
        let expected = [
            -2.0, 1.0, 3.0, 0.0,
            -5.0, 4.0, 6.0, 0.0,
            -8.0, 7.0, 9.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        assert_eq!(out, expected);

        let back = DisplayRotation::Rotation270.remap_row_major(&out);
        assert_eq!(back, SAMPLE);
    }

    #[test]
    fn upright_and_half_turn_pass_through() {
        assert_eq!(DisplayRotation::Rotation0.remap_row_major(&SAMPLE), SAMPLE);
        assert_eq!(DisplayRotation::Rotation180.remap_row_major(&SAMPLE), SAMPLE);
    }

    #[test]
    fn row_major_input_is_transposed() {
        let t = rotation_from_row_major(&SAMPLE);
        let p = t.apply(Vec4::new(1.0, 0.0, 0.0, 0.0));
        // first column of the transform = first row of the sensor matrix
        assert_eq!(p, Vec4::new(1.0, 2.0, 3.0, 0.0));
    }
}
