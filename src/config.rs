//! Overlay configuration and the slider mapping used by host controls.

use crate::display::DisplayRotation;
use crate::error::{OverlayError, Result};

pub const DEFAULT_FIELD_OF_VIEW: f32 = 40.0;
pub const MIN_FIELD_OF_VIEW: f32 = 10.0;
pub const MAX_FIELD_OF_VIEW: f32 = 175.0;

pub const DEFAULT_ORTHOGRAPHIC_SCALE: f32 = 1.0;
pub const MIN_ORTHOGRAPHIC_SCALE: f32 = 0.25;
pub const MAX_ORTHOGRAPHIC_SCALE: f32 = 7.0;

/// Which projection the compass is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
}

impl ProjectionMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Perspective => Self::Orthographic,
            Self::Orthographic => Self::Perspective,
        }
    }
}

/// Inclusive range of a tunable setting, with a 0..=1000 slider mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SettingRange {
    pub min: f32,
    pub max: f32,
}

impl SettingRange {
    /// Resolution of host sliders.
    pub const SLIDER_STEPS: u32 = 1000;

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Value for a slider position; positions past the end are clamped.
    pub fn from_progress(&self, progress: u32) -> f32 {
        let progress = progress.min(Self::SLIDER_STEPS);
        self.min + progress as f32 / Self::SLIDER_STEPS as f32 * (self.max - self.min)
    }

    /// Slider position for a value, truncated toward the minimum.
    pub fn to_progress(&self, value: f32) -> u32 {
        let t = (value - self.min) / (self.max - self.min);
        (t * Self::SLIDER_STEPS as f32).clamp(0.0, Self::SLIDER_STEPS as f32) as u32
    }

    /// Returns `value` if it lies in the range.
    pub fn check(&self, setting: &'static str, value: f32) -> Result<f32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(OverlayError::OutOfRange {
                setting,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Initial settings for an overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    pub projection_mode: ProjectionMode,
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    pub field_of_view_range: SettingRange,
    pub orthographic_scale: f32,
    pub orthographic_scale_range: SettingRange,
    pub display_rotation: DisplayRotation,
    /// Base label size in pixels; cardinal and degree labels scale from it.
    pub label_size: f32,
    pub show_labels: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            projection_mode: ProjectionMode::Perspective,
            field_of_view: DEFAULT_FIELD_OF_VIEW,
            field_of_view_range: SettingRange::new(MIN_FIELD_OF_VIEW, MAX_FIELD_OF_VIEW),
            orthographic_scale: DEFAULT_ORTHOGRAPHIC_SCALE,
            orthographic_scale_range: SettingRange::new(
                MIN_ORTHOGRAPHIC_SCALE,
                MAX_ORTHOGRAPHIC_SCALE,
            ),
            display_rotation: DisplayRotation::Rotation0,
            label_size: 20.0,
            show_labels: true,
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection_mode(mut self, mode: ProjectionMode) -> Self {
        self.projection_mode = mode;
        self
    }

    pub fn field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view = degrees;
        self
    }

    pub fn orthographic_scale(mut self, scale: f32) -> Self {
        self.orthographic_scale = scale;
        self
    }

    pub fn display_rotation(mut self, rotation: DisplayRotation) -> Self {
        self.display_rotation = rotation;
        self
    }

    pub fn label_size(mut self, size: f32) -> Self {
        self.label_size = size;
        self
    }

    pub fn show_labels(mut self, show: bool) -> Self {
        self.show_labels = show;
        self
    }

    /// Checks the initial values against their ranges.
    pub fn validate(&self) -> Result<()> {
        self.field_of_view_range
            .check("field_of_view", self.field_of_view)?;
        self.orthographic_scale_range
            .check("orthographic_scale", self.orthographic_scale)?;
        Ok(())
    }
}

/// Picks the camera field of view matching the layout: horizontal for
/// landscape, vertical otherwise.
pub fn field_of_view_from_camera(
    width: u32,
    height: u32,
    horizontal_degrees: f32,
    vertical_degrees: f32,
) -> f32 {
    if width > height {
        horizontal_degrees
    } else {
        vertical_degrees
    }
}
