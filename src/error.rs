//! Error type shared by the overlay pipeline, configuration and viewer.

use thiserror::Error;

/// Errors surfaced by the overlay.
///
/// The per-vertex transform path never produces errors; these cover
/// preconditions checked at the entry points and resource loading in the
/// viewer.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// A layout pass reported a zero-sized viewport.
    #[error("invalid layout {width}x{height}: both dimensions must be non-zero")]
    InvalidLayout { width: u32, height: u32 },

    /// A rotation arrived before the first valid layout.
    #[error("rotation update received before the first layout pass")]
    NotLaidOut,

    /// A configuration value fell outside its allowed range.
    #[error("{setting} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        setting: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Font data could not be parsed.
    #[error("font error: {0}")]
    Font(String),

    /// A file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// GPU adapter, device or surface setup failed.
    #[error("GPU error: {0}")]
    Gpu(String),

    /// The window or its event loop could not be created.
    #[error("window error: {0}")]
    Window(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_the_setting() {
        let err = OverlayError::OutOfRange {
            setting: "field_of_view",
            value: 200.0,
            min: 10.0,
            max: 175.0,
        };
        assert_eq!(err.to_string(), "field_of_view = 200 is outside [10, 175]");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.ttf");
        let err: OverlayError = io.into();
        assert!(matches!(err, OverlayError::Io(_)));
    }
}
