use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::error;

use compass_overlay::viewer::{self, ViewerOptions};
use compass_overlay::{
    DEFAULT_FIELD_OF_VIEW, DEFAULT_ORTHOGRAPHIC_SCALE, DisplayRotation, LoggingConfig,
    Orientation, OverlayConfig, OverlayError, ProjectionMode, init_logging,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Projection {
    Perspective,
    Orthographic,
}

impl From<Projection> for ProjectionMode {
    fn from(projection: Projection) -> Self {
        match projection {
            Projection::Perspective => ProjectionMode::Perspective,
            Projection::Orthographic => ProjectionMode::Orthographic,
        }
    }
}

/// `compass-overlay` - an AR compass grid over a simulated device orientation.
///
/// Arrows turn and tilt the device, Q/E roll it, P toggles the projection,
/// +/- zoom and Esc quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Window width in logical pixels.
    #[arg(long, default_value_t = 720)]
    width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 1280)]
    height: u32,

    /// Initial vertical field of view in degrees.
    #[arg(long, default_value_t = DEFAULT_FIELD_OF_VIEW)]
    fov: f32,

    /// Initial orthographic scale.
    #[arg(long, default_value_t = DEFAULT_ORTHOGRAPHIC_SCALE)]
    scale: f32,

    #[arg(long, value_enum, default_value_t = Projection::Perspective)]
    projection: Projection,

    /// Display rotation in degrees: 0, 90, 180 or 270.
    #[arg(long, default_value_t = 0)]
    display_rotation: i32,

    /// TTF/OTF font used for labels. Without one only the grid is drawn.
    #[arg(long, env = "COMPASS_OVERLAY_FONT")]
    font: Option<PathBuf>,

    /// Starting bearing in degrees.
    #[arg(long, default_value_t = 0.0)]
    bearing: f32,

    /// Starting pitch in degrees.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pitch: f32,

    /// Degrees per second the device turns on its own.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    spin: f32,

    /// Log filter, e.g. `debug` or `compass_overlay=trace`. Falls back to
    /// `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn into_options(self) -> Result<ViewerOptions, OverlayError> {
        let display_rotation = DisplayRotation::from_degrees(self.display_rotation).ok_or(
            OverlayError::OutOfRange {
                setting: "display_rotation",
                value: self.display_rotation as f32,
                min: 0.0,
                max: 270.0,
            },
        )?;

        let overlay = OverlayConfig::new()
            .projection_mode(self.projection.into())
            .field_of_view(self.fov)
            .orthographic_scale(self.scale)
            .display_rotation(display_rotation);
        overlay.validate()?;

        Ok(ViewerOptions {
            width: self.width,
            height: self.height,
            overlay,
            font: self.font,
            spin: self.spin,
            initial: Orientation::new(self.bearing, self.pitch, 0.0),
            ..ViewerOptions::default()
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut logging = LoggingConfig::new();
    if let Some(filter) = &args.log {
        logging = logging.filter(filter.clone());
    }
    init_logging(logging);

    let result = args.into_options().and_then(viewer::run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
