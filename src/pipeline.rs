//! The overlay pipeline: rotation in, published screen-space geometry out.
//!
//! [`OverlayPipeline`] is driven from a single producer (sensor updates and
//! settings changes). It transforms vertices in scratch storage it owns and
//! only takes the publishing lock to copy results out. A [`FrameReader`] handed
//! to the render side takes the same lock to draw, so a draw never observes a
//! half-published frame.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::canvas::Canvas;
use crate::components::{
    Compass, Component, ComponentView, DrawParams, LabelStyle, NUM_POINTS, Reticle, VertexBatch,
};
use crate::config::{OverlayConfig, ProjectionMode, SettingRange};
use crate::display::{DisplayRotation, rotation_from_row_major};
use crate::error::{OverlayError, Result};
use crate::orientation::{LookDirectionEstimator, Orientation, OrientationEstimator};
use crate::projection::Projection;
use crate::transform::Transform;

/// Callbacks from the pipeline to whatever hosts it.
///
/// Both are invoked on the producer thread, after the publishing lock has been
/// released.
pub trait OverlayHost: Send + Sync {
    /// A new frame is ready to draw.
    fn request_redraw(&self);

    /// Human-readable orientation and projection settings changed.
    fn display_text(&self, _text: &str) {}
}

/// Everything the render side reads, guarded by one lock.
#[derive(Debug)]
pub struct PublishedFrame {
    views: Vec<ComponentView>,
    orientation: Orientation,
    draw_radius: f32,
}

impl PublishedFrame {
    pub fn views(&self) -> &[ComponentView] {
        &self.views
    }

    /// Orientation derived from the last published rotation.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn draw_radius(&self) -> f32 {
        self.draw_radius
    }
}

/// Render-side handle onto the published frame.
#[derive(Clone)]
pub struct FrameReader {
    frame: Arc<Mutex<PublishedFrame>>,
}

impl FrameReader {
    /// Draws every component in order, compass first.
    ///
    /// Text is counter-rotated by the roll truncated to whole degrees.
    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let mut frame = self.frame.lock();
        let params = DrawParams {
            draw_radius: frame.draw_radius,
            text_rotation: -frame.orientation.roll.trunc(),
            width: canvas.width(),
            height: canvas.height(),
        };
        for view in frame.views.iter_mut() {
            view.draw(canvas, &params);
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.frame.lock().orientation
    }

    /// Runs `f` with the lock held.
    pub fn with_frame<R>(&self, f: impl FnOnce(&PublishedFrame) -> R) -> R {
        f(&self.frame.lock())
    }
}

/// Owns projection state, component scratch data and the published frame.
pub struct OverlayPipeline {
    projection: Projection,
    display_rotation: DisplayRotation,
    field_of_view_range: SettingRange,
    orthographic_scale_range: SettingRange,
    components: Vec<Component>,
    perspective_batch: VertexBatch,
    orthographic_batch: VertexBatch,
    orientation: Orientation,
    estimator: Box<dyn OrientationEstimator>,
    published: Arc<Mutex<PublishedFrame>>,
    host: Arc<dyn OverlayHost>,
}

impl OverlayPipeline {
    pub fn new(config: OverlayConfig, host: Arc<dyn OverlayHost>) -> Result<Self> {
        config.validate()?;

        let labels = LabelStyle {
            enabled: config.show_labels,
            size: config.label_size,
            ..LabelStyle::default()
        };
        let components = vec![
            Component::Compass(Compass::new(labels)),
            Component::Reticle(Reticle),
        ];
        let views = components.iter().map(Component::view).collect();

        Ok(Self {
            projection: Projection::new(&config),
            display_rotation: config.display_rotation,
            field_of_view_range: config.field_of_view_range,
            orthographic_scale_range: config.orthographic_scale_range,
            components,
            perspective_batch: VertexBatch::with_capacity(NUM_POINTS),
            orthographic_batch: VertexBatch::with_capacity(NUM_POINTS),
            orientation: Orientation::default(),
            estimator: Box::new(LookDirectionEstimator),
            published: Arc::new(Mutex::new(PublishedFrame {
                views,
                orientation: Orientation::default(),
                draw_radius: 0.0,
            })),
            host,
        })
    }

    /// Replaces the orientation estimator.
    pub fn with_estimator(mut self, estimator: impl OrientationEstimator + 'static) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    /// A handle for the render side.
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            frame: Arc::clone(&self.published),
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn display_rotation(&self) -> DisplayRotation {
        self.display_rotation
    }

    /// Orientation derived from the last rotation applied.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn field_of_view_range(&self) -> SettingRange {
        self.field_of_view_range
    }

    pub fn orthographic_scale_range(&self) -> SettingRange {
        self.orthographic_scale_range
    }

    /// Records a new viewport.
    pub fn layout_changed(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            warn!("ignoring layout {width}x{height}");
            return Err(OverlayError::InvalidLayout { width, height });
        }

        self.projection.set_layout(width, height);
        self.published.lock().draw_radius = self.projection.draw_radius();
        debug!(
            "layout: {width} x {height} aspect: {}",
            self.projection.aspect()
        );

        self.refresh_display_text();
        Ok(())
    }

    pub fn field_of_view_changed(&mut self, degrees: f32) -> Result<()> {
        let degrees = self.field_of_view_range.check("field_of_view", degrees)?;
        self.projection.set_field_of_view(degrees);
        debug!("field of view: {degrees}");
        self.refresh_display_text();
        Ok(())
    }

    pub fn orthographic_scale_changed(&mut self, scale: f32) -> Result<()> {
        let scale = self
            .orthographic_scale_range
            .check("orthographic_scale", scale)?;
        self.projection.set_orthographic_scale(scale);
        debug!("orthographic scale: {scale}");
        self.refresh_display_text();
        Ok(())
    }

    pub fn projection_mode_changed(&mut self, mode: ProjectionMode) {
        self.projection.set_mode(mode);
        debug!("projection mode: {mode:?}");
        self.refresh_display_text();
    }

    pub fn display_rotation_changed(&mut self, rotation: DisplayRotation) {
        if rotation != self.display_rotation {
            debug!("display rotation: {}", rotation.degrees());
            self.display_rotation = rotation;
        }
    }

    /// Entry point for platform sensor matrices.
    ///
    /// `values` is a row-major world->device rotation as platforms report it;
    /// it is remapped for `display_rotation` and applied.
    pub fn orientation_update(
        &mut self,
        values: &[f32; 16],
        display_rotation: DisplayRotation,
    ) -> Result<()> {
        self.display_rotation_changed(display_rotation);
        let remapped = display_rotation.remap_row_major(values);
        self.apply_rotation(&rotation_from_row_major(&remapped))
    }

    /// Transforms and publishes one frame for `rotation`.
    ///
    /// `rotation` maps world to device coordinates and must be orthonormal.
    pub fn apply_rotation(&mut self, rotation: &Transform) -> Result<()> {
        if !self.projection.is_laid_out() {
            warn!("dropping rotation update before first layout");
            return Err(OverlayError::NotLaidOut);
        }
        let started = Instant::now();

        self.perspective_batch.clear();
        self.orthographic_batch.clear();
        for component in &mut self.components {
            component.reset_points();
        }

        let mode = self.projection.mode();
        let batch = match mode {
            ProjectionMode::Perspective => &mut self.perspective_batch,
            ProjectionMode::Orthographic => &mut self.orthographic_batch,
        };
        for component in &mut self.components {
            component.add_to(batch);
        }

        if !self.perspective_batch.is_empty() {
            self.projection.project_perspective(
                rotation,
                self.display_rotation,
                self.perspective_batch.vertices_mut(),
            );
        }
        if !self.orthographic_batch.is_empty() {
            self.projection.project_orthographic(
                rotation,
                self.display_rotation,
                self.orthographic_batch.vertices_mut(),
            );
        }

        let active = match mode {
            ProjectionMode::Perspective => &self.perspective_batch,
            ProjectionMode::Orthographic => &self.orthographic_batch,
        };
        self.orientation = {
            let mut frame = self.published.lock();
            for (component, view) in self.components.iter().zip(frame.views.iter_mut()) {
                component.prepare_draw(active, view);
            }
            let orientation = self
                .estimator
                .estimate(&rotation.matrix(), self.display_rotation);
            frame.orientation = orientation;
            orientation
        };

        self.refresh_display_text();
        self.host.request_redraw();
        trace!("frame published in {:?}", started.elapsed());
        Ok(())
    }

    /// Current orientation and projection setting as shown to the user.
    pub fn display_text(&self) -> String {
        format_display_text(
            self.orientation,
            self.projection.mode(),
            self.projection.field_of_view(),
            self.projection.orthographic_scale(),
        )
    }

    fn refresh_display_text(&self) {
        self.host.display_text(&self.display_text());
    }
}

/// Formats orientation plus the active projection setting, one value per line.
pub fn format_display_text(
    orientation: Orientation,
    mode: ProjectionMode,
    field_of_view: f32,
    orthographic_scale: f32,
) -> String {
    let setting = match mode {
        ProjectionMode::Perspective => format!("v fov\n{field_of_view:.1}°"),
        ProjectionMode::Orthographic => format!("scale\n{orthographic_scale:.1}"),
    };
    format!(
        "{:.1}°\n{:.1}°\n{:.1}°\n\n{setting}",
        orientation.bearing, orientation.pitch, orientation.roll
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TestHost {
        redraws: AtomicUsize,
        text: Mutex<String>,
    }

    impl OverlayHost for TestHost {
        fn request_redraw(&self) {
            self.redraws.fetch_add(1, Ordering::SeqCst);
        }

        fn display_text(&self, text: &str) {
            *self.text.lock() = text.to_owned();
        }
    }

    fn pipeline() -> (OverlayPipeline, Arc<TestHost>) {
        let host = Arc::new(TestHost::default());
        let pipeline = OverlayPipeline::new(OverlayConfig::default(), host.clone()).unwrap();
        (pipeline, host)
    }

    #[test]
    fn rotation_before_layout_is_rejected() {
        let (mut pipeline, host) = pipeline();
        let err = pipeline.apply_rotation(&Transform::IDENTITY).unwrap_err();
        assert!(matches!(err, OverlayError::NotLaidOut));
        assert_eq!(host.redraws.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.reader().with_frame(|f| f.views()[0].published_len()), 0);
    }

    #[test]
    fn zero_layout_is_rejected() {
        let (mut pipeline, _) = pipeline();
        assert!(matches!(
            pipeline.layout_changed(0, 100),
            Err(OverlayError::InvalidLayout { width: 0, height: 100 })
        ));
        assert!(!pipeline.projection().is_laid_out());
    }

    #[test]
    fn update_publishes_and_requests_redraw() {
        let (mut pipeline, host) = pipeline();
        pipeline.layout_changed(720, 1280).unwrap();
        pipeline.apply_rotation(&Transform::IDENTITY).unwrap();

        assert_eq!(host.redraws.load(Ordering::SeqCst), 1);
        let reader = pipeline.reader();
        reader.with_frame(|frame| {
            assert_eq!(frame.views()[0].published_len(), NUM_POINTS);
            assert_eq!(frame.draw_radius(), 360.0);
        });
        assert_eq!(reader.orientation(), pipeline.orientation());
    }

    #[test]
    fn out_of_range_settings_leave_state_alone() {
        let (mut pipeline, _) = pipeline();
        assert!(pipeline.field_of_view_changed(5.0).is_err());
        assert!(pipeline.orthographic_scale_changed(8.0).is_err());
        assert_eq!(pipeline.projection().field_of_view(), 40.0);
        assert_eq!(pipeline.projection().orthographic_scale(), 1.0);

        pipeline.field_of_view_changed(175.0).unwrap();
        assert_eq!(pipeline.projection().field_of_view(), 175.0);
    }

    #[test]
    fn settings_changes_refresh_display_text() {
        let (mut pipeline, host) = pipeline();
        pipeline.field_of_view_changed(62.5).unwrap();
        assert_eq!(*host.text.lock(), "0.0°\n0.0°\n0.0°\n\nv fov\n62.5°");

        pipeline.projection_mode_changed(ProjectionMode::Orthographic);
        pipeline.orthographic_scale_changed(2.5).unwrap();
        assert!(host.text.lock().ends_with("\n\nscale\n2.5"));
    }

    #[test]
    fn display_text_format() {
        let text = format_display_text(
            Orientation::new(271.3, -12.0, 3.0),
            ProjectionMode::Perspective,
            40.0,
            1.0,
        );
        assert_eq!(text, "271.3°\n-12.0°\n3.0°\n\nv fov\n40.0°");

        let text = format_display_text(
            Orientation::default(),
            ProjectionMode::Orthographic,
            40.0,
            0.5,
        );
        assert_eq!(text, "0.0°\n0.0°\n0.0°\n\nscale\n0.5");
    }

    #[test]
    fn draw_passes_truncated_negated_roll() {
        struct FixedRoll;
        impl OrientationEstimator for FixedRoll {
            fn estimate(&self, _: &glam::Mat4, _: DisplayRotation) -> Orientation {
                Orientation::new(0.0, 0.0, 12.7)
            }
        }

        let host = Arc::new(TestHost::default());
        let mut pipeline = OverlayPipeline::new(OverlayConfig::default(), host)
            .unwrap()
            .with_estimator(FixedRoll);
        pipeline.layout_changed(500, 500).unwrap();
        pipeline.apply_rotation(&Transform::IDENTITY).unwrap();

        let mut canvas = RecordingCanvas::new(500, 500);
        pipeline.reader().draw(&mut canvas);
        let rotated = canvas.commands().iter().any(|cmd| {
            matches!(cmd, crate::canvas::DrawCmd::Rotate { degrees, .. } if *degrees == -12.0)
        });
        assert!(rotated);
    }

    #[test]
    fn orthographic_mode_uses_its_own_batch() {
        let (mut pipeline, _) = pipeline();
        pipeline.layout_changed(1000, 1000).unwrap();
        pipeline.projection_mode_changed(ProjectionMode::Orthographic);
        pipeline.apply_rotation(&Transform::IDENTITY).unwrap();

        assert!(pipeline.perspective_batch.is_empty());
        assert_eq!(pipeline.orthographic_batch.len(), NUM_POINTS);
        // North on the horizon sits one unit above the view center.
        let north = pipeline.reader().with_frame(|frame| match &frame.views()[0] {
            ComponentView::Compass(view) => view.points()[5 * 72],
            ComponentView::Reticle(_) => unreachable!(),
        });
        assert!((north.x - 500.0).abs() < 1e-2);
        assert!((north.y + 500.0).abs() < 1e-2);
    }
}
