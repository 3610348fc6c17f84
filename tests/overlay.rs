use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use compass_overlay::components::{ComponentView, NUM_POINTS};
use compass_overlay::*;

#[derive(Default)]
struct CountingHost {
    redraws: AtomicUsize,
}

impl OverlayHost for CountingHost {
    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}

fn laid_out(width: u32, height: u32, config: OverlayConfig) -> (OverlayPipeline, Arc<CountingHost>) {
    let host = Arc::new(CountingHost::default());
    let mut pipeline = OverlayPipeline::new(config, host.clone()).unwrap();
    pipeline.layout_changed(width, height).unwrap();
    (pipeline, host)
}

fn rotation(bearing: f32, pitch: f32, roll: f32) -> Transform {
    Transform::from(Orientation::new(bearing, pitch, roll).to_rotation())
}

fn segments(canvas: &RecordingCanvas) -> usize {
    canvas
        .commands()
        .iter()
        .map(|cmd| match cmd {
            DrawCmd::Lines { points, .. } => points.len() / 4,
            _ => 0,
        })
        .sum()
}

fn texts_at(canvas: &RecordingCanvas, label: &str) -> Vec<(f32, f32)> {
    canvas
        .commands()
        .iter()
        .filter_map(|cmd| match cmd {
            DrawCmd::Text { text, x, y, paint } if text == label && paint.style == PaintStyle::Fill => {
                Some((*x, *y))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn level_north_view_draws_horizon_and_north_label() {
    let (mut pipeline, host) = laid_out(1080, 1920, OverlayConfig::default());
    pipeline.apply_rotation(&rotation(0.0, 0.0, 0.0)).unwrap();
    assert_eq!(host.redraws.load(Ordering::SeqCst), 1);

    let orientation = pipeline.orientation();
    assert!(orientation.bearing.abs() < 1e-3 || (orientation.bearing - 360.0).abs() < 1e-3);
    assert!(orientation.pitch.abs() < 1e-3);

    let mut canvas = RecordingCanvas::new(1080, 1920);
    pipeline.reader().draw(&mut canvas);

    // The north point of the horizon sits in the middle of the screen.
    let north = texts_at(&canvas, "N");
    assert!(
        north
            .iter()
            .any(|(x, y)| (x - 540.0).abs() < 0.5 && (y - 960.0).abs() < 0.5),
        "{north:?}"
    );
    assert!(texts_at(&canvas, "S").is_empty());

    // Front half of the horizon plus the north meridian, all red, plus the
    // two reticle arms.
    let red = canvas.segments_with_color(Color::RED);
    assert!(red > 30, "{red}");
    assert!(canvas.segments_with_color(Color::rgb8(55, 181, 229)) > 0);

    // Reticle ring centered with a tenth of the draw radius.
    let ring = canvas.commands().iter().find_map(|cmd| match cmd {
        DrawCmd::Circle { cx, cy, radius, .. } => Some((*cx, *cy, *radius)),
        _ => None,
    });
    assert_eq!(ring, Some((540.0, 960.0, 54.0)));
}

#[test]
fn rolled_device_counter_rotates_labels() {
    let (mut pipeline, _) = laid_out(800, 800, OverlayConfig::default());
    pipeline.apply_rotation(&rotation(30.0, 10.0, 25.4)).unwrap();
    assert!((pipeline.orientation().roll - 25.4).abs() < 1e-2);

    let mut canvas = RecordingCanvas::new(800, 800);
    pipeline.reader().draw(&mut canvas);

    let rotations: Vec<f32> = canvas
        .commands()
        .iter()
        .filter_map(|cmd| match cmd {
            DrawCmd::Rotate { degrees, .. } => Some(*degrees),
            _ => None,
        })
        .collect();
    assert!(!rotations.is_empty());
    assert!(rotations.iter().all(|d| *d == -25.0));

    let saves = canvas.commands().iter().filter(|c| matches!(c, DrawCmd::Save)).count();
    let restores = canvas.commands().iter().filter(|c| matches!(c, DrawCmd::Restore)).count();
    assert_eq!(saves, rotations.len());
    assert_eq!(saves, restores);
}

#[test]
fn identical_rotations_draw_identically() {
    let (mut pipeline, _) = laid_out(720, 1280, OverlayConfig::default());
    let r = rotation(211.0, -35.0, 12.0);

    pipeline.apply_rotation(&r).unwrap();
    let mut first = RecordingCanvas::new(720, 1280);
    pipeline.reader().draw(&mut first);

    pipeline.apply_rotation(&rotation(10.0, 10.0, 10.0)).unwrap();
    pipeline.apply_rotation(&r).unwrap();
    let mut second = RecordingCanvas::new(720, 1280);
    pipeline.reader().draw(&mut second);

    assert_eq!(first.commands(), second.commands());
}

#[test]
fn sensor_entry_point_matches_direct_rotation() {
    let (mut direct, _) = laid_out(600, 900, OverlayConfig::default());
    let (mut sensor, _) = laid_out(600, 900, OverlayConfig::default());

    let device = Orientation::new(75.0, 20.0, -5.0).to_rotation();
    direct.apply_rotation(&Transform::from(device)).unwrap();
    sensor
        .orientation_update(&device.to_cols_array(), DisplayRotation::Rotation0)
        .unwrap();

    let points = |pipeline: &OverlayPipeline| {
        pipeline.reader().with_frame(|frame| match &frame.views()[0] {
            ComponentView::Compass(view) => view.points().to_vec(),
            ComponentView::Reticle(_) => Vec::new(),
        })
    };
    assert_eq!(points(&direct), points(&sensor));
    assert_eq!(direct.orientation(), sensor.orientation());
}

#[test]
fn orthographic_view_of_the_sky_centers_the_grid() {
    let config = OverlayConfig::new().projection_mode(ProjectionMode::Orthographic);
    let (mut pipeline, _) = laid_out(1000, 1400, config);
    pipeline.apply_rotation(&Transform::IDENTITY).unwrap();

    pipeline.reader().with_frame(|frame| {
        let ComponentView::Compass(view) = &frame.views()[0] else {
            panic!("compass is published first");
        };
        // Identity looks straight up: every ring above the horizon is a
        // circle around the center of the centered square.
        let top_ring = &view.points()[10 * 72..11 * 72];
        let center = Vec3::new(500.0, 700.0, 0.0);
        let radius = 0.5 * 1000.0 * 2.0 * 75f32.to_radians().cos();
        for p in top_ring {
            let d = Vec3::new(p.x, p.y, 0.0).distance(center);
            assert!((d - radius).abs() < 0.1, "{p:?}");
            assert!(p.z > 0.0);
        }
    });
}

#[test]
fn settings_out_of_range_are_reported() {
    let (mut pipeline, _) = laid_out(100, 100, OverlayConfig::default());
    let err = pipeline.field_of_view_changed(200.0).unwrap_err();
    assert_eq!(err.to_string(), "field_of_view = 200 is outside [10, 175]");

    assert!(matches!(
        OverlayPipeline::new(
            OverlayConfig::new().orthographic_scale(0.1),
            Arc::new(CountingHost::default())
        ),
        Err(OverlayError::OutOfRange { setting: "orthographic_scale", .. })
    ));
}

#[test]
fn draws_never_see_a_partial_frame() {
    let rotations = [rotation(0.0, 0.0, 0.0), rotation(140.0, 55.0, 30.0)];

    // Reference segment counts for each rotation, drawn single-threaded.
    let expected: Vec<usize> = rotations
        .iter()
        .map(|r| {
            let (mut pipeline, _) = laid_out(720, 1280, OverlayConfig::default());
            pipeline.apply_rotation(r).unwrap();
            let mut canvas = RecordingCanvas::new(720, 1280);
            pipeline.reader().draw(&mut canvas);
            segments(&canvas)
        })
        .collect();

    let (mut pipeline, _) = laid_out(720, 1280, OverlayConfig::default());
    let reader = pipeline.reader();
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..400 {
                pipeline.apply_rotation(&rotations[i % 2]).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut draws = 0;
    while !done.load(Ordering::SeqCst) || draws < 50 {
        let mut canvas = RecordingCanvas::new(720, 1280);
        reader.draw(&mut canvas);
        let count = segments(&canvas);
        // Before the first publish only the reticle's two arms are drawn.
        assert!(
            count == 2 || expected.contains(&count),
            "draw {draws} saw {count} segments, expected {expected:?}"
        );
        let published = reader.with_frame(|frame| frame.views()[0].published_len());
        assert!(published == 0 || published == NUM_POINTS);
        draws += 1;
    }

    producer.join().unwrap();
}
