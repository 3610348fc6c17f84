//! Desktop host for the overlay.
//!
//! Two threads mirror a phone's sensor and UI threads:
//! - a producer thread owns the [`OverlayPipeline`], integrates a simulated
//!   orientation at ~60 Hz and feeds it in as a platform rotation matrix
//! - the winit thread forwards input as [`Command`]s and draws the published
//!   frame whenever the pipeline asks for a redraw
//!
//! Controls: arrows turn and tilt, Q/E roll, P toggles the projection, +/-
//! zoom, Esc quits.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::canvas::{Canvas, Color, Paint};
use crate::config::{OverlayConfig, ProjectionMode, SettingRange};
use crate::draw2d::Draw2d;
use crate::error::{OverlayError, Result};
use crate::font::FontAtlas;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::orientation::Orientation;
use crate::pipeline::{FrameReader, OverlayHost, OverlayPipeline};

const TICK: Duration = Duration::from_millis(16);

/// Degrees per second while a turn key is held.
const TURN_RATE: f32 = 45.0;

/// Slider steps per +/- press.
const ZOOM_STEP: i32 = 25;

const HUD_TEXT_SIZE: f32 = 18.0;

/// Viewer startup options.
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub overlay: OverlayConfig,
    /// TTF/OTF file for labels; without one only lines are drawn.
    pub font: Option<PathBuf>,
    /// Size the font atlas is rasterized at.
    pub font_size: f32,
    /// Degrees per second the simulated device turns on its own.
    pub spin: f32,
    /// Orientation the simulated device starts in.
    pub initial: Orientation,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "Compass Overlay".to_string(),
            width: 720,
            height: 1280,
            overlay: OverlayConfig::default(),
            font: None,
            font_size: 48.0,
            spin: 0.0,
            initial: Orientation::default(),
        }
    }
}

/// Events the producer sends to the window thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Redraw,
    DisplayText(String),
}

/// Requests from the window thread to the producer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Layout { width: u32, height: u32 },
    /// Held-key directions, each -1, 0 or 1.
    Motion { yaw: f32, pitch: f32, roll: f32 },
    ToggleProjection,
    /// Positive zooms in.
    Zoom(i32),
    Shutdown,
}

/// [`OverlayHost`] that wakes the winit event loop.
struct WindowHost {
    proxy: Mutex<EventLoopProxy<ViewerEvent>>,
}

impl WindowHost {
    fn send(&self, event: ViewerEvent) {
        // The loop is gone during shutdown; nothing left to notify.
        let _ = self.proxy.lock().send_event(event);
    }
}

impl OverlayHost for WindowHost {
    fn request_redraw(&self) {
        self.send(ViewerEvent::Redraw);
    }

    fn display_text(&self, text: &str) {
        self.send(ViewerEvent::DisplayText(text.to_string()));
    }
}

/// Keyboard-driven stand-in for a rotation sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedSensor {
    orientation: Orientation,
    motion: [f32; 3],
    spin: f32,
}

impl SimulatedSensor {
    pub fn new(initial: Orientation, spin: f32) -> Self {
        Self {
            orientation: initial,
            motion: [0.0; 3],
            spin,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_motion(&mut self, yaw: f32, pitch: f32, roll: f32) {
        self.motion = [yaw, pitch, roll];
    }

    /// Advances by `dt` seconds. Bearing wraps into `[0, 360)`, pitch stops
    /// at the poles and roll wraps into `[-180, 180)`.
    pub fn advance(&mut self, dt: f32) {
        let [yaw, pitch, roll] = self.motion;
        let o = &mut self.orientation;
        o.bearing = (o.bearing + (yaw * TURN_RATE + self.spin) * dt).rem_euclid(360.0);
        o.pitch = (o.pitch + pitch * TURN_RATE * dt).clamp(-90.0, 90.0);
        o.roll = (o.roll + roll * TURN_RATE * dt + 180.0).rem_euclid(360.0) - 180.0;
    }

    /// The platform-style sample: a row-major device->world matrix.
    pub fn sample(&self) -> [f32; 16] {
        // Column-major world->device is row-major device->world.
        self.orientation.to_rotation().to_cols_array()
    }
}

/// Slider-stepped value inside `range`.
pub fn step_setting(range: SettingRange, value: f32, steps: i32) -> f32 {
    let progress = range.to_progress(value) as i32 + steps;
    range.from_progress(progress.clamp(0, SettingRange::SLIDER_STEPS as i32) as u32)
}

/// Applies one command to the pipeline.
pub fn handle_command(
    pipeline: &mut OverlayPipeline,
    sensor: &mut SimulatedSensor,
    command: Command,
) -> Result<()> {
    match command {
        Command::Layout { width, height } => pipeline.layout_changed(width, height)?,
        Command::Motion { yaw, pitch, roll } => sensor.set_motion(yaw, pitch, roll),
        Command::ToggleProjection => {
            let mode = pipeline.projection().mode().toggled();
            pipeline.projection_mode_changed(mode);
        }
        Command::Zoom(steps) => match pipeline.projection().mode() {
            ProjectionMode::Perspective => {
                let range = pipeline.field_of_view_range();
                let fov = pipeline.projection().field_of_view();
                pipeline.field_of_view_changed(step_setting(range, fov, -steps * ZOOM_STEP))?;
            }
            ProjectionMode::Orthographic => {
                let range = pipeline.orthographic_scale_range();
                let scale = pipeline.projection().orthographic_scale();
                pipeline
                    .orthographic_scale_changed(step_setting(range, scale, steps * ZOOM_STEP))?;
            }
        },
        Command::Shutdown => {}
    }
    Ok(())
}

fn produce(mut pipeline: OverlayPipeline, mut sensor: SimulatedSensor, commands: Receiver<Command>) {
    let mut last = Instant::now();

    loop {
        match commands.recv_timeout(TICK) {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => {
                if let Err(e) = handle_command(&mut pipeline, &mut sensor, command) {
                    warn!("{command:?} rejected: {e}");
                }
                // Keep ticking on schedule under a burst of commands.
                if last.elapsed() < TICK {
                    continue;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        sensor.advance(now.duration_since(last).as_secs_f32());
        last = now;

        if pipeline.projection().is_laid_out() {
            let display_rotation = pipeline.display_rotation();
            if let Err(e) = pipeline.orientation_update(&sensor.sample(), display_rotation) {
                warn!("orientation update failed: {e}");
            }
        }
    }
    debug!("producer stopped");
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    draw_2d: Draw2d,
    has_font: bool,
}

struct Viewer {
    options: ViewerOptions,
    commands: Sender<Command>,
    reader: FrameReader,
    input: Input,
    hud_text: String,
    running: Option<Running>,
}

impl Viewer {
    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("producer is gone; dropping {command:?}");
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let attributes = WindowAttributes::default()
            .with_title(&self.options.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.options.width,
                self.options.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|e| OverlayError::Window(e.to_string()))?,
        );

        let gpu = GpuContext::new(window.clone())?;
        let mut draw_2d = Draw2d::new(&gpu);

        let has_font = match &self.options.font {
            Some(path) => match FontAtlas::load(&gpu, path, self.options.font_size) {
                Ok(font) => {
                    draw_2d.set_font(&gpu, &font);
                    true
                }
                Err(e) => {
                    warn!("labels disabled, cannot load {}: {e}", path.display());
                    false
                }
            },
            None => {
                info!("no font given; labels disabled");
                false
            }
        };

        Ok(Running {
            window,
            gpu,
            draw_2d,
            has_font,
        })
    }

    fn forward_input(&mut self, event_loop: &ActiveEventLoop) {
        let input = &self.input;
        if input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
            return;
        }

        let mut commands = vec![Command::Motion {
            yaw: input.axis(KeyCode::ArrowLeft, KeyCode::ArrowRight),
            pitch: input.axis(KeyCode::ArrowDown, KeyCode::ArrowUp),
            roll: input.axis(KeyCode::KeyQ, KeyCode::KeyE),
        }];
        if input.key_pressed(KeyCode::KeyP) {
            commands.push(Command::ToggleProjection);
        }
        if input.any_pressed(&[KeyCode::Equal, KeyCode::NumpadAdd]) {
            commands.push(Command::Zoom(1));
        }
        if input.any_pressed(&[KeyCode::Minus, KeyCode::NumpadSubtract]) {
            commands.push(Command::Zoom(-1));
        }

        for command in commands {
            self.send(command);
        }
        self.input.begin_frame();
    }

    fn redraw(&mut self) {
        let Some(running) = &mut self.running else {
            return;
        };
        let (width, height) = (running.gpu.width(), running.gpu.height());

        let canvas = running.draw_2d.begin_frame(width, height);
        self.reader.draw(canvas);
        if running.has_font {
            draw_hud(canvas, &self.hud_text);
        }

        let output = match running.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                running.gpu.reconfigure();
                return;
            }
            Err(e) => {
                warn!("skipping frame: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = running
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.04,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            running.draw_2d.render(&running.gpu, &mut render_pass);
        }

        running.gpu.queue.submit(std::iter::once(encoder.finish()));
        running.window.pre_present_notify();
        output.present();
    }
}

/// Orientation readout in the top-left corner.
fn draw_hud(canvas: &mut dyn Canvas, text: &str) {
    let paint = Paint::new().color(Color::WHITE).text_size(HUD_TEXT_SIZE);
    let line_height = HUD_TEXT_SIZE * 1.2;
    for (i, line) in text.lines().enumerate() {
        canvas.draw_text(line, 12.0, 12.0 + line_height * (i + 1) as f32, &paint);
    }
}

impl ApplicationHandler<ViewerEvent> for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => {
                let size = running.window.inner_size();
                self.running = Some(running);
                self.send(Command::Layout {
                    width: size.width,
                    height: size.height,
                });
            }
            Err(e) => {
                error!("cannot start viewer: {e}");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        let Some(running) = &self.running else {
            return;
        };
        match event {
            ViewerEvent::Redraw => running.window.request_redraw(),
            ViewerEvent::DisplayText(text) => {
                running
                    .window
                    .set_title(&format!("{} | {}", self.options.title, text.replace('\n', " ")));
                self.hud_text = text;
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { .. } => self.forward_input(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(running) = &mut self.running {
                    running.gpu.resize(size.width, size.height);
                }
                if size.width > 0 && size.height > 0 {
                    self.send(Command::Layout {
                        width: size.width,
                        height: size.height,
                    });
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

/// Opens the viewer window and blocks until it is closed.
pub fn run(options: ViewerOptions) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .map_err(|e| OverlayError::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let host = Arc::new(WindowHost {
        proxy: Mutex::new(event_loop.create_proxy()),
    });
    let pipeline = OverlayPipeline::new(options.overlay.clone(), host)?;
    let reader = pipeline.reader();
    let sensor = SimulatedSensor::new(options.initial, options.spin);

    let (commands, receiver) = mpsc::channel();
    let producer: JoinHandle<()> = thread::Builder::new()
        .name("overlay-producer".into())
        .spawn(move || produce(pipeline, sensor, receiver))?;

    let mut viewer = Viewer {
        options,
        commands,
        reader,
        input: Input::new(),
        hud_text: String::new(),
        running: None,
    };
    let result = event_loop
        .run_app(&mut viewer)
        .map_err(|e| OverlayError::Window(e.to_string()));

    viewer.send(Command::Shutdown);
    if producer.join().is_err() {
        error!("producer thread panicked");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use crate::config::{MAX_FIELD_OF_VIEW, MIN_FIELD_OF_VIEW};
    use crate::orientation::{LookDirectionEstimator, OrientationEstimator};
    use crate::transform::Transform;
    use crate::display::DisplayRotation;

    struct Quiet;

    impl OverlayHost for Quiet {
        fn request_redraw(&self) {}
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn sensor_wraps_bearing_and_roll() {
        let mut sensor = SimulatedSensor::new(Orientation::new(350.0, 0.0, 170.0), 0.0);
        sensor.set_motion(1.0, 1.0, 1.0);
        sensor.advance(1.0);

        let o = sensor.orientation();
        assert!(close(o.bearing, 35.0), "{o:?}");
        assert!(close(o.pitch, 45.0), "{o:?}");
        assert!(close(o.roll, -145.0), "{o:?}");

        sensor.advance(2.0);
        assert_eq!(sensor.orientation().pitch, 90.0);
    }

    #[test]
    fn spin_turns_without_keys() {
        let mut sensor = SimulatedSensor::new(Orientation::default(), 10.0);
        sensor.advance(0.5);
        assert!(close(sensor.orientation().bearing, 5.0));
    }

    #[test]
    fn sample_round_trips_through_the_pipeline_convention() {
        let sensor = SimulatedSensor::new(Orientation::new(120.0, 20.0, -15.0), 0.0);
        let rotation = crate::display::rotation_from_row_major(&sensor.sample());
        let o = LookDirectionEstimator.estimate(&rotation.matrix(), DisplayRotation::Rotation0);
        assert!(close(o.bearing, 120.0), "{o:?}");
        assert!(close(o.pitch, 20.0), "{o:?}");
        assert!(close(o.roll, -15.0), "{o:?}");
    }

    #[test]
    fn zoom_steps_along_the_slider() {
        let range = SettingRange::new(MIN_FIELD_OF_VIEW, MAX_FIELD_OF_VIEW);
        assert_eq!(step_setting(range, MIN_FIELD_OF_VIEW, -25), MIN_FIELD_OF_VIEW);
        assert_eq!(step_setting(range, MAX_FIELD_OF_VIEW, 25), MAX_FIELD_OF_VIEW);
        assert!(close(step_setting(range, MIN_FIELD_OF_VIEW, 100), 26.5));
    }

    #[test]
    fn commands_drive_the_pipeline() {
        let mut pipeline = OverlayPipeline::new(OverlayConfig::default(), Arc::new(Quiet)).unwrap();
        let mut sensor = SimulatedSensor::new(Orientation::default(), 0.0);

        handle_command(
            &mut pipeline,
            &mut sensor,
            Command::Layout {
                width: 400,
                height: 400,
            },
        )
        .unwrap();
        assert!(pipeline.projection().is_laid_out());

        handle_command(&mut pipeline, &mut sensor, Command::Zoom(1)).unwrap();
        assert!(pipeline.projection().field_of_view() < 40.0);

        handle_command(&mut pipeline, &mut sensor, Command::ToggleProjection).unwrap();
        assert_eq!(pipeline.projection().mode(), ProjectionMode::Orthographic);
        handle_command(&mut pipeline, &mut sensor, Command::Zoom(1)).unwrap();
        assert!(pipeline.projection().orthographic_scale() > 1.0);

        let zero = Command::Layout {
            width: 0,
            height: 10,
        };
        assert!(handle_command(&mut pipeline, &mut sensor, zero).is_err());

        pipeline.apply_rotation(&Transform::IDENTITY).unwrap();
        let mut canvas = RecordingCanvas::new(400, 400);
        pipeline.reader().draw(&mut canvas);
        assert!(canvas.line_batches() > 0);
    }

    #[test]
    fn hud_draws_one_text_per_line() {
        let mut canvas = RecordingCanvas::new(100, 100);
        draw_hud(&mut canvas, "1.0°\n2.0°\n3.0°\n\nv fov\n40.0°");
        assert_eq!(canvas.filled_texts().len(), 6);
    }
}
