//! GPU implementation of [`Canvas`] for the viewer.
//!
//! [`ShapeBuffer`] turns canvas calls into triangles on the CPU: line segments
//! become quads, circles become rings of quads or triangle fans, and text
//! becomes one textured quad per glyph. [`Draw2d`] owns the wgpu pipelines and
//! uploads a finished buffer in a single pass per frame.

use glam::{Affine2, Vec2};
use log::warn;

use crate::canvas::{Canvas, Color, Paint, PaintStyle, TextAlign};
use crate::font::{FontAtlas, GlyphMetrics};
use crate::gpu::GpuContext;

/// Vertex for 2D shapes and text.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    fn colored(position: Vec2, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            uv: [0.0, 0.0],
            color,
        }
    }
}

/// Uniforms for 2D rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 65536;
const CIRCLE_SEGMENTS: usize = 48;

/// Offsets used to fake a text stroke by stamping the glyphs around the pen.
const OUTLINE_DIRECTIONS: [Vec2; 8] = [
    Vec2::new(1.0, 0.0),
    Vec2::new(0.7071, 0.7071),
    Vec2::new(0.0, 1.0),
    Vec2::new(-0.7071, 0.7071),
    Vec2::new(-1.0, 0.0),
    Vec2::new(-0.7071, -0.7071),
    Vec2::new(0.0, -1.0),
    Vec2::new(0.7071, -0.7071),
];

fn rgba(color: Color) -> [f32; 4] {
    [color.r, color.g, color.b, color.a]
}

/// CPU-side triangle lists for one frame, with a save/restore transform
/// stack.
#[derive(Debug, Default)]
pub struct ShapeBuffer {
    width: u32,
    height: u32,
    transform: Affine2,
    saved: Vec<Affine2>,
    colored: Vec<Vertex2d>,
    text: Vec<Vertex2d>,
    glyphs: Option<GlyphMetrics>,
}

impl ShapeBuffer {
    pub fn new() -> Self {
        Self {
            transform: Affine2::IDENTITY,
            ..Self::default()
        }
    }

    /// Uses `glyphs` to lay out text. Without metrics text is skipped.
    pub fn set_glyphs(&mut self, glyphs: GlyphMetrics) {
        self.glyphs = Some(glyphs);
    }

    /// Drops last frame's geometry and resets the transform stack.
    pub fn begin_frame(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.transform = Affine2::IDENTITY;
        self.saved.clear();
        self.colored.clear();
        self.text.clear();
    }

    pub fn colored_vertices(&self) -> &[Vertex2d] {
        &self.colored
    }

    pub fn text_vertices(&self) -> &[Vertex2d] {
        &self.text
    }

    fn push_segment(&mut self, a: Vec2, b: Vec2, width: f32, color: [f32; 4]) {
        let a = self.transform.transform_point2(a);
        let b = self.transform.transform_point2(b);
        self.colored.extend_from_slice(&segment_quad(a, b, width, color));
    }

    fn push_fan(&mut self, center: Vec2, radius: f32, color: [f32; 4]) {
        let c = self.transform.transform_point2(center);
        let ring = circle_points(center, radius);
        for (p, q) in ring.iter().zip(ring.iter().cycle().skip(1)) {
            self.colored.extend_from_slice(&[
                Vertex2d::colored(c, color),
                Vertex2d::colored(self.transform.transform_point2(*p), color),
                Vertex2d::colored(self.transform.transform_point2(*q), color),
            ]);
        }
    }

    fn push_text(&mut self, text: &str, origin: Vec2, size: f32, color: [f32; 4]) {
        let Some(glyphs) = &self.glyphs else {
            return;
        };
        let scale = size / glyphs.size();
        let mut pen = origin;

        for ch in text.chars() {
            let Some(glyph) = glyphs.glyph(ch) else {
                pen.x += size * 0.5;
                continue;
            };

            if glyph.width > 0 && glyph.height > 0 {
                let w = glyph.width as f32 * scale;
                let h = glyph.height as f32 * scale;
                let x = pen.x + glyph.offset_x * scale;
                // offset_y is the distance from the baseline up to the glyph's bottom
                let y = pen.y - glyph.offset_y * scale - h;

                let [u0, v0, du, dv] = glyph.uv;
                let (u1, v1) = (u0 + du, v0 + dv);
                let corner = |dx: f32, dy: f32, u: f32, v: f32| Vertex2d {
                    position: self.transform.transform_point2(Vec2::new(x + dx, y + dy)).to_array(),
                    uv: [u, v],
                    color,
                };
                let quad = [
                    corner(0.0, 0.0, u0, v0),
                    corner(w, 0.0, u1, v0),
                    corner(0.0, h, u0, v1),
                    corner(w, 0.0, u1, v0),
                    corner(w, h, u1, v1),
                    corner(0.0, h, u0, v1),
                ];
                self.text.extend_from_slice(&quad);
            }

            pen.x += glyph.advance * scale;
        }
    }

    fn text_width(&self, text: &str, size: f32) -> f32 {
        self.glyphs
            .as_ref()
            .map(|g| g.measure(text) * size / g.size())
            .unwrap_or(0.0)
    }
}

impl Canvas for ShapeBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_lines(&mut self, points: &[f32], paint: &Paint) {
        let color = rgba(paint.color);
        for segment in points.chunks_exact(4) {
            self.push_segment(
                Vec2::new(segment[0], segment[1]),
                Vec2::new(segment[2], segment[3]),
                paint.stroke_width,
                color,
            );
        }
    }

    fn draw_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint) {
        let center = Vec2::new(cx, cy);
        let color = rgba(paint.color);

        if matches!(paint.style, PaintStyle::Fill | PaintStyle::FillAndStroke) {
            self.push_fan(center, radius, color);
        }
        if matches!(paint.style, PaintStyle::Stroke | PaintStyle::FillAndStroke) {
            let ring = circle_points(center, radius);
            for (p, q) in ring.iter().zip(ring.iter().cycle().skip(1)) {
                self.push_segment(*p, *q, paint.stroke_width, color);
            }
        }
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint) {
        let width = self.text_width(text, paint.text_size);
        let x = match paint.text_align {
            TextAlign::Left => x,
            TextAlign::Center => x - width * 0.5,
            TextAlign::Right => x - width,
        };
        let origin = Vec2::new(x, y);
        let color = rgba(paint.color);

        match paint.style {
            PaintStyle::Fill => self.push_text(text, origin, paint.text_size, color),
            PaintStyle::Stroke | PaintStyle::FillAndStroke => {
                let reach = paint.stroke_width * 0.5;
                for direction in OUTLINE_DIRECTIONS {
                    self.push_text(text, origin + direction * reach, paint.text_size, color);
                }
                if paint.style == PaintStyle::FillAndStroke {
                    self.push_text(text, origin, paint.text_size, color);
                }
            }
        }
    }

    fn save(&mut self) {
        self.saved.push(self.transform);
    }

    fn rotate(&mut self, degrees: f32, px: f32, py: f32) {
        let pivot = Vec2::new(px, py);
        self.transform = self.transform
            * Affine2::from_translation(pivot)
            * Affine2::from_angle(degrees.to_radians())
            * Affine2::from_translation(-pivot);
    }

    fn restore(&mut self) {
        match self.saved.pop() {
            Some(transform) => self.transform = transform,
            None => warn!("canvas restore without a matching save"),
        }
    }
}

/// Two triangles covering a segment of the given width.
fn segment_quad(a: Vec2, b: Vec2, width: f32, color: [f32; 4]) -> [Vertex2d; 6] {
    let along = (b - a).normalize_or_zero();
    let offset = along.perp() * (width * 0.5);
    let corners = [a + offset, b + offset, a - offset, b - offset];

    [
        Vertex2d::colored(corners[0], color),
        Vertex2d::colored(corners[1], color),
        Vertex2d::colored(corners[2], color),
        Vertex2d::colored(corners[1], color),
        Vertex2d::colored(corners[3], color),
        Vertex2d::colored(corners[2], color),
    ]
}

fn circle_points(center: Vec2, radius: f32) -> Vec<Vec2> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}

/// wgpu pipelines and buffers drawing a [`ShapeBuffer`].
///
/// Shapes are drawn first, then text, each as one draw call.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    font_bind_group: Option<wgpu::BindGroup>,
    shapes: ShapeBuffer,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // group 0: resolution
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // group 1: glyph atlas
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Texture Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let colored_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Colored Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let textured_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Textured Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let pipeline = |label: &str, layout: &wgpu::PipelineLayout, fragment_entry: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(blend_state),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let colored_pipeline = pipeline(
            "Draw2d Colored Pipeline",
            &colored_pipeline_layout,
            "fs_colored",
        );
        let textured_pipeline = pipeline(
            "Draw2d Textured Pipeline",
            &textured_pipeline_layout,
            "fs_textured",
        );

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_group: None,
            shapes: ShapeBuffer::new(),
        }
    }

    /// Enables text drawing with `font`.
    pub fn set_font(&mut self, gpu: &GpuContext, font: &FontAtlas) {
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Font Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&font.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&font.sampler),
                },
            ],
        });
        self.font_bind_group = Some(bind_group);
        self.shapes.set_glyphs(font.metrics().clone());
    }

    /// Starts a frame and returns the canvas to draw it on.
    pub fn begin_frame(&mut self, width: u32, height: u32) -> &mut ShapeBuffer {
        self.shapes.begin_frame(width, height);
        &mut self.shapes
    }

    /// Uploads and draws everything recorded since [`Draw2d::begin_frame`].
    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass) {
        let uniforms = Draw2dUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let colored = self.shapes.colored_vertices();
        let colored = &colored[..colored.len().min(MAX_VERTICES)];
        let text = self.shapes.text_vertices();
        let text = &text[..text.len().min(MAX_VERTICES - colored.len())];
        if colored.len() + text.len()
            < self.shapes.colored_vertices().len() + self.shapes.text_vertices().len()
        {
            warn!("frame exceeds {MAX_VERTICES} vertices; truncating");
        }

        if !colored.is_empty() {
            gpu.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(colored));

            render_pass.set_pipeline(&self.colored_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..colored.len() as u32, 0..1);
        }

        if let (false, Some(bind_group)) = (text.is_empty(), &self.font_bind_group) {
            let offset = colored.len();
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                (offset * std::mem::size_of::<Vertex2d>()) as u64,
                bytemuck::cast_slice(text),
            );

            render_pass.set_pipeline(&self.textured_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(offset as u32..(offset + text.len()) as u32, 0..1);
        }
    }
}
