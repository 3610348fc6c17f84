//! Glyph atlas for viewer labels.
//!
//! Printable ASCII plus the degree sign is rasterized once with fontdue at a
//! fixed size and packed into a single-channel texture. Text at other sizes
//! is drawn by scaling the atlas quads.

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};
use log::info;

use crate::error::{OverlayError, Result};
use crate::gpu::GpuContext;

const PADDING: u32 = 1;
const INITIAL_ATLAS_SIZE: u32 = 256;

/// Information about a single glyph in the atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphInfo {
    /// UV rectangle in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph bitmap in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the glyph's bottom-left corner.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the pen after this glyph.
    pub advance: f32,
}

/// Characters rasterized into the atlas.
fn atlas_chars() -> impl Iterator<Item = char> {
    (32u8..=126u8).map(char::from).chain(std::iter::once('°'))
}

/// Glyph table of an atlas, at the size it was rasterized.
#[derive(Clone, Debug, Default)]
pub struct GlyphMetrics {
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
}

impl GlyphMetrics {
    pub fn new(glyphs: HashMap<char, GlyphInfo>, size: f32) -> Self {
        Self { glyphs, size }
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Size in pixels the glyphs were rasterized at.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Advance width of `text` at the rasterized size.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|c| self.glyphs.get(&c))
            .map(|g| g.advance)
            .sum()
    }
}

/// CPU side of the atlas: coverage bitmap plus glyph table.
#[derive(Debug)]
pub(crate) struct GlyphBitmap {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) coverage: Vec<u8>,
    pub(crate) metrics: GlyphMetrics,
}

impl GlyphBitmap {
    /// Rasterizes and packs the atlas characters from TTF/OTF data.
    pub(crate) fn rasterize(font_data: &[u8], size: f32) -> Result<Self> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| OverlayError::Font(e.to_string()))?;

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = atlas_chars()
            .map(|c| {
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();
        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();

        let (width, height) = atlas_size(&sizes);
        let mut coverage = vec![0u8; (width * height) as usize];
        let mut glyphs = HashMap::new();

        for ((c, metrics, bitmap), (x, y)) in rasterized.iter().zip(pack_rows(&sizes, width)) {
            let (glyph_w, glyph_h) = (metrics.width as u32, metrics.height as u32);

            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * width + x) as usize;
                coverage[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }

            glyphs.insert(
                *c,
                GlyphInfo {
                    uv: [
                        x as f32 / width as f32,
                        y as f32 / height as f32,
                        glyph_w as f32 / width as f32,
                        glyph_h as f32 / height as f32,
                    ],
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        Ok(Self {
            width,
            height,
            coverage,
            metrics: GlyphMetrics::new(glyphs, size),
        })
    }
}

/// Top-left corners for glyphs packed left to right in rows of `atlas_width`.
fn pack_rows(sizes: &[(u32, u32)], atlas_width: u32) -> Vec<(u32, u32)> {
    let mut x = PADDING;
    let mut y = PADDING;
    let mut row_height = 0;

    sizes
        .iter()
        .map(|&(w, h)| {
            if x + w + PADDING > atlas_width {
                x = PADDING;
                y += row_height + PADDING;
                row_height = 0;
            }
            let corner = (x, y);
            x += w + PADDING;
            row_height = row_height.max(h);
            corner
        })
        .collect()
}

/// Smallest power-of-two atlas (growing the smaller side first) that fits.
fn atlas_size(sizes: &[(u32, u32)]) -> (u32, u32) {
    let mut width = INITIAL_ATLAS_SIZE;
    let mut height = INITIAL_ATLAS_SIZE;

    loop {
        let fits = pack_rows(sizes, width)
            .iter()
            .zip(sizes)
            .all(|(&(x, y), &(w, h))| x + w + PADDING <= width && y + h + PADDING <= height);
        if fits {
            return (width, height);
        }
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    }
}

/// A font atlas uploaded to the GPU.
pub struct FontAtlas {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    metrics: GlyphMetrics,
}

impl FontAtlas {
    /// Loads a font file and builds its atlas at `size` pixels.
    pub fn load(gpu: &GpuContext, path: impl AsRef<Path>, size: f32) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let atlas = Self::from_bytes(gpu, &data, size)?;
        info!("loaded font {} at {size}px", path.display());
        Ok(atlas)
    }

    /// Builds an atlas from TTF/OTF data.
    pub fn from_bytes(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self> {
        let bitmap = GlyphBitmap::rasterize(font_data, size)?;
        let extent = wgpu::Extent3d {
            width: bitmap.width,
            height: bitmap.height,
            depth_or_array_layers: 1,
        };

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap.coverage,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bitmap.width),
                rows_per_image: Some(bitmap.height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            metrics: bitmap.metrics,
        })
    }

    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }
}
