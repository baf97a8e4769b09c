use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;

const LEFT_FACE_SHADE: f32 = 0.78;
const RIGHT_FACE_SHADE: f32 = 0.58;

#[derive(Debug, Error)]
pub enum SpriteLoadError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Straight-alpha RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Sprite {
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            rgba.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn load_png(path: &Path) -> Result<Self, SpriteLoadError> {
        let reader = ImageReader::open(path).map_err(|source| SpriteLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| SpriteLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decoded.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    /// A flat isometric tile: a diamond filling the whole image.
    pub fn diamond(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut sprite = Self::solid(width, height, [0, 0, 0, 0]);
        let half_w = width as f32 / 2.0;
        let half_h = height as f32 / 2.0;
        for y in 0..height {
            for x in 0..width {
                if inside_diamond(x, y, half_w, half_h, half_h) {
                    sprite.put(x, y, color);
                }
            }
        }
        sprite
    }

    /// An isometric box: a `top_height` tall diamond roof sitting on
    /// `wall_height` pixels of shaded left and right walls.
    pub fn iso_block(width: u32, wall_height: u32, top_height: u32, color: [u8; 4]) -> Self {
        let height = wall_height + top_height;
        let mut sprite = Self::solid(width, height, [0, 0, 0, 0]);
        let half_w = width as f32 / 2.0;
        let half_top = top_height as f32 / 2.0;
        for y in 0..height {
            for x in 0..width {
                let center_x = x as f32 + 0.5;
                let from_center = (center_x - half_w).abs() / half_w.max(f32::EPSILON);
                let roof_lower_edge = half_top + half_top * (1.0 - from_center);
                let py = y as f32 + 0.5;
                if inside_diamond(x, y, half_w, half_top, half_top) {
                    sprite.put(x, y, color);
                } else if py >= roof_lower_edge && py <= roof_lower_edge + wall_height as f32 {
                    let shade = if center_x < half_w {
                        LEFT_FACE_SHADE
                    } else {
                        RIGHT_FACE_SHADE
                    };
                    sprite.put(x, y, shade_color(color, shade));
                }
            }
        }
        sprite
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(out)
    }

    pub(crate) fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    fn put(&mut self, x: u32, y: u32, color: [u8; 4]) {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba[offset..offset + 4].copy_from_slice(&color);
    }
}

fn inside_diamond(x: u32, y: u32, half_w: f32, half_h: f32, center_y: f32) -> bool {
    if half_w <= 0.0 || half_h <= 0.0 {
        return false;
    }
    let dx = (x as f32 + 0.5 - half_w).abs() / half_w;
    let dy = (y as f32 + 0.5 - center_y).abs() / half_h;
    dx + dy <= 1.0
}

fn shade_color(color: [u8; 4], factor: f32) -> [u8; 4] {
    let scale = |channel: u8| (channel as f32 * factor).round().clamp(0.0, 255.0) as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), color[3]]
}
