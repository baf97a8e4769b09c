use super::sprite::Sprite;

pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];
pub const OPAQUE_WHITE: [u8; 4] = [255, 255, 255, 255];

/// Porter-Duff operators with the same meaning as their canvas-2D namesakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    SourceOver,
    /// Draws only where the destination already has coverage; keeps destination alpha.
    SourceAtop,
    /// Erases destination coverage in proportion to source alpha.
    DestinationOut,
}

/// Straight-alpha RGBA8 drawing target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.rgba.clear();
        self.rgba.resize(width as usize * height as usize * 4, 0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset_of(x as i32, y as i32)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(out)
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Overwrites every pixel regardless of composite mode.
    pub fn fill(&mut self, color: [u8; 4]) {
        for pixel in self.rgba.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4], mode: CompositeMode) {
        let Some(offset) = self.offset_of(x, y) else {
            return;
        };
        let src_alpha = color[3] as f32 / 255.0;
        composite_into(
            &mut self.rgba[offset..offset + 4],
            color,
            src_alpha,
            mode,
        );
    }

    /// Draws `sprite` unscaled with its top-left corner at (`left`, `top`).
    pub fn draw_sprite(
        &mut self,
        sprite: &Sprite,
        left: i32,
        top: i32,
        opacity: f32,
        mode: CompositeMode,
    ) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 || sprite.width() == 0 || sprite.height() == 0 {
            return;
        }
        let draw_left = left.max(0);
        let draw_top = top.max(0);
        let draw_right = (left + sprite.width() as i32).min(self.width as i32);
        let draw_bottom = (top + sprite.height() as i32).min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let src = sprite.rgba();
        let sprite_width = sprite.width() as usize;
        let frame_width = self.width as usize;
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - top) as usize * sprite_width * 4;
            let dst_row = out_y as usize * frame_width * 4;
            for out_x in draw_left..draw_right {
                let src_offset = src_row + (out_x - left) as usize * 4;
                let alpha = src[src_offset + 3];
                if alpha == 0 {
                    continue;
                }
                let color = [
                    src[src_offset],
                    src[src_offset + 1],
                    src[src_offset + 2],
                    alpha,
                ];
                let dst_offset = dst_row + out_x as usize * 4;
                composite_into(
                    &mut self.rgba[dst_offset..dst_offset + 4],
                    color,
                    alpha as f32 / 255.0 * opacity,
                    mode,
                );
            }
        }
    }

    /// Composites another surface of the same size on top of this one.
    pub fn draw_surface(&mut self, source: &Surface, mode: CompositeMode) {
        if source.width != self.width || source.height != self.height {
            return;
        }
        for (dst, src) in self
            .rgba
            .chunks_exact_mut(4)
            .zip(source.rgba.chunks_exact(4))
        {
            if src[3] == 0 {
                continue;
            }
            let color = [src[0], src[1], src[2], src[3]];
            composite_into(dst, color, src[3] as f32 / 255.0, mode);
        }
    }

    /// Fills a disc whose alpha falls linearly from `inner_alpha` at the
    /// centre to `outer_alpha` at `radius`; nothing is drawn beyond the radius.
    pub fn fill_radial_gradient(
        &mut self,
        center_x: f32,
        center_y: f32,
        radius: f32,
        inner_alpha: f32,
        outer_alpha: f32,
        mode: CompositeMode,
    ) {
        if radius <= 0.0 {
            return;
        }
        let min_x = (center_x - radius).floor().max(0.0) as i32;
        let max_x = (center_x + radius).ceil().min(self.width as f32) as i32;
        let min_y = (center_y - radius).floor().max(0.0) as i32;
        let max_y = (center_y + radius).ceil().min(self.height as f32) as i32;
        for y in min_y..max_y {
            for x in min_x..max_x {
                let dx = x as f32 + 0.5 - center_x;
                let dy = y as f32 + 0.5 - center_y;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance > radius {
                    continue;
                }
                let t = distance / radius;
                let alpha = (inner_alpha + (outer_alpha - inner_alpha) * t).clamp(0.0, 1.0);
                let Some(offset) = self.offset_of(x, y) else {
                    continue;
                };
                composite_into(
                    &mut self.rgba[offset..offset + 4],
                    OPAQUE_WHITE,
                    alpha,
                    mode,
                );
            }
        }
    }

    pub fn fill_circle(
        &mut self,
        center_x: f32,
        center_y: f32,
        radius: f32,
        color: [u8; 4],
        mode: CompositeMode,
    ) {
        let min_x = (center_x - radius).floor() as i32;
        let max_x = (center_x + radius).ceil() as i32;
        let min_y = (center_y - radius).floor() as i32;
        let max_y = (center_y + radius).ceil() as i32;
        let radius_squared = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center_x;
                let dy = y as f32 + 0.5 - center_y;
                if dx * dx + dy * dy <= radius_squared {
                    self.blend_pixel(x, y, color, mode);
                }
            }
        }
    }

    pub fn draw_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: [u8; 4],
        mode: CompositeMode,
    ) {
        let (mut x0, mut y0) = (from.0.round() as i32, from.1.round() as i32);
        let (x1, y1) = (to.0.round() as i32, to.1.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let step_x = if x0 < x1 { 1 } else { -1 };
        let step_y = if y0 < y1 { 1 } else { -1 };
        let mut error = dx + dy;
        loop {
            self.blend_pixel(x0, y0, color, mode);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x0 += step_x;
            }
            if doubled <= dx {
                error += dx;
                y0 += step_y;
            }
        }
    }

    fn offset_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

fn composite_into(dst: &mut [u8], src: [u8; 4], src_alpha: f32, mode: CompositeMode) {
    let src_alpha = src_alpha.clamp(0.0, 1.0);
    let dst_alpha = dst[3] as f32 / 255.0;
    match mode {
        CompositeMode::SourceOver => {
            let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
            if out_alpha <= f32::EPSILON {
                dst.copy_from_slice(&TRANSPARENT);
                return;
            }
            for channel in 0..3 {
                let blended = (src[channel] as f32 * src_alpha
                    + dst[channel] as f32 * dst_alpha * (1.0 - src_alpha))
                    / out_alpha;
                dst[channel] = to_channel(blended);
            }
            dst[3] = to_channel(out_alpha * 255.0);
        }
        CompositeMode::SourceAtop => {
            if dst[3] == 0 {
                return;
            }
            for channel in 0..3 {
                let blended =
                    src[channel] as f32 * src_alpha + dst[channel] as f32 * (1.0 - src_alpha);
                dst[channel] = to_channel(blended);
            }
        }
        CompositeMode::DestinationOut => {
            dst[3] = to_channel(dst[3] as f32 * (1.0 - src_alpha));
        }
    }
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
