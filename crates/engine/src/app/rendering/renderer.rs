use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::compositor::FrameBuffers;
use super::surface::Surface;
use super::Viewport;

pub const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];

/// Owns the window surface and the frame buffers the world draws into.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    buffers: FrameBuffers,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            buffers: FrameBuffers::new(size.width, size.height),
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.buffers.resize(width, height);
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn buffers_mut(&mut self) -> &mut FrameBuffers {
        &mut self.buffers
    }

    /// Copies the finished front buffer into the window surface.
    pub fn present(&mut self) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        compose_onto(self.pixels.frame_mut(), &self.buffers.front, CLEAR_COLOR);
        self.pixels.render()
    }
}

/// Flattens a straight-alpha surface over an opaque background colour.
pub(crate) fn compose_onto(frame: &mut [u8], surface: &Surface, background: [u8; 4]) {
    for (out, src) in frame
        .chunks_exact_mut(4)
        .zip(surface.rgba().chunks_exact(4))
    {
        let alpha = src[3] as f32 / 255.0;
        for channel in 0..3 {
            let value = src[channel] as f32 * alpha + background[channel] as f32 * (1.0 - alpha);
            out[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
        out[3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::CompositeMode;

    #[test]
    fn compose_blends_translucent_pixels_over_the_background() {
        let mut surface = Surface::new(3, 1);
        surface.blend_pixel(0, 0, [255, 0, 0, 255], CompositeMode::SourceOver);
        surface.blend_pixel(1, 0, [255, 255, 255, 128], CompositeMode::SourceOver);
        let mut frame = vec![0u8; 12];
        compose_onto(&mut frame, &surface, [0, 0, 0, 255]);

        assert_eq!(&frame[0..4], &[255, 0, 0, 255]);
        assert_eq!(&frame[4..8], &[128, 128, 128, 255]);
        assert_eq!(&frame[8..12], &[0, 0, 0, 255]);
    }
}
