use super::surface::{CompositeMode, Surface, OPAQUE_WHITE};

pub const DEFAULT_REVEAL_RADIUS_PX: f32 = 64.0;
pub const DEFAULT_REVEAL_INNER_ALPHA: f32 = 1.0;
pub const DEFAULT_REVEAL_OUTER_ALPHA: f32 = 0.5;

/// The two drawing targets of a frame. The world is drawn into `back`;
/// `front` accumulates snapshots of it and is what gets presented.
#[derive(Debug, Clone)]
pub struct FrameBuffers {
    pub front: Surface,
    pub back: Surface,
}

impl FrameBuffers {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            front: Surface::new(width, height),
            back: Surface::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.back.width()
    }

    pub fn height(&self) -> u32 {
        self.back.height()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.front.resize(width, height);
        self.back.resize(width, height);
    }
}

/// Cuts a soft hole around the tracked vehicle so anything drawn after it
/// is see-through there, while everything drawn before it stays intact.
///
/// The back buffer starts opaque white and everything is drawn into it with
/// source-atop, so erased pixels stay erased for the rest of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionCompositor {
    pub radius_px: f32,
    pub inner_alpha: f32,
    pub outer_alpha: f32,
}

impl Default for OcclusionCompositor {
    fn default() -> Self {
        Self {
            radius_px: DEFAULT_REVEAL_RADIUS_PX,
            inner_alpha: DEFAULT_REVEAL_INNER_ALPHA,
            outer_alpha: DEFAULT_REVEAL_OUTER_ALPHA,
        }
    }
}

impl OcclusionCompositor {
    pub fn begin_frame(&self, buffers: &mut FrameBuffers) {
        buffers.front.clear();
        buffers.back.fill(OPAQUE_WHITE);
    }

    /// Snapshots the back buffer into the front buffer, then erases a radial
    /// gradient from the back buffer centred on the vehicle.
    pub fn reveal_vehicle(&self, buffers: &mut FrameBuffers, vehicle_px: (f32, f32)) {
        buffers
            .front
            .draw_surface(&buffers.back, CompositeMode::SourceOver);
        buffers.back.fill_radial_gradient(
            vehicle_px.0,
            vehicle_px.1,
            self.radius_px,
            self.inner_alpha,
            self.outer_alpha,
            CompositeMode::DestinationOut,
        );
    }

    pub fn finish_frame(&self, buffers: &mut FrameBuffers) {
        buffers
            .front
            .draw_surface(&buffers.back, CompositeMode::SourceOver);
    }
}
