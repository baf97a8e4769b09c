use crate::app::rendering::ScreenPoint;

use super::entity::EntityHandle;

/// Weight of the previous camera position in the per-tick blend.
pub const CAMERA_SMOOTHING_WEIGHT: f32 = 10.0;

/// Follows a target's projected position with a fixed 10:1 blend per tick.
/// The blend is frame-coupled; the host loop's delta clamp keeps it bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    target: Option<EntityHandle>,
    screen: ScreenPoint,
}

impl Camera {
    pub fn new(screen: ScreenPoint) -> Self {
        Self {
            target: None,
            screen,
        }
    }

    pub fn target(&self) -> Option<EntityHandle> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<EntityHandle>) {
        self.target = target;
    }

    pub fn screen(&self) -> ScreenPoint {
        self.screen
    }

    pub fn snap_to(&mut self, screen: ScreenPoint) {
        self.screen = screen;
    }

    /// Blends `target_screen` into the stored position. `None` leaves the camera where it is.
    pub fn update(&mut self, target_screen: Option<ScreenPoint>) {
        let Some(target) = target_screen else {
            return;
        };
        let divisor = CAMERA_SMOOTHING_WEIGHT + 1.0;
        self.screen = ScreenPoint {
            x: (target.x + self.screen.x * CAMERA_SMOOTHING_WEIGHT) / divisor,
            y: (target.y + self.screen.y * CAMERA_SMOOTHING_WEIGHT) / divisor,
        };
    }
}
