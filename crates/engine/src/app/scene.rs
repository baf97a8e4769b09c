use super::input::{ActionStates, InputAction};
use crate::world::GameWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Held input state sampled once per fixed tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
    cursor_position_px: Option<(f32, f32)>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
        cursor_position_px: Option<(f32, f32)>,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            window_width,
            window_height,
            cursor_position_px,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<(f32, f32)>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Cursor in window pixels, `None` while it is outside the window.
    pub fn cursor_position_px(&self) -> Option<(f32, f32)> {
        self.cursor_position_px
    }
}

/// Game glue driven by the host loop. `update` runs once per fixed tick,
/// before the world's own behaviours.
pub trait Scene {
    fn load(&mut self, world: &mut GameWorld);
    fn update(
        &mut self,
        fixed_dt_millis: f32,
        input: &InputSnapshot,
        world: &mut GameWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut GameWorld);
    fn debug_title(&self, _world: &GameWorld) -> Option<String> {
        None
    }
}
