mod input;
mod loop_runner;
pub(crate) mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{
    project, unproject, viewport_px_to_world, world_to_viewport_px, CompositeMode, FrameBuffers,
    GridPoint, OcclusionCompositor, Renderer, ScreenPoint, Sprite, SpriteLoadError, Surface,
    TileSize, Viewport, CLEAR_COLOR, DEFAULT_REVEAL_INNER_ALPHA, DEFAULT_REVEAL_OUTER_ALPHA,
    DEFAULT_REVEAL_RADIUS_PX, OPAQUE_WHITE, TRANSPARENT,
};
pub use scene::{InputSnapshot, Scene, SceneCommand};
