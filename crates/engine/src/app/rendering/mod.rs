mod compositor;
mod renderer;
mod sprite;
mod surface;
mod transform;

pub use compositor::{
    FrameBuffers, OcclusionCompositor, DEFAULT_REVEAL_INNER_ALPHA, DEFAULT_REVEAL_OUTER_ALPHA,
    DEFAULT_REVEAL_RADIUS_PX,
};
pub use renderer::{Renderer, CLEAR_COLOR};
pub use sprite::{Sprite, SpriteLoadError};
pub use surface::{CompositeMode, Surface, OPAQUE_WHITE, TRANSPARENT};
pub use transform::{
    project, unproject, viewport_px_to_world, world_to_viewport_px, GridPoint, ScreenPoint,
    TileSize, Viewport,
};
