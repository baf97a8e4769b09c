pub mod app;
pub mod map;
pub mod world;

pub use app::{
    project, run_app, unproject, viewport_px_to_world, world_to_viewport_px, AppError,
    CompositeMode, FrameBuffers, GridPoint, InputAction, InputSnapshot, LoopConfig,
    OcclusionCompositor, Renderer, Scene, SceneCommand, ScreenPoint, Sprite, SpriteLoadError,
    Surface, TileSize, Viewport,
};
pub use map::{load_map, MapDescriptor, MapLoadError};
pub use world::{
    wreck_vehicle, Camera, Entity, EntityHandle, EntityKind, Footprint, GameWorld, GhostBehavior,
    MapObjectId, PortalBehavior, Terrain, VehicleTemplate, Visual, WorldBuildError,
};
