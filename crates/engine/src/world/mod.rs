mod behaviors;
mod camera;
mod chunk;
mod consistency;
mod draw;
mod entity;
mod index;
mod lookup;
mod query;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::app::rendering::{OcclusionCompositor, TileSize};

pub use behaviors::{wreck_vehicle, GhostBehavior, PortalBehavior, VehicleTemplate};
pub use camera::{Camera, CAMERA_SMOOTHING_WEIGHT};
pub use chunk::{
    Chunk, ChunkDesc, ChunkIndex, LayerDesc, Terrain, Tile, TileCell, TileGrid, UnknownTerrain,
    WorldBuildError, WorldInfo,
};
pub use consistency::ConsistencyError;
pub use draw::chunk_intersects_view;
pub use entity::{
    Behavior, BuildingPiece, Entity, EntityHandle, EntityKind, Footprint, FootprintBounds,
    MapObjectId, Visual,
};
pub use lookup::ChunkLookup;

use draw::DrawScratch;
use entity::EntityArena;

/// The spatial core: layer-0 chunks, the chunk lookup grid, every live
/// entity and the camera. Everything runs on the thread that owns it.
#[derive(Debug)]
pub struct GameWorld {
    info: WorldInfo,
    tile_size: TileSize,
    chunks: Vec<Chunk>,
    lookup: ChunkLookup,
    entities: EntityArena,
    order: Vec<EntityHandle>,
    ids: HashMap<MapObjectId, EntityHandle>,
    camera: Camera,
    tracked_vehicle: Option<EntityHandle>,
    compositor: OcclusionCompositor,
    tick_handles: Vec<EntityHandle>,
    draw_scratch: DrawScratch,
}

impl GameWorld {
    /// Builds chunks and the lookup grid from layer 0 and turns every
    /// decorated tile of later layers into a depth-sorted tile proxy.
    pub fn new(grid: TileGrid) -> Result<Self, WorldBuildError> {
        let TileGrid { info, layers } = grid;
        if layers.is_empty() {
            return Err(WorldBuildError::NoTerrainLayer);
        }
        for (layer_index, layer) in layers.iter().enumerate() {
            validate_layer(layer_index, layer)?;
        }

        let tile_size = info.tile_size();
        let mut layers = layers.into_iter();
        let terrain = layers.next().ok_or(WorldBuildError::NoTerrainLayer)?;
        let chunks = terrain
            .chunks
            .into_iter()
            .map(|desc| Chunk::from_desc(desc, tile_size))
            .collect::<Result<Vec<_>, _>>()?;
        let lookup = ChunkLookup::build(&chunks)?;

        let mut world = Self {
            info,
            tile_size,
            chunks,
            lookup,
            entities: EntityArena::default(),
            order: Vec::new(),
            ids: HashMap::new(),
            camera: Camera::default(),
            tracked_vehicle: None,
            compositor: OcclusionCompositor::default(),
            tick_handles: Vec::new(),
            draw_scratch: DrawScratch::default(),
        };

        let proxy_depth_offset = info.tile_height as f32 / 2.0;
        let mut decorative_tiles = 0usize;
        for layer in layers {
            for desc in layer.chunks {
                let chunk = Chunk::from_desc(desc, tile_size)?;
                for tile in chunk.tiles() {
                    let Some(sprite) = tile.sprite.clone() else {
                        continue;
                    };
                    world.add(
                        Entity::new(EntityKind::TileProxy, tile.grid)
                            .with_depth_offset(proxy_depth_offset)
                            .with_visual(Visual::Tile {
                                sprite,
                                offset_px: tile.offset_px,
                            }),
                    );
                    decorative_tiles += 1;
                }
            }
        }

        info!(
            chunks = world.chunks.len(),
            chunk_width = world.lookup.chunk_width(),
            chunk_height = world.lookup.chunk_height(),
            decorative_tiles,
            "world_built"
        );
        Ok(world)
    }

    pub fn info(&self) -> WorldInfo {
        self.info
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: ChunkIndex) -> Option<&Chunk> {
        self.chunks.get(index.get())
    }

    pub fn lookup(&self) -> &ChunkLookup {
        &self.lookup
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle)
    }

    /// Mutable access for presentation state. Position and footprint changes
    /// go through [`GameWorld::set_position`] and friends so the index follows.
    pub fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle)
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.entities.contains(handle)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live entities in insertion order.
    pub fn handles(&self) -> &[EntityHandle] {
        &self.order
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Retargets the camera. A new target snaps the camera onto it once;
    /// smoothing resumes from the next tick.
    pub fn set_camera_target(&mut self, target: Option<EntityHandle>) {
        if self.camera.target() == target {
            return;
        }
        self.camera.set_target(target);
        if let Some(screen) = target.and_then(|handle| self.entities.get(handle)).map(Entity::screen) {
            self.camera.snap_to(screen);
        }
    }

    pub fn tracked_vehicle(&self) -> Option<EntityHandle> {
        self.tracked_vehicle
    }

    pub fn compositor(&self) -> OcclusionCompositor {
        self.compositor
    }

    pub fn set_compositor(&mut self, compositor: OcclusionCompositor) {
        self.compositor = compositor;
    }

    /// Registers an entity, indexes it and returns its handle. A vehicle
    /// becomes the tracked vehicle; vehicles and ghosts become the camera target.
    pub fn add(&mut self, entity: Entity) -> EntityHandle {
        let kind = entity.kind();
        let id = entity.id();
        let handle = self.entities.insert(entity);
        self.order.push(handle);
        if let Some(id) = id {
            self.ids.insert(id, handle);
        }
        self.on_entity_moved(handle);

        match kind {
            EntityKind::Vehicle => {
                self.tracked_vehicle = Some(handle);
                self.set_camera_target(Some(handle));
            }
            EntityKind::Ghost => self.set_camera_target(Some(handle)),
            _ => {}
        }
        debug!(kind = %kind, index = handle.index(), "entity_added");
        handle
    }

    /// Unlinks the entity from every chunk, the live list and the id map.
    /// Stale or unknown handles are ignored.
    pub fn remove(&mut self, handle: EntityHandle) -> Option<Entity> {
        let mut entity = self.entities.remove(handle)?;
        for chunk in entity.chunks.drain(..) {
            if let Some(chunk) = self.chunks.get_mut(chunk.get()) {
                index::unlink_member(&mut chunk.members, handle);
            }
        }
        if let Some(position) = self.order.iter().position(|live| *live == handle) {
            self.order.remove(position);
        }
        if let Some(id) = entity.id() {
            if self.ids.get(&id) == Some(&handle) {
                self.ids.remove(&id);
            }
        }
        if self.tracked_vehicle == Some(handle) {
            self.tracked_vehicle = None;
        }
        if self.camera.target() == Some(handle) {
            self.camera.set_target(None);
        }
        debug!(kind = %entity.kind(), index = handle.index(), "entity_removed");
        Some(entity)
    }

    /// Advances every behaviour once, then the camera. Entities added during
    /// the pass start ticking next time; removed ones are skipped.
    pub fn tick(&mut self, dt_millis: f32) {
        let mut handles = std::mem::take(&mut self.tick_handles);
        handles.clear();
        handles.extend_from_slice(&self.order);

        for handle in handles.iter().copied() {
            let Some(mut behavior) = self
                .entities
                .get_mut(handle)
                .and_then(|entity| entity.behavior.take())
            else {
                continue;
            };
            behavior.tick(handle, dt_millis, self);
            if let Some(entity) = self.entities.get_mut(handle) {
                if entity.behavior.is_none() {
                    entity.behavior = Some(behavior);
                }
            }
        }

        self.tick_handles = handles;
        self.update_camera();
    }

    pub fn update_camera(&mut self) {
        let target_screen = self
            .camera
            .target()
            .and_then(|handle| self.entities.get(handle))
            .map(Entity::screen);
        self.camera.update(target_screen);
    }
}

fn validate_layer(layer_index: usize, layer: &LayerDesc) -> Result<(), WorldBuildError> {
    if layer.offset_px != (0.0, 0.0) {
        return Err(WorldBuildError::LayerOffsetUnsupported { layer: layer_index });
    }
    let Some(first) = layer.chunks.first() else {
        if layer_index == 0 {
            return Err(WorldBuildError::EmptyLayer { layer: layer_index });
        }
        return Ok(());
    };
    for chunk in &layer.chunks {
        if chunk.width != first.width || chunk.height != first.height {
            return Err(WorldBuildError::NonUniformChunkSize {
                layer: layer_index,
                expected_width: first.width,
                expected_height: first.height,
                found_width: chunk.width,
                found_height: chunk.height,
            });
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::test_support::grass_world;
    use super::*;
    use crate::app::rendering::{GridPoint, Sprite};

    fn layer(chunks: Vec<ChunkDesc>) -> LayerDesc {
        LayerDesc {
            name: "layer".to_string(),
            offset_px: (0.0, 0.0),
            chunks,
        }
    }

    fn blank_chunk(x: i32, y: i32, width: u32, height: u32) -> ChunkDesc {
        ChunkDesc {
            x,
            y,
            width,
            height,
            cells: vec![TileCell::default(); (width * height) as usize],
        }
    }

    fn info() -> WorldInfo {
        WorldInfo {
            width: 8,
            height: 8,
            tile_width: 64,
            tile_height: 32,
        }
    }

    #[test]
    fn rejects_non_uniform_chunk_sizes() {
        let error = GameWorld::new(TileGrid {
            info: info(),
            layers: vec![layer(vec![blank_chunk(0, 0, 4, 4), blank_chunk(4, 0, 4, 2)])],
        })
        .expect_err("non-uniform");
        assert!(matches!(
            error,
            WorldBuildError::NonUniformChunkSize { layer: 0, .. }
        ));
    }

    #[test]
    fn rejects_layer_offsets() {
        let mut offset_layer = layer(vec![blank_chunk(0, 0, 4, 4)]);
        offset_layer.offset_px = (0.0, 8.0);
        let error = GameWorld::new(TileGrid {
            info: info(),
            layers: vec![layer(vec![blank_chunk(0, 0, 4, 4)]), offset_layer],
        })
        .expect_err("offset");
        assert_eq!(error, WorldBuildError::LayerOffsetUnsupported { layer: 1 });
    }

    #[test]
    fn rejects_missing_terrain_layer() {
        let error = GameWorld::new(TileGrid {
            info: info(),
            layers: Vec::new(),
        })
        .expect_err("no layers");
        assert_eq!(error, WorldBuildError::NoTerrainLayer);
    }

    #[test]
    fn decorative_layers_become_tile_proxies() {
        let sprite = Arc::new(Sprite::solid(64, 64, [1, 2, 3, 255]));
        let mut decorated = blank_chunk(0, 0, 4, 4);
        decorated.cells[5].sprite = Some(Arc::clone(&sprite));
        let world = GameWorld::new(TileGrid {
            info: info(),
            layers: vec![layer(vec![blank_chunk(0, 0, 4, 4)]), layer(vec![decorated])],
        })
        .expect("world");

        let proxies = world.find_all_of_type(EntityKind::TileProxy);
        assert_eq!(proxies.len(), 1);
        let proxy = world.entity(proxies[0]).expect("proxy");
        assert_eq!(proxy.position(), GridPoint::new(1.0, 1.0));
        assert_eq!(proxy.depth_offset(), 16.0);
        assert_eq!(proxy.chunks(), &[ChunkIndex(0)]);
    }

    #[test]
    fn vehicles_become_tracked_and_the_camera_snaps_to_them() {
        let mut world = grass_world(10, 1, 1);
        let vehicle = world.add(
            Entity::new(EntityKind::Vehicle, GridPoint::new(5.0, 3.0)).with_radius(0.25),
        );
        assert_eq!(world.tracked_vehicle(), Some(vehicle));
        assert_eq!(world.camera().target(), Some(vehicle));
        assert_eq!(
            world.camera().screen(),
            world.entity(vehicle).expect("vehicle").screen()
        );

        world.remove(vehicle).expect("removed");
        assert_eq!(world.tracked_vehicle(), None);
        assert_eq!(world.camera().target(), None);
    }

    #[derive(Debug)]
    struct RemoveEverythingOnce {
        victims: Vec<EntityHandle>,
    }

    impl Behavior for RemoveEverythingOnce {
        fn tick(&mut self, handle: EntityHandle, _dt_millis: f32, world: &mut GameWorld) {
            for victim in self.victims.drain(..) {
                world.remove(victim);
            }
            world.remove(handle);
        }
    }

    #[derive(Debug, Default)]
    struct CountTicks;

    impl Behavior for CountTicks {
        fn tick(&mut self, handle: EntityHandle, _dt_millis: f32, world: &mut GameWorld) {
            let position = world.entity(handle).expect("alive").position();
            world.set_position(handle, GridPoint::new(position.x + 1.0, position.y));
        }
    }

    #[test]
    fn removal_during_tick_is_safe() {
        let mut world = grass_world(4, 2, 2);
        let survivor = world.add(
            Entity::new(EntityKind::Marker, GridPoint::new(0.0, 0.0)).with_behavior(CountTicks),
        );
        let victim = world.add(
            Entity::new(EntityKind::Marker, GridPoint::new(1.0, 1.0)).with_behavior(CountTicks),
        );
        let remover = world.add(
            Entity::new(EntityKind::Marker, GridPoint::new(2.0, 2.0)).with_behavior(
                RemoveEverythingOnce {
                    victims: vec![victim],
                },
            ),
        );
        world.order.swap(0, 2);

        world.tick(16.0);

        assert!(!world.contains(victim));
        assert!(!world.contains(remover));
        assert_eq!(
            world.entity(survivor).expect("survivor").position(),
            GridPoint::new(1.0, 0.0)
        );
        world.check_consistency().expect("consistent");
    }
}
