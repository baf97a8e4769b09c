use std::fmt;
use std::sync::Arc;

use crate::app::rendering::{CompositeMode, GridPoint, ScreenPoint, Sprite};

use super::chunk::ChunkIndex;
use super::GameWorld;

/// Generational index into the world's entity slots. A handle outlives its
/// entity safely: once the slot is reused the old handle stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    pub const fn index(self) -> usize {
        self.index as usize
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Stable identifier assigned by the map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Vehicle,
    Ghost,
    Building,
    TileProxy,
    Obstacle,
    Portal,
    RespawnPoint,
    DeliveryZone,
    Package,
    Marker,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Vehicle => "vehicle",
            EntityKind::Ghost => "ghost",
            EntityKind::Building => "building",
            EntityKind::TileProxy => "tile_proxy",
            EntityKind::Obstacle => "obstacle",
            EntityKind::Portal => "portal",
            EntityKind::RespawnPoint => "respawn_point",
            EntityKind::DeliveryZone => "delivery_zone",
            EntityKind::Package => "package",
            EntityKind::Marker => "marker",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Area an entity occupies in tile space, relative to its anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Footprint {
    /// One tile starting at the anchor.
    #[default]
    Point,
    /// Centred on the anchor.
    Circle { radius: f32 },
    /// Anchor is the top-left corner.
    Rect { width: f32, height: f32 },
}

/// Half-open `[min, max)` rectangle in tile units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Footprint {
    pub fn bounds(self, anchor: GridPoint) -> FootprintBounds {
        let (min_x, min_y, width, height) = match self {
            Footprint::Circle { radius } if radius > 0.0 => {
                (anchor.x - radius, anchor.y - radius, radius * 2.0, radius * 2.0)
            }
            Footprint::Rect { width, height } if width > 0.0 && height > 0.0 => {
                (anchor.x, anchor.y, width, height)
            }
            _ => (anchor.x, anchor.y, 1.0, 1.0),
        };
        FootprintBounds {
            min_x,
            min_y,
            max_x: min_x + width,
            max_y: min_y + height,
        }
    }

    pub fn radius(self) -> Option<f32> {
        match self {
            Footprint::Circle { radius } if radius > 0.0 => Some(radius),
            _ => None,
        }
    }
}

/// One stacked storey of a building. `tallness_px` is how far the next
/// piece sits above this one.
#[derive(Debug, Clone)]
pub struct BuildingPiece {
    pub sprite: Arc<Sprite>,
    pub offset_px: (f32, f32),
    pub tallness_px: f32,
}

#[derive(Debug, Clone, Default)]
pub enum Visual {
    #[default]
    None,
    /// A decorative map tile drawn with the tile anchor rules.
    Tile {
        sprite: Arc<Sprite>,
        offset_px: (f32, f32),
    },
    /// Centred on the entity's projected position.
    Sprite { sprite: Arc<Sprite>, alpha: f32 },
    Building { pieces: Vec<BuildingPiece> },
    /// Projected footprint rectangle.
    Outline { color: [u8; 4] },
    Dot { color: [u8; 4], radius_px: f32 },
}

/// Per-tick logic attached to an entity. The world is passed in explicitly;
/// while `tick` runs the behaviour is detached from its entity, so the entity
/// itself may be moved or removed through `world`.
pub trait Behavior: fmt::Debug {
    fn tick(&mut self, handle: EntityHandle, dt_millis: f32, world: &mut GameWorld);
}

#[derive(Debug)]
pub struct Entity {
    kind: EntityKind,
    id: Option<MapObjectId>,
    name: String,
    pub(crate) position: GridPoint,
    pub(crate) screen: ScreenPoint,
    pub(crate) footprint: Footprint,
    pub(crate) tallness: u32,
    depth_offset: f32,
    heading_radians: f32,
    visual: Visual,
    pub(crate) chunks: Vec<ChunkIndex>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl Entity {
    pub fn new(kind: EntityKind, position: GridPoint) -> Self {
        Self {
            kind,
            id: None,
            name: String::new(),
            position,
            screen: ScreenPoint::default(),
            footprint: Footprint::Point,
            tallness: 0,
            depth_offset: 0.0,
            heading_radians: 0.0,
            visual: Visual::None,
            chunks: Vec::new(),
            behavior: None,
        }
    }

    pub fn with_id(mut self, id: MapObjectId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_radius(self, radius: f32) -> Self {
        self.with_footprint(Footprint::Circle { radius })
    }

    pub fn with_size(self, width: f32, height: f32) -> Self {
        self.with_footprint(Footprint::Rect { width, height })
    }

    pub fn with_tallness(mut self, tallness: u32) -> Self {
        self.tallness = tallness;
        self
    }

    pub fn with_depth_offset(mut self, depth_offset: f32) -> Self {
        self.depth_offset = depth_offset;
        self
    }

    pub fn with_heading(mut self, heading_radians: f32) -> Self {
        self.heading_radians = heading_radians;
        self
    }

    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = visual;
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> Option<MapObjectId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> GridPoint {
        self.position
    }

    /// Projected position; refreshed by the world whenever the entity is reindexed.
    pub fn screen(&self) -> ScreenPoint {
        self.screen
    }

    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    pub fn bounds(&self) -> FootprintBounds {
        self.footprint.bounds(self.position)
    }

    /// Centre of the footprint in tile space.
    pub fn center(&self) -> GridPoint {
        match self.footprint {
            Footprint::Rect { width, height } if width > 0.0 && height > 0.0 => GridPoint::new(
                self.position.x + width / 2.0,
                self.position.y + height / 2.0,
            ),
            _ => self.position,
        }
    }

    pub fn tallness(&self) -> u32 {
        self.tallness
    }

    pub fn depth_offset(&self) -> f32 {
        self.depth_offset
    }

    pub fn depth_key(&self) -> f32 {
        self.screen.y + self.depth_offset
    }

    pub fn heading(&self) -> f32 {
        self.heading_radians
    }

    pub fn set_heading(&mut self, heading_radians: f32) {
        self.heading_radians = heading_radians;
    }

    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    pub fn set_visual(&mut self, visual: Visual) {
        self.visual = visual;
    }

    pub fn chunks(&self) -> &[ChunkIndex] {
        &self.chunks
    }

    pub fn composite_mode(&self) -> CompositeMode {
        match self.kind {
            EntityKind::Building => CompositeMode::SourceAtop,
            _ => CompositeMode::SourceOver,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

#[derive(Debug, Default)]
pub(crate) struct EntityArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityArena {
    pub(crate) fn insert(&mut self, entity: Entity) -> EntityHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            return EntityHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entity: Some(entity),
        });
        EntityHandle {
            index,
            generation: 0,
        }
    }

    pub(crate) fn remove(&mut self, handle: EntityHandle) -> Option<Entity> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(entity)
    }

    pub(crate) fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_mut()
    }

    pub(crate) fn contains(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
