use std::sync::Arc;

use crate::app::rendering::{GridPoint, Sprite};
use crate::world::{
    BuildingPiece, Entity, EntityKind, MapObjectId, PortalBehavior, VehicleTemplate, Visual,
    WorldInfo,
};

use super::descriptor::{MapDescriptor, ObjectDescriptor};
use super::MapLoadError;

const OBSTACLE_COLOR: [u8; 4] = [255, 0, 0, 255];
const PORTAL_COLOR: [u8; 4] = [64, 128, 255, 255];
const DELIVERY_ZONE_COLOR: [u8; 4] = [248, 131, 121, 255];
const RESPAWN_POINT_COLOR: [u8; 4] = [0, 255, 0, 128];
const PACKAGE_COLOR: [u8; 4] = [150, 100, 40, 255];
const DEFAULT_BUILDING_COLOR: [u8; 4] = [150, 150, 160, 255];

const BUILDING_MIN_TALLNESS: u32 = 2;
const BUILDING_MAX_TALLNESS: u32 = 8;
const BLOCK_MAX_TALLNESS: u32 = 7;
/// Ceiling on storeys per building, whatever the map asks for.
const MAX_STOREYS: u32 = 32;
/// Largest building block, in tiles.
const MAX_BLOCK_TILES: f32 = 1024.0;

/// Height limits and colour for generated buildings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoning {
    pub min_storeys: u32,
    pub max_storeys: u32,
    pub fixed_storeys: Option<u32>,
    pub color: Option<[u8; 4]>,
}

impl Zoning {
    fn from_properties(object: &ObjectDescriptor, max_storeys: u32) -> Self {
        let read = |name: &str| {
            object
                .number(name)
                .filter(|value| value.is_finite() && *value >= 1.0)
                .map(|value| value as u32)
        };
        Self {
            min_storeys: read("minTallness").unwrap_or(BUILDING_MIN_TALLNESS),
            max_storeys: read("maxTallness").unwrap_or(max_storeys),
            fixed_storeys: read("tallness"),
            color: object.text("color").map(named_color),
        }
    }

    /// Storey count for the building at `(x, y)`. Deterministic per tile so
    /// reloading a map gives the same skyline.
    fn storeys_at(&self, x: i32, y: i32) -> u32 {
        if let Some(fixed) = self.fixed_storeys {
            return fixed;
        }
        let spread = self.max_storeys.saturating_sub(self.min_storeys);
        if spread == 0 {
            return self.min_storeys.max(1);
        }
        self.min_storeys + tile_hash(x, y, 0) % spread
    }

    fn color_at(&self, x: i32, y: i32) -> [u8; 4] {
        self.color.unwrap_or_else(|| {
            if tile_hash(x, y, 1) % 10 < 4 {
                named_color(PALETTE[(tile_hash(x, y, 2) % PALETTE.len() as u32) as usize])
            } else {
                DEFAULT_BUILDING_COLOR
            }
        })
    }
}

const PALETTE: [&str; 4] = ["red", "yellow", "white", "brown"];

fn named_color(name: &str) -> [u8; 4] {
    match name {
        "red" => [178, 60, 52, 255],
        "yellow" => [214, 182, 76, 255],
        "white" => [226, 222, 214, 255],
        "brown" => [128, 88, 60, 255],
        _ => DEFAULT_BUILDING_COLOR,
    }
}

fn tile_hash(x: i32, y: i32, salt: u32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x9E37_79B1)
        ^ (y as u32).wrapping_mul(0x85EB_CA77)
        ^ salt.wrapping_mul(0xC2B2_AE3D);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^ (h >> 16)
}

/// A procedurally drawn building of `storeys` half-tile storeys on the tile
/// whose top corner is `(x, y)`.
pub fn building(info: WorldInfo, x: i32, y: i32, storeys: u32, color: [u8; 4]) -> Entity {
    let storeys = storeys.clamp(1, MAX_STOREYS);
    let storey_px = (info.tile_height / 2).max(1);
    let sprite = Arc::new(Sprite::iso_block(
        info.tile_width,
        storey_px,
        info.tile_height,
        color,
    ));
    let pieces = (0..storeys)
        .map(|_| BuildingPiece {
            sprite: Arc::clone(&sprite),
            offset_px: (0.0, 0.0),
            tallness_px: storey_px as f32,
        })
        .collect();
    let tallness_tiles = (storeys * storey_px).div_ceil(info.tile_height.max(1));
    Entity::new(EntityKind::Building, GridPoint::new(x as f32, y as f32))
        .with_tallness(tallness_tiles)
        .with_depth_offset(info.tile_height as f32 / 2.0)
        .with_visual(Visual::Building { pieces })
}

impl MapDescriptor {
    /// Turns the object layers into entities. Positions and sizes are divided
    /// by the tile height because tiled lays objects out on square tiles.
    /// Unrecognised object types become inert markers.
    pub fn instantiate_entities(
        &self,
        vehicle: &VehicleTemplate,
    ) -> Result<Vec<Entity>, MapLoadError> {
        let info = self.world_info();
        let scale = info.tile_height.max(1) as f32;
        let mut entities = Vec::new();

        for object in self.objects() {
            let position = GridPoint::new(object.x / scale, object.y / scale);
            let size = (object.width / scale, object.height / scale);
            let id = MapObjectId(object.id);
            let placed = |kind| {
                let entity = Entity::new(kind, position).with_id(id);
                if object.name.is_empty() {
                    entity
                } else {
                    entity.with_name(object.name.clone())
                }
            };

            match object.kind.as_str() {
                "Building" => {
                    let zoning = Zoning::from_properties(object, BUILDING_MAX_TALLNESS);
                    let (x, y) = (position.x.floor() as i32, position.y.floor() as i32);
                    let entity = building(
                        info,
                        x,
                        y,
                        zoning.storeys_at(x, y),
                        zoning.color_at(x, y),
                    )
                    .with_id(id);
                    entities.push(entity);
                }
                "BuildingBlock" => {
                    let (width, height) = require_size(object, size)?;
                    if width.ceil() * height.ceil() > MAX_BLOCK_TILES {
                        return Err(MapLoadError::InvalidObjectSize {
                            id: object.id,
                            kind: object.kind.clone(),
                        });
                    }
                    let zoning = Zoning::from_properties(object, BLOCK_MAX_TALLNESS);
                    let origin_x = position.x.floor() as i32;
                    let origin_y = position.y.floor() as i32;
                    for dx in 0..width.ceil() as i32 {
                        for dy in 0..height.ceil() as i32 {
                            let (x, y) = (origin_x + dx, origin_y + dy);
                            entities.push(building(
                                info,
                                x,
                                y,
                                zoning.storeys_at(x, y),
                                zoning.color_at(x, y),
                            ));
                        }
                    }
                    entities.push(
                        placed(EntityKind::Obstacle)
                            .with_size(width, height)
                            .with_visual(Visual::Outline {
                                color: OBSTACLE_COLOR,
                            }),
                    );
                }
                "Obstacle" => {
                    let (width, height) = require_size(object, size)?;
                    entities.push(
                        placed(EntityKind::Obstacle)
                            .with_size(width, height)
                            .with_visual(Visual::Outline {
                                color: OBSTACLE_COLOR,
                            }),
                    );
                }
                "Portal" => {
                    let (width, height) = require_size(object, size)?;
                    let portal = placed(EntityKind::Portal)
                        .with_size(width, height)
                        .with_visual(Visual::Outline {
                            color: PORTAL_COLOR,
                        });
                    let portal = match object.number("destination") {
                        Some(destination) if destination >= 0.0 => {
                            portal.with_behavior(PortalBehavior::new(MapObjectId(
                                destination as u64,
                            )))
                        }
                        _ => portal,
                    };
                    entities.push(portal);
                }
                "RespawnPoint" => {
                    let degrees =
                        object
                            .number("direction")
                            .ok_or(MapLoadError::MissingProperty {
                                id: object.id,
                                property: "direction",
                            })?;
                    entities.push(
                        placed(EntityKind::RespawnPoint)
                            .with_heading(heading_from_degrees(degrees))
                            .with_visual(Visual::Dot {
                                color: RESPAWN_POINT_COLOR,
                                radius_px: 4.0,
                            }),
                    );
                }
                "DeliveryZone" => {
                    let (width, height) = require_size(object, size)?;
                    entities.push(
                        placed(EntityKind::DeliveryZone)
                            .with_size(width, height)
                            .with_visual(Visual::Outline {
                                color: DELIVERY_ZONE_COLOR,
                            }),
                    );
                }
                "Package" => {
                    entities.push(placed(EntityKind::Package).with_visual(Visual::Dot {
                        color: PACKAGE_COLOR,
                        radius_px: 3.0,
                    }));
                }
                "Car" | "Vehicle" => {
                    let heading = object.number("direction").map_or(0.0, heading_from_degrees);
                    entities.push(vehicle.spawn(position, heading).with_id(id));
                }
                _ => entities.push(placed(EntityKind::Marker)),
            }
        }

        Ok(entities)
    }
}

/// Map directions are clockwise degrees; headings are counter-clockwise
/// radians.
fn heading_from_degrees(degrees: f64) -> f32 {
    (-degrees.to_radians()) as f32
}

fn require_size(object: &ObjectDescriptor, size: (f32, f32)) -> Result<(f32, f32), MapLoadError> {
    let valid = |value: f32| value.is_finite() && value > 0.0;
    if valid(size.0) && valid(size.1) {
        Ok(size)
    } else {
        Err(MapLoadError::InvalidObjectSize {
            id: object.id,
            kind: object.kind.clone(),
        })
    }
}
