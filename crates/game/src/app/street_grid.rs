use std::sync::Arc;

use iso_engine::map::building;
use iso_engine::world::{ChunkDesc, LayerDesc, TileCell, TileGrid, WorldBuildError, WorldInfo};
use iso_engine::{
    Entity, EntityKind, GameWorld, GridPoint, MapObjectId, PortalBehavior, Sprite, Terrain,
    VehicleTemplate, Visual,
};
use tracing::info;

const TILE_WIDTH: u32 = 64;
const TILE_HEIGHT: u32 = 32;
const BLOCK: u32 = 8;
const BLOCKS: u32 = 6;
const CHUNK: u32 = 8;
const LAKE_BLOCK: (u32, u32) = (2, 3);

const PORTAL_ID: MapObjectId = MapObjectId(50);
const PORTAL_EXIT_ID: MapObjectId = MapObjectId(51);
const PACKAGE_ID: MapObjectId = MapObjectId(52);

/// Respawn intersections and their map-style clockwise directions in degrees.
const RESPAWN_POINTS: [(u32, u32, f32); 3] = [(8, 8, 0.0), (32, 24, 90.0), (16, 40, 180.0)];

/// A city of square blocks separated by one-tile roads, with a lake in one
/// block. Used when no map file is given.
pub(crate) fn street_grid(vehicle: &VehicleTemplate) -> Result<GameWorld, WorldBuildError> {
    let size = BLOCK * BLOCKS;
    let info = WorldInfo {
        width: size,
        height: size,
        tile_width: TILE_WIDTH,
        tile_height: TILE_HEIGHT,
    };
    let palette = TerrainSprites::new();

    let mut chunks = Vec::new();
    for chunk_y in (0..size).step_by(CHUNK as usize) {
        for chunk_x in (0..size).step_by(CHUNK as usize) {
            let mut cells = Vec::with_capacity((CHUNK * CHUNK) as usize);
            for y in chunk_y..chunk_y + CHUNK {
                for x in chunk_x..chunk_x + CHUNK {
                    let terrain = terrain_at(x, y);
                    cells.push(TileCell {
                        terrain,
                        sprite: palette.sprite(terrain),
                        offset_px: (0.0, 0.0),
                    });
                }
            }
            chunks.push(ChunkDesc {
                x: chunk_x as i32,
                y: chunk_y as i32,
                width: CHUNK,
                height: CHUNK,
                cells,
            });
        }
    }

    let mut world = GameWorld::new(TileGrid {
        info,
        layers: vec![LayerDesc {
            name: "streets".to_string(),
            offset_px: (0.0, 0.0),
            chunks,
        }],
    })?;

    let mut buildings = 0usize;
    for block_y in 0..BLOCKS {
        for block_x in 0..BLOCKS {
            if (block_x, block_y) == LAKE_BLOCK {
                continue;
            }
            let x0 = block_x * BLOCK + 1;
            let y0 = block_y * BLOCK + 1;
            for y in (y0..y0 + BLOCK - 1).step_by(2) {
                for x in (x0..x0 + BLOCK - 1).step_by(2) {
                    let storeys = 2 + (x * 7 + y * 13) % 5;
                    let color = block_color(block_x, block_y);
                    world.add(building(info, x as i32, y as i32, storeys, color));
                    buildings += 1;
                }
            }
            world.add(
                Entity::new(EntityKind::Obstacle, GridPoint::new(x0 as f32, y0 as f32))
                    .with_size((BLOCK - 1) as f32, (BLOCK - 1) as f32),
            );
        }
    }

    for (x, y, degrees) in RESPAWN_POINTS {
        world.add(
            Entity::new(EntityKind::RespawnPoint, road_center(x, y))
                .with_heading(-degrees.to_radians())
                .with_visual(Visual::Dot {
                    color: [0, 255, 0, 128],
                    radius_px: 4.0,
                }),
        );
    }

    world.add(
        Entity::new(EntityKind::Portal, GridPoint::new(0.0, 20.0))
            .with_id(PORTAL_ID)
            .with_size(1.0, 1.0)
            .with_visual(Visual::Outline {
                color: [64, 128, 255, 255],
            })
            .with_behavior(PortalBehavior::new(PORTAL_EXIT_ID)),
    );
    world.add(
        Entity::new(EntityKind::DeliveryZone, GridPoint::new(40.0, 12.0))
            .with_id(PORTAL_EXIT_ID)
            .with_size(1.0, 1.0)
            .with_visual(Visual::Outline {
                color: [248, 131, 121, 255],
            }),
    );
    world.add(
        Entity::new(EntityKind::Package, road_center(9, 8))
            .with_id(PACKAGE_ID)
            .with_visual(Visual::Dot {
                color: [150, 100, 40, 255],
                radius_px: 3.0,
            }),
    );

    let (x, y, degrees) = RESPAWN_POINTS[0];
    world.add(vehicle.spawn(road_center(x, y), -degrees.to_radians()));

    info!(
        width = size,
        height = size,
        buildings,
        entities = world.entity_count(),
        "street_grid_generated"
    );
    Ok(world)
}

fn road_center(x: u32, y: u32) -> GridPoint {
    GridPoint::new(x as f32 + 0.5, y as f32 + 0.5)
}

fn terrain_at(x: u32, y: u32) -> Terrain {
    if x % BLOCK == 0 || y % BLOCK == 0 {
        return Terrain::Road;
    }
    if (x / BLOCK, y / BLOCK) == LAKE_BLOCK {
        let (lx, ly) = (x % BLOCK, y % BLOCK);
        let shore = lx == 1 || ly == 1 || lx == BLOCK - 1 || ly == BLOCK - 1;
        return if shore { Terrain::Sand } else { Terrain::Water };
    }
    Terrain::Grass
}

fn block_color(block_x: u32, block_y: u32) -> [u8; 4] {
    const COLORS: [[u8; 4]; 4] = [
        [178, 60, 52, 255],
        [214, 182, 76, 255],
        [226, 222, 214, 255],
        [128, 88, 60, 255],
    ];
    COLORS[((block_x + block_y * 3) % COLORS.len() as u32) as usize]
}

struct TerrainSprites {
    grass: Arc<Sprite>,
    road: Arc<Sprite>,
    water: Arc<Sprite>,
    sand: Arc<Sprite>,
}

impl TerrainSprites {
    fn new() -> Self {
        let tile = |color| Arc::new(Sprite::diamond(TILE_WIDTH, TILE_HEIGHT, color));
        Self {
            grass: tile([86, 150, 72, 255]),
            road: tile([70, 70, 78, 255]),
            water: tile([48, 96, 190, 255]),
            sand: tile([214, 196, 140, 255]),
        }
    }

    fn sprite(&self, terrain: Terrain) -> Option<Arc<Sprite>> {
        match terrain {
            Terrain::Grass | Terrain::Dirt => Some(Arc::clone(&self.grass)),
            Terrain::Road => Some(Arc::clone(&self.road)),
            Terrain::Water => Some(Arc::clone(&self.water)),
            Terrain::Sand => Some(Arc::clone(&self.sand)),
            Terrain::Void => None,
        }
    }
}
