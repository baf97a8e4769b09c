mod decode;
mod descriptor;
mod objects;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::app::rendering::{Sprite, SpriteLoadError};
use crate::world::{GameWorld, TileGrid, UnknownTerrain, VehicleTemplate, WorldBuildError};

pub use descriptor::{
    ChunkDescriptor, ChunkView, LayerDescriptor, MapDescriptor, ObjectDescriptor,
    ObjectGroupDescriptor, PropertyDescriptor, PropertyValue, TileDescriptor,
    TileLayerDescriptor, TileOffset, TilesetDescriptor,
};
pub use objects::{building, Zoning};

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid map json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("external tileset {source_path} was not resolved")]
    UnresolvedTileset { source_path: String },
    #[error("no tileset entry for tile {gid}")]
    MissingTile { gid: u32 },
    #[error("tile {gid}: {source}")]
    UnknownTerrain {
        gid: u32,
        #[source]
        source: UnknownTerrain,
    },
    #[error("failed to load tile image {image}: {source}")]
    Image {
        image: String,
        #[source]
        source: SpriteLoadError,
    },
    #[error("object {id} ({kind}) has an invalid size")]
    InvalidObjectSize { id: u64, kind: String },
    #[error("object {id} requires the `{property}` property")]
    MissingProperty { id: u64, property: &'static str },
    #[error(transparent)]
    World(#[from] WorldBuildError),
}

impl MapDescriptor {
    /// Reads every external tileset relative to `base_dir` and inlines it.
    pub fn resolve_external_tilesets(&mut self, base_dir: &Path) -> Result<(), MapLoadError> {
        for tileset in &mut self.tilesets {
            let Some(source) = tileset.source.take() else {
                continue;
            };
            let path = base_dir.join(&source);
            let raw = read_file(&path)?;
            let external = TilesetDescriptor::from_json_str(&raw)?;
            tileset.name = external.name;
            tileset.tiles = external.tiles;
            tileset.tile_offset = external.tile_offset;
        }
        Ok(())
    }
}

/// Loads a map file: tilesets and tile images are read relative to the map's
/// directory, then the world is built and the map's objects are added to it.
pub fn load_map(path: &Path, vehicle: &VehicleTemplate) -> Result<GameWorld, MapLoadError> {
    let raw = read_file(path)?;
    let mut map = MapDescriptor::from_json_str(&raw)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    map.resolve_external_tilesets(&base_dir)?;
    let grid = map.decode_tile_grid(|image| Sprite::load_png(&base_dir.join(image)))?;
    let world = build_world(&map, grid, vehicle)?;
    info!(
        path = %path.display(),
        entities = world.entity_count(),
        "map_loaded"
    );
    Ok(world)
}

/// Builds the world from an already decoded grid and adds the map objects.
pub fn build_world(
    map: &MapDescriptor,
    grid: TileGrid,
    vehicle: &VehicleTemplate,
) -> Result<GameWorld, MapLoadError> {
    let mut world = GameWorld::new(grid)?;
    for entity in map.instantiate_entities(vehicle)? {
        world.add(entity);
    }
    Ok(world)
}

fn read_file(path: &Path) -> Result<String, MapLoadError> {
    fs::read_to_string(path).map_err(|source| MapLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::GridPoint;
    use crate::world::{EntityKind, MapObjectId, Terrain, Visual};

    fn vehicle() -> VehicleTemplate {
        VehicleTemplate {
            radius: 0.25,
            visual: Visual::Dot {
                color: [0, 0, 255, 255],
                radius_px: 3.0,
            },
        }
    }

    fn write_png(path: &Path, color: [u8; 4]) {
        image::RgbaImage::from_pixel(64, 32, image::Rgba(color))
            .save(path)
            .expect("write png");
    }

    const TILESET: &str = r#"{
        "name": "terrain",
        "tiles": [
            {"id": 0, "type": "grass", "image": "grass.png"},
            {"id": 1, "type": "water", "image": "water.png"}
        ]
    }"#;

    const MAP: &str = r#"{
        "width": 8, "height": 4, "tilewidth": 64, "tileheight": 32,
        "tilesets": [{"firstgid": 1, "source": "terrain.json"}],
        "layers": [
            {"type": "tilelayer", "name": "ground", "chunks": [
                {"x": 0, "y": 0, "width": 4, "height": 4,
                 "data": [1,1,1,1, 1,2,2,1, 1,1,1,1, 1,1,1,1]},
                {"x": 4, "y": 0, "width": 4, "height": 4,
                 "data": [1,1,1,1, 1,1,1,1, 1,1,1,1, 1,1,1,1]}
            ]},
            {"type": "objectgroup", "name": "objects", "objects": [
                {"id": 1, "type": "RespawnPoint", "x": 64, "y": 64,
                 "properties": [{"name": "direction", "type": "float", "value": 0}]},
                {"id": 2, "type": "Car", "x": 32, "y": 32},
                {"id": 3, "type": "Portal", "x": 160, "y": 0, "width": 32, "height": 32,
                 "properties": [{"name": "destination", "type": "object", "value": 1}]}
            ]}
        ]
    }"#;

    #[test]
    fn loads_a_map_directory_into_a_consistent_world() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(&dir.path().join("grass.png"), [0, 160, 0, 255]);
        write_png(&dir.path().join("water.png"), [0, 0, 200, 255]);
        fs::write(dir.path().join("terrain.json"), TILESET).expect("tileset");
        let map_path = dir.path().join("town.json");
        fs::write(&map_path, MAP).expect("map");

        let world = load_map(&map_path, &vehicle()).expect("world");

        assert_eq!(world.chunks().len(), 2);
        assert_eq!(world.terrain_at(GridPoint::new(1.5, 1.5)), Terrain::Water);
        assert_eq!(world.terrain_at(GridPoint::new(5.5, 1.5)), Terrain::Grass);
        assert_eq!(world.terrain_at(GridPoint::new(9.0, 1.0)), Terrain::Void);

        let respawn = world.find_by_id(MapObjectId(1)).expect("respawn point");
        assert_eq!(
            world.entity(respawn).expect("entity").kind(),
            EntityKind::RespawnPoint
        );
        let car = world.tracked_vehicle().expect("car");
        assert_eq!(
            world.entity(car).expect("car").position(),
            GridPoint::new(1.0, 1.0)
        );
        assert_eq!(world.find_all_of_type(EntityKind::Portal).len(), 1);
        world.check_consistency().expect("consistent");
    }

    #[test]
    fn missing_map_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_map(&dir.path().join("absent.json"), &vehicle()).expect_err("io");
        assert!(matches!(error, MapLoadError::Io { .. }));
    }

    #[test]
    fn missing_tile_image_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("terrain.json"), TILESET).expect("tileset");
        let map_path = dir.path().join("town.json");
        fs::write(&map_path, MAP).expect("map");

        let error = load_map(&map_path, &vehicle()).expect_err("no images");
        match error {
            MapLoadError::Image { image, .. } => assert_eq!(image, "grass.png"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unresolved_external_tilesets_are_rejected_by_the_decoder() {
        let map = MapDescriptor::from_json_str(MAP).expect("map");
        let error = map
            .decode_tile_grid(|_| Ok(Sprite::solid(1, 1, [0; 4])))
            .expect_err("unresolved");
        assert!(matches!(error, MapLoadError::UnresolvedTileset { .. }));
    }
}
