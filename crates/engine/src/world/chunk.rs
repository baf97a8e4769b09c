use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::app::rendering::{project, GridPoint, ScreenPoint, Sprite, TileSize};

use super::entity::EntityHandle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldBuildError {
    #[error("map has no terrain layer")]
    NoTerrainLayer,
    #[error("layer {layer} has no chunks")]
    EmptyLayer { layer: usize },
    #[error(
        "non-uniform chunk sizes are not supported: layer {layer} has {found_width}x{found_height}, expected {expected_width}x{expected_height}"
    )]
    NonUniformChunkSize {
        layer: usize,
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },
    #[error("layers with offsets are not supported (layer {layer})")]
    LayerOffsetUnsupported { layer: usize },
    #[error("chunk at ({x}, {y}) is not aligned to the {width}x{height} chunk stride")]
    MisalignedChunk {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    #[error("two chunks occupy chunk cell ({column}, {row})")]
    DuplicateChunk { column: i32, row: i32 },
    #[error("chunk at ({x}, {y}) has {found} tiles, expected {expected}")]
    TileCountMismatch {
        x: i32,
        y: i32,
        expected: usize,
        found: usize,
    },
    #[error("chunk has zero width or height")]
    ZeroSizedChunk,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized terrain `{0}`")]
pub struct UnknownTerrain(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Terrain {
    #[default]
    Void,
    Grass,
    Road,
    Water,
    Sand,
    Dirt,
}

impl Terrain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Terrain::Void => "void",
            Terrain::Grass => "grass",
            Terrain::Road => "road",
            Terrain::Water => "water",
            Terrain::Sand => "sand",
            Terrain::Dirt => "dirt",
        }
    }
}

impl FromStr for Terrain {
    type Err = UnknownTerrain;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "void" => Ok(Terrain::Void),
            "grass" => Ok(Terrain::Grass),
            "road" => Ok(Terrain::Road),
            "water" => Ok(Terrain::Water),
            "sand" => Ok(Terrain::Sand),
            "dirt" => Ok(Terrain::Dirt),
            other => Err(UnknownTerrain(other.to_string())),
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable grid metadata for a loaded map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldInfo {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl WorldInfo {
    pub fn tile_size(&self) -> TileSize {
        TileSize {
            tile_width: self.tile_width as f32,
            tile_height: self.tile_height as f32,
        }
    }
}

/// A decoded cell as handed over by the map decoder.
#[derive(Debug, Clone, Default)]
pub struct TileCell {
    pub terrain: Terrain,
    pub sprite: Option<Arc<Sprite>>,
    pub offset_px: (f32, f32),
}

#[derive(Debug, Clone)]
pub struct ChunkDesc {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Row-major, `width * height` cells.
    pub cells: Vec<TileCell>,
}

#[derive(Debug, Clone)]
pub struct LayerDesc {
    pub name: String,
    pub offset_px: (f32, f32),
    pub chunks: Vec<ChunkDesc>,
}

/// Everything the world needs to build its spatial structures. Layer 0 is
/// the terrain plane; later layers only contribute decorative tiles.
#[derive(Debug, Clone)]
pub struct TileGrid {
    pub info: WorldInfo,
    pub layers: Vec<LayerDesc>,
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub grid: GridPoint,
    pub screen: ScreenPoint,
    pub terrain: Terrain,
    pub sprite: Option<Arc<Sprite>>,
    pub offset_px: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkIndex(pub(crate) u32);

impl ChunkIndex {
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    /// Projected top corner.
    screen: ScreenPoint,
    /// Horizontal extent of the projected chunk. The left corner belongs to
    /// the last row, the right corner to the last column.
    screen_left: f32,
    screen_right: f32,
    screen_height: f32,
    tiles: Vec<Tile>,
    tiles_by_row: Vec<u32>,
    pub(crate) members: Vec<EntityHandle>,
}

impl Chunk {
    pub(crate) fn from_desc(desc: ChunkDesc, tile_size: TileSize) -> Result<Self, WorldBuildError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(WorldBuildError::ZeroSizedChunk);
        }
        let expected = desc.width as usize * desc.height as usize;
        if desc.cells.len() != expected {
            return Err(WorldBuildError::TileCountMismatch {
                x: desc.x,
                y: desc.y,
                expected,
                found: desc.cells.len(),
            });
        }

        let screen = project(GridPoint::new(desc.x as f32, desc.y as f32), tile_size);
        let bottom_left = GridPoint::new(desc.x as f32, desc.y as f32 + desc.height as f32);
        let top_right = GridPoint::new(desc.x as f32 + desc.width as f32, desc.y as f32);
        let screen_left = project(bottom_left, tile_size).x;
        let screen_right = project(top_right, tile_size).x;
        let screen_height =
            project(GridPoint::new(desc.width as f32, desc.height as f32), tile_size).y;

        let width = desc.width;
        let tiles: Vec<Tile> = desc
            .cells
            .into_iter()
            .enumerate()
            .map(|(index, cell)| {
                let grid = GridPoint::new(
                    (desc.x + (index as u32 % width) as i32) as f32,
                    (desc.y + (index as u32 / width) as i32) as f32,
                );
                Tile {
                    grid,
                    screen: project(grid, tile_size),
                    terrain: cell.terrain,
                    sprite: cell.sprite,
                    offset_px: cell.offset_px,
                }
            })
            .collect();

        let mut tiles_by_row: Vec<u32> = (0..tiles.len() as u32).collect();
        tiles_by_row.sort_by(|a, b| {
            tiles[*a as usize]
                .screen
                .y
                .total_cmp(&tiles[*b as usize].screen.y)
                .then_with(|| a.cmp(b))
        });

        Ok(Self {
            x: desc.x,
            y: desc.y,
            width: desc.width,
            height: desc.height,
            screen,
            screen_left,
            screen_right,
            screen_height,
            tiles,
            tiles_by_row,
            members: Vec::new(),
        })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn screen(&self) -> ScreenPoint {
        self.screen
    }

    pub fn screen_left(&self) -> f32 {
        self.screen_left
    }

    pub fn screen_right(&self) -> f32 {
        self.screen_right
    }

    pub fn screen_width(&self) -> f32 {
        self.screen_right - self.screen_left
    }

    pub fn screen_height(&self) -> f32 {
        self.screen_height
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tiles ordered back to front.
    pub fn tiles_by_row(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles_by_row
            .iter()
            .map(move |index| &self.tiles[*index as usize])
    }

    pub fn members(&self) -> &[EntityHandle] {
        &self.members
    }

    /// Tile under `point`, or `None` when the point falls outside this chunk.
    pub fn tile_at(&self, point: GridPoint) -> Option<&Tile> {
        let local_x = (point.x - self.x as f32).floor();
        let local_y = (point.y - self.y as f32).floor();
        if !(local_x >= 0.0 && local_y >= 0.0) {
            return None;
        }
        if local_x >= self.width as f32 || local_y >= self.height as f32 {
            return None;
        }
        self.tiles
            .get(local_x as usize + local_y as usize * self.width as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: TileSize = TileSize {
        tile_width: 64.0,
        tile_height: 32.0,
    };

    fn desc(x: i32, y: i32, width: u32, height: u32) -> ChunkDesc {
        let cells = (0..width * height)
            .map(|index| TileCell {
                terrain: if index % 2 == 0 {
                    Terrain::Grass
                } else {
                    Terrain::Road
                },
                ..TileCell::default()
            })
            .collect();
        ChunkDesc {
            x,
            y,
            width,
            height,
            cells,
        }
    }

    #[test]
    fn terrain_names_round_trip_through_from_str() {
        for terrain in [
            Terrain::Void,
            Terrain::Grass,
            Terrain::Road,
            Terrain::Water,
            Terrain::Sand,
            Terrain::Dirt,
        ] {
            assert_eq!(terrain.as_str().parse::<Terrain>(), Ok(terrain));
        }
        assert_eq!(
            "lava".parse::<Terrain>(),
            Err(UnknownTerrain("lava".to_string()))
        );
    }

    #[test]
    fn chunk_screen_bounds_follow_the_projection() {
        let chunk = Chunk::from_desc(desc(16, 0, 16, 16), TILE).expect("chunk");
        assert_eq!(chunk.screen(), ScreenPoint::new(16.0 * 32.0, 16.0 * 16.0));
        assert_eq!(chunk.screen_width(), 16.0 * 64.0);
        assert_eq!(chunk.screen_height(), 32.0 * 16.0);
    }

    #[test]
    fn narrow_chunks_extend_further_left_than_right() {
        let chunk = Chunk::from_desc(desc(0, 0, 4, 40), TILE).expect("chunk");
        assert_eq!(chunk.screen_left(), -40.0 * 32.0);
        assert_eq!(chunk.screen_right(), 4.0 * 32.0);
        assert_eq!(chunk.screen_width(), 44.0 * 32.0);
        assert_eq!(chunk.screen_height(), 44.0 * 16.0);
    }

    #[test]
    fn tile_at_uses_the_fractional_offset_inside_the_chunk() {
        let chunk = Chunk::from_desc(desc(4, 4, 4, 4), TILE).expect("chunk");
        let tile = chunk.tile_at(GridPoint::new(5.9, 6.2)).expect("tile");
        assert_eq!(tile.grid, GridPoint::new(5.0, 6.0));
        assert_eq!(tile.terrain, Terrain::Road);
        assert!(chunk.tile_at(GridPoint::new(3.99, 5.0)).is_none());
        assert!(chunk.tile_at(GridPoint::new(8.0, 5.0)).is_none());
        assert!(chunk.tile_at(GridPoint::new(f32::NAN, 5.0)).is_none());
    }

    #[test]
    fn tiles_by_row_are_ordered_back_to_front() {
        let chunk = Chunk::from_desc(desc(0, 0, 3, 3), TILE).expect("chunk");
        let rows: Vec<f32> = chunk.tiles_by_row().map(|tile| tile.screen.y).collect();
        assert!(rows.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(rows.len(), 9);
    }

    #[test]
    fn rejects_wrong_tile_count() {
        let mut bad = desc(0, 0, 2, 2);
        bad.cells.pop();
        let error = Chunk::from_desc(bad, TILE).expect_err("tile count");
        assert!(matches!(
            error,
            WorldBuildError::TileCountMismatch {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }
}
