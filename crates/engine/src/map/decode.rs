use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::app::rendering::{Sprite, SpriteLoadError};
use crate::world::{
    ChunkDesc, LayerDesc, Terrain, TileCell, TileGrid, WorldBuildError, WorldInfo,
};

use super::descriptor::{MapDescriptor, TileLayerDescriptor};
use super::MapLoadError;

impl MapDescriptor {
    pub fn world_info(&self) -> WorldInfo {
        WorldInfo {
            width: self.width,
            height: self.height,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
        }
    }

    /// Resolves every gid used by a tile layer and builds the decoded grid.
    /// Gid 0 is void. Images are fetched through `load_image` once per path,
    /// and only for tiles the map actually places.
    pub fn decode_tile_grid<F>(&self, mut load_image: F) -> Result<TileGrid, MapLoadError>
    where
        F: FnMut(&str) -> Result<Sprite, SpriteLoadError>,
    {
        let used: BTreeSet<u32> = self
            .tile_layers()
            .flat_map(|layer| layer.chunk_views())
            .flat_map(|chunk| chunk.data.iter().copied())
            .collect();

        let mut cells = HashMap::with_capacity(used.len());
        cells.insert(0, TileCell::default());
        let mut images: HashMap<String, Arc<Sprite>> = HashMap::new();

        for tileset in &self.tilesets {
            if let Some(source) = &tileset.source {
                return Err(MapLoadError::UnresolvedTileset {
                    source_path: source.clone(),
                });
            }
            let offset = tileset.tile_offset.unwrap_or_default();
            for tile in &tileset.tiles {
                let gid = tileset.first_gid + tile.id;
                if gid == 0 || !used.contains(&gid) {
                    continue;
                }
                let terrain: Terrain = tile
                    .kind
                    .as_deref()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|source| MapLoadError::UnknownTerrain { gid, source })?;
                let sprite = match &tile.image {
                    Some(image) => Some(cached_image(&mut images, image, &mut load_image)?),
                    None => None,
                };
                cells.insert(
                    gid,
                    TileCell {
                        terrain,
                        sprite,
                        offset_px: (offset.x, offset.y),
                    },
                );
            }
        }

        let layers = self
            .tile_layers()
            .enumerate()
            .map(|(index, layer)| decode_layer(index, layer, &cells))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            layers = layers.len(),
            tiles = cells.len() - 1,
            images = images.len(),
            "tile_grid_decoded"
        );

        Ok(TileGrid {
            info: self.world_info(),
            layers,
        })
    }
}

fn cached_image<F>(
    images: &mut HashMap<String, Arc<Sprite>>,
    image: &str,
    load_image: &mut F,
) -> Result<Arc<Sprite>, MapLoadError>
where
    F: FnMut(&str) -> Result<Sprite, SpriteLoadError>,
{
    if let Some(sprite) = images.get(image) {
        return Ok(Arc::clone(sprite));
    }
    let sprite = Arc::new(load_image(image).map_err(|source| MapLoadError::Image {
        image: image.to_string(),
        source,
    })?);
    images.insert(image.to_string(), Arc::clone(&sprite));
    Ok(sprite)
}

fn decode_layer(
    index: usize,
    layer: &TileLayerDescriptor,
    cells: &HashMap<u32, TileCell>,
) -> Result<LayerDesc, MapLoadError> {
    if layer.start_x != 0 || layer.start_y != 0 {
        return Err(WorldBuildError::LayerOffsetUnsupported { layer: index }.into());
    }

    let chunks = layer
        .chunk_views()
        .into_iter()
        .map(|chunk| {
            let cells = chunk
                .data
                .iter()
                .map(|gid| {
                    cells
                        .get(gid)
                        .cloned()
                        .ok_or(MapLoadError::MissingTile { gid: *gid })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ChunkDesc {
                x: chunk.x,
                y: chunk.y,
                width: chunk.width,
                height: chunk.height,
                cells,
            })
        })
        .collect::<Result<Vec<_>, MapLoadError>>()?;

    Ok(LayerDesc {
        name: layer.name.clone(),
        offset_px: (layer.offset_x, layer.offset_y),
        chunks,
    })
}
