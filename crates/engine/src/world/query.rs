use crate::app::rendering::{unproject, viewport_px_to_world, GridPoint, Viewport};

use super::chunk::Terrain;
use super::entity::{EntityHandle, EntityKind, MapObjectId};
use super::GameWorld;

impl GameWorld {
    /// Terrain of the layer-0 tile under `point`; anything off the map is void.
    pub fn terrain_at(&self, point: GridPoint) -> Terrain {
        self.lookup
            .chunk_containing(point)
            .and_then(|chunk| self.chunks.get(chunk.get()))
            .and_then(|chunk| chunk.tile_at(point))
            .map_or(Terrain::Void, |tile| tile.terrain)
    }

    /// Grid point under a viewport pixel, with the camera at the viewport centre.
    pub fn grid_at_viewport_px(&self, px: (f32, f32), viewport: Viewport) -> GridPoint {
        unproject(
            viewport_px_to_world(px, self.camera.screen(), viewport),
            self.tile_size,
        )
    }

    pub fn find_by_id(&self, id: MapObjectId) -> Option<EntityHandle> {
        self.ids
            .get(&id)
            .copied()
            .filter(|handle| self.entities.contains(*handle))
    }

    /// Live entities of `kind` in insertion order.
    pub fn find_all_of_type(&self, kind: EntityKind) -> Vec<EntityHandle> {
        self.handles_of_type(kind).collect()
    }

    pub fn handles_of_type(&self, kind: EntityKind) -> impl Iterator<Item = EntityHandle> + '_ {
        self.order.iter().copied().filter(move |handle| {
            self.entities
                .get(*handle)
                .is_some_and(|entity| entity.kind() == kind)
        })
    }

    /// Linear scan over live entities; the first of equally near candidates wins.
    pub fn nearest_of_type(&self, kind: EntityKind, point: GridPoint) -> Option<EntityHandle> {
        let mut best: Option<(EntityHandle, f32)> = None;
        for handle in self.handles_of_type(kind) {
            let Some(entity) = self.entities.get(handle) else {
                continue;
            };
            let distance = entity.position().distance_squared(point);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((handle, distance));
            }
        }
        best.map(|(handle, _)| handle)
    }

    /// Other entities sharing at least one chunk with `handle`, each once.
    /// `out` is cleared first so callers can reuse it between ticks.
    pub fn entities_near(&self, handle: EntityHandle, out: &mut Vec<EntityHandle>) {
        out.clear();
        let Some(entity) = self.entities.get(handle) else {
            return;
        };
        for chunk in entity.chunks() {
            let Some(chunk) = self.chunks.get(chunk.get()) else {
                continue;
            };
            for member in chunk.members() {
                if *member != handle && !out.contains(member) {
                    out.push(*member);
                }
            }
        }
    }
}
