use crate::app::rendering::{project, GridPoint};

use super::chunk::{Chunk, ChunkIndex};
use super::entity::{EntityHandle, Footprint};
use super::GameWorld;

impl GameWorld {
    /// Reprojects the entity and rebuilds its chunk membership on both sides
    /// of the relation. Returns `false` for a stale handle.
    ///
    /// Every chunk whose tile rectangle intersects the footprint is linked.
    /// A tall entity is also linked to the chunks holding its footprint's min
    /// corner shifted diagonally back by `0..tallness` tiles, so rows drawn
    /// above its base still find it. Points with no chunk are skipped.
    pub fn on_entity_moved(&mut self, handle: EntityHandle) -> bool {
        let tile_size = self.tile_size;
        let Some(entity) = self.entities.get_mut(handle) else {
            return false;
        };
        entity.screen = project(entity.position, tile_size);
        let bounds = entity.bounds();
        let tallness = entity.tallness;
        let mut memberships = std::mem::take(&mut entity.chunks);

        for chunk in memberships.drain(..) {
            if let Some(chunk) = self.chunks.get_mut(chunk.get()) {
                unlink_member(&mut chunk.members, handle);
            }
        }

        if let Some((columns, rows)) = self.lookup.covering_range(bounds) {
            for row in rows {
                for column in columns.clone() {
                    if let Some(chunk) = self.lookup.get(column, row) {
                        link(&mut self.chunks, &mut memberships, chunk, handle);
                    }
                }
            }
        }

        for z in 0..tallness {
            let behind = GridPoint::new(bounds.min_x - z as f32, bounds.min_y - z as f32);
            if let Some(chunk) = self.lookup.chunk_containing(behind) {
                link(&mut self.chunks, &mut memberships, chunk, handle);
            }
        }

        if let Some(entity) = self.entities.get_mut(handle) {
            entity.chunks = memberships;
        }
        true
    }

    pub fn set_position(&mut self, handle: EntityHandle, position: GridPoint) -> bool {
        let Some(entity) = self.entities.get_mut(handle) else {
            return false;
        };
        entity.position = position;
        self.on_entity_moved(handle)
    }

    pub fn set_footprint(&mut self, handle: EntityHandle, footprint: Footprint) -> bool {
        let Some(entity) = self.entities.get_mut(handle) else {
            return false;
        };
        entity.footprint = footprint;
        self.on_entity_moved(handle)
    }

    pub fn set_tallness(&mut self, handle: EntityHandle, tallness: u32) -> bool {
        let Some(entity) = self.entities.get_mut(handle) else {
            return false;
        };
        entity.tallness = tallness;
        self.on_entity_moved(handle)
    }
}

fn link(
    chunks: &mut [Chunk],
    memberships: &mut Vec<ChunkIndex>,
    chunk: ChunkIndex,
    handle: EntityHandle,
) {
    if !memberships.contains(&chunk) {
        memberships.push(chunk);
    }
    if let Some(chunk) = chunks.get_mut(chunk.get()) {
        if !chunk.members.contains(&handle) {
            chunk.members.push(handle);
        }
    }
}

pub(super) fn unlink_member(members: &mut Vec<EntityHandle>, handle: EntityHandle) {
    if let Some(position) = members.iter().position(|member| *member == handle) {
        members.swap_remove(position);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::grass_world;
    use super::*;
    use crate::world::{Entity, EntityKind, MapObjectId};

    fn sorted(mut chunks: Vec<ChunkIndex>) -> Vec<ChunkIndex> {
        chunks.sort();
        chunks
    }

    #[test]
    fn single_entity_in_a_single_chunk() {
        let mut world = grass_world(10, 1, 1);
        let handle = world.add(Entity::new(EntityKind::Marker, GridPoint::new(5.0, 5.0)));
        assert!(world.on_entity_moved(handle));

        let entity = world.entity(handle).expect("entity");
        assert_eq!(entity.chunks(), &[ChunkIndex(0)]);
        assert_eq!(world.chunks()[0].members(), &[handle]);
    }

    #[test]
    fn footprint_spanning_four_chunks_is_linked_to_each() {
        let mut world = grass_world(4, 3, 3);
        let handle = world.add(
            Entity::new(EntityKind::Vehicle, GridPoint::new(4.0, 4.0)).with_radius(0.5),
        );
        let entity = world.entity(handle).expect("entity");
        // Chunks are laid out row-major: index = row * 3 + column.
        assert_eq!(
            sorted(entity.chunks().to_vec()),
            vec![ChunkIndex(0), ChunkIndex(1), ChunkIndex(3), ChunkIndex(4)]
        );
        for chunk in entity.chunks() {
            assert!(world.chunks()[chunk.get()].members().contains(&handle));
        }
    }

    #[test]
    fn footprint_coverage_matches_intersecting_chunks() {
        let mut world = grass_world(4, 4, 4);
        let handle = world.add(
            Entity::new(EntityKind::Obstacle, GridPoint::new(2.0, 5.0)).with_size(7.0, 2.0),
        );
        let bounds = world.entity(handle).expect("entity").bounds();
        let mut expected = Vec::new();
        for (index, chunk) in world.chunks().iter().enumerate() {
            let intersects = (chunk.x() as f32) < bounds.max_x
                && ((chunk.x() + chunk.width() as i32) as f32) > bounds.min_x
                && (chunk.y() as f32) < bounds.max_y
                && ((chunk.y() + chunk.height() as i32) as f32) > bounds.min_y;
            if intersects {
                expected.push(ChunkIndex(index as u32));
            }
        }
        assert_eq!(
            sorted(world.entity(handle).expect("entity").chunks().to_vec()),
            expected
        );
        assert_eq!(expected.len(), 3);
    }

    #[test]
    fn reindexing_without_moving_is_idempotent() {
        let mut world = grass_world(4, 3, 3);
        let handle = world.add(
            Entity::new(EntityKind::Building, GridPoint::new(5.0, 5.0)).with_tallness(3),
        );
        let first = world.entity(handle).expect("entity").chunks().to_vec();
        world.on_entity_moved(handle);
        world.on_entity_moved(handle);
        let second = world.entity(handle).expect("entity").chunks().to_vec();
        assert_eq!(first, second);
        for chunk in world.chunks() {
            let count = chunk.members().iter().filter(|m| **m == handle).count();
            assert!(count <= 1);
        }
        world.check_consistency().expect("consistent");
    }

    #[test]
    fn tallness_reaches_chunks_diagonally_behind() {
        let mut world = grass_world(4, 3, 3);
        let flat = world.add(Entity::new(EntityKind::Building, GridPoint::new(4.0, 4.0)));
        let tall = world.add(
            Entity::new(EntityKind::Building, GridPoint::new(4.0, 4.0)).with_tallness(2),
        );
        assert_eq!(world.entity(flat).expect("flat").chunks(), &[ChunkIndex(4)]);
        assert_eq!(
            sorted(world.entity(tall).expect("tall").chunks().to_vec()),
            vec![ChunkIndex(0), ChunkIndex(4)]
        );
        assert!(world.chunks()[0].members().contains(&tall));
    }

    #[test]
    fn a_single_storey_stays_in_its_base_chunk() {
        let mut world = grass_world(4, 3, 3);
        let low = world.add(
            Entity::new(EntityKind::Building, GridPoint::new(4.0, 4.0)).with_tallness(1),
        );
        assert_eq!(world.entity(low).expect("low").chunks(), &[ChunkIndex(4)]);
        assert!(!world.chunks()[0].members().contains(&low));
        world.check_consistency().expect("consistent");
    }

    #[test]
    fn moving_updates_both_sides_of_the_relation() {
        let mut world = grass_world(4, 3, 1);
        let handle = world.add(Entity::new(EntityKind::Package, GridPoint::new(1.0, 1.0)));
        assert!(world.set_position(handle, GridPoint::new(9.0, 1.0)));

        assert_eq!(world.entity(handle).expect("entity").chunks(), &[ChunkIndex(2)]);
        assert!(world.chunks()[0].members().is_empty());
        assert_eq!(world.chunks()[2].members(), &[handle]);
        assert_eq!(
            world.entity(handle).expect("entity").screen(),
            project(GridPoint::new(9.0, 1.0), world.tile_size())
        );
    }

    #[test]
    fn entities_off_the_grid_are_not_indexed() {
        let mut world = grass_world(4, 1, 1);
        let handle = world.add(Entity::new(EntityKind::Marker, GridPoint::new(-10.0, 2.0)));
        assert!(world.entity(handle).expect("entity").chunks().is_empty());
        assert!(world.chunks()[0].members().is_empty());

        world.set_position(handle, GridPoint::new(f32::NAN, 2.0));
        assert!(world.entity(handle).expect("entity").chunks().is_empty());
    }

    #[test]
    fn removal_unlinks_every_chunk_and_the_id() {
        let mut world = grass_world(4, 2, 2);
        let handle = world.add(
            Entity::new(EntityKind::Package, GridPoint::new(3.5, 3.5))
                .with_id(MapObjectId(42))
                .with_radius(1.0),
        );
        assert_eq!(world.entity(handle).expect("entity").chunks().len(), 4);

        let removed = world.remove(handle).expect("removed");
        assert!(removed.chunks().is_empty());
        assert_eq!(world.find_by_id(MapObjectId(42)), None);
        assert!(world.chunks().iter().all(|chunk| chunk.members().is_empty()));
        assert!(world.remove(handle).is_none());
        assert!(!world.set_position(handle, GridPoint::new(1.0, 1.0)));
    }

    #[test]
    fn symmetry_holds_after_a_random_walk() {
        let mut world = grass_world(4, 4, 4);
        let mut handles = Vec::new();
        let mut seed = 0x2545_f491_u32;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % 1700) as f32 / 100.0 - 0.5
        };
        for step in 0..200 {
            match step % 5 {
                0 | 1 => {
                    let entity = Entity::new(EntityKind::Marker, GridPoint::new(next(), next()))
                        .with_radius(next().abs() / 4.0)
                        .with_tallness((step % 4) as u32);
                    handles.push(world.add(entity));
                }
                2 | 3 => {
                    if let Some(handle) = handles.get(step % handles.len().max(1)).copied() {
                        world.set_position(handle, GridPoint::new(next(), next()));
                    }
                }
                _ => {
                    if !handles.is_empty() {
                        let handle = handles.swap_remove(step % handles.len());
                        world.remove(handle);
                    }
                }
            }
            world.check_consistency().expect("consistent after every step");
        }
    }
}
