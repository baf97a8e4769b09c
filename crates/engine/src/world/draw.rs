use crate::app::rendering::{
    project, world_to_viewport_px, CompositeMode, FrameBuffers, GridPoint, ScreenPoint, Sprite,
    Surface, TileSize, Viewport,
};

use super::chunk::{Chunk, ChunkIndex};
use super::entity::{Entity, EntityHandle, Visual};
use super::GameWorld;

const OUTLINE_FILL_ALPHA: u8 = 96;

/// Per-frame buffers reused across frames.
#[derive(Debug, Default)]
pub(crate) struct DrawScratch {
    visible_chunks: Vec<ChunkIndex>,
    draw_list: Vec<EntityHandle>,
    stamps: Vec<u64>,
    frame: u64,
}

/// Strict overlap between a chunk's screen bounding box and the viewport
/// centred on `camera`. The box overestimates the chunk's diamond, so this
/// can report chunks that are not actually on screen, never the reverse.
pub fn chunk_intersects_view(chunk: &Chunk, camera: ScreenPoint, viewport: Viewport) -> bool {
    let half_view_w = viewport.width as f32 / 2.0;
    let half_view_h = viewport.height as f32 / 2.0;
    let left = chunk.screen_left();
    let right = chunk.screen_right();
    let top = chunk.screen().y;
    let bottom = chunk.screen().y + chunk.screen_height();

    left < camera.x + half_view_w
        && right > camera.x - half_view_w
        && top < camera.y + half_view_h
        && bottom > camera.y - half_view_h
}

impl GameWorld {
    pub fn visible_chunks(&self, viewport: Viewport) -> impl Iterator<Item = ChunkIndex> + '_ {
        let camera = self.camera.screen();
        self.chunks
            .iter()
            .enumerate()
            .filter(move |(_, chunk)| chunk_intersects_view(chunk, camera, viewport))
            .map(|(index, _)| ChunkIndex(index as u32))
    }

    /// Distinct members of every visible chunk in painter's order: ascending
    /// `screen.y + depth_offset`, ties by handle for a stable result.
    pub fn collect_draw_list(&mut self, viewport: Viewport) -> &[EntityHandle] {
        let camera = self.camera.screen();
        let scratch = &mut self.draw_scratch;
        scratch.frame = scratch.frame.wrapping_add(1).max(1);
        let frame = scratch.frame;
        if scratch.stamps.len() < self.entities.slot_count() {
            scratch.stamps.resize(self.entities.slot_count(), 0);
        }

        scratch.visible_chunks.clear();
        scratch.draw_list.clear();
        for (index, chunk) in self.chunks.iter().enumerate() {
            if !chunk_intersects_view(chunk, camera, viewport) {
                continue;
            }
            scratch.visible_chunks.push(ChunkIndex(index as u32));
            for member in chunk.members() {
                let stamp = &mut scratch.stamps[member.index()];
                if *stamp == frame {
                    continue;
                }
                *stamp = frame;
                scratch.draw_list.push(*member);
            }
        }

        let entities = &self.entities;
        scratch.draw_list.sort_by(|a, b| {
            let key_a = entities.get(*a).map_or(f32::MAX, Entity::depth_key);
            let key_b = entities.get(*b).map_or(f32::MAX, Entity::depth_key);
            key_a.total_cmp(&key_b).then_with(|| a.cmp(b))
        });
        &scratch.draw_list
    }

    /// Draws one frame: visible terrain, then entities back to front, with the
    /// occlusion cutout taken when the tracked vehicle is reached. The front
    /// buffer holds the finished frame.
    pub fn draw(&mut self, buffers: &mut FrameBuffers) {
        let viewport = Viewport {
            width: buffers.width(),
            height: buffers.height(),
        };
        let compositor = self.compositor;
        compositor.begin_frame(buffers);
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }

        self.collect_draw_list(viewport);
        let camera = self.camera.screen();
        let tile_size = self.tile_size;
        let scratch = &self.draw_scratch;

        for chunk in &scratch.visible_chunks {
            let Some(chunk) = self.chunks.get(chunk.get()) else {
                continue;
            };
            for tile in chunk.tiles_by_row() {
                let Some(sprite) = tile.sprite.as_deref() else {
                    continue;
                };
                let anchor = world_to_viewport_px(tile.screen, camera, viewport);
                draw_tile_sprite(
                    &mut buffers.back,
                    sprite,
                    anchor,
                    tile.offset_px,
                    tile_size,
                    CompositeMode::SourceAtop,
                );
            }
        }

        for handle in &scratch.draw_list {
            let Some(entity) = self.entities.get(*handle) else {
                continue;
            };
            let anchor = world_to_viewport_px(entity.screen(), camera, viewport);
            draw_entity(&mut buffers.back, entity, anchor, camera, viewport, tile_size);
            if self.tracked_vehicle == Some(*handle) {
                compositor.reveal_vehicle(buffers, anchor);
            }
        }

        compositor.finish_frame(buffers);
    }
}

fn draw_entity(
    target: &mut Surface,
    entity: &Entity,
    anchor: (f32, f32),
    camera: ScreenPoint,
    viewport: Viewport,
    tile_size: TileSize,
) {
    let mode = entity.composite_mode();
    match entity.visual() {
        Visual::None => {}
        Visual::Tile { sprite, offset_px } => {
            draw_tile_sprite(target, sprite, anchor, *offset_px, tile_size, mode);
        }
        Visual::Sprite { sprite, alpha } => {
            let left = anchor.0 - sprite.width() as f32 / 2.0;
            let top = anchor.1 - sprite.height() as f32 / 2.0;
            target.draw_sprite(sprite, left.round() as i32, top.round() as i32, *alpha, mode);
        }
        Visual::Building { pieces } => {
            let mut bottom = anchor.1 + tile_size.tile_height;
            for piece in pieces {
                let left = anchor.0 - piece.sprite.width() as f32 / 2.0 + piece.offset_px.0;
                let top = bottom - piece.sprite.height() as f32 + piece.offset_px.1;
                target.draw_sprite(
                    &piece.sprite,
                    left.round() as i32,
                    top.round() as i32,
                    1.0,
                    mode,
                );
                bottom -= piece.tallness_px;
            }
        }
        Visual::Outline { color } => {
            let bounds = entity.bounds();
            let corners = [
                GridPoint::new(bounds.min_x, bounds.min_y),
                GridPoint::new(bounds.max_x, bounds.min_y),
                GridPoint::new(bounds.max_x, bounds.max_y),
                GridPoint::new(bounds.min_x, bounds.max_y),
            ]
            .map(|corner| world_to_viewport_px(project(corner, tile_size), camera, viewport));
            let fill = [color[0], color[1], color[2], OUTLINE_FILL_ALPHA.min(color[3])];
            fill_quad(target, &corners, fill, mode);
            for index in 0..corners.len() {
                let next = corners[(index + 1) % corners.len()];
                target.draw_line(corners[index], next, *color, mode);
            }
        }
        Visual::Dot { color, radius_px } => {
            target.fill_circle(anchor.0, anchor.1, *radius_px, *color, mode);
        }
    }
}

/// Map tiles are anchored the way the map editor exports isometric tiles:
/// horizontally centred on the tile's top corner, bottom-aligned one tile
/// height below it.
fn draw_tile_sprite(
    target: &mut Surface,
    sprite: &Sprite,
    anchor: (f32, f32),
    offset_px: (f32, f32),
    tile_size: TileSize,
    mode: CompositeMode,
) {
    let left = anchor.0 - tile_size.tile_width + sprite.width() as f32 / 2.0 + offset_px.0;
    let top = anchor.1 + tile_size.tile_height - sprite.height() as f32 + offset_px.1;
    target.draw_sprite(sprite, left.round() as i32, top.round() as i32, 1.0, mode);
}

/// Scanline fill of a convex quad.
fn fill_quad(target: &mut Surface, corners: &[(f32, f32); 4], color: [u8; 4], mode: CompositeMode) {
    let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min).floor() as i32;
    let max_y = corners
        .iter()
        .map(|c| c.1)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil() as i32;
    let min_y = min_y.max(0);
    let max_y = max_y.min(target.height() as i32);
    for y in min_y..max_y {
        let scan_y = y as f32 + 0.5;
        let mut left = f32::INFINITY;
        let mut right = f32::NEG_INFINITY;
        for index in 0..corners.len() {
            let (x0, y0) = corners[index];
            let (x1, y1) = corners[(index + 1) % corners.len()];
            if (scan_y < y0.min(y1)) || (scan_y > y0.max(y1)) || (y1 - y0).abs() <= f32::EPSILON {
                continue;
            }
            let x = x0 + (scan_y - y0) * (x1 - x0) / (y1 - y0);
            left = left.min(x);
            right = right.max(x);
        }
        if left > right {
            continue;
        }
        let start = left.round().max(0.0) as i32;
        let end = right.round().min(target.width() as f32) as i32;
        for x in start..end {
            target.blend_pixel(x, y, color, mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::grass_world;
    use super::*;
    use crate::world::{BuildingPiece, EntityKind};

    fn viewport() -> Viewport {
        Viewport {
            width: 320,
            height: 240,
        }
    }

    #[test]
    fn culling_is_sound_for_every_chunk() {
        let mut world = grass_world(4, 6, 6);
        world.camera_mut().snap_to(ScreenPoint::new(40.0, 200.0));
        let camera = world.camera().screen();
        let visible: Vec<ChunkIndex> = world.visible_chunks(viewport()).collect();

        for (index, chunk) in world.chunks().iter().enumerate() {
            let overlaps = chunk.screen_left() < camera.x + 160.0
                && chunk.screen_right() > camera.x - 160.0
                && chunk.screen().y < camera.y + 120.0
                && chunk.screen().y + chunk.screen_height() > camera.y - 120.0;
            assert_eq!(
                visible.contains(&ChunkIndex(index as u32)),
                overlaps,
                "chunk {index}"
            );
        }
        assert!(!visible.is_empty());
        assert!(visible.len() < world.chunks().len());
    }

    #[test]
    fn narrow_chunks_stay_visible_over_every_tile() {
        use crate::world::{ChunkDesc, LayerDesc, Terrain, TileCell, TileGrid, WorldInfo};

        let mut world = GameWorld::new(TileGrid {
            info: WorldInfo {
                width: 4,
                height: 40,
                tile_width: 64,
                tile_height: 32,
            },
            layers: vec![LayerDesc {
                name: "ground".to_string(),
                offset_px: (0.0, 0.0),
                chunks: vec![ChunkDesc {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 40,
                    cells: vec![
                        TileCell {
                            terrain: Terrain::Grass,
                            ..TileCell::default()
                        };
                        160
                    ],
                }],
            }],
        })
        .expect("world");
        let view = Viewport {
            width: 200,
            height: 200,
        };

        for y in 0..40 {
            for x in 0..4 {
                let centre = project(
                    GridPoint::new(x as f32 + 0.5, y as f32 + 0.5),
                    world.tile_size(),
                );
                world.camera_mut().snap_to(centre);
                assert_eq!(
                    world.visible_chunks(view).count(),
                    1,
                    "tile ({x}, {y}) centred at {centre:?}"
                );
            }
        }
    }

    #[test]
    fn touching_edges_do_not_count_as_overlap() {
        let world = grass_world(4, 1, 1);
        let chunk = &world.chunks()[0];
        // Chunk box spans x in [-128, 128], y in [0, 128].
        let view = Viewport {
            width: 100,
            height: 100,
        };
        assert!(!chunk_intersects_view(chunk, ScreenPoint::new(0.0, -50.0), view));
        assert!(chunk_intersects_view(chunk, ScreenPoint::new(0.0, -49.0), view));
        assert!(!chunk_intersects_view(chunk, ScreenPoint::new(178.0, 50.0), view));
    }

    #[test]
    fn draw_list_is_deduplicated_and_depth_sorted() {
        let mut world = grass_world(4, 2, 2);
        let front = world.add(Entity::new(EntityKind::Package, GridPoint::new(6.0, 6.0)));
        let spanning = world.add(
            Entity::new(EntityKind::Marker, GridPoint::new(4.0, 4.0)).with_radius(1.0),
        );
        let back = world.add(Entity::new(EntityKind::Package, GridPoint::new(0.5, 0.5)));
        let lifted = world.add(
            Entity::new(EntityKind::Package, GridPoint::new(0.5, 0.5)).with_depth_offset(16.0),
        );
        world.camera_mut().snap_to(ScreenPoint::new(0.0, 128.0));

        let list = world.collect_draw_list(viewport()).to_vec();
        assert_eq!(list, vec![back, lifted, spanning, front]);
        let list_again = world.collect_draw_list(viewport()).to_vec();
        assert_eq!(list, list_again);
    }

    #[test]
    fn greater_screen_y_draws_later() {
        let mut world = grass_world(8, 1, 1);
        let a = world.add(Entity::new(EntityKind::Package, GridPoint::new(3.0, 4.0)));
        let b = world.add(Entity::new(EntityKind::Package, GridPoint::new(2.0, 2.0)));
        world.camera_mut().snap_to(ScreenPoint::new(0.0, 100.0));
        let list = world.collect_draw_list(viewport()).to_vec();
        let position = |handle| list.iter().position(|h| *h == handle).expect("listed");
        assert!(position(a) > position(b));
    }

    #[test]
    fn draw_reveals_ground_under_a_vehicle_hidden_by_a_building() {
        let mut world = grass_world(8, 1, 1);
        let vehicle_sprite = Arc::new(Sprite::solid(8, 8, [0, 0, 255, 255]));
        let roof = Arc::new(Sprite::solid(64, 64, [255, 0, 0, 255]));
        let vehicle = world.add(
            Entity::new(EntityKind::Vehicle, GridPoint::new(4.0, 4.0))
                .with_radius(0.25)
                .with_visual(Visual::Sprite {
                    sprite: vehicle_sprite,
                    alpha: 1.0,
                }),
        );
        world.add(
            Entity::new(EntityKind::Building, GridPoint::new(5.0, 5.0)).with_visual(
                Visual::Building {
                    pieces: vec![BuildingPiece {
                        sprite: roof,
                        offset_px: (0.0, 0.0),
                        tallness_px: 32.0,
                    }],
                },
            ),
        );
        let vehicle_screen = world.entity(vehicle).expect("vehicle").screen();
        world.camera_mut().snap_to(vehicle_screen);

        let mut buffers = FrameBuffers::new(200, 200);
        world.draw(&mut buffers);

        // The building is drawn after the vehicle and covers it, but the
        // cutout keeps the vehicle visible at the centre of the screen.
        let centre = buffers.front.pixel(100, 100).expect("centre");
        assert!(centre[2] >= 250 && centre[0] <= 5, "{centre:?}");
        // Outside the cutout radius the building is fully opaque.
        assert_eq!(buffers.front.pixel(70, 160), Some([255, 0, 0, 255]));
        // Inside it the building is only partly erased.
        let rim = buffers.front.pixel(100, 150).expect("rim");
        assert!(rim[0] > 100 && rim[2] > 100, "{rim:?}");
    }

    #[test]
    fn draw_without_a_vehicle_presents_the_back_buffer() {
        let mut world = grass_world(8, 1, 1);
        world.add(
            Entity::new(EntityKind::Package, GridPoint::new(4.0, 4.0)).with_visual(Visual::Dot {
                color: [0, 255, 0, 255],
                radius_px: 4.0,
            }),
        );
        let centre = project(GridPoint::new(4.0, 4.0), world.tile_size());
        world.camera_mut().snap_to(centre);
        let mut buffers = FrameBuffers::new(64, 64);
        world.draw(&mut buffers);
        assert_eq!(buffers.front, buffers.back);
        assert_eq!(buffers.front.pixel(32, 32), Some([0, 255, 0, 255]));
        assert_eq!(buffers.front.pixel(0, 0), Some([255, 255, 255, 255]));
    }
}
