use tracing::{info, warn};

use crate::app::rendering::GridPoint;

use super::entity::{Behavior, Entity, EntityHandle, EntityKind, Footprint, MapObjectId, Visual};
use super::GameWorld;

pub const GHOST_WAIT_MILLIS: f32 = 500.0;
/// Tiles per tick, independent of frame time.
pub const GHOST_SPEED: f32 = 0.075;
const GHOST_ALPHA: f32 = 0.5;

/// What a respawned vehicle looks like.
#[derive(Debug, Clone)]
pub struct VehicleTemplate {
    pub radius: f32,
    pub visual: Visual,
}

impl VehicleTemplate {
    pub fn spawn(&self, position: GridPoint, heading_radians: f32) -> Entity {
        Entity::new(EntityKind::Vehicle, position)
            .with_radius(self.radius)
            .with_heading(heading_radians)
            .with_visual(self.visual.clone())
    }

    fn ghost_visual(&self) -> Visual {
        match &self.visual {
            Visual::Sprite { sprite, alpha } => Visual::Sprite {
                sprite: sprite.clone(),
                alpha: alpha * GHOST_ALPHA,
            },
            Visual::Dot { color, radius_px } => Visual::Dot {
                color: [
                    color[0],
                    color[1],
                    color[2],
                    (color[3] as f32 * GHOST_ALPHA).round() as u8,
                ],
                radius_px: *radius_px,
            },
            other => other.clone(),
        }
    }
}

/// Warps any vehicle whose circle touches the portal rectangle to the centre
/// of the destination entity.
#[derive(Debug)]
pub struct PortalBehavior {
    destination: MapObjectId,
    nearby: Vec<EntityHandle>,
}

impl PortalBehavior {
    pub fn new(destination: MapObjectId) -> Self {
        Self {
            destination,
            nearby: Vec::new(),
        }
    }

    pub fn destination(&self) -> MapObjectId {
        self.destination
    }
}

impl Behavior for PortalBehavior {
    fn tick(&mut self, handle: EntityHandle, _dt_millis: f32, world: &mut GameWorld) {
        let Some(portal) = world.entity(handle) else {
            return;
        };
        let Footprint::Rect { width, height } = portal.footprint() else {
            return;
        };
        let origin = portal.position();
        let Some(arrival) = world
            .find_by_id(self.destination)
            .and_then(|destination| world.entity(destination))
            .map(Entity::center)
        else {
            return;
        };

        world.entities_near(handle, &mut self.nearby);
        for other in self.nearby.iter().copied() {
            let Some(vehicle) = world.entity(other) else {
                continue;
            };
            if vehicle.kind() != EntityKind::Vehicle {
                continue;
            }
            let radius = vehicle.footprint().radius().unwrap_or(0.0);
            if circle_touches_rect(vehicle.position(), radius, origin, width, height) {
                world.set_position(other, arrival);
                info!(
                    portal = handle.index(),
                    destination = self.destination.0,
                    x = arrival.x,
                    y = arrival.y,
                    "vehicle_warped"
                );
            }
        }
    }
}

fn circle_touches_rect(
    center: GridPoint,
    radius: f32,
    origin: GridPoint,
    width: f32,
    height: f32,
) -> bool {
    let closest_x = center.x.clamp(origin.x, origin.x + width);
    let closest_y = center.y.clamp(origin.y, origin.y + height);
    center.distance_squared(GridPoint::new(closest_x, closest_y)) <= radius * radius
}

/// Drifts toward a respawn point after a short pause, then removes itself and
/// puts a fresh vehicle there.
#[derive(Debug)]
pub struct GhostBehavior {
    respawn_point: EntityHandle,
    wait_millis: f32,
    vehicle: VehicleTemplate,
}

impl GhostBehavior {
    pub fn new(respawn_point: EntityHandle, vehicle: VehicleTemplate) -> Self {
        Self {
            respawn_point,
            wait_millis: GHOST_WAIT_MILLIS,
            vehicle,
        }
    }
}

impl Behavior for GhostBehavior {
    fn tick(&mut self, handle: EntityHandle, dt_millis: f32, world: &mut GameWorld) {
        self.wait_millis = (self.wait_millis - dt_millis).max(0.0);
        if self.wait_millis > 0.0 {
            return;
        }
        let Some(ghost) = world.entity(handle) else {
            return;
        };
        let position = ghost.position();
        let Some((target, heading)) = world
            .entity(self.respawn_point)
            .map(|point| (point.position(), point.heading()))
        else {
            warn!(ghost = handle.index(), "respawn_point_missing");
            world.remove(handle);
            return;
        };

        let dx = target.x - position.x;
        let dy = target.y - position.y;
        if dx * dx + dy * dy < GHOST_SPEED {
            world.remove(handle);
            let vehicle = world.add(self.vehicle.spawn(target, heading));
            info!(
                vehicle = vehicle.index(),
                x = target.x,
                y = target.y,
                "vehicle_respawned"
            );
        } else {
            let direction = dy.atan2(dx);
            world.set_position(
                handle,
                GridPoint::new(
                    position.x + direction.cos() * GHOST_SPEED,
                    position.y + direction.sin() * GHOST_SPEED,
                ),
            );
        }
    }
}

/// Removes `vehicle` and leaves a ghost in its place that heads for the
/// nearest respawn point. Returns the ghost, or `None` when the vehicle is
/// gone or the map has no respawn point (the vehicle is still removed).
pub fn wreck_vehicle(
    world: &mut GameWorld,
    vehicle: EntityHandle,
    template: &VehicleTemplate,
) -> Option<EntityHandle> {
    let wreck = world.remove(vehicle)?;
    let position = wreck.position();
    let Some(respawn_point) = world.nearest_of_type(EntityKind::RespawnPoint, position) else {
        warn!(x = position.x, y = position.y, "no_respawn_point");
        return None;
    };
    let ghost = world.add(
        Entity::new(EntityKind::Ghost, position)
            .with_heading(wreck.heading())
            .with_visual(template.ghost_visual())
            .with_behavior(GhostBehavior::new(respawn_point, template.clone())),
    );
    info!(x = position.x, y = position.y, "vehicle_wrecked");
    Some(ghost)
}
