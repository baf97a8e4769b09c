use iso_engine::{
    wreck_vehicle, EntityHandle, EntityKind, Footprint, GameWorld, GridPoint, InputAction,
    InputSnapshot, Scene, SceneCommand, Terrain, VehicleTemplate, Viewport,
};
use tracing::{debug, info};

use super::tuning::DrivingTuning;

/// Keyboard driving for the tracked vehicle. Steering and throttle are glue
/// only; the world decides nothing about handling.
pub(crate) struct DrivingScene {
    tuning: DrivingTuning,
    vehicle: VehicleTemplate,
    speed: f32,
    wrecks: u32,
    nearby: Vec<EntityHandle>,
    hover: Option<(GridPoint, Terrain)>,
}

impl DrivingScene {
    pub(crate) fn new(tuning: DrivingTuning, vehicle: VehicleTemplate) -> Self {
        Self {
            tuning,
            vehicle,
            speed: 0.0,
            wrecks: 0,
            nearby: Vec::new(),
            hover: None,
        }
    }

    fn update_speed(&mut self, dt_seconds: f32, input: &InputSnapshot) {
        let tuning = &self.tuning;
        let accelerate = input.is_down(InputAction::Accelerate);
        let reverse = input.is_down(InputAction::Reverse);
        self.speed = match (accelerate, reverse) {
            (true, false) if self.speed < 0.0 => self.speed + tuning.braking * dt_seconds,
            (true, false) => self.speed + tuning.acceleration * dt_seconds,
            (false, true) if self.speed > 0.0 => self.speed - tuning.braking * dt_seconds,
            (false, true) => self.speed - tuning.acceleration * dt_seconds,
            _ => approach_zero(self.speed, tuning.rolling_friction * dt_seconds),
        }
        .clamp(-tuning.max_reverse_speed, tuning.max_speed);
    }

    fn blocked(&mut self, world: &GameWorld, vehicle: EntityHandle, next: GridPoint) -> bool {
        world.entities_near(vehicle, &mut self.nearby);
        self.nearby.iter().any(|other| {
            world.entity(*other).is_some_and(|entity| {
                entity.kind() == EntityKind::Obstacle
                    && matches!(entity.footprint(), Footprint::Rect { .. })
                    && {
                        let bounds = entity.bounds();
                        next.x >= bounds.min_x
                            && next.x < bounds.max_x
                            && next.y >= bounds.min_y
                            && next.y < bounds.max_y
                    }
            })
        })
    }
}

fn approach_zero(value: f32, step: f32) -> f32 {
    if value > 0.0 {
        (value - step).max(0.0)
    } else {
        (value + step).min(0.0)
    }
}

impl Scene for DrivingScene {
    fn load(&mut self, world: &mut GameWorld) {
        self.speed = 0.0;
        info!(
            entity_count = world.entity_count(),
            vehicle = world.tracked_vehicle().is_some(),
            "driving_scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_millis: f32,
        input: &InputSnapshot,
        world: &mut GameWorld,
    ) -> SceneCommand {
        if input.quit_requested() || input.is_down(InputAction::Quit) {
            return SceneCommand::Quit;
        }
        let (width, height) = input.window_size();
        self.hover = input.cursor_position_px().map(|px| {
            let point = world.grid_at_viewport_px(px, Viewport { width, height });
            (point, world.terrain_at(point))
        });
        let Some(vehicle) = world.tracked_vehicle() else {
            self.speed = 0.0;
            return SceneCommand::None;
        };
        let Some((position, heading)) = world
            .entity(vehicle)
            .map(|entity| (entity.position(), entity.heading()))
        else {
            return SceneCommand::None;
        };

        let dt_seconds = fixed_dt_millis / 1000.0;
        self.update_speed(dt_seconds, input);

        let steer = match (
            input.is_down(InputAction::SteerLeft),
            input.is_down(InputAction::SteerRight),
        ) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        let heading = if self.speed == 0.0 {
            heading
        } else {
            heading + steer * self.tuning.turn_rate * dt_seconds * self.speed.signum()
        };
        if let Some(entity) = world.entity_mut(vehicle) {
            entity.set_heading(heading);
        }
        if self.speed == 0.0 {
            return SceneCommand::None;
        }

        let distance = self.speed * dt_seconds;
        let next = GridPoint::new(
            position.x + heading.cos() * distance,
            position.y - heading.sin() * distance,
        );
        if self.blocked(world, vehicle, next) {
            debug!(x = next.x, y = next.y, "vehicle_blocked");
            self.speed = 0.0;
            return SceneCommand::None;
        }
        world.set_position(vehicle, next);

        let terrain = world.terrain_at(next);
        if matches!(terrain, Terrain::Water | Terrain::Void) {
            self.wrecks += 1;
            self.speed = 0.0;
            info!(%terrain, wrecks = self.wrecks, "vehicle_lost");
            wreck_vehicle(world, vehicle, &self.vehicle);
        }
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut GameWorld) {
        info!(
            wrecks = self.wrecks,
            entity_count = world.entity_count(),
            "driving_scene_unloaded"
        );
    }

    fn debug_title(&self, world: &GameWorld) -> Option<String> {
        let status = if world.tracked_vehicle().is_some() {
            format!("{:.1} tiles/s", self.speed)
        } else {
            "respawning".to_string()
        };
        let mut title = format!("Courier | {status} | wrecks {}", self.wrecks);
        if let Some((point, terrain)) = self.hover {
            title.push_str(&format!(" | {terrain} at ({:.1}, {:.1})", point.x, point.y));
        }
        Some(title)
    }
}
