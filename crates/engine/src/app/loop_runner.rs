use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::world::GameWorld;

use super::input::ActionStates;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// How often the chunk membership relation is verified. `None` disables
    /// the check.
    pub consistency_check_interval: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Courier".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            consistency_check_interval: cfg!(debug_assertions).then(|| Duration::from_secs(1)),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `scene` and `world` until the window closes or
/// the scene asks to quit. Simulation runs on a fixed step; drawing happens
/// once per redraw.
pub fn run_app(
    config: LoopConfig,
    mut world: GameWorld,
    mut scene: Box<dyn Scene>,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_millis = fixed_dt.as_secs_f32() * 1000.0;
    let viewport = renderer.viewport();
    let mut input_collector = InputCollector::new(viewport.width, viewport.height);
    let mut consistency_timer = config.consistency_check_interval.map(|interval| {
        IntervalTimer::new(normalize_non_zero_duration(interval, Duration::from_secs(1)))
    });

    scene.load(&mut world);
    world.update_camera();
    info!(
        entity_count = world.entity_count(),
        chunk_count = world.chunks().len(),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        consistency_check = consistency_timer.is_some(),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.clear_cursor_position();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = scene.update(fixed_dt_millis, &input_snapshot, &mut world);
                        world.tick(fixed_dt_millis);
                        if command == SceneCommand::Quit {
                            info!(reason = "scene", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if let Some(timer) = consistency_timer.as_mut() {
                        if timer.is_due(now) {
                            verify_world(&world);
                        }
                    }

                    world.draw(renderer.buffers_mut());
                    if let Err(error) = renderer.present() {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }

                    let next_title = scene.debug_title(&world);
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload(&mut world);
                info!(entity_count = world.entity_count(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// A broken membership relation is a maintenance bug, so debug builds stop
/// right there; release builds only log it.
fn verify_world(world: &GameWorld) {
    if let Err(violation) = world.check_consistency() {
        error!(error = %violation, "consistency_violation");
        if cfg!(debug_assertions) {
            panic!("chunk membership is inconsistent: {violation}");
        }
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    window_width: u32,
    window_height: u32,
    cursor_position_px: Option<(f32, f32)>,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some((x, y));
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::Accelerate, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::Reverse, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::SteerLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::SteerRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            _ => {}
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.window_width,
            self.window_height,
            self.cursor_position_px,
        )
    }
}

#[derive(Debug)]
struct IntervalTimer {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl IntervalTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// True at most once per interval; the first call starts the clock.
    fn is_due(&mut self, now: Instant) -> bool {
        match self.last_fired {
            None => {
                self.last_fired = Some(now);
                false
            }
            Some(last) if now.saturating_duration_since(last) >= self.interval => {
                self.last_fired = Some(now);
                true
            }
            Some(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(16), max_frame_delta),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), Duration::from_secs(1)),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn driving_keys_map_to_actions() {
        let mut input = InputCollector::new(800, 600);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowUp), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyA), true);
        let held = input.snapshot_for_tick();
        assert!(held.is_down(InputAction::Accelerate));
        assert!(held.is_down(InputAction::SteerLeft));
        assert!(!held.is_down(InputAction::Reverse));
        assert_eq!(held.window_size(), (800, 600));

        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), false);
        let released = input.snapshot_for_tick();
        assert!(!released.is_down(InputAction::Accelerate));
        assert!(released.is_down(InputAction::SteerLeft));
    }

    #[test]
    fn snapshot_carries_cursor_until_it_leaves() {
        let mut input = InputCollector::new(1280, 720);
        input.set_cursor_position_px(100.0, 200.0);
        assert_eq!(
            input.snapshot_for_tick().cursor_position_px(),
            Some((100.0, 200.0))
        );
        input.clear_cursor_position();
        assert_eq!(input.snapshot_for_tick().cursor_position_px(), None);
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn interval_timer_fires_once_per_interval() {
        let start = Instant::now();
        let mut timer = IntervalTimer::new(Duration::from_millis(100));
        assert!(!timer.is_due(start));
        assert!(!timer.is_due(start + Duration::from_millis(50)));
        assert!(timer.is_due(start + Duration::from_millis(100)));
        assert!(!timer.is_due(start + Duration::from_millis(150)));
        assert!(timer.is_due(start + Duration::from_millis(210)));
    }
}
