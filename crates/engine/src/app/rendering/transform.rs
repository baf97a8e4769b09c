/// Pixel size of one tile's diamond. Tiled exports these as `tilewidth`/`tileheight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSize {
    pub tile_width: f32,
    pub tile_height: f32,
}

/// Logical position in tile units; not necessarily integral.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridPoint {
    pub x: f32,
    pub y: f32,
}

impl GridPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: GridPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Projected position in unscrolled screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ScreenPoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// The one isometric projection. Every screen coordinate in the engine goes
/// through here so tiles, culling, camera and hit tests agree.
pub fn project(point: GridPoint, tile_size: TileSize) -> ScreenPoint {
    ScreenPoint {
        x: (point.x - point.y) * tile_size.tile_width / 2.0,
        y: (point.x + point.y) * tile_size.tile_height / 2.0,
    }
}

pub fn unproject(screen: ScreenPoint, tile_size: TileSize) -> GridPoint {
    let half_w = tile_size.tile_width / 2.0;
    let half_h = tile_size.tile_height / 2.0;
    if half_w.abs() <= f32::EPSILON || half_h.abs() <= f32::EPSILON {
        return GridPoint::default();
    }
    let diff = screen.x / half_w;
    let sum = screen.y / half_h;
    GridPoint {
        x: (sum + diff) / 2.0,
        y: (sum - diff) / 2.0,
    }
}

/// Maps a projected point into viewport pixels, with the camera at the viewport centre.
pub fn world_to_viewport_px(
    screen: ScreenPoint,
    camera_screen: ScreenPoint,
    viewport: Viewport,
) -> (f32, f32) {
    (
        screen.x - camera_screen.x + viewport.width as f32 * 0.5,
        screen.y - camera_screen.y + viewport.height as f32 * 0.5,
    )
}

pub fn viewport_px_to_world(
    px: (f32, f32),
    camera_screen: ScreenPoint,
    viewport: Viewport,
) -> ScreenPoint {
    ScreenPoint {
        x: px.0 + camera_screen.x - viewport.width as f32 * 0.5,
        y: px.1 + camera_screen.y - viewport.height as f32 * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: TileSize = TileSize {
        tile_width: 64.0,
        tile_height: 32.0,
    };

    #[test]
    fn origin_projects_to_origin() {
        let screen = project(GridPoint::new(0.0, 0.0), TILE);
        assert_eq!(screen, ScreenPoint::new(0.0, 0.0));
    }

    #[test]
    fn projection_matches_isometric_formula() {
        for (x, y) in [(1.0, 0.0), (0.0, 1.0), (3.5, -2.25), (-7.0, 11.0), (5.0, 5.0)] {
            let screen = project(GridPoint::new(x, y), TILE);
            assert_eq!(screen.x, (x - y) * 32.0, "x for ({x}, {y})");
            assert_eq!(screen.y, (x + y) * 16.0, "y for ({x}, {y})");
        }
    }

    #[test]
    fn swapped_axes_project_differently_off_the_diagonal() {
        let a = project(GridPoint::new(2.0, 7.0), TILE);
        let b = project(GridPoint::new(7.0, 2.0), TILE);
        assert_ne!(a, b);
        assert_eq!(a.y, b.y);

        let c = project(GridPoint::new(4.0, 4.0), TILE);
        let d = project(GridPoint::new(4.0, 4.0), TILE);
        assert_eq!(c, d);
    }

    #[test]
    fn unproject_inverts_project() {
        let point = GridPoint::new(12.25, -3.5);
        let back = unproject(project(point, TILE), TILE);
        assert!((back.x - point.x).abs() < 1e-4);
        assert!((back.y - point.y).abs() < 1e-4);
    }

    #[test]
    fn camera_position_maps_to_viewport_center() {
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        let camera = ScreenPoint::new(120.0, -40.0);
        let (x, y) = world_to_viewport_px(camera, camera, viewport);
        assert_eq!((x, y), (400.0, 300.0));

        let round_trip = viewport_px_to_world((x + 10.0, y - 5.0), camera, viewport);
        assert_eq!(round_trip, ScreenPoint::new(130.0, -45.0));
    }
}
