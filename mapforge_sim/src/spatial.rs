// Spatial queries over the terrain grid.
//
// The grid itself is the spatial index: every entity is stored on its anchor
// cell, so "what is near this rect" reduces to scanning the cells under the
// query area. Because footprints can spill past their anchor cell, queries
// widen their area by the largest committed entity extent (tracked on the
// grid) before mapping it to cell ranges — an entity anchored just outside
// the query rect is still found.
//
// Overlap predicates mirror the placement rules exactly: rectangles touching
// edge-to-edge do NOT overlap, while circle/circle and circle/rect contact
// uses strict inequality. Placement relies on these being the single source
// of truth for "collides".

use crate::grid::TerrainGrid;
use crate::types::CellCoord;

/// An axis-aligned rectangle in world (pixel) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangles sharing only an edge or corner do not overlap.
    pub fn overlaps(self, other: Rect) -> bool {
        !(self.x + self.w <= other.x
            || other.x + other.w <= self.x
            || self.y + self.h <= other.y
            || other.y + other.h <= self.y)
    }

    /// Clamp the circle center into the rect and compare squared distances;
    /// strict, so exact tangency does not overlap.
    pub fn overlaps_circle(self, circle: Circle) -> bool {
        let closest_x = circle.x.clamp(self.x, self.x + self.w);
        let closest_y = circle.y.clamp(self.y, self.y + self.h);
        let dx = circle.x - closest_x;
        let dy = circle.y - closest_y;
        dx * dx + dy * dy < circle.r * circle.r
    }

    /// The rect grown by `margin` on every side.
    pub fn expanded(self, margin: f64) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }
}

/// A circle in world (pixel) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    /// Strict: circles exactly touching do not overlap.
    pub fn overlaps(self, other: Circle) -> bool {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt() < self.r + other.r
    }

    pub fn overlaps_rect(self, rect: Rect) -> bool {
        rect.overlaps_circle(self)
    }

    /// Axis-aligned bounding box.
    pub fn bounds(self) -> Rect {
        Rect::new(self.x - self.r, self.y - self.r, 2.0 * self.r, 2.0 * self.r)
    }
}

/// The world-space footprint of a placed or tentative entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Footprint {
    Rect(Rect),
    Circle(Circle),
}

impl Footprint {
    fn overlaps_rect(self, rect: Rect) -> bool {
        match self {
            Footprint::Rect(r) => r.overlaps(rect),
            Footprint::Circle(c) => c.overlaps_rect(rect),
        }
    }

    fn overlaps_circle(self, circle: Circle) -> bool {
        match self {
            Footprint::Rect(r) => r.overlaps_circle(circle),
            Footprint::Circle(c) => c.overlaps(circle),
        }
    }
}

/// A committed house resolved to world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRect {
    pub cell: CellCoord,
    pub shape: Rect,
}

/// A committed rock or tree resolved to world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldCircle {
    pub cell: CellCoord,
    pub shape: Circle,
}

/// Everything found near a query area.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaEntities {
    pub houses: Vec<WorldRect>,
    pub rocks: Vec<WorldCircle>,
    pub trees: Vec<WorldCircle>,
}

/// The in-bounds cells whose area intersects a world-space rect.
///
/// Coordinates are clamped to the grid, so a rect hanging past the map edge
/// yields only the cells that exist. An unset grid yields nothing.
pub fn cells_in_world_bounds(grid: &TerrainGrid, area: Rect) -> Vec<CellCoord> {
    if grid.is_unset() {
        return Vec::new();
    }
    let cs = grid.cell_size_px();
    let min_cx = (area.x / cs).floor().max(0.0) as i32;
    let min_cy = (area.y / cs).floor().max(0.0) as i32;
    let max_cx = ((area.x + area.w) / cs)
        .floor()
        .min(f64::from(grid.tiles_x() - 1)) as i32;
    let max_cy = ((area.y + area.h) / cs)
        .floor()
        .min(f64::from(grid.tiles_y() - 1)) as i32;

    let mut cells = Vec::new();
    for cy in min_cy..=max_cy {
        for cx in min_cx..=max_cx {
            cells.push(CellCoord::new(cx, cy));
        }
    }
    cells
}

/// All committed entities whose anchor cell lies under `area` widened by the
/// grid's maximum entity extent, resolved to world coordinates.
///
/// Each anchor cell is visited exactly once, so no dedup pass is needed.
pub fn entities_in_area(grid: &TerrainGrid, area: Rect) -> AreaEntities {
    let mut found = AreaEntities::default();
    let cs = grid.cell_size_px();
    for coord in cells_in_world_bounds(grid, area.expanded(grid.max_entity_extent())) {
        let Some(cell) = grid.cell(coord) else {
            continue;
        };
        let base_x = f64::from(coord.x) * cs;
        let base_y = f64::from(coord.y) * cs;
        for house in &cell.houses {
            found.houses.push(WorldRect {
                cell: coord,
                shape: Rect::new(
                    base_x + house.offset_x * cs,
                    base_y + house.offset_y * cs,
                    house.width_px,
                    house.height_px,
                ),
            });
        }
        for rock in &cell.rocks {
            found.rocks.push(WorldCircle {
                cell: coord,
                shape: Circle::new(
                    base_x + rock.offset_x * cs,
                    base_y + rock.offset_y * cs,
                    rock.radius_px,
                ),
            });
        }
        for tree in &cell.trees {
            found.trees.push(WorldCircle {
                cell: coord,
                shape: Circle::new(
                    base_x + tree.offset_x * cs,
                    base_y + tree.offset_y * cs,
                    tree.crown_radius_px,
                ),
            });
        }
    }
    found
}

/// Would a rectangle at `rect` collide with any committed entity or any
/// member of the uncommitted `pending` batch?
pub fn rect_collides(grid: &TerrainGrid, rect: Rect, pending: &[Footprint]) -> bool {
    let nearby = entities_in_area(grid, rect);
    if nearby.houses.iter().any(|h| rect.overlaps(h.shape)) {
        return true;
    }
    if nearby.rocks.iter().any(|r| rect.overlaps_circle(r.shape)) {
        return true;
    }
    if nearby.trees.iter().any(|t| rect.overlaps_circle(t.shape)) {
        return true;
    }
    pending.iter().any(|f| f.overlaps_rect(rect))
}

/// Would a circle at `circle` collide with any committed entity or any
/// member of the uncommitted `pending` batch?
pub fn circle_collides(grid: &TerrainGrid, circle: Circle, pending: &[Footprint]) -> bool {
    let nearby = entities_in_area(grid, circle.bounds());
    if nearby.houses.iter().any(|h| circle.overlaps_rect(h.shape)) {
        return true;
    }
    if nearby.rocks.iter().any(|r| circle.overlaps(r.shape)) {
        return true;
    }
    if nearby.trees.iter().any(|t| circle.overlaps(t.shape)) {
        return true;
    }
    pending.iter().any(|f| f.overlaps_circle(circle))
}
