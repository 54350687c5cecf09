// Stochastic entity placement.
//
// All three generators sweep the grid row-major, cell by cell. Each eligible
// cell rolls a probability gate, then tries to fit entities at random
// sub-cell offsets with a bounded retry budget, rejecting anything that
// collides with committed entities or with earlier members of the same
// batch. Houses cluster near roads and other houses, trees cluster near
// trees and shun houses, rocks just roll their base probability.
//
// A plan only *proposes* placements; committing them to the grid (and
// creating the group) is the session's job, so a pass that places nothing
// leaves no trace.
//
// **Critical constraint: determinism.** The sweep order is fixed and every
// random draw comes from the session PRNG, so a given grid + config + rng
// state always yields the same batch.

use crate::config::{HouseConfig, RockConfig, TreeConfig};
use crate::grid::{Cell, TerrainGrid};
use crate::spatial::{self, Circle, Footprint, Rect};
use crate::types::CellCoord;
use mapforge_prng::MapRng;

const HOUSE_ATTEMPTS: u32 = 30;
const ROCK_ATTEMPTS: u32 = 20;
const TREE_ATTEMPTS: u32 = 30;

// Houses keep this fraction of the cell edge clear on every side.
const HOUSE_MARGIN_FRAC: f64 = 0.05;
// Circles keep this many pixels beyond their radius clear inside the cell.
const CIRCLE_MARGIN_PX: f64 = 2.0;

/// A proposed house position within its anchor cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HouseFit {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width_px: f64,
    pub height_px: f64,
}

/// A proposed rock or tree position within its anchor cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleFit {
    pub offset_x: f64,
    pub offset_y: f64,
    pub radius_px: f64,
}

/// The outcome of one generation sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementBatch<T> {
    /// Proposed placements in sweep order, keyed by anchor cell.
    pub placements: Vec<(CellCoord, T)>,
    /// Number of distinct cells that received at least one placement.
    pub cells_touched: u32,
}

impl<T> Default for PlacementBatch<T> {
    fn default() -> Self {
        Self {
            placements: Vec::new(),
            cells_touched: 0,
        }
    }
}

/// Sum of `importance / d²` over cells within the Chebyshev radius that
/// satisfy `pred`, where d² is the squared Euclidean cell distance. The
/// center cell is excluded; a non-positive importance short-circuits to 0.
fn proximity_bonus(
    grid: &TerrainGrid,
    at: CellCoord,
    radius: i32,
    importance: f64,
    pred: impl Fn(&Cell) -> bool,
) -> f64 {
    if importance <= 0.0 {
        return 0.0;
    }
    let mut bonus = 0.0;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            let neighbor = CellCoord::new(at.x + dx, at.y + dy);
            if grid.cell(neighbor).is_some_and(&pred) {
                bonus += importance / f64::from(dx * dx + dy * dy);
            }
        }
    }
    bonus
}

/// Total houses on cells within the Chebyshev radius, the center included.
fn nearby_house_count(grid: &TerrainGrid, at: CellCoord, radius: i32) -> u32 {
    let mut count = 0;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let neighbor = CellCoord::new(at.x + dx, at.y + dy);
            if let Some(cell) = grid.cell(neighbor) {
                count += cell.houses.len() as u32;
            }
        }
    }
    count
}

// Radius draw tolerant of a degenerate (min == max) range.
fn uniform_radius(rng: &mut MapRng, min: f64, max: f64) -> f64 {
    if max > min { rng.range_f64(min, max) } else { min }
}

// How many entities to attempt in a cell that passed its gate.
fn batch_size(rng: &mut MapRng, max_per_cell: u32, remaining: u32) -> u32 {
    let drawn = (rng.next_f64() * f64::from(max_per_cell)).floor() as u32 + 1;
    drawn.min(remaining)
}

/// Propose a batch of houses.
///
/// Eligible cells are passable, inside the altitude band, road-free, and
/// under their per-cell cap. The placement probability is the configured
/// base plus inverse-square proximity bonuses for roads (only when any roads
/// exist) and for already-committed houses.
pub fn plan_houses(
    grid: &TerrainGrid,
    cfg: &HouseConfig,
    has_roads: bool,
    rng: &mut MapRng,
) -> PlacementBatch<HouseFit> {
    let mut batch = PlacementBatch::default();
    let mut pending: Vec<Footprint> = Vec::new();

    for coord in grid.coords() {
        let Some(cell) = grid.cell(coord) else {
            continue;
        };
        let current = cell.houses.len() as u32;
        if !cell.is_passable
            || cell.altitude < cfg.min_height
            || cell.altitude > cfg.max_height
            || !cell.road_ids.is_empty()
            || current >= cfg.max_per_cell
        {
            continue;
        }

        let mut probability = cfg.probability;
        if has_roads {
            probability += proximity_bonus(
                grid,
                coord,
                cfg.search_radius,
                cfg.road_importance,
                |c| !c.road_ids.is_empty(),
            );
        }
        probability += proximity_bonus(
            grid,
            coord,
            cfg.search_radius,
            cfg.neighbor_importance,
            |c| !c.houses.is_empty(),
        );
        let probability = probability.clamp(0.0, 1.0);

        if rng.next_f64() > probability {
            continue;
        }

        let to_add = batch_size(rng, cfg.max_per_cell, cfg.max_per_cell - current);
        let mut placed_in_cell = 0;
        for _ in 0..to_add {
            if let Some(fit) = try_place_house(grid, coord, cfg, &pending, rng) {
                let cs = grid.cell_size_px();
                pending.push(Footprint::Rect(Rect::new(
                    f64::from(coord.x) * cs + fit.offset_x * cs,
                    f64::from(coord.y) * cs + fit.offset_y * cs,
                    fit.width_px,
                    fit.height_px,
                )));
                batch.placements.push((coord, fit));
                placed_in_cell += 1;
            }
        }
        if placed_in_cell > 0 {
            batch.cells_touched += 1;
        }
    }
    batch
}

fn try_place_house(
    grid: &TerrainGrid,
    coord: CellCoord,
    cfg: &HouseConfig,
    pending: &[Footprint],
    rng: &mut MapRng,
) -> Option<HouseFit> {
    let cs = grid.cell_size_px();
    let margin_px = HOUSE_MARGIN_FRAC * cs;
    let base_x = f64::from(coord.x) * cs;
    let base_y = f64::from(coord.y) * cs;
    let map_w = grid.world_width_px();
    let map_h = grid.world_height_px();

    // Reject cells too close to the map edge to ever fit the footprint.
    let max_right = base_x + cs - margin_px + cfg.width_px;
    let max_bottom = base_y + cs - margin_px + cfg.height_px;
    if max_right > map_w || max_bottom > map_h {
        let available_w = map_w - (base_x + margin_px);
        let available_h = map_h - (base_y + margin_px);
        if available_w < cfg.width_px || available_h < cfg.height_px {
            return None;
        }
    }

    let available = 1.0 - 2.0 * HOUSE_MARGIN_FRAC;
    for _ in 0..HOUSE_ATTEMPTS {
        let offset_x = HOUSE_MARGIN_FRAC + rng.next_f64() * available;
        let offset_y = HOUSE_MARGIN_FRAC + rng.next_f64() * available;
        let rect = Rect::new(
            base_x + offset_x * cs,
            base_y + offset_y * cs,
            cfg.width_px,
            cfg.height_px,
        );

        // Every cell under the footprint must itself accept a house.
        let mut footprint_ok = true;
        for under in spatial::cells_in_world_bounds(grid, rect) {
            let Some(under_cell) = grid.cell(under) else {
                footprint_ok = false;
                break;
            };
            if !under_cell.is_passable
                || !under_cell.road_ids.is_empty()
                || under_cell.altitude < cfg.min_height
                || under_cell.altitude > cfg.max_height
            {
                footprint_ok = false;
                break;
            }
        }
        if !footprint_ok {
            continue;
        }

        if !spatial::rect_collides(grid, rect, pending) {
            return Some(HouseFit {
                offset_x,
                offset_y,
                width_px: cfg.width_px,
                height_px: cfg.height_px,
            });
        }
    }
    None
}

/// Propose a batch of rocks. Eligibility is the altitude band, no road, and
/// the per-cell cap; the probability is the flat configured base.
pub fn plan_rocks(
    grid: &TerrainGrid,
    cfg: &RockConfig,
    rng: &mut MapRng,
) -> PlacementBatch<CircleFit> {
    let mut batch = PlacementBatch::default();
    let mut pending: Vec<Footprint> = Vec::new();

    for coord in grid.coords() {
        let Some(cell) = grid.cell(coord) else {
            continue;
        };
        let current = cell.rocks.len() as u32;
        if cell.altitude < cfg.min_altitude
            || cell.altitude > cfg.max_altitude
            || !cell.road_ids.is_empty()
            || current >= cfg.max_per_cell
        {
            continue;
        }
        if rng.next_f64() > cfg.probability.clamp(0.0, 1.0) {
            continue;
        }

        let to_add = batch_size(rng, cfg.max_per_cell, cfg.max_per_cell - current);
        let mut placed_in_cell = 0;
        for _ in 0..to_add {
            let radius = uniform_radius(rng, cfg.min_radius_px, cfg.max_radius_px);
            if let Some(fit) =
                try_place_circle(grid, coord, radius, ROCK_ATTEMPTS, &pending, rng)
            {
                let cs = grid.cell_size_px();
                pending.push(Footprint::Circle(Circle::new(
                    f64::from(coord.x) * cs + fit.offset_x * cs,
                    f64::from(coord.y) * cs + fit.offset_y * cs,
                    fit.radius_px,
                )));
                batch.placements.push((coord, fit));
                placed_in_cell += 1;
            }
        }
        if placed_in_cell > 0 {
            batch.cells_touched += 1;
        }
    }
    batch
}

/// Propose a batch of trees.
///
/// Trees cluster: the base probability gains an inverse-square bonus from
/// cells that already hold trees, then the whole probability is scaled down
/// by `1 - nearby_houses · case_penalty` (floored at zero), where the house
/// count includes the candidate cell itself.
pub fn plan_trees(
    grid: &TerrainGrid,
    cfg: &TreeConfig,
    rng: &mut MapRng,
) -> PlacementBatch<CircleFit> {
    let mut batch = PlacementBatch::default();
    let mut pending: Vec<Footprint> = Vec::new();

    for coord in grid.coords() {
        let Some(cell) = grid.cell(coord) else {
            continue;
        };
        let current = cell.trees.len() as u32;
        if cell.altitude < cfg.min_altitude
            || cell.altitude > cfg.max_altitude
            || !cell.road_ids.is_empty()
            || current >= cfg.max_per_cell
        {
            continue;
        }

        let mut probability = cfg.probability
            + proximity_bonus(
                grid,
                coord,
                cfg.search_radius,
                cfg.tree_attraction,
                |c| !c.trees.is_empty(),
            );
        let houses = nearby_house_count(grid, coord, cfg.search_radius);
        probability *= (1.0 - f64::from(houses) * cfg.case_penalty).max(0.0);
        let probability = probability.clamp(0.0, 1.0);

        if rng.next_f64() > probability {
            continue;
        }

        let to_add = batch_size(rng, cfg.max_per_cell, cfg.max_per_cell - current);
        let mut placed_in_cell = 0;
        for _ in 0..to_add {
            let radius = uniform_radius(rng, cfg.min_radius_px, cfg.max_radius_px);
            if let Some(fit) =
                try_place_circle(grid, coord, radius, TREE_ATTEMPTS, &pending, rng)
            {
                let cs = grid.cell_size_px();
                pending.push(Footprint::Circle(Circle::new(
                    f64::from(coord.x) * cs + fit.offset_x * cs,
                    f64::from(coord.y) * cs + fit.offset_y * cs,
                    fit.radius_px,
                )));
                batch.placements.push((coord, fit));
                placed_in_cell += 1;
            }
        }
        if placed_in_cell > 0 {
            batch.cells_touched += 1;
        }
    }
    batch
}

fn try_place_circle(
    grid: &TerrainGrid,
    coord: CellCoord,
    radius: f64,
    attempts: u32,
    pending: &[Footprint],
    rng: &mut MapRng,
) -> Option<CircleFit> {
    let cs = grid.cell_size_px();
    let margin_rel = (radius + CIRCLE_MARGIN_PX) / cs;
    let available = 1.0 - 2.0 * margin_rel;
    if available <= 0.0 {
        // The circle cannot fit inside a single cell with its margin.
        return None;
    }
    let base_x = f64::from(coord.x) * cs;
    let base_y = f64::from(coord.y) * cs;
    let map_w = grid.world_width_px();
    let map_h = grid.world_height_px();

    for _ in 0..attempts {
        let offset_x = margin_rel + rng.next_f64() * available;
        let offset_y = margin_rel + rng.next_f64() * available;
        let circle = Circle::new(base_x + offset_x * cs, base_y + offset_y * cs, radius);

        // Keep the whole disc inside the world.
        if circle.x - radius < 0.0
            || circle.x + radius > map_w
            || circle.y - radius < 0.0
            || circle.y + radius > map_h
        {
            continue;
        }
        if !spatial::circle_collides(grid, circle, pending) {
            return Some(CircleFit {
                offset_x,
                offset_y,
                radius_px: radius,
            });
        }
    }
    None
}
