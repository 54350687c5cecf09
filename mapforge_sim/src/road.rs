// Road planning: A* over the cell grid, plus width expansion.
//
// Roads connect two cells over 4-connected, passable terrain. The step cost
// rewards flat ground and makes paving over houses expensive but possible:
// crossing into a cell costs `1 + 5·|Δaltitude| + 50·houses`, and cells with
// more houses than the configured destruction budget are excluded outright.
// Altitude limits apply to the endpoints only; the session validates those
// before planning, so intermediate cells are free to climb.
//
// **Critical constraint: determinism.** The open set is a binary heap ordered
// by f-score with ties broken by discovery sequence, so equal-cost frontiers
// expand in a fixed order and the same inputs always yield the same path.

use crate::config::RoadConfig;
use crate::grid::TerrainGrid;
use crate::types::{CellCoord, RoadId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Cost added per house destroyed when a road crosses an occupied cell.
pub const HOUSE_DESTRUCTION_COST: f64 = 50.0;
/// Weight of the altitude difference between adjacent cells.
pub const ALTITUDE_COST_WEIGHT: f64 = 5.0;

// 4-connected neighborhood, clockwise from north. The order is part of the
// deterministic tie-break: equal-cost neighbors enter the open set in this
// sequence.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// A committed road.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub name: String,
    /// Every covered cell: the planned path first, then expansion layers.
    pub cells: Vec<CellCoord>,
    /// Rendering hint only.
    pub visible: bool,
    /// Hex color recorded at creation time.
    pub color: String,
    pub start: CellCoord,
    pub end: CellCoord,
    /// Width in cells the road was expanded to.
    pub width: u32,
}

/// Can `coord` carry road surface?
///
/// Requires an in-bounds, passable cell whose house count does not exceed
/// the destruction budget. Altitude limits are enforced only when
/// `check_altitude` is set — endpoint validation uses them, path search does
/// not.
pub fn can_be_road(
    grid: &TerrainGrid,
    coord: CellCoord,
    cfg: &RoadConfig,
    check_altitude: bool,
) -> bool {
    let Some(cell) = grid.cell(coord) else {
        return false;
    };
    if !cell.is_passable {
        return false;
    }
    if check_altitude && (cell.altitude < cfg.min_altitude || cell.altitude > cfg.max_altitude) {
        return false;
    }
    cell.houses.len() as u32 <= cfg.max_houses_to_destroy
}

/// Cost of stepping from `from` into `to`.
pub fn step_cost(grid: &TerrainGrid, from: CellCoord, to: CellCoord) -> f64 {
    let from_alt = grid.altitude(from).unwrap_or(0.0);
    let to_alt = grid.altitude(to).unwrap_or(0.0);
    let houses = grid.cell(to).map_or(0, |c| c.houses.len()) as f64;
    1.0 + ALTITUDE_COST_WEIGHT * (to_alt - from_alt).abs() + HOUSE_DESTRUCTION_COST * houses
}

// Open-set entry. Reversed ordering turns the max-heap into a min-heap on
// f-score; among equal f-scores the earliest-discovered entry wins.
#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    coord: CellCoord,
    f_score: f64,
    seq: u64,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

/// A* from `start` to `end`, inclusive of both.
///
/// Returns the cheapest 4-connected path under `step_cost`, or an empty
/// vector when no path exists. The caller is expected to have validated the
/// endpoints; unreachable or out-of-bounds endpoints simply yield no path.
pub fn find_path(
    grid: &TerrainGrid,
    start: CellCoord,
    end: CellCoord,
    cfg: &RoadConfig,
) -> Vec<CellCoord> {
    let (Some(start_idx), Some(_)) = (grid.index(start), grid.index(end)) else {
        return Vec::new();
    };
    let n = grid.tiles_x() as usize * grid.tiles_y() as usize;
    let mut g_score = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<CellCoord>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    g_score[start_idx] = 0.0;
    open.push(OpenEntry {
        coord: start,
        f_score: f64::from(start.manhattan_distance(end)),
        seq,
    });

    while let Some(entry) = open.pop() {
        let Some(idx) = grid.index(entry.coord) else {
            continue;
        };
        if closed[idx] {
            continue;
        }
        closed[idx] = true;

        if entry.coord == end {
            return reconstruct(grid, &came_from, end);
        }

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let next = CellCoord::new(entry.coord.x + dx, entry.coord.y + dy);
            let Some(next_idx) = grid.index(next) else {
                continue;
            };
            if closed[next_idx] || !can_be_road(grid, next, cfg, false) {
                continue;
            }
            let tentative = g_score[idx] + step_cost(grid, entry.coord, next);
            if tentative < g_score[next_idx] {
                g_score[next_idx] = tentative;
                came_from[next_idx] = Some(entry.coord);
                seq += 1;
                open.push(OpenEntry {
                    coord: next,
                    f_score: tentative + f64::from(next.manhattan_distance(end)),
                    seq,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct(
    grid: &TerrainGrid,
    came_from: &[Option<CellCoord>],
    end: CellCoord,
) -> Vec<CellCoord> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(idx) = grid.index(current) {
        match came_from[idx] {
            Some(prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Grow a 1-cell path to `width` cells.
///
/// Runs `width - 1` layers; each layer scans every cell accumulated so far
/// and annexes its south and east neighbors when they qualify as road
/// surface (altitude unchecked). The growth direction is asymmetric on
/// purpose: downstream consumers rely on roads thickening toward +x/+y.
pub fn expand_path(
    grid: &TerrainGrid,
    path: &[CellCoord],
    width: u32,
    cfg: &RoadConfig,
) -> Vec<CellCoord> {
    let mut cells: Vec<CellCoord> = path.to_vec();
    if width <= 1 || path.is_empty() {
        return cells;
    }
    let mut seen: FxHashSet<CellCoord> = path.iter().copied().collect();
    for _ in 1..width {
        let snapshot = cells.clone();
        for cell in snapshot {
            for next in [
                CellCoord::new(cell.x, cell.y + 1),
                CellCoord::new(cell.x + 1, cell.y),
            ] {
                if seen.contains(&next) {
                    continue;
                }
                if can_be_road(grid, next, cfg, false) {
                    seen.insert(next);
                    cells.push(next);
                }
            }
        }
    }
    cells
}
