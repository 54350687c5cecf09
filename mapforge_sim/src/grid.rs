// The terrain grid: altitude field plus per-cell entity storage.
//
// The grid is a flat row-major `Vec<Cell>`. Each cell carries its synthesized
// altitude, the derived passability/water flags, and inline lists of the
// roads and entities occupying it. Derived flags are computed once at
// synthesis from fixed thresholds; they never change afterwards (roads and
// entities are layered on top, they do not reshape terrain).
//
// Out-of-range access is a query, not an error: reads answer "absent/false"
// and writes are no-ops, so callers can probe neighborhoods near the map
// edge without clamping on their side.
//
// **Critical constraint: determinism.** Synthesis is parallelized over cells
// with rayon, which is safe because each cell's altitude is a pure function
// of the (already shuffled) permutation table and the cell coordinates.

use crate::config::GridConfig;
use crate::entity::{HousePlacement, RockPlacement, TreePlacement};
use crate::noise::PerlinNoise;
use crate::types::{CellCoord, RoadId};
use mapforge_prng::MapRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Altitudes below this are not passable terrain.
pub const MIN_PASSABLE: f64 = 0.25;
/// Altitudes above this are not passable terrain.
pub const MAX_PASSABLE: f64 = 0.75;
/// Altitudes strictly below this are water.
pub const WATER_THRESHOLD: f64 = 0.3;

/// One grid cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Normalized altitude in [0, 1].
    pub altitude: f64,
    /// `altitude` within the passable band, inclusive on both ends.
    pub is_passable: bool,
    /// `altitude` strictly below the water threshold. Water cells can still
    /// be passable: the bands overlap on purpose (fords, shallows).
    pub is_water: bool,
    /// Roads covering this cell, in paving order.
    pub road_ids: SmallVec<[RoadId; 2]>,
    pub houses: SmallVec<[HousePlacement; 2]>,
    pub rocks: SmallVec<[RockPlacement; 2]>,
    pub trees: SmallVec<[TreePlacement; 2]>,
}

/// The terrain grid for one map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    cells: Vec<Cell>,
    tiles_x: u32,
    tiles_y: u32,
    /// The parameters the grid was synthesized with, kept for export.
    params: GridConfig,
    /// Largest footprint extent (rect edge or circle radius, in pixels) of
    /// any entity ever committed. Collision queries widen their search area
    /// by this much so entities anchored outside the query rect are found.
    /// Monotone: deletions do not shrink it, which keeps it a valid bound.
    max_entity_extent: f64,
}

impl TerrainGrid {
    /// Synthesize a new grid. Returns `None` when the configured dimensions
    /// do not fit at least one cell in each direction.
    pub fn generate(cfg: &GridConfig, rng: &mut MapRng) -> Option<Self> {
        if cfg.cell_size == 0 {
            return None;
        }
        let tiles_x = cfg.width_px / cfg.cell_size;
        let tiles_y = cfg.height_px / cfg.cell_size;
        if tiles_x < 1 || tiles_y < 1 {
            return None;
        }

        let noise = PerlinNoise::new(rng);
        let noise_ref = &noise;
        let cells: Vec<Cell> = (0..tiles_y as i32)
            .into_par_iter()
            .flat_map_iter(move |y| {
                (0..tiles_x as i32).map(move |x| {
                    let altitude = noise_ref.fractal(f64::from(x), f64::from(y), cfg);
                    Cell {
                        altitude,
                        is_passable: (MIN_PASSABLE..=MAX_PASSABLE).contains(&altitude),
                        is_water: altitude < WATER_THRESHOLD,
                        ..Cell::default()
                    }
                })
            })
            .collect();

        Some(Self {
            cells,
            tiles_x,
            tiles_y,
            params: cfg.clone(),
            max_entity_extent: 0.0,
        })
    }

    /// A flat grid at a fixed altitude. Useful as a fixture for pathfinding
    /// and placement tests where terrain variation is noise.
    pub fn uniform(tiles_x: u32, tiles_y: u32, cell_size: u32, altitude: f64) -> Self {
        let cell = Cell {
            altitude,
            is_passable: (MIN_PASSABLE..=MAX_PASSABLE).contains(&altitude),
            is_water: altitude < WATER_THRESHOLD,
            ..Cell::default()
        };
        Self {
            cells: vec![cell; (tiles_x * tiles_y) as usize],
            tiles_x,
            tiles_y,
            params: GridConfig {
                width_px: tiles_x * cell_size,
                height_px: tiles_y * cell_size,
                cell_size,
                ..GridConfig::default()
            },
            max_entity_extent: 0.0,
        }
    }

    /// True before the first successful `generate`.
    pub fn is_unset(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn params(&self) -> &GridConfig {
        &self.params
    }

    pub fn cell_size_px(&self) -> f64 {
        f64::from(self.params.cell_size)
    }

    /// World width actually covered by cells, in pixels. Can be smaller than
    /// the configured width when the cell size does not divide it evenly.
    pub fn world_width_px(&self) -> f64 {
        f64::from(self.tiles_x) * self.cell_size_px()
    }

    pub fn world_height_px(&self) -> f64 {
        f64::from(self.tiles_y) * self.cell_size_px()
    }

    pub fn in_bounds(&self, coord: CellCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.tiles_x
            && (coord.y as u32) < self.tiles_y
    }

    /// Flat index of an in-bounds coordinate.
    pub fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.y as usize * self.tiles_x as usize + coord.x as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|i| self.cells.get(i))
    }

    pub fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.index(coord).and_then(|i| self.cells.get_mut(i))
    }

    /// Passability query; out-of-range cells are not passable.
    pub fn is_passable(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(|c| c.is_passable)
    }

    pub fn altitude(&self, coord: CellCoord) -> Option<f64> {
        self.cell(coord).map(|c| c.altitude)
    }

    /// True when at least one road covers the cell.
    pub fn has_road(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(|c| !c.road_ids.is_empty())
    }

    /// Cell coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> {
        let tiles_x = self.tiles_x as i32;
        let tiles_y = self.tiles_y as i32;
        (0..tiles_y).flat_map(move |y| (0..tiles_x).map(move |x| CellCoord::new(x, y)))
    }

    /// All cells, row-major, paired with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> {
        self.coords().zip(self.cells.iter())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    pub fn max_entity_extent(&self) -> f64 {
        self.max_entity_extent
    }

    /// Record that an entity with the given extent now exists on the grid.
    pub fn note_entity_extent(&mut self, extent: f64) {
        if extent > self.max_entity_extent {
            self.max_entity_extent = extent;
        }
    }
}
