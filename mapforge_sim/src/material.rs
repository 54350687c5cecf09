// Material definitions and the two compiled material views.
//
// A material claims a half-open altitude band `[min, max)`. Bands may
// overlap; depth disambiguates. The flat array resolves each cell to a
// single material number by scanning definitions from the deepest down, so
// a higher-depth material always shadows a lower one. The layered view
// emits one binary grid per definition in ascending depth, overlaps intact,
// plus a synthetic road layer stacked above everything.
//
// Ties on depth resolve by insertion order (stable sorts), which keeps the
// output reproducible when users define two materials at the same depth.

use crate::config::MaterialsConfig;
use crate::grid::TerrainGrid;
use crate::types::MaterialId;
use serde::{Deserialize, Serialize};

/// One altitude-band material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    pub id: MaterialId,
    /// Band lower bound, inclusive.
    pub min_altitude: f64,
    /// Band upper bound, exclusive.
    pub max_altitude: f64,
    /// The number written into exported material arrays.
    pub material_number: u16,
    pub name: String,
    /// Display color, hex string.
    pub color: String,
    /// Stacking order; deeper (larger) wins in the flat array.
    pub depth: i32,
}

impl MaterialDef {
    /// Half-open band test: `min <= altitude < max`.
    pub fn contains(&self, altitude: f64) -> bool {
        altitude >= self.min_altitude && altitude < self.max_altitude
    }
}

/// Ordered collection of material definitions with id assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialRegistry {
    defs: Vec<MaterialDef>,
    next_id: u32,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self {
            defs: Vec::new(),
            next_id: 1,
        }
    }
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard six-band palette sessions start with: a full-range
    /// background at depth 0 with overlapping vegetation and built-surface
    /// bands stacked above it.
    pub fn default_palette() -> Self {
        let mut registry = Self::new();
        registry.add(0.0, 1.0, 10, "bg", "#ffffff", Some(0));
        registry.add(0.1, 0.3, 1, "dry_grass", "#c4a44a", Some(1));
        registry.add(0.25, 0.5, 2, "green_grass", "#4a8c4a", Some(2));
        registry.add(0.45, 0.6, 3, "dark_grass", "#2d5c2d", Some(3));
        registry.add(0.7, 0.8, 4, "sidewalk", "#8c8c8c", Some(4));
        registry.add(0.75, 1.0, 5, "house_area", "#6b4423", Some(5));
        registry
    }

    /// Add a definition. An empty name falls back to `"Material {number}"`;
    /// a missing depth stacks on top (current max + 1, or 0 for the first).
    pub fn add(
        &mut self,
        min_altitude: f64,
        max_altitude: f64,
        material_number: u16,
        name: &str,
        color: &str,
        depth: Option<i32>,
    ) -> MaterialId {
        let id = MaterialId(self.next_id);
        self.next_id += 1;
        let depth = depth.unwrap_or_else(|| {
            self.defs
                .iter()
                .map(|d| d.depth)
                .max()
                .map_or(0, |max| max + 1)
        });
        let name = if name.is_empty() {
            format!("Material {material_number}")
        } else {
            name.to_owned()
        };
        self.defs.push(MaterialDef {
            id,
            min_altitude,
            max_altitude,
            material_number,
            name,
            color: color.to_owned(),
            depth,
        });
        id
    }

    /// Remove by id. Unknown ids are a silent no-op; returns whether
    /// anything was removed.
    pub fn remove(&mut self, id: MaterialId) -> bool {
        let before = self.defs.len();
        self.defs.retain(|d| d.id != id);
        self.defs.len() != before
    }

    pub fn get(&self, id: MaterialId) -> Option<&MaterialDef> {
        self.defs.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut MaterialDef> {
        self.defs.iter_mut().find(|d| d.id == id)
    }

    /// Definitions in insertion order.
    pub fn defs(&self) -> &[MaterialDef] {
        &self.defs
    }

    /// Definitions sorted by ascending depth; insertion order breaks ties.
    pub fn sorted_ascending(&self) -> Vec<&MaterialDef> {
        let mut sorted: Vec<&MaterialDef> = self.defs.iter().collect();
        sorted.sort_by_key(|d| d.depth);
        sorted
    }

    /// Definitions sorted by descending depth; insertion order breaks ties.
    pub fn sorted_descending(&self) -> Vec<&MaterialDef> {
        let mut sorted: Vec<&MaterialDef> = self.defs.iter().collect();
        sorted.sort_by(|a, b| b.depth.cmp(&a.depth));
        sorted
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn max_depth(&self) -> Option<i32> {
        self.defs.iter().map(|d| d.depth).max()
    }
}

/// One binary grid of the layered view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLayer {
    pub name: String,
    pub material_number: u16,
    pub depth: i32,
    /// Row-major 0/1 occupancy grid.
    pub data: Vec<Vec<u8>>,
}

/// Resolve every cell to a single material number.
///
/// Deepest matching band wins; cells matching no band get 0. When
/// `roads_as_material` is set, road cells get the configured road number
/// regardless of altitude.
pub fn flat_materials(
    grid: &TerrainGrid,
    registry: &MaterialRegistry,
    cfg: &MaterialsConfig,
) -> Vec<Vec<u16>> {
    let by_depth = registry.sorted_descending();
    let mut rows = Vec::with_capacity(grid.tiles_y() as usize);
    let mut row = Vec::with_capacity(grid.tiles_x() as usize);
    for (coord, cell) in grid.iter() {
        let number = if cfg.roads_as_material && !cell.road_ids.is_empty() {
            cfg.road_material_number
        } else {
            by_depth
                .iter()
                .find(|d| d.contains(cell.altitude))
                .map_or(0, |d| d.material_number)
        };
        row.push(number);
        if coord.x as u32 == grid.tiles_x() - 1 {
            rows.push(std::mem::take(&mut row));
            row = Vec::with_capacity(grid.tiles_x() as usize);
        }
    }
    rows
}

/// Compile the layered view: one binary grid per definition in ascending
/// depth. With `roads_as_material` set, a synthetic "Road" layer is appended
/// above the deepest definition; with `road_destroy_materials` also set,
/// road cells are zeroed out of every altitude layer.
pub fn layered_materials(
    grid: &TerrainGrid,
    registry: &MaterialRegistry,
    cfg: &MaterialsConfig,
) -> Vec<MaterialLayer> {
    let tiles_x = grid.tiles_x() as usize;
    let tiles_y = grid.tiles_y() as usize;
    let mut layers = Vec::with_capacity(registry.len() + 1);

    for def in registry.sorted_ascending() {
        let mut data = vec![vec![0u8; tiles_x]; tiles_y];
        for (coord, cell) in grid.iter() {
            let destroyed = cfg.road_destroy_materials
                && cfg.roads_as_material
                && !cell.road_ids.is_empty();
            if def.contains(cell.altitude) && !destroyed {
                data[coord.y as usize][coord.x as usize] = 1;
            }
        }
        layers.push(MaterialLayer {
            name: def.name.clone(),
            material_number: def.material_number,
            depth: def.depth,
            data,
        });
    }

    if cfg.roads_as_material {
        let mut road_data = vec![vec![0u8; tiles_x]; tiles_y];
        for (coord, cell) in grid.iter() {
            if !cell.road_ids.is_empty() {
                road_data[coord.y as usize][coord.x as usize] = 1;
            }
        }
        layers.push(MaterialLayer {
            name: "Road".to_owned(),
            material_number: cfg.road_material_number,
            depth: registry.max_depth().map_or(0, |d| d + 1),
            data: road_data,
        });
    }

    layers
}
