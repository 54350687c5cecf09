// The map session: owned state plus every user-facing operation.
//
// A session owns the PRNG, the terrain grid, the committed roads, the three
// entity group registries, and the material palette. Operations mutate that
// state and return a typed outcome; outcomes render to the status strings a
// front end shows, so nothing in here panics or throws — an invalid request
// is just another outcome.
//
// **Critical constraint: determinism.** All randomness flows through the
// session's single `MapRng`. Replaying the same seed and operation sequence
// reproduces the session byte-for-byte, including every id and every export.

use crate::config::{GridConfig, HouseConfig, MaterialsConfig, RockConfig, RoadConfig, TreeConfig};
use crate::entity::{
    GroupParams, GroupRegistry, HousePlacement, RockPlacement, TreePlacement,
};
use crate::export::{self, ExportData, ExportKind};
use crate::grid::TerrainGrid;
use crate::material::MaterialRegistry;
use crate::placement;
use crate::road::{self, Road};
use crate::types::{CellCoord, EntityKind, GroupId, RoadId};
use mapforge_prng::MapRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a terrain generation request.
#[derive(Clone, Debug, PartialEq)]
pub enum GridOutcome {
    Generated {
        tiles_x: u32,
        tiles_y: u32,
        width_px: u32,
        height_px: u32,
    },
    /// The requested dimensions do not fit a single cell.
    DimensionsTooSmall,
}

impl fmt::Display for GridOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridOutcome::Generated {
                tiles_x,
                tiles_y,
                width_px,
                height_px,
            } => write!(
                f,
                "Terrain generated: {tiles_x}x{tiles_y} tiles ({width_px}x{height_px}px)."
            ),
            GridOutcome::DimensionsTooSmall => {
                write!(f, "Map dimensions are too small for the chosen cell size.")
            }
        }
    }
}

/// Result of an entity generation request.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacementOutcome {
    Generated {
        kind: EntityKind,
        group: GroupId,
        placed: u32,
        cells: u32,
    },
    /// The sweep produced zero placements; no group was created.
    NothingPlaced { kind: EntityKind },
    NoGrid,
}

impl fmt::Display for PlacementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementOutcome::Generated {
                kind,
                group,
                placed,
                cells,
            } => write!(
                f,
                "Generated {placed} {} in {cells} cells (group {group}).",
                kind.plural()
            ),
            PlacementOutcome::NothingPlaced { kind } => write!(
                f,
                "No {} generated. Try raising the probability or widening the filters.",
                kind.plural()
            ),
            PlacementOutcome::NoGrid => write!(f, "Generate terrain first."),
        }
    }
}

/// Why a cell cannot serve as a road endpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EndpointIssue {
    Impassable,
    AltitudeOutOfRange { altitude: f64, min: f64, max: f64 },
    TooManyHouses,
}

/// Result of a road creation request.
#[derive(Clone, Debug, PartialEq)]
pub enum RoadOutcome {
    Created {
        id: RoadId,
        cells: usize,
        width: u32,
        start: CellCoord,
        end: CellCoord,
        destroyed_houses: u32,
        destroyed_rocks: u32,
        destroyed_trees: u32,
    },
    NoPath {
        min_altitude: f64,
        max_altitude: f64,
    },
    InvalidEndpoint {
        cell: CellCoord,
        issue: EndpointIssue,
    },
    NoGrid,
}

impl fmt::Display for RoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadOutcome::Created {
                id,
                cells,
                width,
                start,
                end,
                destroyed_houses,
                destroyed_rocks,
                destroyed_trees,
            } => {
                write!(
                    f,
                    "Road {id} created (width {width}): {cells} cells from {start} to {end}."
                )?;
                if destroyed_houses + destroyed_rocks + destroyed_trees > 0 {
                    write!(
                        f,
                        " Destroyed: {destroyed_houses} houses, {destroyed_rocks} rocks, {destroyed_trees} trees."
                    )?;
                }
                Ok(())
            }
            RoadOutcome::NoPath {
                min_altitude,
                max_altitude,
            } => write!(
                f,
                "Could not find a path (it may be blocked by houses, impassable zones, or cells outside the altitude range {min_altitude}-{max_altitude})."
            ),
            RoadOutcome::InvalidEndpoint { cell, issue } => match issue {
                EndpointIssue::Impassable => write!(f, "Cell {cell} is impassable."),
                EndpointIssue::AltitudeOutOfRange { altitude, min, max } => write!(
                    f,
                    "Cell {cell} altitude {altitude:.2} is outside the allowed range ({min}-{max})."
                ),
                EndpointIssue::TooManyHouses => {
                    write!(f, "Cell {cell} has houses and cannot be a road endpoint.")
                }
            },
            RoadOutcome::NoGrid => write!(f, "Generate terrain first."),
        }
    }
}

/// Result of a deletion request. Deleting something absent is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Result of an export request.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome {
    Exported { data: ExportData, summary: String },
    NoGrid,
}

impl ExportOutcome {
    pub fn status(&self) -> String {
        match self {
            ExportOutcome::Exported { summary, .. } => summary.clone(),
            ExportOutcome::NoGrid => "No map to export. Generate terrain first.".to_owned(),
        }
    }
}

/// Aggregate session counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub roads: usize,
    pub road_cells: usize,
    pub houses: u64,
    pub rocks: u64,
    pub trees: u64,
    pub cells: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Roads: {} ({} cells) | Houses: {} | Rocks: {} | Trees: {} | Cells: {}",
            self.roads, self.road_cells, self.houses, self.rocks, self.trees, self.cells
        )
    }
}

/// One complete map-editing session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapSession {
    rng: MapRng,
    pub grid: TerrainGrid,
    /// Committed roads in creation order.
    pub roads: Vec<Road>,
    next_road_id: u32,
    pub houses: GroupRegistry,
    pub rocks: GroupRegistry,
    pub trees: GroupRegistry,
    pub materials: MaterialRegistry,
    /// Color stamped onto newly created roads.
    pub road_color: String,
}

impl MapSession {
    /// Start a session with the default material palette and an empty grid.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: MapRng::new(seed),
            grid: TerrainGrid::default(),
            roads: Vec::new(),
            next_road_id: 1,
            houses: GroupRegistry::new(),
            rocks: GroupRegistry::new(),
            trees: GroupRegistry::new(),
            materials: MaterialRegistry::default_palette(),
            road_color: RoadConfig::default().color,
        }
    }

    /// Synthesize (or replace) the terrain. Roads and entities from the
    /// previous terrain are discarded and id counters restart; the material
    /// palette survives.
    pub fn generate_grid(&mut self, cfg: &GridConfig) -> GridOutcome {
        let Some(grid) = TerrainGrid::generate(cfg, &mut self.rng) else {
            return GridOutcome::DimensionsTooSmall;
        };
        self.grid = grid;
        self.roads.clear();
        self.next_road_id = 1;
        self.houses.reset();
        self.rocks.reset();
        self.trees.reset();
        GridOutcome::Generated {
            tiles_x: self.grid.tiles_x(),
            tiles_y: self.grid.tiles_y(),
            width_px: cfg.width_px,
            height_px: cfg.height_px,
        }
    }

    /// Run a house generation sweep and commit the results as a new group.
    pub fn generate_houses(&mut self, cfg: &HouseConfig) -> PlacementOutcome {
        if self.grid.is_unset() {
            return PlacementOutcome::NoGrid;
        }
        let has_roads = !self.roads.is_empty();
        let batch = placement::plan_houses(&self.grid, cfg, has_roads, &mut self.rng);
        if batch.placements.is_empty() {
            return PlacementOutcome::NothingPlaced {
                kind: EntityKind::House,
            };
        }
        let placed = batch.placements.len() as u32;
        let group = self
            .houses
            .allocate("Group", placed, GroupParams::Houses(cfg.clone()));
        for (coord, fit) in batch.placements {
            self.grid.note_entity_extent(fit.width_px.max(fit.height_px));
            if let Some(cell) = self.grid.cell_mut(coord) {
                cell.houses.push(HousePlacement {
                    group,
                    offset_x: fit.offset_x,
                    offset_y: fit.offset_y,
                    width_px: fit.width_px,
                    height_px: fit.height_px,
                });
            }
        }
        PlacementOutcome::Generated {
            kind: EntityKind::House,
            group,
            placed,
            cells: batch.cells_touched,
        }
    }

    /// Run a rock generation sweep and commit the results as a new group.
    pub fn generate_rocks(&mut self, cfg: &RockConfig) -> PlacementOutcome {
        if self.grid.is_unset() {
            return PlacementOutcome::NoGrid;
        }
        let batch = placement::plan_rocks(&self.grid, cfg, &mut self.rng);
        if batch.placements.is_empty() {
            return PlacementOutcome::NothingPlaced {
                kind: EntityKind::Rock,
            };
        }
        let placed = batch.placements.len() as u32;
        let group = self
            .rocks
            .allocate("Rocks", placed, GroupParams::Rocks(cfg.clone()));
        for (coord, fit) in batch.placements {
            self.grid.note_entity_extent(fit.radius_px);
            if let Some(cell) = self.grid.cell_mut(coord) {
                cell.rocks.push(RockPlacement {
                    group,
                    offset_x: fit.offset_x,
                    offset_y: fit.offset_y,
                    radius_px: fit.radius_px,
                });
            }
        }
        PlacementOutcome::Generated {
            kind: EntityKind::Rock,
            group,
            placed,
            cells: batch.cells_touched,
        }
    }

    /// Run a tree generation sweep and commit the results as a new group.
    pub fn generate_trees(&mut self, cfg: &TreeConfig) -> PlacementOutcome {
        if self.grid.is_unset() {
            return PlacementOutcome::NoGrid;
        }
        let batch = placement::plan_trees(&self.grid, cfg, &mut self.rng);
        if batch.placements.is_empty() {
            return PlacementOutcome::NothingPlaced {
                kind: EntityKind::Tree,
            };
        }
        let placed = batch.placements.len() as u32;
        let group = self
            .trees
            .allocate("Trees", placed, GroupParams::Trees(cfg.clone()));
        for (coord, fit) in batch.placements {
            self.grid.note_entity_extent(fit.radius_px);
            if let Some(cell) = self.grid.cell_mut(coord) {
                cell.trees.push(TreePlacement {
                    group,
                    offset_x: fit.offset_x,
                    offset_y: fit.offset_y,
                    crown_radius_px: fit.radius_px,
                });
            }
        }
        PlacementOutcome::Generated {
            kind: EntityKind::Tree,
            group,
            placed,
            cells: batch.cells_touched,
        }
    }

    fn endpoint_issue(&self, coord: CellCoord, cfg: &RoadConfig) -> EndpointIssue {
        let Some(cell) = self.grid.cell(coord) else {
            return EndpointIssue::Impassable;
        };
        if !cell.is_passable {
            return EndpointIssue::Impassable;
        }
        if cell.altitude < cfg.min_altitude || cell.altitude > cfg.max_altitude {
            return EndpointIssue::AltitudeOutOfRange {
                altitude: cell.altitude,
                min: cfg.min_altitude,
                max: cfg.max_altitude,
            };
        }
        EndpointIssue::TooManyHouses
    }

    /// Plan and commit a road between two cells.
    ///
    /// Both endpoints are validated against the full road rules (altitude
    /// included); the path in between only needs passable terrain within the
    /// house destruction budget. Committing stamps the road onto every
    /// covered cell and destroys whatever entities were there, atomically —
    /// a failed plan changes nothing.
    pub fn create_road(&mut self, start: CellCoord, end: CellCoord, cfg: &RoadConfig) -> RoadOutcome {
        if self.grid.is_unset() {
            return RoadOutcome::NoGrid;
        }
        for endpoint in [start, end] {
            if !road::can_be_road(&self.grid, endpoint, cfg, true) {
                return RoadOutcome::InvalidEndpoint {
                    cell: endpoint,
                    issue: self.endpoint_issue(endpoint, cfg),
                };
            }
        }
        let base = road::find_path(&self.grid, start, end, cfg);
        if base.is_empty() {
            return RoadOutcome::NoPath {
                min_altitude: cfg.min_altitude,
                max_altitude: cfg.max_altitude,
            };
        }
        let cells = road::expand_path(&self.grid, &base, cfg.width, cfg);

        let id = RoadId(self.next_road_id);
        self.next_road_id += 1;
        let mut destroyed_houses = 0u32;
        let mut destroyed_rocks = 0u32;
        let mut destroyed_trees = 0u32;
        for &coord in &cells {
            let Some(cell) = self.grid.cell_mut(coord) else {
                continue;
            };
            cell.road_ids.push(id);
            destroyed_houses += cell.houses.len() as u32;
            for house in cell.houses.drain(..) {
                self.houses.decrement(house.group);
            }
            destroyed_rocks += cell.rocks.len() as u32;
            for rock in cell.rocks.drain(..) {
                self.rocks.decrement(rock.group);
            }
            destroyed_trees += cell.trees.len() as u32;
            for tree in cell.trees.drain(..) {
                self.trees.decrement(tree.group);
            }
        }
        self.houses.prune_empty();
        self.rocks.prune_empty();
        self.trees.prune_empty();

        let cell_count = cells.len();
        self.roads.push(Road {
            id,
            name: format!("Road {id}"),
            cells,
            visible: true,
            color: self.road_color.clone(),
            start,
            end,
            width: cfg.width,
        });
        RoadOutcome::Created {
            id,
            cells: cell_count,
            width: cfg.width,
            start,
            end,
            destroyed_houses,
            destroyed_rocks,
            destroyed_trees,
        }
    }

    /// Delete a road: unstamp its cells and forget it. Entities it destroyed
    /// stay destroyed.
    pub fn delete_road(&mut self, id: RoadId) -> DeleteOutcome {
        let Some(position) = self.roads.iter().position(|r| r.id == id) else {
            return DeleteOutcome::NotFound;
        };
        let removed = self.roads.remove(position);
        for coord in removed.cells {
            if let Some(cell) = self.grid.cell_mut(coord) {
                cell.road_ids.retain(|rid| *rid != id);
            }
        }
        DeleteOutcome::Deleted
    }

    /// Delete an entity group and every surviving member it placed.
    pub fn delete_group(&mut self, kind: EntityKind, id: GroupId) -> DeleteOutcome {
        let registry = match kind {
            EntityKind::House => &mut self.houses,
            EntityKind::Rock => &mut self.rocks,
            EntityKind::Tree => &mut self.trees,
        };
        if registry.remove(id).is_none() {
            return DeleteOutcome::NotFound;
        }
        for cell in self.grid.cells_mut() {
            match kind {
                EntityKind::House => cell.houses.retain(|h| h.group != id),
                EntityKind::Rock => cell.rocks.retain(|r| r.group != id),
                EntityKind::Tree => cell.trees.retain(|t| t.group != id),
            }
        }
        DeleteOutcome::Deleted
    }

    /// Remove every group of one kind and restart its id counter.
    pub fn clear_kind(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::House => {
                self.houses.reset();
                for cell in self.grid.cells_mut() {
                    cell.houses.clear();
                }
            }
            EntityKind::Rock => {
                self.rocks.reset();
                for cell in self.grid.cells_mut() {
                    cell.rocks.clear();
                }
            }
            EntityKind::Tree => {
                self.trees.reset();
                for cell in self.grid.cells_mut() {
                    cell.trees.clear();
                }
            }
        }
    }

    /// Remove all roads and entities, keeping terrain and materials.
    pub fn clear_all(&mut self) {
        self.roads.clear();
        self.next_road_id = 1;
        self.houses.reset();
        self.rocks.reset();
        self.trees.reset();
        for cell in self.grid.cells_mut() {
            cell.road_ids.clear();
            cell.houses.clear();
            cell.rocks.clear();
            cell.trees.clear();
        }
    }

    /// Toggle one road's rendering flag.
    pub fn set_road_visible(&mut self, id: RoadId, visible: bool) -> DeleteOutcome {
        match self.roads.iter_mut().find(|r| r.id == id) {
            Some(road) => {
                road.visible = visible;
                DeleteOutcome::Deleted
            }
            None => DeleteOutcome::NotFound,
        }
    }

    /// Toggle every road's rendering flag.
    pub fn set_all_roads_visible(&mut self, visible: bool) {
        for road in &mut self.roads {
            road.visible = visible;
        }
    }

    /// Toggle one entity group's rendering flag.
    pub fn set_group_visible(&mut self, kind: EntityKind, id: GroupId, visible: bool) -> DeleteOutcome {
        let registry = match kind {
            EntityKind::House => &mut self.houses,
            EntityKind::Rock => &mut self.rocks,
            EntityKind::Tree => &mut self.trees,
        };
        match registry.get_mut(id) {
            Some(group) => {
                group.visible = visible;
                DeleteOutcome::Deleted
            }
            None => DeleteOutcome::NotFound,
        }
    }

    /// Toggle every group of one kind.
    pub fn set_all_groups_visible(&mut self, kind: EntityKind, visible: bool) {
        let registry = match kind {
            EntityKind::House => &mut self.houses,
            EntityKind::Rock => &mut self.rocks,
            EntityKind::Tree => &mut self.trees,
        };
        for group in registry.iter_mut() {
            group.visible = visible;
        }
    }

    /// Recolor every existing road and future roads.
    pub fn set_road_color(&mut self, color: &str) {
        self.road_color = color.to_owned();
        for road in &mut self.roads {
            road.color = color.to_owned();
        }
    }

    /// Assemble an export of the requested kind.
    pub fn export(&self, kind: ExportKind, cfg: &MaterialsConfig) -> ExportOutcome {
        if self.grid.is_unset() {
            return ExportOutcome::NoGrid;
        }
        let data = export::build(kind, &self.grid, &self.roads, &self.materials, cfg);
        let summary = match kind {
            ExportKind::Default => format!(
                "Map exported: {}x{} cells, {} roads, {} houses, {} rocks, {} trees.",
                self.grid.tiles_x(),
                self.grid.tiles_y(),
                self.roads.len(),
                self.houses.total_count(),
                self.rocks.total_count(),
                self.trees.total_count()
            ),
            ExportKind::Materials => format!(
                "Materials exported: {}x{} array.",
                self.grid.tiles_x(),
                self.grid.tiles_y()
            ),
            ExportKind::Layers => format!(
                "Layers exported: {} layers ({}x{} each, binary format).",
                self.materials.len() + usize::from(cfg.roads_as_material),
                self.grid.tiles_x(),
                self.grid.tiles_y()
            ),
            ExportKind::Objects => format!(
                "Objects exported: {} roads, {} houses, {} rocks, {} trees.",
                self.roads.len(),
                self.houses.total_count(),
                self.rocks.total_count(),
                self.trees.total_count()
            ),
        };
        ExportOutcome::Exported { data, summary }
    }

    /// Aggregate counters over the current state.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            roads: self.roads.len(),
            road_cells: self.roads.iter().map(|r| r.cells.len()).sum(),
            houses: self.houses.total_count(),
            rocks: self.rocks.total_count(),
            trees: self.trees.total_count(),
            cells: self.grid.tiles_x() as usize * self.grid.tiles_y() as usize,
        }
    }

    /// Serialize the whole session.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restore a session serialized by `to_json`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_session() -> MapSession {
        let mut session = MapSession::new(42);
        session.grid = TerrainGrid::uniform(8, 6, 100, 0.5);
        session
    }

    fn tiny_houses() -> HouseConfig {
        HouseConfig {
            probability: 1.0,
            max_per_cell: 1,
            width_px: 2.0,
            height_px: 2.0,
            ..HouseConfig::default()
        }
    }

    #[test]
    fn operations_without_terrain_report_no_grid() {
        let mut session = MapSession::new(1);
        assert_eq!(
            session.generate_houses(&HouseConfig::default()),
            PlacementOutcome::NoGrid
        );
        assert_eq!(
            session.create_road(CellCoord::new(0, 0), CellCoord::new(1, 0), &RoadConfig::default()),
            RoadOutcome::NoGrid
        );
        assert_eq!(
            session.export(ExportKind::Default, &MaterialsConfig::default()),
            ExportOutcome::NoGrid
        );
    }

    #[test]
    fn generate_grid_status_string() {
        let mut session = MapSession::new(1);
        let cfg = GridConfig {
            width_px: 320,
            height_px: 160,
            cell_size: 32,
            ..GridConfig::default()
        };
        let outcome = session.generate_grid(&cfg);
        assert_eq!(
            outcome.to_string(),
            "Terrain generated: 10x5 tiles (320x160px)."
        );
    }

    #[test]
    fn generate_grid_rejects_tiny_dimensions() {
        let mut session = MapSession::new(1);
        let cfg = GridConfig {
            width_px: 10,
            height_px: 10,
            cell_size: 32,
            ..GridConfig::default()
        };
        assert_eq!(session.generate_grid(&cfg), GridOutcome::DimensionsTooSmall);
        assert!(session.grid.is_unset());
    }

    #[test]
    fn regeneration_resets_roads_groups_and_counters() {
        let mut session = flat_session();
        session.generate_houses(&tiny_houses());
        session.create_road(CellCoord::new(0, 0), CellCoord::new(7, 0), &RoadConfig {
            max_houses_to_destroy: 1,
            ..RoadConfig::default()
        });
        assert!(!session.roads.is_empty());

        let cfg = GridConfig {
            width_px: 320,
            height_px: 160,
            cell_size: 32,
            ..GridConfig::default()
        };
        session.generate_grid(&cfg);
        assert!(session.roads.is_empty());
        assert!(session.houses.is_empty());
        // Counters restart: the next road gets id 1 again.
        session.grid = TerrainGrid::uniform(4, 1, 100, 0.5);
        let outcome = session.create_road(
            CellCoord::new(0, 0),
            CellCoord::new(3, 0),
            &RoadConfig::default(),
        );
        let RoadOutcome::Created { id, .. } = outcome else {
            panic!("expected road creation, got {outcome:?}");
        };
        assert_eq!(id, RoadId(1));
    }

    #[test]
    fn house_generation_creates_group_and_commits() {
        let mut session = flat_session();
        let outcome = session.generate_houses(&tiny_houses());
        let PlacementOutcome::Generated { group, placed, cells, .. } = outcome else {
            panic!("expected placements, got {outcome:?}");
        };
        assert_eq!(placed, 48);
        assert_eq!(cells, 48);
        assert_eq!(session.houses.get(group).unwrap().name, "Group 1");
        assert_eq!(session.houses.total_count(), 48);
        let on_grid: usize = session.grid.iter().map(|(_, c)| c.houses.len()).sum();
        assert_eq!(on_grid, 48);
        assert_eq!(session.grid.max_entity_extent(), 2.0);
    }

    #[test]
    fn empty_sweep_creates_no_group() {
        let mut session = flat_session();
        let cfg = HouseConfig {
            probability: 0.0,
            road_importance: 0.0,
            neighbor_importance: 0.0,
            ..tiny_houses()
        };
        let outcome = session.generate_houses(&cfg);
        assert_eq!(
            outcome,
            PlacementOutcome::NothingPlaced {
                kind: EntityKind::House
            }
        );
        assert!(session.houses.is_empty());
        // The diagnostic names the kind.
        assert!(outcome.to_string().contains("No houses generated"));
    }

    #[test]
    fn road_stamps_cells_and_destroys_entities() {
        let mut session = flat_session();
        session.generate_houses(&tiny_houses());
        let cfg = RoadConfig {
            max_houses_to_destroy: 1,
            ..RoadConfig::default()
        };
        let outcome = session.create_road(CellCoord::new(0, 2), CellCoord::new(7, 2), &cfg);
        let RoadOutcome::Created { id, cells, destroyed_houses, .. } = outcome else {
            panic!("expected road creation, got {outcome:?}");
        };
        assert_eq!(cells, 8);
        assert_eq!(destroyed_houses, 8);
        assert_eq!(session.houses.total_count(), 40);
        let road = &session.roads[0];
        for &coord in &road.cells {
            let cell = session.grid.cell(coord).unwrap();
            assert_eq!(cell.road_ids.as_slice(), &[id]);
            assert!(cell.houses.is_empty());
        }
    }

    #[test]
    fn road_destroying_all_members_prunes_the_group() {
        let mut session = MapSession::new(3);
        session.grid = TerrainGrid::uniform(4, 1, 100, 0.5);
        session.generate_houses(&tiny_houses());
        assert_eq!(session.houses.total_count(), 4);
        let cfg = RoadConfig {
            max_houses_to_destroy: 1,
            ..RoadConfig::default()
        };
        let outcome = session.create_road(CellCoord::new(0, 0), CellCoord::new(3, 0), &cfg);
        assert!(matches!(outcome, RoadOutcome::Created { .. }));
        assert!(session.houses.is_empty());
    }

    #[test]
    fn invalid_endpoints_are_diagnosed() {
        let mut session = flat_session();
        if let Some(cell) = session.grid.cell_mut(CellCoord::new(0, 0)) {
            cell.is_passable = false;
        }
        let outcome = session.create_road(
            CellCoord::new(0, 0),
            CellCoord::new(3, 0),
            &RoadConfig::default(),
        );
        assert_eq!(
            outcome,
            RoadOutcome::InvalidEndpoint {
                cell: CellCoord::new(0, 0),
                issue: EndpointIssue::Impassable
            }
        );
        assert_eq!(outcome.to_string(), "Cell (0, 0) is impassable.");

        let narrow = RoadConfig {
            min_altitude: 0.6,
            max_altitude: 0.7,
            ..RoadConfig::default()
        };
        let outcome = session.create_road(CellCoord::new(1, 0), CellCoord::new(3, 0), &narrow);
        assert!(matches!(
            outcome,
            RoadOutcome::InvalidEndpoint {
                issue: EndpointIssue::AltitudeOutOfRange { .. },
                ..
            }
        ));

        // A house on the endpoint with a zero destruction budget.
        session.generate_houses(&tiny_houses());
        let outcome = session.create_road(
            CellCoord::new(2, 2),
            CellCoord::new(5, 2),
            &RoadConfig::default(),
        );
        assert!(matches!(
            outcome,
            RoadOutcome::InvalidEndpoint {
                issue: EndpointIssue::TooManyHouses,
                ..
            }
        ));
        // Nothing was committed by the failed attempts.
        assert!(session.roads.is_empty());
    }

    #[test]
    fn unreachable_endpoints_report_no_path() {
        let mut session = MapSession::new(5);
        session.grid = TerrainGrid::uniform(5, 1, 100, 0.5);
        if let Some(cell) = session.grid.cell_mut(CellCoord::new(2, 0)) {
            cell.is_passable = false;
        }
        let outcome = session.create_road(
            CellCoord::new(0, 0),
            CellCoord::new(4, 0),
            &RoadConfig::default(),
        );
        assert!(matches!(outcome, RoadOutcome::NoPath { .. }));
        assert!(session.roads.is_empty());
        assert!(!session.grid.has_road(CellCoord::new(0, 0)));
    }

    #[test]
    fn delete_road_unstamps_cells() {
        let mut session = flat_session();
        let outcome = session.create_road(
            CellCoord::new(0, 0),
            CellCoord::new(4, 0),
            &RoadConfig::default(),
        );
        let RoadOutcome::Created { id, .. } = outcome else {
            panic!("expected road creation");
        };
        assert_eq!(session.delete_road(id), DeleteOutcome::Deleted);
        assert!(session.roads.is_empty());
        assert!(!session.grid.has_road(CellCoord::new(2, 0)));
        assert_eq!(session.delete_road(id), DeleteOutcome::NotFound);
    }

    #[test]
    fn overlapping_roads_keep_their_own_stamps() {
        let mut session = flat_session();
        let cfg = RoadConfig::default();
        session.create_road(CellCoord::new(0, 1), CellCoord::new(6, 1), &cfg);
        session.create_road(CellCoord::new(3, 0), CellCoord::new(3, 4), &cfg);
        // The crossing cell carries both ids; deleting road 1 leaves road 2.
        session.delete_road(RoadId(1));
        assert!(session.grid.has_road(CellCoord::new(3, 1)));
        assert!(!session.grid.has_road(CellCoord::new(1, 1)));
    }

    #[test]
    fn delete_group_removes_members() {
        let mut session = flat_session();
        let outcome = session.generate_houses(&tiny_houses());
        let PlacementOutcome::Generated { group, .. } = outcome else {
            panic!("expected placements");
        };
        assert_eq!(session.delete_group(EntityKind::House, group), DeleteOutcome::Deleted);
        let on_grid: usize = session.grid.iter().map(|(_, c)| c.houses.len()).sum();
        assert_eq!(on_grid, 0);
        assert_eq!(
            session.delete_group(EntityKind::House, group),
            DeleteOutcome::NotFound
        );
    }

    #[test]
    fn clear_kind_and_clear_all() {
        let mut session = flat_session();
        session.generate_houses(&tiny_houses());
        session.generate_trees(&TreeConfig {
            probability: 1.0,
            case_penalty: 0.0,
            min_radius_px: 3.0,
            max_radius_px: 5.0,
            ..TreeConfig::default()
        });
        session.clear_kind(EntityKind::House);
        assert!(session.houses.is_empty());
        assert!(session.trees.total_count() > 0);

        session.clear_all();
        assert!(session.trees.is_empty());
        assert_eq!(session.stats().road_cells, 0);
        // Terrain and palette survive.
        assert!(!session.grid.is_unset());
        assert_eq!(session.materials.len(), 6);
    }

    #[test]
    fn visibility_toggles() {
        let mut session = flat_session();
        session.create_road(CellCoord::new(0, 0), CellCoord::new(3, 0), &RoadConfig::default());
        assert_eq!(
            session.set_road_visible(RoadId(1), false),
            DeleteOutcome::Deleted
        );
        assert!(!session.roads[0].visible);
        session.set_all_roads_visible(true);
        assert!(session.roads[0].visible);
        assert_eq!(
            session.set_road_visible(RoadId(9), false),
            DeleteOutcome::NotFound
        );

        let outcome = session.generate_houses(&tiny_houses());
        let PlacementOutcome::Generated { group, .. } = outcome else {
            panic!("expected placements");
        };
        session.set_group_visible(EntityKind::House, group, false);
        assert!(!session.houses.get(group).unwrap().visible);
        session.set_all_groups_visible(EntityKind::House, true);
        assert!(session.houses.get(group).unwrap().visible);
    }

    #[test]
    fn recoloring_applies_to_existing_and_future_roads() {
        let mut session = flat_session();
        session.create_road(CellCoord::new(0, 0), CellCoord::new(2, 0), &RoadConfig::default());
        session.set_road_color("#123456");
        assert_eq!(session.roads[0].color, "#123456");
        session.create_road(CellCoord::new(0, 3), CellCoord::new(2, 3), &RoadConfig::default());
        assert_eq!(session.roads[1].color, "#123456");
    }

    #[test]
    fn export_summaries() {
        let mut session = flat_session();
        session.generate_houses(&tiny_houses());
        let outcome = session.export(ExportKind::Materials, &MaterialsConfig::default());
        assert_eq!(outcome.status(), "Materials exported: 8x6 array.");
        let outcome = session.export(ExportKind::Layers, &MaterialsConfig::default());
        assert_eq!(
            outcome.status(),
            "Layers exported: 6 layers (8x6 each, binary format)."
        );
        let with_roads = MaterialsConfig {
            roads_as_material: true,
            ..MaterialsConfig::default()
        };
        let outcome = session.export(ExportKind::Layers, &with_roads);
        assert_eq!(
            outcome.status(),
            "Layers exported: 7 layers (8x6 each, binary format)."
        );
        let outcome = session.export(ExportKind::Default, &MaterialsConfig::default());
        let ExportOutcome::Exported { data, .. } = outcome else {
            panic!("expected export");
        };
        assert!(matches!(data, ExportData::Full(_)));
    }

    #[test]
    fn stats_aggregate_session_state() {
        let mut session = flat_session();
        session.generate_houses(&tiny_houses());
        session.create_road(
            CellCoord::new(0, 5),
            CellCoord::new(7, 5),
            &RoadConfig {
                max_houses_to_destroy: 1,
                ..RoadConfig::default()
            },
        );
        let stats = session.stats();
        assert_eq!(stats.roads, 1);
        assert_eq!(stats.road_cells, 8);
        assert_eq!(stats.houses, 40);
        assert_eq!(stats.cells, 48);
        assert!(stats.to_string().starts_with("Roads: 1 (8 cells)"));
    }

    #[test]
    fn committed_entities_never_overlap_pairwise() {
        use crate::spatial::{self, Footprint, Rect};

        let mut session = MapSession::new(31);
        session.grid = TerrainGrid::uniform(10, 8, 64, 0.5);
        session.generate_trees(&TreeConfig {
            probability: 0.8,
            case_penalty: 0.0,
            min_radius_px: 6.0,
            max_radius_px: 12.0,
            ..TreeConfig::default()
        });
        session.generate_rocks(&RockConfig {
            probability: 0.8,
            min_radius_px: 4.0,
            max_radius_px: 10.0,
            ..RockConfig::default()
        });
        session.generate_houses(&HouseConfig {
            probability: 0.8,
            width_px: 14.0,
            height_px: 12.0,
            ..HouseConfig::default()
        });

        let everything = spatial::entities_in_area(
            &session.grid,
            Rect::new(0.0, 0.0, session.grid.world_width_px(), session.grid.world_height_px()),
        );
        let mut shapes: Vec<Footprint> = Vec::new();
        shapes.extend(everything.houses.iter().map(|h| Footprint::Rect(h.shape)));
        shapes.extend(everything.rocks.iter().map(|r| Footprint::Circle(r.shape)));
        shapes.extend(everything.trees.iter().map(|t| Footprint::Circle(t.shape)));
        assert!(shapes.len() > 20, "expected a busy map, got {}", shapes.len());

        for (i, a) in shapes.iter().enumerate() {
            for b in shapes.iter().skip(i + 1) {
                let collides = match (a, b) {
                    (Footprint::Rect(r1), Footprint::Rect(r2)) => r1.overlaps(*r2),
                    (Footprint::Rect(r), Footprint::Circle(c))
                    | (Footprint::Circle(c), Footprint::Rect(r)) => r.overlaps_circle(*c),
                    (Footprint::Circle(c1), Footprint::Circle(c2)) => c1.overlaps(*c2),
                };
                assert!(!collides, "entities overlap: {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn full_replay_is_deterministic() {
        let run = || {
            let mut session = MapSession::new(2024);
            session.generate_grid(&GridConfig {
                width_px: 640,
                height_px: 320,
                cell_size: 32,
                ..GridConfig::default()
            });
            session.generate_trees(&TreeConfig {
                min_radius_px: 3.0,
                max_radius_px: 6.0,
                probability: 0.4,
                ..TreeConfig::default()
            });
            session.generate_rocks(&RockConfig {
                min_radius_px: 3.0,
                max_radius_px: 6.0,
                probability: 0.3,
                ..RockConfig::default()
            });
            session.generate_houses(&HouseConfig {
                probability: 0.5,
                width_px: 6.0,
                height_px: 5.0,
                ..HouseConfig::default()
            });
            session.to_json().unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn session_roundtrips_through_json() {
        let mut session = flat_session();
        session.generate_houses(&tiny_houses());
        let json = session.to_json().unwrap();
        let mut restored = MapSession::from_json(&json).unwrap();
        // The restored session continues identically.
        let a = session.generate_trees(&TreeConfig {
            probability: 0.5,
            min_radius_px: 3.0,
            max_radius_px: 5.0,
            ..TreeConfig::default()
        });
        let b = restored.generate_trees(&TreeConfig {
            probability: 0.5,
            min_radius_px: 3.0,
            max_radius_px: 5.0,
            ..TreeConfig::default()
        });
        assert_eq!(a, b);
    }
}
