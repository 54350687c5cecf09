// Export assembly: the four JSON views of a finished map.
//
// Field names serialize in camelCase and coordinates are rounded (altitudes
// to 4 decimals, world positions to 2) to match what downstream map
// consumers already parse. The views:
//
//   - `Default`: parameters, per-cell grid, flat materials, definitions,
//     entities, and summary metadata — the whole map.
//   - `Materials`: just the flat material array with its definitions.
//   - `Layers`: one binary grid per material in depth order, road on top.
//   - `Objects`: entity positions only, with world-space metadata.
//
// Exports carry no timestamps or other environment-dependent fields, so the
// same session state always serializes to the same bytes.

use crate::config::MaterialsConfig;
use crate::grid::{MAX_PASSABLE, MIN_PASSABLE, TerrainGrid, WATER_THRESHOLD};
use crate::material::{self, MaterialLayer, MaterialRegistry};
use crate::road::Road;
use serde::{Deserialize, Serialize};

/// Which view to export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Default,
    Materials,
    Layers,
    Objects,
}

/// Generation parameters echoed into the full export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParametersExport {
    pub width_px: u32,
    pub height_px: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub cell_size: u32,
    pub scale: f64,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    pub min_passable: f64,
    pub max_passable: f64,
    pub water_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellExport {
    pub altitude: f64,
    pub passable: bool,
    pub is_water: bool,
    pub has_road: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDefExport {
    pub name: String,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub material_number: u16,
    pub color: String,
    pub depth: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsSettingsExport {
    pub roads_as_material: bool,
    pub road_material_number: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseExport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleExport {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadPointExport {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadExport {
    pub id: u32,
    pub width: u32,
    /// Covered cells as world coordinates of their top-left corners.
    pub cells: Vec<RoadPointExport>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesExport {
    pub houses: Vec<HouseExport>,
    pub trees: Vec<CircleExport>,
    pub rocks: Vec<CircleExport>,
    pub roads: Vec<RoadExport>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullMetadataExport {
    pub grid_width: u32,
    pub grid_height: u32,
    pub total_houses: usize,
    pub total_trees: usize,
    pub total_rocks: usize,
    pub total_roads: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsMetadataExport {
    pub grid_width: u32,
    pub grid_height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectsMetadataExport {
    pub cell_size: u32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub world_width: f64,
    pub world_height: f64,
    pub total_houses: usize,
    pub total_trees: usize,
    pub total_rocks: usize,
    pub total_roads: usize,
}

/// The complete map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullExport {
    pub parameters: ParametersExport,
    pub grid: Vec<Vec<CellExport>>,
    pub materials: Vec<Vec<u16>>,
    pub material_definitions: Vec<MaterialDefExport>,
    pub materials_config: MaterialsSettingsExport,
    pub entities: EntitiesExport,
    pub metadata: FullMetadataExport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsExport {
    pub materials: Vec<Vec<u16>>,
    pub material_definitions: Vec<MaterialDefExport>,
    pub materials_config: MaterialsSettingsExport,
    pub metadata: MaterialsMetadataExport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayersExport {
    pub layers: Vec<MaterialLayer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectsExport {
    pub houses: Vec<HouseExport>,
    pub trees: Vec<CircleExport>,
    pub rocks: Vec<CircleExport>,
    pub roads: Vec<RoadExport>,
    pub metadata: ObjectsMetadataExport,
}

/// One exported view. Untagged: the JSON shape itself identifies the view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportData {
    Full(FullExport),
    Materials(MaterialsExport),
    Layers(LayersExport),
    Objects(ObjectsExport),
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn material_defs(registry: &MaterialRegistry) -> Vec<MaterialDefExport> {
    registry
        .sorted_ascending()
        .into_iter()
        .map(|d| MaterialDefExport {
            name: d.name.clone(),
            min_altitude: d.min_altitude,
            max_altitude: d.max_altitude,
            material_number: d.material_number,
            color: d.color.clone(),
            depth: d.depth,
        })
        .collect()
}

fn collect_entities(grid: &TerrainGrid, roads: &[Road]) -> EntitiesExport {
    let cs = grid.cell_size_px();
    let mut entities = EntitiesExport::default();
    for (coord, cell) in grid.iter() {
        let base_x = f64::from(coord.x) * cs;
        let base_y = f64::from(coord.y) * cs;
        for house in &cell.houses {
            entities.houses.push(HouseExport {
                x: round2(base_x + house.offset_x * cs),
                y: round2(base_y + house.offset_y * cs),
                width: house.width_px,
                height: house.height_px,
            });
        }
        for tree in &cell.trees {
            entities.trees.push(CircleExport {
                x: round2(base_x + tree.offset_x * cs),
                y: round2(base_y + tree.offset_y * cs),
                radius: round2(tree.crown_radius_px),
            });
        }
        for rock in &cell.rocks {
            entities.rocks.push(CircleExport {
                x: round2(base_x + rock.offset_x * cs),
                y: round2(base_y + rock.offset_y * cs),
                radius: round2(rock.radius_px),
            });
        }
    }
    for road in roads {
        entities.roads.push(RoadExport {
            id: road.id.0,
            width: road.width,
            cells: road
                .cells
                .iter()
                .map(|c| RoadPointExport {
                    x: round2(f64::from(c.x) * cs),
                    y: round2(f64::from(c.y) * cs),
                })
                .collect(),
        });
    }
    entities
}

/// Assemble the requested view from session state. The caller guarantees the
/// grid has been generated.
pub fn build(
    kind: ExportKind,
    grid: &TerrainGrid,
    roads: &[Road],
    registry: &MaterialRegistry,
    cfg: &MaterialsConfig,
) -> ExportData {
    let settings = MaterialsSettingsExport {
        roads_as_material: cfg.roads_as_material,
        road_material_number: cfg.road_material_number,
    };
    match kind {
        ExportKind::Default => {
            let params = grid.params();
            let entities = collect_entities(grid, roads);
            let mut cell_rows = Vec::with_capacity(grid.tiles_y() as usize);
            let mut row = Vec::with_capacity(grid.tiles_x() as usize);
            for (coord, cell) in grid.iter() {
                row.push(CellExport {
                    altitude: round4(cell.altitude),
                    passable: cell.is_passable,
                    is_water: cell.is_water,
                    has_road: !cell.road_ids.is_empty(),
                });
                if coord.x as u32 == grid.tiles_x() - 1 {
                    cell_rows.push(std::mem::take(&mut row));
                    row = Vec::with_capacity(grid.tiles_x() as usize);
                }
            }
            let metadata = FullMetadataExport {
                grid_width: grid.tiles_x(),
                grid_height: grid.tiles_y(),
                total_houses: entities.houses.len(),
                total_trees: entities.trees.len(),
                total_rocks: entities.rocks.len(),
                total_roads: entities.roads.len(),
            };
            ExportData::Full(FullExport {
                parameters: ParametersExport {
                    width_px: params.width_px,
                    height_px: params.height_px,
                    tiles_x: grid.tiles_x(),
                    tiles_y: grid.tiles_y(),
                    cell_size: params.cell_size,
                    scale: params.scale,
                    octaves: params.octaves,
                    persistence: params.persistence,
                    lacunarity: params.lacunarity,
                    min_passable: MIN_PASSABLE,
                    max_passable: MAX_PASSABLE,
                    water_threshold: WATER_THRESHOLD,
                },
                grid: cell_rows,
                materials: material::flat_materials(grid, registry, cfg),
                material_definitions: material_defs(registry),
                materials_config: settings,
                entities,
                metadata,
            })
        }
        ExportKind::Materials => ExportData::Materials(MaterialsExport {
            materials: material::flat_materials(grid, registry, cfg),
            material_definitions: material_defs(registry),
            materials_config: settings,
            metadata: MaterialsMetadataExport {
                grid_width: grid.tiles_x(),
                grid_height: grid.tiles_y(),
            },
        }),
        ExportKind::Layers => ExportData::Layers(LayersExport {
            layers: material::layered_materials(grid, registry, cfg),
        }),
        ExportKind::Objects => {
            let entities = collect_entities(grid, roads);
            let metadata = ObjectsMetadataExport {
                cell_size: grid.params().cell_size,
                grid_width: grid.tiles_x(),
                grid_height: grid.tiles_y(),
                world_width: grid.world_width_px(),
                world_height: grid.world_height_px(),
                total_houses: entities.houses.len(),
                total_trees: entities.trees.len(),
                total_rocks: entities.rocks.len(),
                total_roads: entities.roads.len(),
            };
            ExportData::Objects(ObjectsExport {
                houses: entities.houses,
                trees: entities.trees,
                rocks: entities.rocks,
                roads: entities.roads,
                metadata,
            })
        }
    }
}
