// Configuration for the map generator.
//
// Every generation pass is parameterized by one of the structs below; the
// session stores the full `MapConfig` it was created with, and individual
// operations may be re-run with a modified sub-config. All configs are plain
// serde-able data so a whole run can be described by a single JSON document.

use serde::{Deserialize, Serialize};

/// Terrain synthesis parameters: map dimensions plus the fractal noise knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Map width in pixels.
    pub width_px: u32,
    /// Map height in pixels.
    pub height_px: u32,
    /// Edge length of one square cell, in pixels.
    pub cell_size: u32,
    /// Base noise frequency. Smaller values give broader landforms.
    pub scale: f64,
    /// Number of noise octaves summed per cell.
    pub octaves: u32,
    /// Amplitude falloff per octave.
    pub persistence: f64,
    /// Frequency growth per octave.
    pub lacunarity: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width_px: 1280,
            height_px: 640,
            cell_size: 128,
            scale: 0.1,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Road planning parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// Lowest altitude allowed for road endpoints, inclusive.
    pub min_altitude: f64,
    /// Highest altitude allowed for road endpoints, inclusive.
    pub max_altitude: f64,
    /// Road width in cells. Widths above 1 grow the path after planning.
    pub width: u32,
    /// How many houses a single cell may contain and still be paved over.
    pub max_houses_to_destroy: u32,
    /// Display color recorded on new roads, as a hex string.
    pub color: String,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            min_altitude: 0.0,
            max_altitude: 1.0,
            width: 1,
            max_houses_to_destroy: 0,
            color: "#FFD700".to_owned(),
        }
    }
}

/// House placement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseConfig {
    /// Lowest altitude a house cell may have, inclusive.
    pub min_height: f64,
    /// Highest altitude a house cell may have, inclusive.
    pub max_height: f64,
    /// Weight of nearby roads in the placement probability.
    pub road_importance: f64,
    /// Weight of nearby houses in the placement probability.
    pub neighbor_importance: f64,
    /// Chebyshev radius, in cells, of the proximity scan.
    pub search_radius: i32,
    /// Base placement probability per cell.
    pub probability: f64,
    /// Maximum number of houses a single cell may hold.
    pub max_per_cell: u32,
    /// House footprint width in pixels.
    pub width_px: f64,
    /// House footprint height in pixels.
    pub height_px: f64,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            min_height: 0.25,
            max_height: 0.75,
            road_importance: 0.5,
            neighbor_importance: 0.3,
            search_radius: 3,
            probability: 0.1,
            max_per_cell: 2,
            width_px: 32.0,
            height_px: 26.0,
        }
    }
}

/// Rock placement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockConfig {
    /// Smallest rock radius in pixels.
    pub min_radius_px: f64,
    /// Largest rock radius in pixels.
    pub max_radius_px: f64,
    /// Lowest altitude a rock cell may have, inclusive.
    pub min_altitude: f64,
    /// Highest altitude a rock cell may have, inclusive.
    pub max_altitude: f64,
    /// Base placement probability per cell.
    pub probability: f64,
    /// Maximum number of rocks a single cell may hold.
    pub max_per_cell: u32,
}

impl Default for RockConfig {
    fn default() -> Self {
        Self {
            min_radius_px: 10.0,
            max_radius_px: 32.0,
            min_altitude: 0.0,
            max_altitude: 1.0,
            probability: 0.05,
            max_per_cell: 2,
        }
    }
}

/// Tree placement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Smallest crown radius in pixels.
    pub min_radius_px: f64,
    /// Largest crown radius in pixels.
    pub max_radius_px: f64,
    /// Lowest altitude a tree cell may have, inclusive.
    pub min_altitude: f64,
    /// Highest altitude a tree cell may have, inclusive.
    pub max_altitude: f64,
    /// Base placement probability per cell.
    pub probability: f64,
    /// Maximum number of trees a single cell may hold.
    pub max_per_cell: u32,
    /// Per-house multiplicative probability penalty for nearby houses.
    pub case_penalty: f64,
    /// Chebyshev radius, in cells, of the proximity scan.
    pub search_radius: i32,
    /// Weight of nearby trees in the placement probability (clustering).
    pub tree_attraction: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            min_radius_px: 16.0,
            max_radius_px: 38.0,
            min_altitude: 0.0,
            max_altitude: 1.0,
            probability: 0.1,
            max_per_cell: 3,
            case_penalty: 0.1,
            search_radius: 3,
            tree_attraction: 0.2,
        }
    }
}

/// Material export behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialsConfig {
    /// When true, road cells override the altitude-derived material in the
    /// flat material array.
    pub roads_as_material: bool,
    /// Material number written for road cells when `roads_as_material` is on.
    pub road_material_number: u16,
    /// When true, road cells are zeroed out of every altitude-derived layer
    /// in the layered export.
    pub road_destroy_materials: bool,
}

impl Default for MaterialsConfig {
    fn default() -> Self {
        Self {
            roads_as_material: false,
            road_material_number: 99,
            road_destroy_materials: false,
        }
    }
}

/// Complete configuration for a map session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// PRNG seed. The same seed and operation sequence reproduce the map.
    pub seed: u64,
    pub grid: GridConfig,
    pub road: RoadConfig,
    pub house: HouseConfig,
    pub rock: RockConfig,
    pub tree: TreeConfig,
    pub materials: MaterialsConfig,
}

impl MapConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the config to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
