// Mapforge: deterministic procedural tile-map generation.
//
// A headless engine that synthesizes altitude-based terrain, plans roads
// with A*, scatters houses, rocks, and trees, compiles material views, and
// exports everything as JSON. Module map:
//
//   - `types`: cell coordinates and id newtypes.
//   - `config`: serde-able parameter structs for every operation.
//   - `noise`: classic Perlin noise with fractal octaves.
//   - `grid`: the terrain grid and per-cell entity storage.
//   - `spatial`: area queries and the overlap predicates.
//   - `road`: A* path planning and width expansion.
//   - `placement`: stochastic house/rock/tree sweeps.
//   - `entity`: placements and group registries.
//   - `material`: altitude-band materials and compiled views.
//   - `export`: the four JSON export shapes.
//   - `session`: owned state plus every user-facing operation.
//   - `command`: the serializable command surface.
//
// **Critical constraint: determinism.** Same seed, same operation sequence,
// same map — on every platform. All randomness flows through one
// `mapforge_prng::MapRng`; collections iterate in defined orders; exports
// carry no timestamps.

pub mod command;
pub mod config;
pub mod entity;
pub mod export;
pub mod grid;
pub mod material;
pub mod noise;
pub mod placement;
pub mod road;
pub mod session;
pub mod spatial;
pub mod types;

pub use mapforge_prng::MapRng;

pub use command::{CommandOutcome, MapCommand};
pub use config::MapConfig;
pub use export::{ExportData, ExportKind};
pub use session::MapSession;
pub use types::{CellCoord, EntityKind, GroupId, MaterialId, RoadId};
