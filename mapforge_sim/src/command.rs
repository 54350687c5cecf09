// Serializable commands: the session's wire-level surface.
//
// Every operation a front end can request is a `MapCommand` variant carrying
// its own parameters, so a map-building run can be recorded, shipped, or
// replayed as a JSON list. `apply` executes one command and returns the
// status string plus, for exports, the assembled data.

use crate::config::{GridConfig, HouseConfig, MaterialsConfig, RockConfig, RoadConfig, TreeConfig};
use crate::export::{ExportData, ExportKind};
use crate::session::{DeleteOutcome, ExportOutcome, MapSession};
use crate::types::{CellCoord, EntityKind, GroupId, RoadId};
use serde::{Deserialize, Serialize};

/// One requested operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MapCommand {
    GenerateGrid { config: GridConfig },
    GenerateHouses { config: HouseConfig },
    GenerateRocks { config: RockConfig },
    GenerateTrees { config: TreeConfig },
    CreateRoad {
        start: CellCoord,
        end: CellCoord,
        config: RoadConfig,
    },
    DeleteRoad { id: RoadId },
    DeleteGroup { kind: EntityKind, id: GroupId },
    ClearKind { kind: EntityKind },
    ClearAll,
    SetRoadVisible { id: RoadId, visible: bool },
    SetAllRoadsVisible { visible: bool },
    SetGroupVisible {
        kind: EntityKind,
        id: GroupId,
        visible: bool,
    },
    SetAllGroupsVisible { kind: EntityKind, visible: bool },
    SetRoadColor { color: String },
    Export {
        kind: ExportKind,
        config: MaterialsConfig,
    },
}

/// What a command produced: a human-readable status, plus the payload for
/// export commands.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutcome {
    pub status: String,
    pub export: Option<ExportData>,
}

impl CommandOutcome {
    fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            export: None,
        }
    }
}

impl MapSession {
    /// Execute one command against this session.
    pub fn apply(&mut self, command: &MapCommand) -> CommandOutcome {
        match command {
            MapCommand::GenerateGrid { config } => {
                CommandOutcome::status(self.generate_grid(config).to_string())
            }
            MapCommand::GenerateHouses { config } => {
                CommandOutcome::status(self.generate_houses(config).to_string())
            }
            MapCommand::GenerateRocks { config } => {
                CommandOutcome::status(self.generate_rocks(config).to_string())
            }
            MapCommand::GenerateTrees { config } => {
                CommandOutcome::status(self.generate_trees(config).to_string())
            }
            MapCommand::CreateRoad { start, end, config } => {
                CommandOutcome::status(self.create_road(*start, *end, config).to_string())
            }
            MapCommand::DeleteRoad { id } => match self.delete_road(*id) {
                DeleteOutcome::Deleted => CommandOutcome::status(format!("Road {id} deleted.")),
                DeleteOutcome::NotFound => {
                    CommandOutcome::status(format!("Road {id} not found; nothing deleted."))
                }
            },
            MapCommand::DeleteGroup { kind, id } => match self.delete_group(*kind, *id) {
                DeleteOutcome::Deleted => {
                    CommandOutcome::status(format!("Deleted {} group {id}.", kind.plural()))
                }
                DeleteOutcome::NotFound => CommandOutcome::status(format!(
                    "No {} group {id}; nothing deleted.",
                    kind.plural()
                )),
            },
            MapCommand::ClearKind { kind } => {
                self.clear_kind(*kind);
                CommandOutcome::status(format!("All {} have been removed.", kind.plural()))
            }
            MapCommand::ClearAll => {
                self.clear_all();
                CommandOutcome::status("Everything cleared.")
            }
            MapCommand::SetRoadVisible { id, visible } => match self.set_road_visible(*id, *visible)
            {
                DeleteOutcome::Deleted => CommandOutcome::status(format!(
                    "Road {id} {}.",
                    if *visible { "shown" } else { "hidden" }
                )),
                DeleteOutcome::NotFound => CommandOutcome::status(format!("Road {id} not found.")),
            },
            MapCommand::SetAllRoadsVisible { visible } => {
                self.set_all_roads_visible(*visible);
                CommandOutcome::status(format!(
                    "All roads {}.",
                    if *visible { "shown" } else { "hidden" }
                ))
            }
            MapCommand::SetGroupVisible { kind, id, visible } => {
                match self.set_group_visible(*kind, *id, *visible) {
                    DeleteOutcome::Deleted => CommandOutcome::status(format!(
                        "{} group {id} {}.",
                        capitalize(kind.plural()),
                        if *visible { "shown" } else { "hidden" }
                    )),
                    DeleteOutcome::NotFound => CommandOutcome::status(format!(
                        "No {} group {id}.",
                        kind.plural()
                    )),
                }
            }
            MapCommand::SetAllGroupsVisible { kind, visible } => {
                self.set_all_groups_visible(*kind, *visible);
                CommandOutcome::status(format!(
                    "All {} {}.",
                    kind.plural(),
                    if *visible { "shown" } else { "hidden" }
                ))
            }
            MapCommand::SetRoadColor { color } => {
                self.set_road_color(color);
                CommandOutcome::status(format!("Road color set to {color}."))
            }
            MapCommand::Export { kind, config } => match self.export(*kind, config) {
                ExportOutcome::Exported { data, summary } => CommandOutcome {
                    status: summary,
                    export: Some(data),
                },
                outcome @ ExportOutcome::NoGrid => CommandOutcome::status(outcome.status()),
            },
        }
    }

    /// Execute a command sequence, collecting each outcome.
    pub fn apply_all(&mut self, commands: &[MapCommand]) -> Vec<CommandOutcome> {
        commands.iter().map(|c| self.apply(c)).collect()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
