// Core types shared across the map generator.
//
// Defines the grid cell address (`CellCoord`) and the compact integer
// identifiers used for roads, entity groups, and material definitions. Ids
// are plain monotonically-assigned integers rather than UUIDs: they are
// allocated by one session, never merged across sessions, and appear in
// exported JSON where small numbers are friendlier to downstream consumers.
//
// **Critical constraint: determinism.** Id assignment is a pure function of
// the operation sequence (counters owned by `MapSession`), never of hashing
// or iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell address in the terrain grid.
///
/// Signed so that out-of-range queries (e.g. a proximity scan near the map
/// edge) can be expressed directly; the grid answers "absent/false" for any
/// coordinate outside its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two cells — the A* heuristic for the
    /// 4-connected road grid.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unique identifier for a road, assigned in creation order starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadId(pub u32);

impl fmt::Display for RoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an entity group. Counters are per entity kind, so
/// house group 1 and rock group 1 are distinct groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a material definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three placeable entity kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    House,
    Rock,
    Tree,
}

impl EntityKind {
    /// Plural noun used in status strings ("Generated 12 houses ...").
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::House => "houses",
            EntityKind::Rock => "rocks",
            EntityKind::Tree => "trees",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(3, 4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(b.manhattan_distance(a), 7);
    }

    #[test]
    fn manhattan_distance_handles_negative_coords() {
        let a = CellCoord::new(-2, 1);
        let b = CellCoord::new(1, -3);
        assert_eq!(a.manhattan_distance(b), 7);
    }

    #[test]
    fn cell_coord_ordering() {
        // CellCoord must have a total order (used as a set/map key).
        let a = CellCoord::new(0, 0);
        let b = CellCoord::new(1, 0);
        assert!(a < b);
    }

    #[test]
    fn coord_serialization_roundtrip() {
        let c = CellCoord::new(7, -2);
        let json = serde_json::to_string(&c).unwrap();
        let restored: CellCoord = serde_json::from_str(&json).unwrap();
        assert_eq!(c, restored);
    }
}
