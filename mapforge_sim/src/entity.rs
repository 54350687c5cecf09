// Placed entities and their group bookkeeping.
//
// Entities (houses, rocks, trees) are stored inline on their anchor cell as
// small per-cell lists; this module defines those records plus the group
// registry that tracks batch membership. A group is one generation pass'
// output: it remembers the parameters that produced it, how many members
// survive, and whether a renderer should draw it. Roads destroy members in
// place, so counts shrink over time and empty groups are pruned.
//
// **Critical constraint: determinism.** Groups live in a `BTreeMap` keyed by
// id so iteration (exports, stats) is always in allocation order.

use crate::config::{HouseConfig, RockConfig, TreeConfig};
use crate::types::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A house anchored to a cell. Offsets are fractions of the cell edge for the
/// top-left corner of the footprint; the footprint extends right and down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HousePlacement {
    pub group: GroupId,
    pub offset_x: f64,
    pub offset_y: f64,
    pub width_px: f64,
    pub height_px: f64,
}

/// A rock anchored to a cell. Offsets locate the circle center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RockPlacement {
    pub group: GroupId,
    pub offset_x: f64,
    pub offset_y: f64,
    pub radius_px: f64,
}

/// A tree anchored to a cell. Offsets locate the crown center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreePlacement {
    pub group: GroupId,
    pub offset_x: f64,
    pub offset_y: f64,
    pub crown_radius_px: f64,
}

/// The parameters a group was generated with, kept for inspection and replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GroupParams {
    Houses(HouseConfig),
    Rocks(RockConfig),
    Trees(TreeConfig),
}

/// One generation batch of a single entity kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityGroup {
    pub id: GroupId,
    pub name: String,
    /// Rendering hint only; hidden groups still collide and still block.
    pub visible: bool,
    /// Surviving member count. Decremented when roads destroy members.
    pub count: u32,
    pub params: GroupParams,
}

/// Registry of entity groups for one kind, with its own id counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupRegistry {
    groups: BTreeMap<GroupId, EntityGroup>,
    next_id: u32,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group named `"{prefix} {id}"` and return its id.
    pub fn allocate(&mut self, prefix: &str, count: u32, params: GroupParams) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;
        self.groups.insert(
            id,
            EntityGroup {
                id,
                name: format!("{prefix} {id}"),
                visible: true,
                count,
                params,
            },
        );
        id
    }

    pub fn get(&self, id: GroupId) -> Option<&EntityGroup> {
        self.groups.get(&id)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut EntityGroup> {
        self.groups.get_mut(&id)
    }

    /// Remove a group entirely. Returns the removed group, if it existed.
    pub fn remove(&mut self, id: GroupId) -> Option<EntityGroup> {
        self.groups.remove(&id)
    }

    /// Record the destruction of one member. Saturates at zero; unknown ids
    /// are ignored.
    pub fn decrement(&mut self, id: GroupId) {
        if let Some(group) = self.groups.get_mut(&id) {
            group.count = group.count.saturating_sub(1);
        }
    }

    /// Drop every group whose member count reached zero.
    pub fn prune_empty(&mut self) {
        self.groups.retain(|_, group| group.count > 0);
    }

    /// Total surviving members across all groups.
    pub fn total_count(&self) -> u64 {
        self.groups.values().map(|g| u64::from(g.count)).sum()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityGroup> {
        self.groups.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityGroup> {
        self.groups.values_mut()
    }

    /// Clear all groups and restart id assignment at 1.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.next_id = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rock_params() -> GroupParams {
        GroupParams::Rocks(RockConfig::default())
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut registry = GroupRegistry::new();
        assert_eq!(registry.allocate("Rocks", 3, rock_params()), GroupId(1));
        assert_eq!(registry.allocate("Rocks", 5, rock_params()), GroupId(2));
        assert_eq!(registry.get(GroupId(1)).unwrap().name, "Rocks 1");
        assert_eq!(registry.total_count(), 8);
    }

    #[test]
    fn deleting_a_group_does_not_reuse_its_id() {
        let mut registry = GroupRegistry::new();
        let first = registry.allocate("Group", 2, rock_params());
        registry.remove(first);
        let second = registry.allocate("Group", 2, rock_params());
        assert_eq!(second, GroupId(2));
    }

    #[test]
    fn decrement_saturates_and_prune_drops_empty() {
        let mut registry = GroupRegistry::new();
        let id = registry.allocate("Trees", 2, GroupParams::Trees(TreeConfig::default()));
        registry.decrement(id);
        registry.decrement(id);
        registry.decrement(id); // extra decrement must not underflow
        assert_eq!(registry.get(id).unwrap().count, 0);
        registry.prune_empty();
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn decrement_of_unknown_id_is_a_no_op() {
        let mut registry = GroupRegistry::new();
        registry.decrement(GroupId(42));
        assert!(registry.is_empty());
    }

    #[test]
    fn reset_restarts_id_assignment() {
        let mut registry = GroupRegistry::new();
        registry.allocate("Group", 1, GroupParams::Houses(HouseConfig::default()));
        registry.allocate("Group", 1, GroupParams::Houses(HouseConfig::default()));
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(
            registry.allocate("Group", 1, GroupParams::Houses(HouseConfig::default())),
            GroupId(1)
        );
    }

    #[test]
    fn iteration_is_in_allocation_order() {
        let mut registry = GroupRegistry::new();
        for count in [4, 1, 9] {
            registry.allocate("Rocks", count, rock_params());
        }
        let counts: Vec<u32> = registry.iter().map(|g| g.count).collect();
        assert_eq!(counts, vec![4, 1, 9]);
    }
}
