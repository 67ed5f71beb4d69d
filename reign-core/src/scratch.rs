//! Typed per-instance scratch data carried between preview and commit.
//!
//! Every random draw made while previewing an outcome is written here the
//! first time it happens and read back on later previews, so redrawing the
//! preview never re-rolls and commit applies exactly what was shown.
//! Entries are keyed by effect slot (the command's position in its outcome),
//! which keeps two commands of the same kind apart.

use crate::state::{ArmyId, Equipment, FactionId, StructureId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotScratch {
    Structures { ids: Vec<StructureId> },
    Imprison { rolled: i32 },
    Factions { ids: Vec<FactionId> },
    Army { army: ArmyId },
    Equipment { army: ArmyId, equipment: Equipment },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstanceScratch {
    slots: BTreeMap<usize, SlotScratch>,
    /// Rolled values for dice-valued static deltas, keyed by delta index.
    static_rolls: BTreeMap<usize, i32>,
}

impl InstanceScratch {
    pub fn slot(&self, slot: usize) -> Option<&SlotScratch> {
        self.slots.get(&slot)
    }

    pub fn set_slot(&mut self, slot: usize, value: SlotScratch) {
        self.slots.insert(slot, value);
    }

    pub fn clear_slot(&mut self, slot: usize) {
        self.slots.remove(&slot);
    }

    pub fn static_roll(&self, index: usize) -> Option<i32> {
        self.static_rolls.get(&index).copied()
    }

    pub fn set_static_roll(&mut self, index: usize, value: i32) {
        self.static_rolls.insert(index, value);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.static_rolls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_independent() {
        let mut scratch = InstanceScratch::default();
        assert!(scratch.is_empty());

        scratch.set_slot(0, SlotScratch::Imprison { rolled: 2 });
        scratch.set_slot(1, SlotScratch::Imprison { rolled: 3 });
        scratch.set_static_roll(0, -4);

        assert_eq!(scratch.slot(0), Some(&SlotScratch::Imprison { rolled: 2 }));
        assert_eq!(scratch.slot(1), Some(&SlotScratch::Imprison { rolled: 3 }));
        assert_eq!(scratch.static_roll(0), Some(-4));

        scratch.clear_slot(0);
        assert_eq!(scratch.slot(0), None);
        assert!(!scratch.is_empty());
    }

    #[test]
    fn test_serializes_with_kind_tags() {
        let mut scratch = InstanceScratch::default();
        scratch.set_slot(
            2,
            SlotScratch::Equipment {
                army: 7,
                equipment: Equipment::Runes,
            },
        );
        let json = serde_json::to_string(&scratch).unwrap();
        assert!(json.contains(r#""kind":"equipment""#));
        let back: InstanceScratch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scratch);
    }
}
