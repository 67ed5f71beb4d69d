use crate::bounded::{BoundedInt, HitPoints, Severity};
use crate::modifiers::{ModifierId, RecurringModifier};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use im::{OrdMap, OrdSet, Vector};

pub type FactionId = String;
pub type ArmyId = u32;
pub type StructureId = u32;
/// Map cell identifier, e.g. `"5.12"`.
pub type HexId = String;

/// Kingdom-level stockpiles and counters. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Gold,
    Food,
    Lumber,
    Stone,
    Ore,
    Luxuries,
    Unrest,
    Imprisoned,
    Fame,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Gold => "gold",
            Resource::Food => "food",
            Resource::Lumber => "lumber",
            Resource::Stone => "stone",
            Resource::Ore => "ore",
            Resource::Luxuries => "luxuries",
            Resource::Unrest => "unrest",
            Resource::Imprisoned => "imprisoned",
            Resource::Fame => "fame",
        }
    }

    /// Whether gaining this resource is bad for the kingdom.
    pub fn is_harmful(self) -> bool {
        matches!(self, Resource::Unrest)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Faction attitude ladder, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attitude {
    Hostile,
    Unfriendly,
    Indifferent,
    Friendly,
    Helpful,
}

impl Attitude {
    pub const LADDER: [Attitude; 5] = [
        Attitude::Hostile,
        Attitude::Unfriendly,
        Attitude::Indifferent,
        Attitude::Friendly,
        Attitude::Helpful,
    ];

    fn position(self) -> BoundedInt {
        let index = Self::LADDER.iter().position(|a| *a == self).unwrap_or(0);
        BoundedInt::new(index as i32, 0, Self::LADDER.len() as i32 - 1)
    }

    /// Step along the ladder, clamped at Hostile and Helpful.
    pub fn shifted(self, steps: i32) -> Attitude {
        Self::LADDER[self.position().shifted(steps).get() as usize]
    }

    /// Whether a shift by `steps` would change anything.
    pub fn can_shift(self, steps: i32) -> bool {
        steps != 0 && self.shifted(steps) != self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Attitude::Hostile => "Hostile",
            Attitude::Unfriendly => "Unfriendly",
            Attitude::Indifferent => "Indifferent",
            Attitude::Friendly => "Friendly",
            Attitude::Helpful => "Helpful",
        }
    }
}

impl fmt::Display for Attitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub attitude: Attitude,
}

/// Army equipment upgrades. Each can be granted once per army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equipment {
    Armor,
    Runes,
    Weapons,
    Gear,
}

impl Equipment {
    pub const ALL: [Equipment; 4] = [
        Equipment::Armor,
        Equipment::Runes,
        Equipment::Weapons,
        Equipment::Gear,
    ];
}

impl fmt::Display for Equipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Equipment::Armor => "armor",
            Equipment::Runes => "runes",
            Equipment::Weapons => "weapons",
            Equipment::Gear => "gear",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Army {
    pub id: ArmyId,
    pub name: String,
    /// Backing actor on the tabletop. Armies without one cannot carry
    /// conditions or equipment.
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub player_controlled: bool,
    #[serde(default)]
    pub conditions: OrdMap<String, Severity>,
    #[serde(default)]
    pub equipment: OrdSet<Equipment>,
}

impl Army {
    /// Eligible targets for army effects: a backing actor and player control.
    pub fn accepts_effects(&self) -> bool {
        self.actor_id.is_some() && self.player_controlled
    }

    pub fn missing_equipment(&self) -> Vec<Equipment> {
        Equipment::ALL
            .into_iter()
            .filter(|e| !self.equipment.contains(e))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub name: String,
    pub settlement: String,
    pub hit_points: HitPoints,
}

impl Structure {
    /// A structure at 0 hit points is damaged and provides nothing.
    pub fn is_damaged(&self) -> bool {
        self.hit_points.is_at_min()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Plains,
    Forest,
    Hills,
    Mountains,
    Swamp,
    Desert,
    Lake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorksiteKind {
    Farmland,
    LumberCamp,
    Mine,
    Quarry,
}

impl WorksiteKind {
    pub fn supports(self, terrain: Terrain) -> bool {
        match self {
            WorksiteKind::Farmland => matches!(terrain, Terrain::Plains | Terrain::Hills),
            WorksiteKind::LumberCamp => matches!(terrain, Terrain::Forest | Terrain::Swamp),
            WorksiteKind::Mine => matches!(terrain, Terrain::Hills | Terrain::Mountains),
            WorksiteKind::Quarry => matches!(terrain, Terrain::Hills | Terrain::Mountains),
        }
    }

    /// The default worksite for a terrain, if any can be built there.
    pub fn for_terrain(terrain: Terrain) -> Option<WorksiteKind> {
        match terrain {
            Terrain::Plains => Some(WorksiteKind::Farmland),
            Terrain::Forest | Terrain::Swamp => Some(WorksiteKind::LumberCamp),
            Terrain::Hills => Some(WorksiteKind::Farmland),
            Terrain::Mountains => Some(WorksiteKind::Mine),
            Terrain::Desert | Terrain::Lake => None,
        }
    }
}

impl fmt::Display for WorksiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorksiteKind::Farmland => "farmland",
            WorksiteKind::LumberCamp => "lumber camp",
            WorksiteKind::Mine => "mine",
            WorksiteKind::Quarry => "quarry",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hex {
    pub id: HexId,
    pub terrain: Terrain,
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub worksite: Option<WorksiteKind>,
    #[serde(default)]
    pub neighbors: Vec<HexId>,
}

/// The kingdom aggregate. Persistent `im` collections make snapshots O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KingdomState {
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub resources: OrdMap<Resource, i32>,
    #[serde(default)]
    pub factions: OrdMap<FactionId, Faction>,
    #[serde(default)]
    pub armies: OrdMap<ArmyId, Army>,
    #[serde(default)]
    pub structures: OrdMap<StructureId, Structure>,
    #[serde(default)]
    pub hexes: OrdMap<HexId, Hex>,
    #[serde(default)]
    pub ongoing_modifiers: Vector<RecurringModifier>,
    #[serde(default)]
    pub next_modifier_id: ModifierId,
}

impl KingdomState {
    pub fn resource(&self, resource: Resource) -> i32 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    /// Add `delta` to a resource, clamping at zero. Returns the change that
    /// was actually applied.
    pub fn adjust_resource(&mut self, resource: Resource, delta: i32) -> i32 {
        let current = self.resource(resource);
        let next = current.saturating_add(delta).max(0);
        self.resources.insert(resource, next);
        next - current
    }

    /// Structures that can still take damage, by ascending id.
    pub fn damageable_structures(&self) -> Vec<&Structure> {
        self.structures.values().filter(|s| !s.is_damaged()).collect()
    }

    /// Armies that accept conditions and equipment, by ascending id.
    pub fn effect_eligible_armies(&self) -> Vec<&Army> {
        self.armies.values().filter(|a| a.accepts_effects()).collect()
    }

    pub fn is_adjacent_to_claimed(&self, hex: &str) -> bool {
        self.hexes.get(hex).is_some_and(|h| {
            h.neighbors
                .iter()
                .any(|n| self.hexes.get(n).is_some_and(|nh| nh.claimed))
        })
    }

    /// Compute a deterministic checksum of the kingdom state.
    ///
    /// Identical states produce identical checksums; ordered collections
    /// make iteration order part of the value.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KingdomStateBuilder;

    #[test]
    fn test_attitude_ladder_clamps() {
        assert_eq!(Attitude::Indifferent.shifted(1), Attitude::Friendly);
        assert_eq!(Attitude::Friendly.shifted(5), Attitude::Helpful);
        assert_eq!(Attitude::Unfriendly.shifted(-3), Attitude::Hostile);
        assert!(!Attitude::Helpful.can_shift(1));
        assert!(Attitude::Helpful.can_shift(-1));
        assert!(!Attitude::Hostile.can_shift(-2));
        assert!(!Attitude::Friendly.can_shift(0));
    }

    #[test]
    fn test_adjust_resource_clamps_at_zero() {
        let mut state = KingdomStateBuilder::new()
            .with_resource(Resource::Gold, 3)
            .build();

        assert_eq!(state.adjust_resource(Resource::Gold, -5), -3);
        assert_eq!(state.resource(Resource::Gold), 0);
        assert_eq!(state.adjust_resource(Resource::Food, 2), 2);
        assert_eq!(state.resource(Resource::Food), 2);
    }

    #[test]
    fn test_worksite_terrain_rules() {
        assert!(WorksiteKind::Mine.supports(Terrain::Mountains));
        assert!(!WorksiteKind::Farmland.supports(Terrain::Forest));
        assert_eq!(
            WorksiteKind::for_terrain(Terrain::Forest),
            Some(WorksiteKind::LumberCamp)
        );
        assert_eq!(WorksiteKind::for_terrain(Terrain::Lake), None);
    }

    #[test]
    fn test_checksum_tracks_changes() {
        let state = KingdomStateBuilder::new()
            .with_resource(Resource::Unrest, 2)
            .with_faction("swordlords", "Swordlords", Attitude::Indifferent)
            .build();
        let copy = state.clone();
        assert_eq!(state.checksum(), copy.checksum());

        let mut changed = state.clone();
        changed.adjust_resource(Resource::Unrest, 1);
        assert_ne!(state.checksum(), changed.checksum());
    }

    #[test]
    fn test_state_json_round_trip() {
        let state = KingdomStateBuilder::new()
            .with_resource(Resource::Gold, 10)
            .with_army(1, "Guard", true, true)
            .with_structure(4, "Barracks", "Capital", 2)
            .with_hex("1.1", Terrain::Plains, true, &["1.2"])
            .build();

        let json = serde_json::to_string(&state).unwrap();
        let back: KingdomState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn test_adjacency() {
        let state = KingdomStateBuilder::new()
            .with_hex("1.1", Terrain::Plains, true, &["1.2"])
            .with_hex("1.2", Terrain::Forest, false, &["1.1", "1.3"])
            .with_hex("1.3", Terrain::Hills, false, &["1.2"])
            .build();
        assert!(state.is_adjacent_to_claimed("1.2"));
        assert!(!state.is_adjacent_to_claimed("1.3"));
        assert!(!state.is_adjacent_to_claimed("9.9"));
    }
}
