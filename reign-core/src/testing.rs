//! Builders and fakes shared by unit tests, scenario tests and the CLI's
//! demo data checks.

use crate::bounded::new_hit_points;
use crate::catalog::EventCatalog;
use crate::command::{Command, CommandHandler, HandlerContext, PreparedCommand};
use crate::dice::{DiceFormula, DiceRoller};
use crate::error::{DiceError, ResolutionError};
use crate::interaction::ResolutionData;
use crate::outcome::OutcomeTier;
use crate::scratch::InstanceScratch;
use crate::state::{
    Army, ArmyId, Attitude, Faction, Hex, KingdomState, Resource, Structure, StructureId, Terrain,
};
use std::collections::VecDeque;

pub struct KingdomStateBuilder {
    state: KingdomState,
}

impl KingdomStateBuilder {
    pub fn new() -> Self {
        Self {
            state: KingdomState::default(),
        }
    }

    pub fn turn(mut self, turn: u32) -> Self {
        self.state.turn = turn;
        self
    }

    pub fn with_resource(mut self, resource: Resource, amount: i32) -> Self {
        self.state.resources.insert(resource, amount.max(0));
        self
    }

    pub fn with_faction(mut self, id: &str, name: &str, attitude: Attitude) -> Self {
        self.state.factions.insert(
            id.to_string(),
            Faction {
                id: id.to_string(),
                name: name.to_string(),
                attitude,
            },
        );
        self
    }

    pub fn with_army(
        mut self,
        id: ArmyId,
        name: &str,
        has_actor: bool,
        player_controlled: bool,
    ) -> Self {
        self.state.armies.insert(
            id,
            Army {
                id,
                name: name.to_string(),
                actor_id: has_actor.then(|| format!("actor-{id}")),
                player_controlled,
                conditions: Default::default(),
                equipment: Default::default(),
            },
        );
        self
    }

    pub fn with_structure(
        mut self,
        id: StructureId,
        name: &str,
        settlement: &str,
        max_hit_points: i32,
    ) -> Self {
        self.state.structures.insert(
            id,
            Structure {
                id,
                name: name.to_string(),
                settlement: settlement.to_string(),
                hit_points: new_hit_points(max_hit_points),
            },
        );
        self
    }

    pub fn with_hex(mut self, id: &str, terrain: Terrain, claimed: bool, neighbors: &[&str]) -> Self {
        self.state.hexes.insert(
            id.to_string(),
            Hex {
                id: id.to_string(),
                terrain,
                claimed,
                worksite: None,
                neighbors: neighbors.iter().map(|n| n.to_string()).collect(),
            },
        );
        self
    }

    pub fn build(self) -> KingdomState {
        self.state
    }
}

impl Default for KingdomStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Roller that returns queued values in order.
///
/// Formulas are still parsed so syntax errors surface as they would with a
/// real roller. Once the queue is empty every roll returns the formula's
/// minimum.
#[derive(Debug, Default)]
pub struct ScriptedRoller {
    queue: VecDeque<i32>,
    calls: usize,
}

impl ScriptedRoller {
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            calls: 0,
        }
    }

    /// Number of rolls made so far, including picks.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll(&mut self, formula: &str) -> Result<i32, DiceError> {
        let parsed = DiceFormula::parse(formula)?;
        self.calls += 1;
        Ok(self.queue.pop_front().unwrap_or_else(|| parsed.min()))
    }
}

/// Runs one handler against a fixed state with its own scratch, the way the
/// pipeline does for a single slot.
pub struct HandlerHarness {
    pub state: KingdomState,
    pub scratch: InstanceScratch,
    pub resolution: ResolutionData,
    pub warnings: Vec<String>,
    pub dice: ScriptedRoller,
    pub outcome: OutcomeTier,
}

impl HandlerHarness {
    pub fn new(state: KingdomState, dice: ScriptedRoller) -> Self {
        Self {
            state,
            scratch: InstanceScratch::default(),
            resolution: ResolutionData::default(),
            warnings: Vec::new(),
            dice,
            outcome: OutcomeTier::Success,
        }
    }

    pub fn prepare(
        &mut self,
        handler: &dyn CommandHandler,
        command: &Command,
        slot: usize,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let mut ctx = HandlerContext {
            state: &self.state,
            outcome: self.outcome,
            approach: None,
            event_id: "harness",
            slot,
            scratch: &mut self.scratch,
            resolution: &self.resolution,
            dice: &mut self.dice,
            warnings: &mut self.warnings,
        };
        handler.prepare(command, &mut ctx)
    }
}

/// Small catalog covering every command kind and both interaction-gated
/// effects.
pub const SAMPLE_CATALOG_JSON: &str = r#"{
  "events": [
    {
      "id": "bandit-activity",
      "name": "Bandit Activity",
      "skills": ["intrigue", "warfare"],
      "approaches": [
        {
          "approach": "virtuous",
          "label": "Offer amnesty",
          "skills": ["diplomacy"],
          "outcomes": {
            "success": {
              "description": "The bandits lay down arms.",
              "commands": [{"kind": "adjust_faction_attitude", "steps": 1}]
            },
            "failure": {
              "description": "The bandits laugh off the offer.",
              "modifiers": [{"resource": "unrest", "amount": 1}],
              "endsEvent": false
            }
          }
        },
        {
          "approach": "practical",
          "label": "Hire guards",
          "skills": ["warfare"],
          "outcomes": {
            "success": {
              "description": "Patrols recover stolen gear.",
              "commands": [{"kind": "equip_army"}]
            },
            "failure": {
              "description": "The patrols come back exhausted.",
              "commands": [{"kind": "apply_army_condition", "condition": "fatigued"}]
            }
          }
        },
        {
          "approach": "ruthless",
          "label": "Hunt them down",
          "skills": ["intrigue"],
          "outcomes": {
            "critical-success": {
              "description": "The gang is rounded up.",
              "modifiers": [{"resource": "fame", "amount": 1}],
              "commands": [{"kind": "convert_unrest_to_imprisoned", "dice": "1d3"}]
            },
            "success": {
              "description": "The gang scatters.",
              "modifiers": [{"resource": "unrest", "amount": -1}]
            },
            "failure": {
              "description": "The bandits strike back.",
              "modifiers": [{"resource": "gold", "amount": "-1d4"}],
              "commands": [{"kind": "damage_structure"}],
              "endsEvent": false
            },
            "critical-failure": {
              "description": "The bandits burn a building and keep raiding.",
              "commands": [{"kind": "destroy_structure"}],
              "recurring": {"name": "Bandit Raids", "resource": "gold", "formula": "-1d4", "duration": 2}
            }
          }
        }
      ]
    },
    {
      "id": "land-rush",
      "name": "Land Rush",
      "skills": ["exploration"],
      "outcomes": {
        "success": {
          "description": "Settlers push into the wilds.",
          "interaction": {
            "title": "Choose hexes to claim",
            "count": 2,
            "constraints": ["unclaimed", "adjacent-to-claimed"]
          },
          "commands": [{"kind": "claim_hexes"}]
        },
        "failure": {
          "description": "The settlers squabble.",
          "modifiers": [{"resource": "unrest", "amount": 1}]
        }
      }
    },
    {
      "id": "new-worksite",
      "name": "Prospectors",
      "skills": ["industry"],
      "outcomes": {
        "success": {
          "description": "Prospectors find a promising site.",
          "modifiers": [{"resource": "gold", "amount": -2}],
          "interaction": {
            "title": "Choose a hex for the worksite",
            "constraints": ["claimed", "without-worksite", "supports-worksite"]
          },
          "commands": [{"kind": "create_worksite"}]
        },
        "failure": {
          "description": "The prospectors keep looking.",
          "endsEvent": false
        }
      }
    }
  ]
}"#;

pub fn sample_catalog() -> EventCatalog {
    EventCatalog::from_json(SAMPLE_CATALOG_JSON).expect("sample catalog is valid")
}
