//! Commands and the two-phase handler contract.
//!
//! A [`Command`] is pure data declared in an outcome table. Dispatching it
//! through the [`CommandRegistry`] asks the matching [`CommandHandler`] to
//! *prepare* it: read the snapshot, make and remember any random choice,
//! and return a [`PreparedCommand`] holding badges plus a commit closure.
//! Preparation never touches the [`StateStore`]; only
//! [`PreparedCommand::commit`] does, and only once.
//!
//! ```text
//! Command ──dispatch──▶ CommandHandler::prepare ──▶ PreparedCommand
//!                          (snapshot, scratch)        (badges, commit)
//!                                                          │
//!                                   StateStore ◀──commit───┘
//! ```

pub mod army;
pub mod faction;
pub mod imprison;
pub mod registry;
pub mod structure;
pub mod territory;

use crate::dice::DiceRoller;
use crate::error::{CommitError, ResolutionError};
use crate::interaction::ResolutionData;
use crate::outcome::{Approach, Badge, OutcomeTier};
use crate::scratch::{InstanceScratch, SlotScratch};
use crate::state::{Equipment, FactionId, KingdomState, WorksiteKind};
use crate::store::StateStore;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use army::{ArmyConditionHandler, EquipArmyHandler};
pub use faction::FactionAttitudeHandler;
pub use imprison::ConvertUnrestHandler;
pub use registry::CommandRegistry;
pub use structure::{DamageStructureHandler, DestroyStructureHandler};
pub use territory::{ClaimHexesHandler, CreateWorksiteHandler};

fn one() -> u32 {
    1
}

fn one_i32() -> i32 {
    1
}

/// A dynamic effect declared by an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Knock hit points off random intact structures.
    DamageStructure {
        #[serde(default = "one")]
        count: u32,
        #[serde(default = "one_i32")]
        amount: i32,
    },
    DestroyStructure {
        #[serde(default = "one")]
        count: u32,
    },
    /// Move a rolled amount of unrest into imprisoned, capped by current unrest.
    ConvertUnrestToImprisoned { dice: String },
    AdjustFactionAttitude {
        steps: i32,
        #[serde(default = "one")]
        count: u32,
        /// Target a specific faction instead of picking at random. When set,
        /// `count` is ignored and at most this one faction shifts.
        #[serde(default)]
        faction: Option<FactionId>,
    },
    ApplyArmyCondition {
        condition: String,
        #[serde(default = "one_i32")]
        amount: i32,
        #[serde(default)]
        beneficial: bool,
    },
    EquipArmy {
        #[serde(default)]
        equipment: Option<Equipment>,
    },
    /// Claim the hexes chosen at the interaction gate.
    ClaimHexes,
    /// Build a worksite on the hex chosen at the interaction gate.
    CreateWorksite {
        #[serde(default)]
        worksite: Option<WorksiteKind>,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::DamageStructure { .. } => CommandKind::DamageStructure,
            Command::DestroyStructure { .. } => CommandKind::DestroyStructure,
            Command::ConvertUnrestToImprisoned { .. } => CommandKind::ConvertUnrestToImprisoned,
            Command::AdjustFactionAttitude { .. } => CommandKind::AdjustFactionAttitude,
            Command::ApplyArmyCondition { .. } => CommandKind::ApplyArmyCondition,
            Command::EquipArmy { .. } => CommandKind::EquipArmy,
            Command::ClaimHexes => CommandKind::ClaimHexes,
            Command::CreateWorksite { .. } => CommandKind::CreateWorksite,
        }
    }

    /// Dice formulas embedded in the command, for catalog validation.
    pub fn formulas(&self) -> Vec<&str> {
        match self {
            Command::ConvertUnrestToImprisoned { dice } => vec![dice.as_str()],
            _ => Vec::new(),
        }
    }
}

/// Dispatch key for the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    DamageStructure,
    DestroyStructure,
    ConvertUnrestToImprisoned,
    AdjustFactionAttitude,
    ApplyArmyCondition,
    EquipArmy,
    ClaimHexes,
    CreateWorksite,
}

impl CommandKind {
    pub const ALL: [CommandKind; 8] = [
        CommandKind::DamageStructure,
        CommandKind::DestroyStructure,
        CommandKind::ConvertUnrestToImprisoned,
        CommandKind::AdjustFactionAttitude,
        CommandKind::ApplyArmyCondition,
        CommandKind::EquipArmy,
        CommandKind::ClaimHexes,
        CommandKind::CreateWorksite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::DamageStructure => "damage_structure",
            CommandKind::DestroyStructure => "destroy_structure",
            CommandKind::ConvertUnrestToImprisoned => "convert_unrest_to_imprisoned",
            CommandKind::AdjustFactionAttitude => "adjust_faction_attitude",
            CommandKind::ApplyArmyCondition => "apply_army_condition",
            CommandKind::EquipArmy => "equip_army",
            CommandKind::ClaimHexes => "claim_hexes",
            CommandKind::CreateWorksite => "create_worksite",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred mutation produced by a handler.
pub type CommitFn = Box<dyn FnOnce(&mut KingdomState) -> Result<(), CommitError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Applied,
    /// The closure already ran (successfully or not); nothing was done.
    AlreadyCommitted,
}

/// The read-only half of a two-phase effect, ready to commit.
pub struct PreparedCommand {
    pub kind: CommandKind,
    pub badges: Vec<Badge>,
    commit: Option<CommitFn>,
}

impl PreparedCommand {
    pub fn new<F>(kind: CommandKind, badges: Vec<Badge>, commit: F) -> Self
    where
        F: FnOnce(&mut KingdomState) -> Result<(), CommitError> + Send + 'static,
    {
        Self {
            kind,
            badges,
            commit: Some(Box::new(commit)),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.commit.is_none()
    }

    /// Apply the mutation as one store transaction. Later calls are no-ops.
    pub fn commit(&mut self, store: &StateStore) -> Result<CommitStatus, CommitError> {
        let Some(mutation) = self.commit.take() else {
            return Ok(CommitStatus::AlreadyCommitted);
        };
        store.try_apply(mutation).map(|()| CommitStatus::Applied)
    }
}

impl fmt::Debug for PreparedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCommand")
            .field("kind", &self.kind)
            .field("badges", &self.badges)
            .field("committed", &self.is_committed())
            .finish()
    }
}

/// Everything a handler may look at while preparing one command.
pub struct HandlerContext<'a> {
    /// Read-only snapshot; handlers never see the live store.
    pub state: &'a KingdomState,
    pub outcome: OutcomeTier,
    pub approach: Option<Approach>,
    pub event_id: &'a str,
    /// Position of the command within its outcome.
    pub slot: usize,
    pub scratch: &'a mut InstanceScratch,
    pub resolution: &'a ResolutionData,
    pub dice: &'a mut dyn DiceRoller,
    pub warnings: &'a mut Vec<String>,
}

impl HandlerContext<'_> {
    /// Choice made by an earlier preview of this slot.
    pub fn remembered(&self) -> Option<&SlotScratch> {
        self.scratch.slot(self.slot)
    }

    pub fn remember(&mut self, value: SlotScratch) {
        self.scratch.set_slot(self.slot, value);
    }

    pub fn forget(&mut self) {
        self.scratch.clear_slot(self.slot);
    }

    /// Record a "no effect" explanation for the player.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{} slot {}: {}", self.event_id, self.slot, message);
        self.warnings.push(message);
    }
}

/// One handler per command kind.
///
/// `Ok(None)` means the command has no effect given the current state; the
/// pipeline skips it. Handlers must not mutate anything but the context's
/// scratch and warnings.
pub trait CommandHandler: Send + Sync {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError>;
}

fn mismatch(expected: CommandKind, command: &Command) -> ResolutionError {
    ResolutionError::HandlerMismatch {
        expected,
        got: command.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Resource;
    use crate::testing::KingdomStateBuilder;

    #[test]
    fn test_command_json_shape() {
        let cmd: Command = serde_json::from_str(
            r#"{"kind": "convert_unrest_to_imprisoned", "dice": "1d3"}"#,
        )
        .unwrap();
        assert_eq!(cmd.kind(), CommandKind::ConvertUnrestToImprisoned);
        assert_eq!(cmd.formulas(), vec!["1d3"]);

        let cmd: Command = serde_json::from_str(r#"{"kind": "damage_structure"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::DamageStructure {
                count: 1,
                amount: 1
            }
        );

        let cmd: Command = serde_json::from_str(r#"{"kind": "claim_hexes"}"#).unwrap();
        assert_eq!(cmd, Command::ClaimHexes);

        assert!(serde_json::from_str::<Command>(r#"{"kind": "summon_dragon"}"#).is_err());
    }

    #[test]
    fn test_kind_names_match_serde_tags() {
        let cmd = Command::EquipArmy { equipment: None };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["kind"], CommandKind::EquipArmy.as_str());
    }

    #[test]
    fn test_prepared_command_commits_once() {
        let store = StateStore::new(
            KingdomStateBuilder::new()
                .with_resource(Resource::Gold, 1)
                .build(),
        );
        let mut prepared = PreparedCommand::new(CommandKind::DamageStructure, vec![], |s| {
            s.adjust_resource(Resource::Gold, 1);
            Ok(())
        });

        assert_eq!(prepared.commit(&store), Ok(CommitStatus::Applied));
        assert_eq!(prepared.commit(&store), Ok(CommitStatus::AlreadyCommitted));
        assert!(prepared.is_committed());
        assert_eq!(store.snapshot().resource(Resource::Gold), 2);
    }

    #[test]
    fn test_failed_commit_leaves_store_untouched() {
        let store = StateStore::default();
        let mut prepared = PreparedCommand::new(CommandKind::DestroyStructure, vec![], |s| {
            s.adjust_resource(Resource::Gold, 10);
            Err(CommitError::TargetMissing("structure 9".to_string()))
        });

        assert!(prepared.commit(&store).is_err());
        assert_eq!(store.snapshot().resource(Resource::Gold), 0);
        assert_eq!(prepared.commit(&store), Ok(CommitStatus::AlreadyCommitted));
    }
}
