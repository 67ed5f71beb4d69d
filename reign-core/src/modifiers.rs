//! Recurring modifier ledger.
//!
//! Outcomes can leave an effect behind that reapplies every turn for a fixed
//! number of turns ("the bandits keep raiding: lose 1d4 gold per turn for
//! three turns"). Entries live on [`KingdomState::ongoing_modifiers`] so they
//! are part of every snapshot, and are advanced by [`advance_turn`].

use crate::dice::{DiceFormula, DiceRoller};
use crate::error::DiceError;
use crate::state::{KingdomState, Resource};
use crate::store::StateStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// Type-safe recurring modifier identifier, allocated from
/// [`KingdomState::next_modifier_id`].
#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct ModifierId(pub u64);

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modifier#{}", self.0)
    }
}

/// Declaration of a multi-turn effect in an outcome table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSpec {
    pub name: String,
    pub resource: Resource,
    /// Dice formula rolled each turn; negative results drain the resource.
    pub formula: String,
    /// Number of turns the effect applies.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurringModifier {
    pub id: ModifierId,
    pub name: String,
    pub resource: Resource,
    pub formula: String,
    pub remaining_turns: u32,
    pub source_event: String,
}

/// Append a modifier to the ledger. Zero-duration specs register nothing.
pub fn register(
    state: &mut KingdomState,
    spec: &RecurringSpec,
    source_event: &str,
) -> Option<ModifierId> {
    if spec.duration == 0 {
        return None;
    }
    let id = state.next_modifier_id;
    state.next_modifier_id = ModifierId(id.0 + 1);
    state.ongoing_modifiers.push_back(RecurringModifier {
        id,
        name: spec.name.clone(),
        resource: spec.resource,
        formula: spec.formula.clone(),
        remaining_turns: spec.duration,
        source_event: source_event.to_string(),
    });
    log::debug!(
        "Registered {} '{}' from {} for {} turns",
        id,
        spec.name,
        source_event,
        spec.duration
    );
    Some(id)
}

/// Remove a modifier before it runs out (e.g. the event was resolved).
pub fn remove(state: &mut KingdomState, id: ModifierId) -> bool {
    let before = state.ongoing_modifiers.len();
    state.ongoing_modifiers.retain(|m| m.id != id);
    state.ongoing_modifiers.len() != before
}

/// What one ledger entry did during a turn advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedModifier {
    pub id: ModifierId,
    pub name: String,
    pub resource: Resource,
    pub rolled: i32,
    /// Change actually applied after clamping the resource at zero.
    pub applied: i32,
    pub expired: bool,
}

/// Advance the kingdom one turn: bump the turn counter, apply every ongoing
/// modifier once, decrement durations and drop expired entries.
///
/// Runs as a single store mutation; if any formula fails to parse, nothing
/// is applied.
#[instrument(skip_all, name = "recurring_modifiers")]
pub fn advance_turn(
    store: &StateStore,
    dice: &mut dyn DiceRoller,
) -> Result<Vec<AppliedModifier>, DiceError> {
    store.try_apply(|state| {
        state.turn += 1;

        let mut applied = Vec::with_capacity(state.ongoing_modifiers.len());
        let mut kept = im::Vector::new();
        let ledger = std::mem::take(&mut state.ongoing_modifiers);

        for mut modifier in ledger {
            DiceFormula::parse(&modifier.formula)?;
            let rolled = dice.roll(&modifier.formula)?;
            let change = state.adjust_resource(modifier.resource, rolled);
            modifier.remaining_turns = modifier.remaining_turns.saturating_sub(1);
            let expired = modifier.remaining_turns == 0;

            applied.push(AppliedModifier {
                id: modifier.id,
                name: modifier.name.clone(),
                resource: modifier.resource,
                rolled,
                applied: change,
                expired,
            });

            if expired {
                log::info!("{} '{}' expired", modifier.id, modifier.name);
            } else {
                kept.push_back(modifier);
            }
        }

        state.ongoing_modifiers = kept;
        Ok(applied)
    })
}
