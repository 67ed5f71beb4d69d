//! Error types for catalog loading, dice parsing, and event resolution.
//!
//! Handlers never return errors for missing targets: "no eligible target" is
//! a warning plus a skipped effect. The variants here cover the conditions
//! that must reach the caller.

use crate::command::CommandKind;
use crate::interaction::Rejection;
use crate::outcome::{Approach, OutcomeTier};
use crate::pipeline::InstanceStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiceError {
    #[error("Empty dice formula")]
    Empty,
    #[error("Invalid dice term '{term}' in formula '{formula}'")]
    InvalidTerm { formula: String, term: String },
    #[error("Dice formula '{0}' is out of range")]
    OutOfRange(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate event id: {0}")]
    DuplicateEvent(String),
    #[error("Event '{event}': {reason}")]
    Invalid { event: String, reason: String },
    #[error("Event '{event}' uses command '{kind}' but no handler is registered")]
    MissingHandler { event: String, kind: CommandKind },
}

/// Failure while committing a prepared command against the live state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("Target no longer exists: {0}")]
    TargetMissing(String),
    #[error("Target no longer eligible: {0}")]
    TargetIneligible(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
    #[error("Event '{event}' has no approach '{approach}'")]
    UnknownApproach { event: String, approach: Approach },
    #[error("Approach is locked for this instance ({0})")]
    ApproachLocked(Approach),
    #[error("No approach selected")]
    ApproachRequired,
    #[error("No outcome recorded")]
    OutcomeRequired,
    #[error("Outcome already recorded as {0}")]
    OutcomeLocked(OutcomeTier),
    #[error("Event '{event}' defines no effects for {tier}")]
    NoOutcomeDefined { event: String, tier: OutcomeTier },
    #[error("No handler registered for command kind '{0}'")]
    UnregisteredCommand(CommandKind),
    #[error("Handler for '{expected}' was given a '{got}' command")]
    HandlerMismatch {
        expected: CommandKind,
        got: CommandKind,
    },
    #[error("Cannot {action} while instance is {status}")]
    InvalidTransition {
        status: InstanceStatus,
        action: &'static str,
    },
    #[error("Instance is awaiting an interaction")]
    InteractionPending,
    #[error("Instance has no pending interaction")]
    NoInteraction,
    #[error("Selection rejected: {0}")]
    SelectionRejected(Rejection),
    #[error(transparent)]
    Dice(#[from] DiceError),
}

pub type Result<T> = std::result::Result<T, ResolutionError>;
