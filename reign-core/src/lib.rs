//! # Reign Core
//!
//! Outcome resolution for turn-based kingdom events.
//!
//! A skill check produces one of four outcome tiers; each tier applies
//! resource deltas, dynamic commands, and possibly a multi-turn modifier.
//! Some effects need a player decision first (the approach) or a validated
//! map selection (the interaction gate) before they can be committed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │ EventCatalog│────▶│OutcomePipeline│────▶│ CommandRegistry │
//! │  (static)   │     │ (state mach.) │     │   (handlers)    │
//! └─────────────┘     └───────┬───────┘     └────────┬────────┘
//!                             │ preview: snapshots   │ PreparedCommand
//!                             │ execute: commits     ▼
//!                     ┌───────▼───────┐     ┌─────────────────┐
//!                     │  StateStore   │◀────│ commit closures │
//!                     │ (KingdomState)│     └─────────────────┘
//!                     └───────┬───────┘
//!                             ▼
//!                     ┌───────────────┐
//!                     │   Observers   │
//!                     └───────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`KingdomState`] | Resources, factions, armies, structures, hexes, ongoing modifiers |
//! | [`StateStore`] | Snapshots for readers, serialized mutations for writers |
//! | [`Command`] | Dynamic effect declared by an outcome (pure data) |
//! | [`CommandHandler`] | Turns a command into a [`PreparedCommand`] |
//! | [`OutcomePipeline`] | Trigger → approach → preview → interaction → execute |
//! | [`DiceRoller`] | Randomness source (`"2d4+1"` formulas, uniform picks) |
//! | [`ResolutionObserver`] | Notified of every finished instance |

pub mod bounded;
pub mod catalog;
pub mod command;
pub mod config;
pub mod dice;
pub mod error;
pub mod interaction;
pub mod modifiers;
pub mod observer;
pub mod outcome;
pub mod pipeline;
pub mod scratch;
pub mod state;
pub mod store;
pub mod testing;


pub use bounded::BoundedInt;
pub use catalog::{EventCatalog, EventDefinition, OutcomeEffects, OutcomeTable};
pub use command::{Command, CommandHandler, CommandKind, CommandRegistry, PreparedCommand};
pub use config::{CommitFailurePolicy, ResolutionConfig};
pub use dice::{DiceFormula, DiceRoller, SeededRoller};
pub use error::{CatalogError, CommitError, DiceError, ResolutionError};
pub use interaction::{InteractionGate, InteractionRequest, Rejection, Selection};
pub use modifiers::{advance_turn, AppliedModifier, ModifierId, RecurringModifier};
pub use observer::event_log::EventLogObserver;
pub use observer::{ObserverRegistry, ResolutionEvent, ResolutionObserver};
pub use outcome::{Approach, Badge, OutcomeTier, Polarity};
pub use pipeline::{
    EventInstance, ExecutionReport, InstanceId, InstanceStatus, OutcomePipeline, Preview,
};
pub use state::{KingdomState, Resource};
pub use store::{Snapshot, StateStore};
