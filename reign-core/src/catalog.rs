//! Event catalog: static outcome tables loaded from JSON.
//!
//! The catalog is content, not engine. It is parsed once, validated, and then
//! shared read-only by every pipeline.

use crate::command::{Command, CommandKind};
use crate::dice::{DiceFormula, DiceRoller};
use crate::error::{CatalogError, DiceError};
use crate::interaction::InteractionSpec;
use crate::modifiers::RecurringSpec;
use crate::outcome::{Approach, OutcomeTier};
use crate::state::Resource;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// A static resource amount: a fixed number or a dice formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Flat(i32),
    Formula(String),
}

impl Amount {
    pub fn is_random(&self) -> bool {
        match self {
            Amount::Flat(_) => false,
            Amount::Formula(formula) => DiceFormula::parse(formula)
                .map(|f| !f.is_constant())
                .unwrap_or(false),
        }
    }

    pub fn resolve(&self, dice: &mut dyn DiceRoller) -> Result<i32, DiceError> {
        match self {
            Amount::Flat(value) => Ok(*value),
            Amount::Formula(formula) => dice.roll(formula),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub resource: Resource,
    pub amount: Amount,
}

fn default_ends_event() -> bool {
    true
}

/// Everything one outcome tier does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEffects {
    #[serde(default)]
    pub description: String,
    /// Static deltas applied after all commands commit.
    #[serde(default)]
    pub modifiers: Vec<ResourceDelta>,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub interaction: Option<InteractionSpec>,
    #[serde(default)]
    pub recurring: Option<RecurringSpec>,
    /// `false` keeps the event alive into the next turn.
    #[serde(default = "default_ends_event", alias = "endsEvent")]
    pub ends_event: bool,
}

impl Default for OutcomeEffects {
    fn default() -> Self {
        Self {
            description: String::new(),
            modifiers: Vec::new(),
            commands: Vec::new(),
            interaction: None,
            recurring: None,
            ends_event: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutcomeTable {
    #[serde(default)]
    pub critical_success: Option<OutcomeEffects>,
    #[serde(default)]
    pub success: Option<OutcomeEffects>,
    #[serde(default)]
    pub failure: Option<OutcomeEffects>,
    #[serde(default)]
    pub critical_failure: Option<OutcomeEffects>,
}

impl OutcomeTable {
    pub fn get(&self, tier: OutcomeTier) -> Option<&OutcomeEffects> {
        match tier {
            OutcomeTier::CriticalSuccess => self.critical_success.as_ref(),
            OutcomeTier::Success => self.success.as_ref(),
            OutcomeTier::Failure => self.failure.as_ref(),
            OutcomeTier::CriticalFailure => self.critical_failure.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OutcomeTier, &OutcomeEffects)> {
        OutcomeTier::ALL
            .into_iter()
            .filter_map(move |tier| self.get(tier).map(|effects| (tier, effects)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproachDefinition {
    pub approach: Approach,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub outcomes: OutcomeTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Empty when the event has a single default table.
    #[serde(default)]
    pub approaches: Vec<ApproachDefinition>,
    #[serde(default)]
    pub outcomes: OutcomeTable,
}

impl EventDefinition {
    pub fn has_approaches(&self) -> bool {
        !self.approaches.is_empty()
    }

    pub fn approach(&self, approach: Approach) -> Option<&ApproachDefinition> {
        self.approaches.iter().find(|a| a.approach == approach)
    }

    /// The outcome table for an approach, or the default table.
    pub fn table_for(&self, approach: Option<Approach>) -> Option<&OutcomeTable> {
        match approach {
            Some(approach) => self.approach(approach).map(|a| &a.outcomes),
            None if !self.has_approaches() => Some(&self.outcomes),
            None => None,
        }
    }

    fn tables(&self) -> impl Iterator<Item = &OutcomeTable> {
        std::iter::once(&self.outcomes).chain(self.approaches.iter().map(|a| &a.outcomes))
    }

    /// Every command declared anywhere in the event.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.tables()
            .flat_map(|table| table.iter())
            .flat_map(|(_, effects)| effects.commands.iter())
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::Invalid {
            event: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty event id".to_string()));
        }

        let mut seen = FxHashSet::default();
        for definition in &self.approaches {
            if !seen.insert(definition.approach) {
                return Err(invalid(format!(
                    "approach '{}' defined twice",
                    definition.approach
                )));
            }
            if definition.outcomes.is_empty() {
                return Err(invalid(format!(
                    "approach '{}' has an empty outcome table",
                    definition.approach
                )));
            }
        }
        if !self.has_approaches() && self.outcomes.is_empty() {
            return Err(invalid("no outcome table".to_string()));
        }

        for table in self.tables() {
            for (tier, effects) in table.iter() {
                effects
                    .validate()
                    .map_err(|reason| invalid(format!("{tier}: {reason}")))?;
            }
        }
        Ok(())
    }
}

impl OutcomeEffects {
    fn validate(&self) -> Result<(), String> {
        let check = |formula: &str| {
            DiceFormula::parse(formula)
                .map(|_| ())
                .map_err(|e| e.to_string())
        };

        for delta in &self.modifiers {
            if let Amount::Formula(formula) = &delta.amount {
                check(formula)?;
            }
        }
        for command in &self.commands {
            for formula in command.formulas() {
                check(formula)?;
            }
            let gated = matches!(
                command.kind(),
                CommandKind::ClaimHexes | CommandKind::CreateWorksite
            );
            if gated && self.interaction.is_none() {
                return Err(format!("'{}' needs an interaction", command.kind()));
            }
        }
        if let Some(recurring) = &self.recurring {
            check(&recurring.formula)?;
            if recurring.duration == 0 {
                return Err(format!("recurring '{}' has zero duration", recurring.name));
            }
        }
        if let Some(interaction) = &self.interaction {
            if interaction.count == 0 {
                return Err(format!("interaction '{}' allows zero picks", interaction.title));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    events: Vec<EventDefinition>,
}

/// Validated, immutable set of event definitions.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<EventDefinition>,
    index: FxHashMap<String, usize>,
}

impl EventCatalog {
    pub fn new(events: Vec<EventDefinition>) -> Result<Self, CatalogError> {
        let mut index = FxHashMap::default();
        for (i, event) in events.iter().enumerate() {
            event.validate()?;
            if index.insert(event.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateEvent(event.id.clone()));
            }
        }
        log::debug!("Loaded catalog with {} events", events.len());
        Ok(Self { events, index })
    }

    /// Parse `{"events": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.events)
    }

    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.index.get(id).map(|&i| &self.events[i])
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
