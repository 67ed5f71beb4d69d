//! Outcome resolution pipeline.
//!
//! Drives one [`EventInstance`] at a time through
//!
//! ```text
//! Created ──select_approach──▶ ApproachSelected ──preview──▶ Previewed ──execute──▶ Committed
//!                                                    │    ▲                           CommittedWithErrors
//!                                                    ▼    │ submit_selection          Ongoing ──retrigger──▶ (next turn)
//!                                             InteractionPending                          OngoingWithErrors ──retrigger──▶
//! ```
//!
//! `preview` only reads snapshots and may be repeated freely; every random
//! draw is remembered in the instance's scratch, so the badges shown are
//! exactly what `execute` commits. Nothing touches the [`StateStore`] until
//! `execute`. Instances are independent, so any number of them can be driven
//! from different threads against the same pipeline.

use crate::catalog::{Amount, EventCatalog, EventDefinition, OutcomeEffects};
use crate::command::{CommandKind, CommandRegistry, HandlerContext, PreparedCommand};
use crate::config::{CommitFailurePolicy, ResolutionConfig};
use crate::dice::{DiceFormula, DiceRoller};
use crate::error::{CatalogError, ResolutionError, Result};
use crate::interaction::{InteractionGate, InteractionRequest, ResolutionData, Selection};
use crate::modifiers::{self, AppliedModifier, ModifierId};
use crate::observer::{ObserverRegistry, ResolutionEvent, ResolutionObserver};
use crate::outcome::{Approach, Badge, OutcomeTier, Polarity};
use crate::scratch::InstanceScratch;
use crate::state::Resource;
use crate::store::StateStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::instrument;

#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    Created,
    ApproachSelected,
    Previewed,
    InteractionPending,
    Committed,
    CommittedWithErrors,
    /// Executed, but the event carries on into the next turn.
    Ongoing,
    /// Like `Ongoing`, with at least one command that failed to commit.
    OngoingWithErrors,
    Abandoned,
}

impl InstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InstanceStatus::Committed
                | InstanceStatus::CommittedWithErrors
                | InstanceStatus::Ongoing
                | InstanceStatus::OngoingWithErrors
                | InstanceStatus::Abandoned
        )
    }

    /// The event continues next turn and can be retriggered.
    pub fn is_ongoing(self) -> bool {
        matches!(
            self,
            InstanceStatus::Ongoing | InstanceStatus::OngoingWithErrors
        )
    }

    /// At least one prepared command failed to commit.
    pub fn has_errors(self) -> bool {
        matches!(
            self,
            InstanceStatus::CommittedWithErrors | InstanceStatus::OngoingWithErrors
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Created => "created",
            InstanceStatus::ApproachSelected => "approach-selected",
            InstanceStatus::Previewed => "previewed",
            InstanceStatus::InteractionPending => "interaction-pending",
            InstanceStatus::Committed => "committed",
            InstanceStatus::CommittedWithErrors => "committed-with-errors",
            InstanceStatus::Ongoing => "ongoing",
            InstanceStatus::OngoingWithErrors => "ongoing-with-errors",
            InstanceStatus::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the player sees before committing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Preview {
    pub badges: Vec<Badge>,
    /// Effects skipped for lack of a target.
    pub warnings: Vec<String>,
    /// Set while the outcome still needs a selection.
    pub interaction: Option<InteractionRequest>,
}

/// A prepared command that failed to commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFailure {
    pub kind: CommandKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub instance: InstanceId,
    pub event_id: String,
    pub turn: u32,
    pub approach: Option<Approach>,
    pub outcome: OutcomeTier,
    pub status: InstanceStatus,
    pub badges: Vec<Badge>,
    pub warnings: Vec<String>,
    pub failures: Vec<CommitFailure>,
    /// Commands skipped after a failure under `StopOnFirstError`.
    pub skipped: Vec<CommandKind>,
    pub modifier: Option<ModifierId>,
}

/// One triggered occurrence of an event.
///
/// Owned by the caller; the pipeline only ever borrows it, so the phases of
/// one instance cannot overlap.
#[derive(Debug)]
pub struct EventInstance {
    id: InstanceId,
    event_id: String,
    turn: u32,
    approach: Option<Approach>,
    outcome: Option<OutcomeTier>,
    scratch: InstanceScratch,
    resolution: ResolutionData,
    status: InstanceStatus,
    pending: Option<InteractionRequest>,
    prepared: Vec<PreparedCommand>,
    deltas: Vec<(Resource, i32)>,
    preview: Option<Preview>,
}

impl EventInstance {
    fn new(id: InstanceId, event_id: &str, turn: u32, status: InstanceStatus) -> Self {
        Self {
            id,
            event_id: event_id.to_string(),
            turn,
            approach: None,
            outcome: None,
            scratch: InstanceScratch::default(),
            resolution: ResolutionData::default(),
            status,
            pending: None,
            prepared: Vec::new(),
            deltas: Vec::new(),
            preview: None,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn approach(&self) -> Option<Approach> {
        self.approach
    }

    pub fn outcome(&self) -> Option<OutcomeTier> {
        self.outcome
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn scratch(&self) -> &InstanceScratch {
        &self.scratch
    }

    pub fn resolution(&self) -> &ResolutionData {
        &self.resolution
    }

    pub fn pending_interaction(&self) -> Option<&InteractionRequest> {
        self.pending.as_ref()
    }

    /// Most recent preview, if any.
    pub fn last_preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    fn invalid(&self, action: &'static str) -> ResolutionError {
        ResolutionError::InvalidTransition {
            status: self.status,
            action,
        }
    }
}

fn delta_badge(resource: Resource, amount: i32) -> Badge {
    let gain = amount > 0;
    let polarity = if gain != resource.is_harmful() {
        Polarity::Positive
    } else {
        Polarity::Negative
    };
    Badge::new(format!("{amount:+} {resource}"), polarity).with_icon(resource.as_str())
}

fn recurring_badge(effects: &OutcomeEffects) -> Option<Badge> {
    let spec = effects.recurring.as_ref()?;
    let gain = DiceFormula::parse(&spec.formula)
        .map(|f| f.max() > 0)
        .unwrap_or(false);
    let polarity = if gain != spec.resource.is_harmful() {
        Polarity::Positive
    } else {
        Polarity::Negative
    };
    Some(
        Badge::new(
            format!(
                "{}: {} {} per turn for {} turns",
                spec.name, spec.formula, spec.resource, spec.duration
            ),
            polarity,
        )
        .with_icon("ongoing"),
    )
}

pub struct OutcomePipeline {
    catalog: Arc<EventCatalog>,
    registry: CommandRegistry,
    store: Arc<StateStore>,
    config: ResolutionConfig,
    observers: ObserverRegistry,
    next_instance: AtomicU64,
}

impl OutcomePipeline {
    /// Build a pipeline, failing if the catalog uses a command kind the
    /// registry cannot dispatch.
    pub fn new(
        catalog: Arc<EventCatalog>,
        registry: CommandRegistry,
        store: Arc<StateStore>,
        config: ResolutionConfig,
    ) -> std::result::Result<Self, CatalogError> {
        registry.ensure_covers(&catalog)?;
        Ok(Self {
            catalog,
            registry,
            store,
            config,
            observers: ObserverRegistry::new(),
            next_instance: AtomicU64::new(1),
        })
    }

    /// Pipeline with every built-in handler registered.
    pub fn with_defaults(
        catalog: Arc<EventCatalog>,
        store: Arc<StateStore>,
        config: ResolutionConfig,
    ) -> std::result::Result<Self, CatalogError> {
        let registry = CommandRegistry::with_default_handlers(&config);
        Self::new(catalog, registry, store, config)
    }

    pub fn register_observer(&mut self, observer: Box<dyn ResolutionObserver>) {
        self.observers.register(observer);
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    fn event(&self, id: &str) -> Result<&EventDefinition> {
        self.catalog
            .get(id)
            .ok_or_else(|| ResolutionError::UnknownEvent(id.to_string()))
    }

    fn allocate_id(&self) -> InstanceId {
        InstanceId(self.next_instance.fetch_add(1, Ordering::Relaxed))
    }

    /// Effects for the instance's (approach, outcome).
    fn effects(&self, instance: &EventInstance) -> Result<&OutcomeEffects> {
        let event = self.event(&instance.event_id)?;
        let tier = instance.outcome.ok_or(ResolutionError::OutcomeRequired)?;
        let table = match (instance.approach, event.table_for(instance.approach)) {
            (_, Some(table)) => table,
            (None, None) => return Err(ResolutionError::ApproachRequired),
            (Some(approach), None) => {
                return Err(ResolutionError::UnknownApproach {
                    event: event.id.clone(),
                    approach,
                })
            }
        };
        table.get(tier).ok_or_else(|| ResolutionError::NoOutcomeDefined {
            event: event.id.clone(),
            tier,
        })
    }

    /// Start a new instance. Events without approaches skip straight to
    /// `ApproachSelected`.
    pub fn trigger(&self, event_id: &str, turn: u32) -> Result<EventInstance> {
        let event = self.event(event_id)?;
        let status = if event.has_approaches() {
            InstanceStatus::Created
        } else {
            InstanceStatus::ApproachSelected
        };
        let instance = EventInstance::new(self.allocate_id(), event_id, turn, status);
        log::info!(
            "Triggered {} '{}' on turn {} ({})",
            instance.id,
            event_id,
            turn,
            status
        );
        Ok(instance)
    }

    pub fn select_approach(&self, instance: &mut EventInstance, approach: Approach) -> Result<()> {
        if let Some(current) = instance.approach {
            return Err(ResolutionError::ApproachLocked(current));
        }
        if instance.status != InstanceStatus::Created {
            return Err(instance.invalid("select an approach"));
        }
        let event = self.event(&instance.event_id)?;
        if event.approach(approach).is_none() {
            return Err(ResolutionError::UnknownApproach {
                event: event.id.clone(),
                approach,
            });
        }
        instance.approach = Some(approach);
        instance.status = InstanceStatus::ApproachSelected;
        log::debug!("{} approach: {}", instance.id, approach);
        Ok(())
    }

    /// Record the skill check result. Set once; repeating the same tier is
    /// accepted.
    pub fn record_outcome(&self, instance: &mut EventInstance, tier: OutcomeTier) -> Result<()> {
        if instance.status.is_terminal() {
            return Err(instance.invalid("record an outcome"));
        }
        match instance.outcome {
            Some(current) if current == tier => return Ok(()),
            Some(current) => return Err(ResolutionError::OutcomeLocked(current)),
            None => {}
        }
        if instance.status == InstanceStatus::Created {
            return Err(ResolutionError::ApproachRequired);
        }
        instance.outcome = Some(tier);
        log::debug!("{} outcome: {}", instance.id, tier);
        Ok(())
    }

    /// Compute the badges for the recorded outcome without touching the
    /// store. Idempotent: draws are remembered in the instance scratch.
    #[instrument(skip_all, name = "preview")]
    pub fn preview(
        &self,
        instance: &mut EventInstance,
        dice: &mut dyn DiceRoller,
    ) -> Result<Preview> {
        match instance.status {
            InstanceStatus::Created => return Err(ResolutionError::ApproachRequired),
            status if status.is_terminal() => return Err(instance.invalid("preview")),
            _ => {}
        }
        let effects = self.effects(instance)?;
        let tier = instance.outcome.ok_or(ResolutionError::OutcomeRequired)?;
        let snapshot = self.store.snapshot();

        let mut badges = Vec::new();
        let mut warnings = Vec::new();

        let mut deltas = Vec::with_capacity(effects.modifiers.len());
        for (index, delta) in effects.modifiers.iter().enumerate() {
            let amount = match &delta.amount {
                Amount::Flat(value) => *value,
                Amount::Formula(_) => match instance.scratch.static_roll(index) {
                    Some(rolled) => rolled,
                    None => {
                        let rolled = delta.amount.resolve(dice)?;
                        instance.scratch.set_static_roll(index, rolled);
                        rolled
                    }
                },
            };
            if amount != 0 {
                badges.push(delta_badge(delta.resource, amount));
                deltas.push((delta.resource, amount));
            }
        }

        let pending = match &effects.interaction {
            Some(spec) if instance.resolution.is_empty() => Some(InteractionGate::request(
                instance.id,
                &instance.event_id,
                spec,
            )),
            _ => None,
        };

        let mut prepared = Vec::with_capacity(effects.commands.len());
        for (slot, command) in effects.commands.iter().enumerate() {
            let mut ctx = HandlerContext {
                state: &snapshot,
                outcome: tier,
                approach: instance.approach,
                event_id: &instance.event_id,
                slot,
                scratch: &mut instance.scratch,
                resolution: &instance.resolution,
                dice: &mut *dice,
                warnings: &mut warnings,
            };
            if let Some(command) = self.registry.dispatch(command, &mut ctx)? {
                badges.extend(command.badges.iter().cloned());
                prepared.push(command);
            }
        }

        badges.extend(recurring_badge(effects));

        let blocked = pending.is_some()
            && effects
                .interaction
                .as_ref()
                .is_some_and(|spec| spec.required);
        instance.status = if blocked {
            InstanceStatus::InteractionPending
        } else {
            InstanceStatus::Previewed
        };
        instance.prepared = prepared;
        instance.deltas = deltas;
        instance.pending = pending.clone();

        let preview = Preview {
            badges,
            warnings,
            interaction: pending,
        };
        log::debug!(
            "{} previewed {} badges ({})",
            instance.id,
            preview.badges.len(),
            instance.status
        );
        instance.preview = Some(preview.clone());
        Ok(preview)
    }

    /// Validate a selection against the current state and, if it passes,
    /// attach it and re-run the preview.
    #[instrument(skip_all, name = "submit_selection")]
    pub fn submit_selection(
        &self,
        instance: &mut EventInstance,
        selection: &Selection,
        dice: &mut dyn DiceRoller,
    ) -> Result<Preview> {
        if instance.status.is_terminal() {
            return Err(instance.invalid("submit a selection"));
        }
        let request = instance
            .pending
            .clone()
            .ok_or(ResolutionError::NoInteraction)?;

        let fresh = self.store.snapshot();
        match InteractionGate::validate(&request, &fresh, selection) {
            Ok(data) => {
                log::info!("{} selection accepted: {:?}", instance.id, data.selected_hexes);
                instance.resolution = data;
                self.preview(instance, dice)
            }
            Err(rejection) => {
                log::warn!("{} selection rejected: {}", instance.id, rejection);
                Err(ResolutionError::SelectionRejected(rejection))
            }
        }
    }

    /// Commit the previewed effects, apply static deltas and register any
    /// recurring modifier.
    #[instrument(skip_all, name = "execute")]
    pub fn execute(&self, instance: &mut EventInstance) -> Result<ExecutionReport> {
        match instance.status {
            InstanceStatus::Previewed => {}
            InstanceStatus::InteractionPending => {
                return Err(ResolutionError::InteractionPending)
            }
            _ => return Err(instance.invalid("execute")),
        }
        let effects = self.effects(instance)?;
        let tier = instance.outcome.ok_or(ResolutionError::OutcomeRequired)?;

        let mut failures = Vec::new();
        let mut skipped = Vec::new();
        for command in instance.prepared.iter_mut() {
            let stop = !failures.is_empty()
                && self.config.commit_failure_policy == CommitFailurePolicy::StopOnFirstError;
            if stop {
                skipped.push(command.kind);
                continue;
            }
            if let Err(e) = command.commit(&self.store) {
                log::error!(
                    "{} '{}': {} failed to commit: {}",
                    instance.id,
                    instance.event_id,
                    command.kind,
                    e
                );
                failures.push(CommitFailure {
                    kind: command.kind,
                    reason: e.to_string(),
                });
            }
        }
        instance.prepared.clear();

        let deltas = std::mem::take(&mut instance.deltas);
        let event_id = instance.event_id.clone();
        let modifier = self.store.apply(|state| {
            for (resource, amount) in &deltas {
                state.adjust_resource(*resource, *amount);
            }
            effects
                .recurring
                .as_ref()
                .and_then(|spec| modifiers::register(state, spec, &event_id))
        });

        instance.status = match (effects.ends_event, failures.is_empty()) {
            (true, true) => InstanceStatus::Committed,
            (true, false) => InstanceStatus::CommittedWithErrors,
            (false, true) => InstanceStatus::Ongoing,
            (false, false) => InstanceStatus::OngoingWithErrors,
        };

        let preview = instance.preview.clone().unwrap_or_default();
        let report = ExecutionReport {
            instance: instance.id,
            event_id,
            turn: instance.turn,
            approach: instance.approach,
            outcome: tier,
            status: instance.status,
            badges: preview.badges,
            warnings: preview.warnings,
            failures,
            skipped,
            modifier,
        };
        log::info!(
            "{} '{}' resolved as {} ({} failures)",
            report.instance,
            report.event_id,
            report.status,
            report.failures.len()
        );

        self.observers
            .notify(&ResolutionEvent::Resolved(report.clone()), &self.store.snapshot());
        Ok(report)
    }

    /// Start next turn's instance of an ongoing event.
    pub fn retrigger(&self, previous: &EventInstance, turn: u32) -> Result<EventInstance> {
        if !previous.status.is_ongoing() {
            return Err(previous.invalid("retrigger"));
        }
        let event = self.event(&previous.event_id)?;
        let keep_approach = !self.config.reselect_approach_on_retrigger;

        let mut instance = EventInstance::new(
            self.allocate_id(),
            &previous.event_id,
            turn,
            InstanceStatus::ApproachSelected,
        );
        if event.has_approaches() {
            if keep_approach && previous.approach.is_some() {
                instance.approach = previous.approach;
            } else {
                instance.status = InstanceStatus::Created;
            }
        }
        log::info!(
            "{} '{}' continues as {} on turn {} ({})",
            previous.id,
            previous.event_id,
            instance.id,
            turn,
            instance.status
        );
        Ok(instance)
    }

    /// Drop an unfinished instance. Nothing reaches the store.
    pub fn abandon(&self, instance: &mut EventInstance) -> Result<()> {
        if instance.status.is_terminal() {
            return Err(instance.invalid("abandon"));
        }
        instance.prepared.clear();
        instance.deltas.clear();
        instance.status = InstanceStatus::Abandoned;
        log::info!("{} '{}' abandoned", instance.id, instance.event_id);

        self.observers.notify(
            &ResolutionEvent::Abandoned {
                instance: instance.id,
                event_id: instance.event_id.clone(),
                turn: instance.turn,
            },
            &self.store.snapshot(),
        );
        Ok(())
    }

    /// Advance the recurring modifier ledger by one turn.
    pub fn advance_turn(
        &self,
        dice: &mut dyn DiceRoller,
    ) -> std::result::Result<Vec<AppliedModifier>, crate::error::DiceError> {
        modifiers::advance_turn(&self.store, dice)
    }
}
