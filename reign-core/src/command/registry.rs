use super::{
    ArmyConditionHandler, ClaimHexesHandler, Command, CommandHandler, CommandKind,
    ConvertUnrestHandler, CreateWorksiteHandler, DamageStructureHandler, DestroyStructureHandler,
    EquipArmyHandler, FactionAttitudeHandler, HandlerContext, PreparedCommand,
};
use crate::catalog::EventCatalog;
use crate::config::ResolutionConfig;
use crate::error::{CatalogError, ResolutionError};
use rustc_hash::FxHashMap;

/// Dispatch table from command kind to handler.
///
/// Handlers are stored as trait objects, registered once at startup.
pub struct CommandRegistry {
    handlers: FxHashMap<CommandKind, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: FxHashMap::default(),
        }
    }

    /// Registry with every built-in handler.
    pub fn with_default_handlers(config: &ResolutionConfig) -> Self {
        let mut registry = Self::new();
        registry.register(CommandKind::DamageStructure, Box::new(DamageStructureHandler));
        registry.register(CommandKind::DestroyStructure, Box::new(DestroyStructureHandler));
        registry.register(
            CommandKind::ConvertUnrestToImprisoned,
            Box::new(ConvertUnrestHandler),
        );
        registry.register(
            CommandKind::AdjustFactionAttitude,
            Box::new(FactionAttitudeHandler),
        );
        registry.register(
            CommandKind::ApplyArmyCondition,
            Box::new(ArmyConditionHandler::new(config.max_condition_severity)),
        );
        registry.register(CommandKind::EquipArmy, Box::new(EquipArmyHandler));
        registry.register(CommandKind::ClaimHexes, Box::new(ClaimHexesHandler));
        registry.register(CommandKind::CreateWorksite, Box::new(CreateWorksiteHandler));
        registry
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register(&mut self, kind: CommandKind, handler: Box<dyn CommandHandler>) {
        if self.handlers.insert(kind, handler).is_some() {
            log::warn!("Replaced handler for command kind '{}'", kind);
        } else {
            log::debug!("Registered handler for command kind '{}'", kind);
        }
    }

    pub fn contains(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Prepare `command` with its registered handler.
    ///
    /// A missing handler is a configuration error and is returned
    /// immediately; `Ok(None)` means the command has nothing to do.
    pub fn dispatch(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let kind = command.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or(ResolutionError::UnregisteredCommand(kind))?;
        handler.prepare(command, ctx)
    }

    /// Fail fast if any command in the catalog has no handler.
    pub fn ensure_covers(&self, catalog: &EventCatalog) -> Result<(), CatalogError> {
        for event in catalog.events() {
            for command in event.commands() {
                if !self.contains(command.kind()) {
                    return Err(CatalogError::MissingHandler {
                        event: event.id.clone(),
                        kind: command.kind(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::ResolutionData;
    use crate::outcome::OutcomeTier;
    use crate::scratch::InstanceScratch;
    use crate::testing::{sample_catalog, KingdomStateBuilder, ScriptedRoller};

    #[test]
    fn test_default_registry_covers_every_kind() {
        let registry = CommandRegistry::with_default_handlers(&ResolutionConfig::default());
        assert_eq!(registry.len(), CommandKind::ALL.len());
        for kind in CommandKind::ALL {
            assert!(registry.contains(kind), "missing {kind}");
        }
        assert!(registry.ensure_covers(&sample_catalog()).is_ok());
    }

    #[test]
    fn test_unregistered_kind_is_fatal() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());

        let state = KingdomStateBuilder::new().build();
        let mut scratch = InstanceScratch::default();
        let resolution = ResolutionData::default();
        let mut dice = ScriptedRoller::new([1]);
        let mut warnings = Vec::new();
        let mut ctx = HandlerContext {
            state: &state,
            outcome: OutcomeTier::Success,
            approach: None,
            event_id: "test",
            slot: 0,
            scratch: &mut scratch,
            resolution: &resolution,
            dice: &mut dice,
            warnings: &mut warnings,
        };

        let err = registry
            .dispatch(&Command::ClaimHexes, &mut ctx)
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UnregisteredCommand(CommandKind::ClaimHexes)
        );
    }

    #[test]
    fn test_ensure_covers_reports_missing_handler() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandKind::DamageStructure, Box::new(DamageStructureHandler));
        let err = registry.ensure_covers(&sample_catalog()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingHandler { .. }));
    }
}
