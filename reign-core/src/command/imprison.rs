//! Unrest to imprisoned conversion.
//!
//! The amount moved can never exceed the unrest available, both when the
//! badge is computed and again at commit time against the live state.

use super::{mismatch, Command, CommandHandler, CommandKind, HandlerContext, PreparedCommand};
use crate::error::ResolutionError;
use crate::outcome::Badge;
use crate::scratch::SlotScratch;
use crate::state::{KingdomState, Resource};

/// Move up to `amount` unrest into imprisoned. Returns the amount moved.
pub fn imprison_unrest(state: &mut KingdomState, amount: i32) -> i32 {
    let moved = amount.clamp(0, state.resource(Resource::Unrest).max(0));
    state.adjust_resource(Resource::Unrest, -moved);
    state.adjust_resource(Resource::Imprisoned, moved);
    moved
}

pub struct ConvertUnrestHandler;

impl CommandHandler for ConvertUnrestHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::ConvertUnrestToImprisoned { dice } = command else {
            return Err(mismatch(CommandKind::ConvertUnrestToImprisoned, command));
        };

        let rolled = match ctx.remembered() {
            Some(SlotScratch::Imprison { rolled }) => *rolled,
            _ => {
                let rolled = ctx.dice.roll(dice)?;
                ctx.remember(SlotScratch::Imprison { rolled });
                rolled
            }
        };

        let unrest = ctx.state.resource(Resource::Unrest).max(0);
        let amount = rolled.clamp(0, unrest);
        if amount == 0 {
            ctx.warn(if unrest == 0 {
                "No unrest to imprison".to_string()
            } else {
                format!("Rolled {rolled} on {dice}; nobody is imprisoned")
            });
            return Ok(None);
        }

        let badge = Badge::positive(format!("Imprison {amount} unrest")).with_icon("imprisoned");
        Ok(Some(PreparedCommand::new(
            CommandKind::ConvertUnrestToImprisoned,
            vec![badge],
            move |kingdom| {
                let moved = imprison_unrest(kingdom, amount);
                if moved < amount {
                    log::warn!("Imprisoned {moved} of {amount} unrest; the rest was already gone");
                }
                Ok(())
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommitStatus;
    use crate::store::StateStore;
    use crate::testing::{HandlerHarness, KingdomStateBuilder, ScriptedRoller};
    use proptest::prelude::*;

    fn kingdom(unrest: i32, imprisoned: i32) -> KingdomState {
        KingdomStateBuilder::new()
            .with_resource(Resource::Unrest, unrest)
            .with_resource(Resource::Imprisoned, imprisoned)
            .build()
    }

    fn command(dice: &str) -> Command {
        Command::ConvertUnrestToImprisoned {
            dice: dice.to_string(),
        }
    }

    #[test]
    fn test_roll_is_clamped_to_unrest() {
        let mut harness = HandlerHarness::new(kingdom(2, 1), ScriptedRoller::new([3]));
        let mut prepared = harness
            .prepare(&ConvertUnrestHandler, &command("1d3"), 0)
            .unwrap()
            .unwrap();
        assert_eq!(prepared.badges[0].text, "Imprison 2 unrest");

        let store = StateStore::new(harness.state.clone());
        assert_eq!(prepared.commit(&store), Ok(CommitStatus::Applied));
        assert_eq!(prepared.commit(&store), Ok(CommitStatus::AlreadyCommitted));

        let after = store.snapshot();
        assert_eq!(after.resource(Resource::Unrest), 0);
        assert_eq!(after.resource(Resource::Imprisoned), 3);
    }

    #[test]
    fn test_no_unrest_is_a_no_op() {
        let mut harness = HandlerHarness::new(kingdom(0, 0), ScriptedRoller::new([2]));
        assert!(harness
            .prepare(&ConvertUnrestHandler, &command("1d3"), 0)
            .unwrap()
            .is_none());
        assert_eq!(harness.warnings, vec!["No unrest to imprison".to_string()]);
    }

    #[test]
    fn test_commit_reclamps_against_live_state() {
        let mut harness = HandlerHarness::new(kingdom(4, 0), ScriptedRoller::new([4]));
        let mut prepared = harness
            .prepare(&ConvertUnrestHandler, &command("1d4"), 0)
            .unwrap()
            .unwrap();

        // Unrest dropped while the player was looking at the preview.
        let store = StateStore::new(kingdom(1, 0));
        prepared.commit(&store).unwrap();
        let after = store.snapshot();
        assert_eq!(after.resource(Resource::Unrest), 0);
        assert_eq!(after.resource(Resource::Imprisoned), 1);
    }

    #[test]
    fn test_bad_formula_surfaces() {
        let mut harness = HandlerHarness::new(kingdom(2, 0), ScriptedRoller::new([1]));
        let err = harness
            .prepare(&ConvertUnrestHandler, &command("a lot"), 0)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Dice(_)));
    }

    proptest! {
        #[test]
        fn prop_imprisonment_conserves_and_clamps(
            unrest in 0i32..20,
            imprisoned in 0i32..20,
            rolled in -5i32..30,
        ) {
            let mut state = kingdom(unrest, imprisoned);
            let moved = imprison_unrest(&mut state, rolled);
            let expected = rolled.max(0).min(unrest);
            prop_assert_eq!(moved, expected);
            prop_assert_eq!(state.resource(Resource::Unrest), unrest - expected);
            prop_assert_eq!(state.resource(Resource::Imprisoned), imprisoned + expected);
            prop_assert!(state.resource(Resource::Unrest) >= 0);
        }
    }
}
