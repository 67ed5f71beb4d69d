//! Structure damage and destruction.

use super::{mismatch, Command, CommandHandler, CommandKind, HandlerContext, PreparedCommand};
use crate::dice::pick_distinct;
use crate::error::{CommitError, ResolutionError};
use crate::outcome::Badge;
use crate::scratch::SlotScratch;
use crate::state::{Structure, StructureId};

/// Pick `count` structures among `eligible`, reusing an earlier pick when
/// every remembered structure is still eligible.
fn choose_structures(
    ctx: &mut HandlerContext<'_>,
    eligible: &[&Structure],
    count: u32,
) -> Vec<StructureId> {
    if let Some(SlotScratch::Structures { ids }) = ctx.remembered() {
        if !ids.is_empty() && ids.iter().all(|id| eligible.iter().any(|s| s.id == *id)) {
            return ids.clone();
        }
    }

    let ids: Vec<StructureId> = pick_distinct(&mut *ctx.dice, eligible.len(), count as usize)
        .into_iter()
        .map(|i| eligible[i].id)
        .collect();
    ctx.remember(SlotScratch::Structures { ids: ids.clone() });
    ids
}

fn describe(structure: &Structure) -> String {
    format!("{} in {}", structure.name, structure.settlement)
}

pub struct DamageStructureHandler;

impl CommandHandler for DamageStructureHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::DamageStructure { count, amount } = command else {
            return Err(mismatch(CommandKind::DamageStructure, command));
        };
        let amount = (*amount).max(1);
        let state = ctx.state;

        let eligible = state.damageable_structures();
        if eligible.is_empty() || *count == 0 {
            ctx.forget();
            ctx.warn("No intact structures to damage");
            return Ok(None);
        }

        let ids = choose_structures(ctx, &eligible, *count);
        if ids.is_empty() {
            ctx.forget();
            ctx.warn("No structure drawn to damage");
            return Ok(None);
        }
        let badges = ids
            .iter()
            .filter_map(|id| state.structures.get(id))
            .map(|s| Badge::negative(format!("{} is damaged", describe(s))).with_icon("structure"))
            .collect();

        Ok(Some(PreparedCommand::new(
            CommandKind::DamageStructure,
            badges,
            move |kingdom| {
                for id in &ids {
                    let structure = kingdom
                        .structures
                        .get_mut(id)
                        .ok_or_else(|| CommitError::TargetMissing(format!("structure {id}")))?;
                    structure.hit_points.add(-amount);
                }
                Ok(())
            },
        )))
    }
}

pub struct DestroyStructureHandler;

impl CommandHandler for DestroyStructureHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::DestroyStructure { count } = command else {
            return Err(mismatch(CommandKind::DestroyStructure, command));
        };

        let state = ctx.state;
        let eligible: Vec<&Structure> = state.structures.values().collect();
        if eligible.is_empty() || *count == 0 {
            ctx.forget();
            ctx.warn("No structures to destroy");
            return Ok(None);
        }

        let ids = choose_structures(ctx, &eligible, *count);
        if ids.is_empty() {
            ctx.forget();
            ctx.warn("No structure drawn to destroy");
            return Ok(None);
        }
        let badges = ids
            .iter()
            .filter_map(|id| state.structures.get(id))
            .map(|s| Badge::negative(format!("{} is destroyed", describe(s))).with_icon("structure"))
            .collect();

        Ok(Some(PreparedCommand::new(
            CommandKind::DestroyStructure,
            badges,
            move |kingdom| {
                for id in &ids {
                    kingdom
                        .structures
                        .remove(id)
                        .ok_or_else(|| CommitError::TargetMissing(format!("structure {id}")))?;
                }
                Ok(())
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::KingdomState;
    use crate::store::StateStore;
    use crate::testing::{HandlerHarness, KingdomStateBuilder, ScriptedRoller};

    fn town() -> KingdomState {
        KingdomStateBuilder::new()
            .with_structure(1, "Barracks", "Capital", 2)
            .with_structure(2, "Granary", "Capital", 1)
            .with_structure(3, "Shrine", "Tatzlford", 1)
            .build()
    }

    #[test]
    fn test_no_structures_is_a_no_op() {
        let mut harness = HandlerHarness::new(KingdomState::default(), ScriptedRoller::new([1]));
        let prepared = harness
            .prepare(&DamageStructureHandler, &Command::DamageStructure { count: 1, amount: 1 }, 0)
            .unwrap();
        assert!(prepared.is_none());
        assert_eq!(harness.warnings.len(), 1);
    }

    #[test]
    fn test_damage_targets_previewed_structure() {
        // 1d3 -> 2 picks the Granary.
        let mut harness = HandlerHarness::new(town(), ScriptedRoller::new([2]));
        let command = Command::DamageStructure { count: 1, amount: 1 };
        let mut prepared = harness.prepare(&DamageStructureHandler, &command, 0).unwrap().unwrap();
        assert_eq!(prepared.badges[0].text, "Granary in Capital is damaged");

        let store = StateStore::new(harness.state.clone());
        prepared.commit(&store).unwrap();
        let after = store.snapshot();
        assert!(after.structures[&2].is_damaged());
        assert!(!after.structures[&1].is_damaged());
    }

    #[test]
    fn test_repreview_reuses_choice() {
        let mut harness = HandlerHarness::new(town(), ScriptedRoller::new([3, 1, 1]));
        let command = Command::DamageStructure { count: 1, amount: 1 };
        let first = harness.prepare(&DamageStructureHandler, &command, 0).unwrap().unwrap();
        let second = harness.prepare(&DamageStructureHandler, &command, 0).unwrap().unwrap();
        assert_eq!(first.badges, second.badges);
        assert_eq!(
            harness.scratch.slot(0),
            Some(&SlotScratch::Structures { ids: vec![3] })
        );
    }

    #[test]
    fn test_damaged_structures_are_not_eligible() {
        let mut state = town();
        state.structures.get_mut(&1).unwrap().hit_points.set(0);
        state.structures.get_mut(&2).unwrap().hit_points.set(0);
        let mut harness = HandlerHarness::new(state, ScriptedRoller::new([1]));
        let prepared = harness
            .prepare(&DamageStructureHandler, &Command::DamageStructure { count: 2, amount: 1 }, 0)
            .unwrap()
            .unwrap();
        assert_eq!(prepared.badges.len(), 1);
        assert!(prepared.badges[0].text.starts_with("Shrine"));
    }

    #[test]
    fn test_large_settlement_still_yields_a_target() {
        let mut builder = KingdomStateBuilder::new();
        for id in 1..=1001 {
            builder = builder.with_structure(id, "House", "Capital", 1);
        }
        let mut harness = HandlerHarness::new(builder.build(), ScriptedRoller::default());
        let command = Command::DamageStructure { count: 1, amount: 1 };
        let prepared = harness.prepare(&DamageStructureHandler, &command, 0).unwrap().unwrap();
        assert_eq!(prepared.badges.len(), 1);
        assert!(harness.warnings.is_empty());
        assert_eq!(
            harness.scratch.slot(0),
            Some(&SlotScratch::Structures { ids: vec![1] })
        );
    }

    #[test]
    fn test_destroy_removes_and_reports_missing_target() {
        let mut harness = HandlerHarness::new(town(), ScriptedRoller::new([1]));
        let command = Command::DestroyStructure { count: 1 };
        let mut prepared = harness.prepare(&DestroyStructureHandler, &command, 0).unwrap().unwrap();

        let mut gone = town();
        gone.structures.remove(&1);
        let store = StateStore::new(gone);
        assert_eq!(
            prepared.commit(&store),
            Err(CommitError::TargetMissing("structure 1".to_string()))
        );

        let mut again = harness.prepare(&DestroyStructureHandler, &command, 0).unwrap().unwrap();
        let store = StateStore::new(town());
        again.commit(&store).unwrap();
        assert!(!store.snapshot().structures.contains_key(&1));
    }
}
