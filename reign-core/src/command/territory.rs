//! Territory commands. Both consume hexes picked at the interaction gate;
//! without a validated selection they prepare nothing.

use super::{mismatch, Command, CommandHandler, CommandKind, HandlerContext, PreparedCommand};
use crate::error::{CommitError, ResolutionError};
use crate::outcome::Badge;
use crate::state::{Hex, HexId, KingdomState, WorksiteKind};

fn live_hex<'a>(kingdom: &'a mut KingdomState, id: &HexId) -> Result<&'a mut Hex, CommitError> {
    kingdom
        .hexes
        .get_mut(id)
        .ok_or_else(|| CommitError::TargetMissing(format!("hex {id}")))
}

pub struct ClaimHexesHandler;

impl CommandHandler for ClaimHexesHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::ClaimHexes = command else {
            return Err(mismatch(CommandKind::ClaimHexes, command));
        };
        if ctx.resolution.is_empty() {
            ctx.warn("Claim awaiting hex selection");
            return Ok(None);
        }

        let hexes: Vec<HexId> = ctx.resolution.selected_hexes.clone();
        let badges = hexes
            .iter()
            .map(|id| Badge::positive(format!("Claim hex {id}")).with_icon("hex"))
            .collect();

        Ok(Some(PreparedCommand::new(
            CommandKind::ClaimHexes,
            badges,
            move |kingdom| {
                for id in &hexes {
                    let hex = live_hex(kingdom, id)?;
                    if hex.claimed {
                        return Err(CommitError::TargetIneligible(format!(
                            "hex {id} was claimed in the meantime"
                        )));
                    }
                    hex.claimed = true;
                }
                Ok(())
            },
        )))
    }
}

pub struct CreateWorksiteHandler;

impl CommandHandler for CreateWorksiteHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::CreateWorksite { worksite } = command else {
            return Err(mismatch(CommandKind::CreateWorksite, command));
        };
        let state = ctx.state;
        let Some(id) = ctx.resolution.selected_hexes.first().cloned() else {
            ctx.warn("Worksite awaiting hex selection");
            return Ok(None);
        };
        let Some(hex) = state.hexes.get(&id) else {
            ctx.warn(format!("Hex {id} no longer exists"));
            return Ok(None);
        };

        let kind = match worksite {
            Some(kind) if kind.supports(hex.terrain) => *kind,
            Some(kind) => {
                ctx.warn(format!("A {kind} cannot be built on {:?} hex {id}", hex.terrain));
                return Ok(None);
            }
            None => match WorksiteKind::for_terrain(hex.terrain) {
                Some(kind) => kind,
                None => {
                    ctx.warn(format!("No worksite can be built on {:?} hex {id}", hex.terrain));
                    return Ok(None);
                }
            },
        };

        let badge = Badge::positive(format!("Build a {kind} on hex {id}")).with_icon("worksite");
        Ok(Some(PreparedCommand::new(
            CommandKind::CreateWorksite,
            vec![badge],
            move |kingdom| {
                let hex = live_hex(kingdom, &id)?;
                if !hex.claimed {
                    return Err(CommitError::TargetIneligible(format!(
                        "hex {id} is not part of the kingdom"
                    )));
                }
                if let Some(existing) = hex.worksite {
                    return Err(CommitError::TargetIneligible(format!(
                        "hex {id} already has a {existing}"
                    )));
                }
                hex.worksite = Some(kind);
                Ok(())
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::ResolutionData;
    use crate::state::Terrain;
    use crate::store::StateStore;
    use crate::testing::{HandlerHarness, KingdomStateBuilder, ScriptedRoller};

    fn borderland() -> KingdomState {
        KingdomStateBuilder::new()
            .with_hex("1.1", Terrain::Plains, true, &["1.2"])
            .with_hex("1.2", Terrain::Forest, false, &["1.1"])
            .with_hex("2.1", Terrain::Mountains, true, &[])
            .with_hex("2.2", Terrain::Lake, true, &[])
            .build()
    }

    fn selected(hexes: &[&str]) -> ResolutionData {
        ResolutionData {
            selected_hexes: hexes.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn test_claim_without_selection_is_pending() {
        let mut harness = HandlerHarness::new(borderland(), ScriptedRoller::new([1]));
        assert!(harness
            .prepare(&ClaimHexesHandler, &Command::ClaimHexes, 0)
            .unwrap()
            .is_none());
        assert!(harness.warnings[0].contains("awaiting"));
    }

    #[test]
    fn test_claim_selected_hex() {
        let mut harness = HandlerHarness::new(borderland(), ScriptedRoller::new([1]));
        harness.resolution = selected(&["1.2"]);
        let mut prepared = harness
            .prepare(&ClaimHexesHandler, &Command::ClaimHexes, 0)
            .unwrap()
            .unwrap();
        assert_eq!(prepared.badges[0].text, "Claim hex 1.2");

        let store = StateStore::new(borderland());
        prepared.commit(&store).unwrap();
        assert!(store.snapshot().hexes["1.2"].claimed);
    }

    #[test]
    fn test_claim_fails_if_taken_meanwhile() {
        let mut harness = HandlerHarness::new(borderland(), ScriptedRoller::new([1]));
        harness.resolution = selected(&["1.2"]);
        let mut prepared = harness
            .prepare(&ClaimHexesHandler, &Command::ClaimHexes, 0)
            .unwrap()
            .unwrap();

        let store = StateStore::new(borderland());
        store.apply(|s| s.hexes.get_mut("1.2").unwrap().claimed = true);
        assert!(matches!(
            prepared.commit(&store),
            Err(CommitError::TargetIneligible(_))
        ));
    }

    #[test]
    fn test_worksite_defaults_to_terrain() {
        let mut harness = HandlerHarness::new(borderland(), ScriptedRoller::new([1]));
        harness.resolution = selected(&["2.1"]);
        let mut prepared = harness
            .prepare(&CreateWorksiteHandler, &Command::CreateWorksite { worksite: None }, 0)
            .unwrap()
            .unwrap();
        assert_eq!(prepared.badges[0].text, "Build a mine on hex 2.1");

        let store = StateStore::new(borderland());
        prepared.commit(&store).unwrap();
        assert_eq!(store.snapshot().hexes["2.1"].worksite, Some(WorksiteKind::Mine));

        // A second commit of a fresh preparation hits the existing worksite.
        let mut again = harness
            .prepare(&CreateWorksiteHandler, &Command::CreateWorksite { worksite: None }, 0)
            .unwrap()
            .unwrap();
        assert!(again.commit(&store).is_err());
    }

    #[test]
    fn test_worksite_incompatible_terrain() {
        let mut harness = HandlerHarness::new(borderland(), ScriptedRoller::new([1]));
        harness.resolution = selected(&["2.2"]);
        assert!(harness
            .prepare(&CreateWorksiteHandler, &Command::CreateWorksite { worksite: None }, 0)
            .unwrap()
            .is_none());

        harness.resolution = selected(&["1.1"]);
        assert!(harness
            .prepare(
                &CreateWorksiteHandler,
                &Command::CreateWorksite {
                    worksite: Some(WorksiteKind::Mine)
                },
                0
            )
            .unwrap()
            .is_none());
        assert_eq!(harness.warnings.len(), 2);
    }
}
