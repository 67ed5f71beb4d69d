//! Faction attitude shifts along the bounded Hostile..Helpful ladder.

use super::{mismatch, Command, CommandHandler, CommandKind, HandlerContext, PreparedCommand};
use crate::dice::pick_distinct;
use crate::error::{CommitError, ResolutionError};
use crate::outcome::{Badge, Polarity};
use crate::scratch::SlotScratch;
use crate::state::{Faction, FactionId};

pub struct FactionAttitudeHandler;

impl FactionAttitudeHandler {
    fn targets(
        ctx: &mut HandlerContext<'_>,
        steps: i32,
        count: u32,
        faction: Option<&FactionId>,
    ) -> Vec<FactionId> {
        let state = ctx.state;

        if let Some(id) = faction {
            return match state.factions.get(id) {
                None => {
                    ctx.warn(format!("Faction '{id}' does not exist"));
                    Vec::new()
                }
                Some(f) if !f.attitude.can_shift(steps) => {
                    ctx.warn(format!("{} is already {}", f.name, f.attitude));
                    Vec::new()
                }
                Some(f) => vec![f.id.clone()],
            };
        }

        let eligible: Vec<&Faction> = state
            .factions
            .values()
            .filter(|f| f.attitude.can_shift(steps))
            .collect();
        if eligible.is_empty() {
            ctx.warn("No faction can change its attitude that way");
            return Vec::new();
        }

        if let Some(SlotScratch::Factions { ids }) = ctx.remembered() {
            if !ids.is_empty() && ids.iter().all(|id| eligible.iter().any(|f| &f.id == id)) {
                return ids.clone();
            }
        }

        let ids: Vec<FactionId> = pick_distinct(&mut *ctx.dice, eligible.len(), count as usize)
            .into_iter()
            .map(|i| eligible[i].id.clone())
            .collect();
        if ids.is_empty() {
            ctx.warn("No faction drawn to change attitude");
            return ids;
        }
        ctx.remember(SlotScratch::Factions { ids: ids.clone() });
        ids
    }
}

impl CommandHandler for FactionAttitudeHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::AdjustFactionAttitude {
            steps,
            count,
            faction,
        } = command
        else {
            return Err(mismatch(CommandKind::AdjustFactionAttitude, command));
        };
        let steps = *steps;
        if steps == 0 || *count == 0 {
            return Ok(None);
        }

        let ids = Self::targets(ctx, steps, *count, faction.as_ref());
        if ids.is_empty() {
            ctx.forget();
            return Ok(None);
        }

        let polarity = if steps > 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        };
        let state = ctx.state;
        let badges = ids
            .iter()
            .filter_map(|id| state.factions.get(id))
            .map(|f| {
                Badge::new(
                    format!("{}: {} → {}", f.name, f.attitude, f.attitude.shifted(steps)),
                    polarity,
                )
                .with_icon("faction")
            })
            .collect();

        Ok(Some(PreparedCommand::new(
            CommandKind::AdjustFactionAttitude,
            badges,
            move |kingdom| {
                for id in &ids {
                    let faction = kingdom
                        .factions
                        .get_mut(id)
                        .ok_or_else(|| CommitError::TargetMissing(format!("faction {id}")))?;
                    faction.attitude = faction.attitude.shifted(steps);
                }
                Ok(())
            },
        )))
    }
}
