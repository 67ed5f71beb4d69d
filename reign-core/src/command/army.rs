//! Army conditions and equipment.
//!
//! Only armies with a backing actor that the players control can receive
//! these effects.

use super::{mismatch, Command, CommandHandler, CommandKind, HandlerContext, PreparedCommand};
use crate::bounded::new_severity;
use crate::error::{CommitError, ResolutionError};
use crate::outcome::{Badge, Polarity};
use crate::scratch::SlotScratch;
use crate::state::{Army, ArmyId, Equipment, KingdomState};

fn live_army(kingdom: &mut KingdomState, id: ArmyId) -> Result<&mut Army, CommitError> {
    let army = kingdom
        .armies
        .get_mut(&id)
        .ok_or_else(|| CommitError::TargetMissing(format!("army {id}")))?;
    if !army.accepts_effects() {
        return Err(CommitError::TargetIneligible(format!(
            "army {id} lost its actor or player control"
        )));
    }
    Ok(army)
}

fn lacks(army: &Army, item: Equipment) -> bool {
    !army.equipment.contains(&item)
}

pub struct ArmyConditionHandler {
    max_severity: i32,
}

impl ArmyConditionHandler {
    pub fn new(max_severity: i32) -> Self {
        Self {
            max_severity: max_severity.max(1),
        }
    }
}

impl CommandHandler for ArmyConditionHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::ApplyArmyCondition {
            condition,
            amount,
            beneficial,
        } = command
        else {
            return Err(mismatch(CommandKind::ApplyArmyCondition, command));
        };
        let amount = (*amount).max(1);
        let state = ctx.state;

        let eligible = state.effect_eligible_armies();
        if eligible.is_empty() {
            ctx.forget();
            ctx.warn(format!("No player army can receive {condition}"));
            return Ok(None);
        }

        let remembered = match ctx.remembered() {
            Some(SlotScratch::Army { army }) if eligible.iter().any(|a| a.id == *army) => {
                Some(*army)
            }
            _ => None,
        };
        let army_id = match remembered {
            Some(id) => id,
            None => {
                let Some(index) = ctx.dice.pick(eligible.len()) else {
                    ctx.forget();
                    ctx.warn(format!("No army drawn to receive {condition}"));
                    return Ok(None);
                };
                let id = eligible[index].id;
                ctx.remember(SlotScratch::Army { army: id });
                id
            }
        };

        let cap = self.max_severity;
        let Some(army) = state.armies.get(&army_id) else {
            return Ok(None);
        };
        let text = match army.conditions.get(condition) {
            Some(current) => format!(
                "{}: {} {} → {}",
                army.name,
                condition,
                current.get(),
                current.shifted(amount).get()
            ),
            None => format!(
                "{} gains {} {}",
                army.name,
                condition,
                new_severity(amount, cap).get()
            ),
        };
        let polarity = if *beneficial {
            Polarity::Positive
        } else {
            Polarity::Negative
        };

        let condition = condition.clone();
        Ok(Some(PreparedCommand::new(
            CommandKind::ApplyArmyCondition,
            vec![Badge::new(text, polarity).with_icon("army")],
            move |kingdom| {
                let army = live_army(kingdom, army_id)?;
                match army.conditions.get_mut(&condition) {
                    Some(severity) => severity.add(amount),
                    None => {
                        army.conditions
                            .insert(condition, new_severity(amount, cap));
                    }
                }
                Ok(())
            },
        )))
    }
}

pub struct EquipArmyHandler;

impl CommandHandler for EquipArmyHandler {
    fn prepare(
        &self,
        command: &Command,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<Option<PreparedCommand>, ResolutionError> {
        let Command::EquipArmy { equipment } = command else {
            return Err(mismatch(CommandKind::EquipArmy, command));
        };
        let state = ctx.state;

        let eligible: Vec<&Army> = state
            .effect_eligible_armies()
            .into_iter()
            .filter(|a| match equipment {
                Some(item) => lacks(a, *item),
                None => !a.missing_equipment().is_empty(),
            })
            .collect();
        if eligible.is_empty() {
            ctx.forget();
            ctx.warn("No player army can be outfitted");
            return Ok(None);
        }

        let remembered = match ctx.remembered() {
            Some(SlotScratch::Equipment { army, equipment: item })
                if eligible.iter().any(|a| a.id == *army && lacks(a, *item))
                    && equipment.map_or(true, |e| e == *item) =>
            {
                Some((*army, *item))
            }
            _ => None,
        };
        let (army_id, item) = match remembered {
            Some(choice) => choice,
            None => {
                let drawn = ctx.dice.pick(eligible.len()).and_then(|index| {
                    let army = eligible[index];
                    let item = match equipment {
                        Some(item) => *item,
                        None => {
                            let missing = army.missing_equipment();
                            missing[ctx.dice.pick(missing.len())?]
                        }
                    };
                    Some((army, item))
                });
                let Some((army, item)) = drawn else {
                    ctx.forget();
                    ctx.warn("No army drawn to outfit");
                    return Ok(None);
                };
                ctx.remember(SlotScratch::Equipment {
                    army: army.id,
                    equipment: item,
                });
                (army.id, item)
            }
        };

        let name = state
            .armies
            .get(&army_id)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        let badge = Badge::positive(format!("{name} is outfitted with {item}")).with_icon("army");

        Ok(Some(PreparedCommand::new(
            CommandKind::EquipArmy,
            vec![badge],
            move |kingdom| {
                live_army(kingdom, army_id)?.equipment.insert(item);
                Ok(())
            },
        )))
    }
}
