//! Scripted intents fed to the authority by the command-line driver.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use skirmish_core::{
    action::{GroundTargetAction, PickUpRuneAction, PurchaseItemAction, UnitTargetAction},
    catalog::{BASIC_ATTACK, DEMO_BLUE, DEMO_RED},
    AbilityId, CellCoord, ItemId, PlayerId, RuneId, ShopId, TurnAction, UnitId,
};

/// Single intent submitted on behalf of a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ScriptStep {
    /// Player submitting the intent.
    pub(crate) player: PlayerId,
    /// Intent in its wire form.
    pub(crate) action: TurnAction,
}

/// Reads a JSON array of steps from `path`.
pub(crate) fn load(path: &Path) -> Result<Vec<ScriptStep>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse script {}", path.display()))
}

fn parse(text: &str) -> Result<Vec<ScriptStep>> {
    Ok(serde_json::from_str(text)?)
}

fn step(player: PlayerId, action: TurnAction) -> ScriptStep {
    ScriptStep { player, action }
}

fn attack(unit: u32, target: u32) -> TurnAction {
    TurnAction::UnitTargetAbility(UnitTargetAction {
        unit_id: UnitId::new(unit),
        ability_id: BASIC_ATTACK,
        target_id: UnitId::new(target),
    })
}

/// Four rounds of skirmishing on the demo battlefield.
pub(crate) fn demo() -> Vec<ScriptStep> {
    let butcher = UnitId::new(1);
    let sorcerer = UnitId::new(2);
    let warden = UnitId::new(3);
    let creep = UnitId::new(4);
    vec![
        step(DEMO_RED, TurnAction::move_unit(butcher, CellCoord::new(1, 4))),
        step(
            DEMO_RED,
            TurnAction::PickUpRune(PickUpRuneAction {
                unit_id: sorcerer,
                rune_id: RuneId::new(1),
            }),
        ),
        step(
            DEMO_RED,
            TurnAction::PurchaseItem(PurchaseItemAction {
                unit_id: butcher,
                shop_id: ShopId::new(1),
                item_id: ItemId::new(2),
            }),
        ),
        step(DEMO_RED, TurnAction::end_turn()),
        step(DEMO_BLUE, TurnAction::move_unit(creep, CellCoord::new(1, 5))),
        step(DEMO_BLUE, attack(4, 1)),
        step(
            DEMO_BLUE,
            TurnAction::UnitTargetAbility(UnitTargetAction {
                unit_id: warden,
                ability_id: AbilityId::new(2),
                target_id: butcher,
            }),
        ),
        step(DEMO_BLUE, TurnAction::end_turn()),
        step(DEMO_RED, attack(1, 4)),
        step(
            DEMO_RED,
            TurnAction::GroundTargetAbility(GroundTargetAction {
                unit_id: sorcerer,
                ability_id: AbilityId::new(1),
                target: CellCoord::new(3, 5),
            }),
        ),
        step(DEMO_RED, TurnAction::end_turn()),
        step(DEMO_BLUE, attack(4, 1)),
        step(DEMO_BLUE, TurnAction::end_turn()),
        step(DEMO_RED, attack(1, 4)),
        step(DEMO_RED, TurnAction::end_turn()),
        step(DEMO_BLUE, attack(4, 1)),
        step(DEMO_BLUE, TurnAction::end_turn()),
        step(
            DEMO_RED,
            TurnAction::GroundTargetAbility(GroundTargetAction {
                unit_id: butcher,
                ability_id: AbilityId::new(1),
                target: CellCoord::new(1, 5),
            }),
        ),
        step(DEMO_RED, TurnAction::end_turn()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_from_the_wire_form() {
        let steps = parse(
            r#"[
                { "player": 1, "action": { "type": 1 } },
                { "player": 2, "action": { "type": 0, "unit_id": 4, "to": { "column": 1, "row": 5 } } }
            ]"#,
        )
        .expect("script parses");

        assert_eq!(
            steps,
            vec![
                step(DEMO_RED, TurnAction::end_turn()),
                step(DEMO_BLUE, TurnAction::move_unit(UnitId::new(4), CellCoord::new(1, 5))),
            ]
        );
    }

    #[test]
    fn demo_script_survives_its_own_wire_form() {
        let text = serde_json::to_string(&demo()).expect("serialize script");
        assert_eq!(parse(&text).expect("script parses"), demo());
    }

    #[test]
    fn unknown_action_tags_are_rejected() {
        assert!(parse(r#"[{ "player": 1, "action": { "type": 99 } }]"#).is_err());
    }
}
