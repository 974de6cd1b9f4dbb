//! Deterministic application of one delta to a battle.
//!
//! Every handler first resolves all references the delta carries and only
//! then mutates, so a delta is either applied completely or not at all.

use std::collections::BTreeSet;

use skirmish_core::{
    delta::{
        BlinkEffect, ConfigureGrid, DamageEffect, EndTurn, GameStart, GroundTargetAbility,
        HookEffect, ModifierApplied, ModifierRemoved, NoTargetAbility, PlayerJoin, PurchaseItem,
        RunePickUp, RuneSpawn, ShopSpawn, UnitAttack, UnitMove, UnitSpawn, UnitTargetAbility,
        UseHeroCard,
    },
    Ability, AbilityEffect, AbilityId, AppliedModifier, BattlePhase, CardId, CellCoord, Delta,
    GridSize, HealthChange, HookOutcome, ModifierApplication, ModifierChange, ModifierHandleId,
    Player, PlayerId, RuneEffect, RuneId, ShopId, Unit, UnitBlueprint, UnitField, UnitId,
};
use thiserror::Error;

use crate::{query, Battle, Grid};

/// Outcome of collapsing a single delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collapse {
    /// The delta was applied in full.
    Applied,
    /// The delta referenced state this battle does not hold and was skipped.
    Skipped(CollapseGap),
}

/// Referential gap that turns a delta into a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CollapseGap {
    /// No unit with the identifier exists.
    #[error("unit {0} is unknown")]
    UnknownUnit(UnitId),
    /// The unit is dead and cannot be relocated.
    #[error("unit {0} is dead")]
    DeadUnit(UnitId),
    /// A unit with the identifier already exists.
    #[error("unit {0} already exists")]
    DuplicateUnit(UnitId),
    /// No player with the identifier exists.
    #[error("player {0} is unknown")]
    UnknownPlayer(PlayerId),
    /// A player with the identifier already joined.
    #[error("player {0} already joined")]
    DuplicatePlayer(PlayerId),
    /// The unit has no ability with the identifier.
    #[error("unit {unit_id} has no ability {ability_id}")]
    UnknownAbility {
        /// Unit that was searched.
        unit_id: UnitId,
        /// Ability that was not found.
        ability_id: AbilityId,
    },
    /// No unit carries the modifier instance.
    #[error("modifier handle {0} is unknown")]
    UnknownModifier(ModifierHandleId),
    /// The modifier instance is already attached.
    #[error("modifier handle {0} is already attached")]
    DuplicateModifier(ModifierHandleId),
    /// No rune with the identifier lies on the grid.
    #[error("rune {0} is unknown")]
    UnknownRune(RuneId),
    /// A rune with the identifier already lies on the grid.
    #[error("rune {0} already exists")]
    DuplicateRune(RuneId),
    /// No shop with the identifier exists.
    #[error("shop {0} is unknown")]
    UnknownShop(ShopId),
    /// A shop with the identifier already exists.
    #[error("shop {0} already exists")]
    DuplicateShop(ShopId),
    /// The card is not in the player's hand.
    #[error("player {player_id} holds no card {card_id}")]
    UnknownCard {
        /// Player whose hand was searched.
        player_id: PlayerId,
        /// Card that was not found.
        card_id: CardId,
    },
    /// The cell lies outside the grid.
    #[error("cell {0:?} is outside the grid")]
    OutOfBounds(CellCoord),
    /// Another unit or rune already occupies the cell.
    #[error("cell {0:?} is occupied")]
    CellOccupied(CellCoord),
    /// The delta is only valid in another battle phase.
    #[error("delta is not valid during the {0:?} phase")]
    UnexpectedPhase(BattlePhase),
}

type Checked = Result<(), CollapseGap>;

/// Applies one delta to the battle and advances its head.
///
/// The head advances even when the delta is skipped so that replay never
/// stalls on an entity this battle legitimately lacks.
pub fn collapse(battle: &mut Battle, delta: &Delta) -> Collapse {
    let index = battle.delta_head;
    let outcome = match apply(battle, delta) {
        Ok(()) => {
            detect_game_over(battle);
            Collapse::Applied
        }
        Err(gap) => {
            tracing::warn!(
                delta_index = index,
                delta_type = delta.type_tag(),
                %gap,
                "skipping delta"
            );
            Collapse::Skipped(gap)
        }
    };
    battle.delta_head = battle.delta_head.saturating_add(1);
    outcome
}

fn apply(battle: &mut Battle, delta: &Delta) -> Checked {
    match delta {
        Delta::ConfigureGrid(configure) => configure_grid(battle, configure),
        Delta::PlayerJoin(join) => player_join(battle, join),
        Delta::UnitSpawn(spawn) => unit_spawn(battle, spawn),
        Delta::RuneSpawn(spawn) => rune_spawn(battle, spawn),
        Delta::ShopSpawn(spawn) => shop_spawn(battle, spawn),
        Delta::GameStart(start) => game_start(battle, start),
        Delta::UnitMove(step) => unit_move(battle, step),
        Delta::UnitAttack(attack) => unit_attack(battle, attack),
        Delta::HealthChange(change) => {
            let _ = known_unit(battle, change.target_id)?;
            set_health(battle, change);
            Ok(())
        }
        Delta::ManaChange(change) => {
            let unit = known_unit_mut(battle, change.unit_id)?;
            unit.mana = change.new_value.min(unit.max_mana);
            Ok(())
        }
        Delta::GroundTargetAbility(GroundTargetAbility {
            unit_id,
            ability_id,
            effect,
            ..
        })
        | Delta::UnitTargetAbility(UnitTargetAbility {
            unit_id,
            ability_id,
            effect,
            ..
        })
        | Delta::NoTargetAbility(NoTargetAbility {
            unit_id,
            ability_id,
            effect,
        }) => ability_use(battle, *unit_id, *ability_id, effect),
        Delta::ModifierApplied(ModifierApplied {
            unit_id,
            application,
        }) => {
            let _ = known_unit(battle, *unit_id)?;
            fresh_handles(battle, [application])?;
            attach_modifier(battle, *unit_id, application);
            Ok(())
        }
        Delta::ModifierRemoved(ModifierRemoved { handle_id }) => {
            let unit_id = battle
                .unit_holding(*handle_id)
                .ok_or(CollapseGap::UnknownModifier(*handle_id))?;
            detach_modifier(battle, unit_id, *handle_id);
            Ok(())
        }
        Delta::LevelChange(change) => {
            known_unit_mut(battle, change.unit_id)?.level = change.new_level;
            Ok(())
        }
        Delta::GoldChange(change) => {
            battle
                .player_mut(change.player_id)
                .ok_or(CollapseGap::UnknownPlayer(change.player_id))?
                .gold = change.new_value;
            Ok(())
        }
        Delta::UseHeroCard(card) => use_hero_card(battle, card),
        Delta::RunePickUp(pick_up) => rune_pick_up(battle, pick_up),
        Delta::PurchaseItem(purchase) => purchase_item(battle, purchase),
        Delta::EndTurn(end) => end_turn(battle, end),
        Delta::GameOver(over) => {
            battle.phase = BattlePhase::Finished;
            battle.winner = over.winner;
            Ok(())
        }
    }
}

fn configure_grid(battle: &mut Battle, configure: &ConfigureGrid) -> Checked {
    expect_phase(battle, BattlePhase::Setup)?;
    battle.grid = Grid::rebuild(
        GridSize::new(configure.columns, configure.rows),
        battle.units.values(),
        battle.runes.values(),
    );
    Ok(())
}

fn player_join(battle: &mut Battle, join: &PlayerJoin) -> Checked {
    expect_phase(battle, BattlePhase::Setup)?;
    if battle.player_index(join.player.id).is_some() {
        return Err(CollapseGap::DuplicatePlayer(join.player.id));
    }
    battle.players.push(join.player.clone());
    Ok(())
}

fn unit_spawn(battle: &mut Battle, spawn: &UnitSpawn) -> Checked {
    let _ = known_player(battle, spawn.unit.owner)?;
    check_spawn(battle, &spawn.unit)?;
    spawn_unit(battle, &spawn.unit);
    Ok(())
}

fn rune_spawn(battle: &mut Battle, spawn: &RuneSpawn) -> Checked {
    let rune = spawn.rune;
    if battle.runes.contains_key(&rune.id) {
        return Err(CollapseGap::DuplicateRune(rune.id));
    }
    let cell = battle
        .grid
        .cell(rune.position)
        .ok_or(CollapseGap::OutOfBounds(rune.position))?;
    if cell.is_occupied() || cell.rune().is_some() {
        return Err(CollapseGap::CellOccupied(rune.position));
    }
    battle.grid.place_rune(rune.id, rune.position);
    let _ = battle.runes.insert(rune.id, rune);
    Ok(())
}

fn shop_spawn(battle: &mut Battle, spawn: &ShopSpawn) -> Checked {
    let shop = &spawn.shop;
    if battle.shops.contains_key(&shop.id) {
        return Err(CollapseGap::DuplicateShop(shop.id));
    }
    in_bounds(battle, shop.position)?;
    let _ = battle.shops.insert(shop.id, shop.clone());
    Ok(())
}

fn game_start(battle: &mut Battle, start: &GameStart) -> Checked {
    expect_phase(battle, BattlePhase::Setup)?;
    let index = battle
        .player_index(start.first_player_id)
        .ok_or(CollapseGap::UnknownPlayer(start.first_player_id))?;
    battle.phase = BattlePhase::InProgress;
    battle.turning_player_index = index;
    Ok(())
}

fn unit_move(battle: &mut Battle, step: &UnitMove) -> Checked {
    let _ = living_unit(battle, step.unit_id)?;
    free_cell(battle, step.to, step.unit_id)?;
    relocate(battle, step.unit_id, step.to);
    let unit = known_unit_mut(battle, step.unit_id)?;
    unit.move_points = unit.move_points.saturating_sub(step.move_cost);
    Ok(())
}

fn unit_attack(battle: &mut Battle, attack: &UnitAttack) -> Checked {
    let _ = known_ability(battle, attack.attacker_id, attack.ability_id)?;
    let _ = known_unit(battle, attack.health.target_id)?;
    set_health(battle, &attack.health);
    spend_ability(battle, attack.attacker_id, attack.ability_id);
    Ok(())
}

fn ability_use(
    battle: &mut Battle,
    unit_id: UnitId,
    ability_id: AbilityId,
    effect: &AbilityEffect,
) -> Checked {
    let _ = known_ability(battle, unit_id, ability_id)?;
    check_effect(battle, unit_id, effect)?;
    apply_effect(battle, unit_id, effect);
    spend_ability(battle, unit_id, ability_id);
    Ok(())
}

fn check_effect(battle: &Battle, caster_id: UnitId, effect: &AbilityEffect) -> Checked {
    match effect {
        AbilityEffect::Damage(DamageEffect { hits }) => {
            for hit in hits {
                let _ = known_unit(battle, hit.health.target_id)?;
            }
            fresh_handles(battle, hits.iter().filter_map(|hit| hit.modifier.as_ref()))
        }
        AbilityEffect::Heal(heal) => known_unit(battle, heal.health.target_id).map(|_| ()),
        AbilityEffect::Hook(HookEffect { outcome }) => match outcome {
            HookOutcome::Hit(hit) => {
                let _ = known_unit(battle, hit.target_id)?;
                free_cell(battle, hit.moved_to, hit.target_id)
            }
            HookOutcome::Miss(_) => Ok(()),
        },
        AbilityEffect::Blink(BlinkEffect { to, .. }) => {
            let _ = living_unit(battle, caster_id)?;
            free_cell(battle, *to, caster_id)
        }
        AbilityEffect::Modifier(modifier) => {
            let _ = known_unit(battle, modifier.target_id)?;
            fresh_handles(battle, [&modifier.application])
        }
    }
}

fn apply_effect(battle: &mut Battle, caster_id: UnitId, effect: &AbilityEffect) {
    match effect {
        AbilityEffect::Damage(DamageEffect { hits }) => {
            for hit in hits {
                set_health(battle, &hit.health);
                if let Some(application) = &hit.modifier {
                    attach_modifier(battle, hit.health.target_id, application);
                }
            }
        }
        AbilityEffect::Heal(heal) => set_health(battle, &heal.health),
        AbilityEffect::Hook(HookEffect { outcome }) => {
            if let HookOutcome::Hit(hit) = outcome {
                set_health(battle, &hit.health);
                if battle.units.get(&hit.target_id).is_some_and(Unit::is_alive) {
                    relocate(battle, hit.target_id, hit.moved_to);
                }
            }
        }
        AbilityEffect::Blink(BlinkEffect { to, .. }) => relocate(battle, caster_id, *to),
        AbilityEffect::Modifier(modifier) => {
            attach_modifier(battle, modifier.target_id, &modifier.application);
        }
    }
}

fn use_hero_card(battle: &mut Battle, card: &UseHeroCard) -> Checked {
    let player = known_player(battle, card.player_id)?;
    if player.card(card.card_id).is_none() {
        return Err(CollapseGap::UnknownCard {
            player_id: card.player_id,
            card_id: card.card_id,
        });
    }
    check_spawn(battle, &card.unit)?;

    if let Some(player) = battle.player_mut(card.player_id) {
        player.hand.retain(|held| held.id != card.card_id);
        player.has_used_a_card_this_turn = true;
    }
    spawn_unit(battle, &card.unit);
    Ok(())
}

fn rune_pick_up(battle: &mut Battle, pick_up: &RunePickUp) -> Checked {
    let _ = living_unit(battle, pick_up.unit_id)?;
    let rune = *battle
        .runes
        .get(&pick_up.rune_id)
        .ok_or(CollapseGap::UnknownRune(pick_up.rune_id))?;
    free_cell(battle, rune.position, pick_up.unit_id)?;
    match &pick_up.effect {
        RuneEffect::Bounty(bounty) => {
            let _ = known_player(battle, bounty.player_id)?;
        }
        RuneEffect::Regeneration(_) => {}
        RuneEffect::DoubleDamage(double) => fresh_handles(battle, [&double.application])?,
    }

    let _ = battle.runes.remove(&rune.id);
    battle.grid.clear_rune(rune.position);
    relocate(battle, pick_up.unit_id, rune.position);
    if let Some(unit) = battle.units.get_mut(&pick_up.unit_id) {
        unit.move_points = unit.move_points.saturating_sub(pick_up.move_cost);
    }

    match &pick_up.effect {
        RuneEffect::Bounty(bounty) => {
            if let Some(player) = battle.player_mut(bounty.player_id) {
                player.gold = bounty.new_gold;
            }
        }
        RuneEffect::Regeneration(regeneration) => {
            set_health(battle, &regeneration.health);
            if let Some(unit) = battle.units.get_mut(&pick_up.unit_id) {
                unit.mana = regeneration.new_mana.min(unit.max_mana);
            }
        }
        RuneEffect::DoubleDamage(double) => {
            attach_modifier(battle, pick_up.unit_id, &double.application);
        }
    }
    Ok(())
}

fn purchase_item(battle: &mut Battle, purchase: &PurchaseItem) -> Checked {
    let owner = known_unit(battle, purchase.unit_id)?.owner;
    let _ = known_player(battle, owner)?;
    if !battle.shops.contains_key(&purchase.shop_id) {
        return Err(CollapseGap::UnknownShop(purchase.shop_id));
    }

    let unit = known_unit_mut(battle, purchase.unit_id)?;
    for change in &purchase.item.changes {
        let _ = shift_field(unit, change.field, change.amount);
    }
    unit.items.push(purchase.item.clone());
    if let Some(player) = battle.player_mut(owner) {
        player.gold = purchase.new_gold;
    }
    Ok(())
}

fn end_turn(battle: &mut Battle, end: &EndTurn) -> Checked {
    let _ = known_player(battle, end.player_id)?;
    let next_index = battle
        .player_index(end.next_player_id)
        .ok_or(CollapseGap::UnknownPlayer(end.next_player_id))?;

    for unit in battle.units.values_mut().filter(|unit| unit.is_alive()) {
        if unit.owner == end.player_id {
            for modifier in &mut unit.modifiers {
                if let Some(remaining) = modifier.duration_remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                }
            }
        }
        if unit.owner == end.next_player_id {
            unit.move_points = unit.max_move_points;
            unit.has_taken_an_action_this_turn = false;
            for ability in &mut unit.abilities {
                if let Ability::Active(active) = ability {
                    active.cooldown_remaining = active.cooldown_remaining.saturating_sub(1);
                }
            }
        }
    }

    battle.turning_player_index = next_index;
    if let Some(player) = battle.player_mut(end.next_player_id) {
        player.has_used_a_card_this_turn = false;
    }
    Ok(())
}

fn detect_game_over(battle: &mut Battle) {
    if battle.phase != BattlePhase::InProgress {
        return;
    }
    let owners = query::surviving_owners(battle);
    if owners.len() <= 1 {
        battle.phase = BattlePhase::Finished;
        battle.winner = owners.into_iter().next();
        tracing::info!(winner = ?battle.winner, "battle finished");
    }
}

fn expect_phase(battle: &Battle, phase: BattlePhase) -> Checked {
    if battle.phase == phase {
        Ok(())
    } else {
        Err(CollapseGap::UnexpectedPhase(battle.phase))
    }
}

fn known_player(battle: &Battle, player_id: PlayerId) -> Result<&Player, CollapseGap> {
    query::player(battle, player_id).ok_or(CollapseGap::UnknownPlayer(player_id))
}

fn known_unit(battle: &Battle, unit_id: UnitId) -> Result<&Unit, CollapseGap> {
    battle
        .units
        .get(&unit_id)
        .ok_or(CollapseGap::UnknownUnit(unit_id))
}

fn known_unit_mut(battle: &mut Battle, unit_id: UnitId) -> Result<&mut Unit, CollapseGap> {
    battle
        .units
        .get_mut(&unit_id)
        .ok_or(CollapseGap::UnknownUnit(unit_id))
}

fn living_unit(battle: &Battle, unit_id: UnitId) -> Result<&Unit, CollapseGap> {
    let unit = known_unit(battle, unit_id)?;
    if unit.is_alive() {
        Ok(unit)
    } else {
        Err(CollapseGap::DeadUnit(unit_id))
    }
}

fn known_ability(battle: &Battle, unit_id: UnitId, ability_id: AbilityId) -> Checked {
    let unit = known_unit(battle, unit_id)?;
    match unit.ability(ability_id) {
        Some(_) => Ok(()),
        None => Err(CollapseGap::UnknownAbility {
            unit_id,
            ability_id,
        }),
    }
}

fn in_bounds(battle: &Battle, cell: CellCoord) -> Checked {
    if battle.grid.contains(cell) {
        Ok(())
    } else {
        Err(CollapseGap::OutOfBounds(cell))
    }
}

/// The cell must exist and hold no living unit other than `mover`.
fn free_cell(battle: &Battle, cell: CellCoord, mover: UnitId) -> Checked {
    in_bounds(battle, cell)?;
    match battle.grid.occupant(cell) {
        Some(occupant) if occupant != mover => Err(CollapseGap::CellOccupied(cell)),
        _ => Ok(()),
    }
}

fn check_spawn(battle: &Battle, blueprint: &UnitBlueprint) -> Checked {
    if battle.units.contains_key(&blueprint.id) {
        return Err(CollapseGap::DuplicateUnit(blueprint.id));
    }
    let cell = battle
        .grid
        .cell(blueprint.position)
        .ok_or(CollapseGap::OutOfBounds(blueprint.position))?;
    if cell.is_occupied() {
        return Err(CollapseGap::CellOccupied(blueprint.position));
    }
    Ok(())
}

fn fresh_handles<'a>(
    battle: &Battle,
    applications: impl IntoIterator<Item = &'a ModifierApplication>,
) -> Checked {
    let mut seen = BTreeSet::new();
    for application in applications {
        let handle_id = application.handle_id;
        if !seen.insert(handle_id) || battle.unit_holding(handle_id).is_some() {
            return Err(CollapseGap::DuplicateModifier(handle_id));
        }
    }
    Ok(())
}

fn spawn_unit(battle: &mut Battle, blueprint: &UnitBlueprint) {
    battle.grid.occupy(blueprint.id, blueprint.position);
    let _ = battle
        .units
        .insert(blueprint.id, Unit::from_blueprint(blueprint));
    let following = UnitId::new(blueprint.id.get().saturating_add(1));
    battle.next_unit_id = battle.next_unit_id.max(following);
}

fn relocate(battle: &mut Battle, unit_id: UnitId, to: CellCoord) {
    let Some(unit) = battle.units.get_mut(&unit_id) else {
        return;
    };
    battle.grid.vacate(unit.position);
    unit.position = to;
    battle.grid.occupy(unit_id, to);
}

/// Health is written verbatim; reaching zero kills the unit and frees its cell.
fn set_health(battle: &mut Battle, change: &HealthChange) {
    let Some(unit) = battle.units.get_mut(&change.target_id) else {
        return;
    };
    unit.health = change.new_value.min(unit.max_health);
    if unit.health == 0 && unit.is_alive() {
        unit.dead = true;
        battle.grid.vacate(unit.position);
    }
}

fn spend_ability(battle: &mut Battle, unit_id: UnitId, ability_id: AbilityId) {
    let Some(unit) = battle.units.get_mut(&unit_id) else {
        return;
    };
    unit.has_taken_an_action_this_turn = true;
    let mut mana_cost = 0;
    if let Some(Ability::Active(active)) = unit
        .abilities
        .iter_mut()
        .find(|ability| ability.id() == ability_id)
    {
        active.cooldown_remaining = active.cooldown;
        mana_cost = active.mana_cost;
    }
    unit.mana = unit.mana.saturating_sub(mana_cost);
}

fn attach_modifier(battle: &mut Battle, unit_id: UnitId, application: &ModifierApplication) {
    let Some(unit) = battle.units.get_mut(&unit_id) else {
        return;
    };
    if !unit.is_alive() {
        return;
    }

    let mut swapped_out = Vec::new();
    let mut applied_shifts = Vec::new();
    for change in &application.changes {
        match change {
            ModifierChange::Field(field) => {
                applied_shifts.push(shift_field(unit, field.field, field.amount));
            }
            ModifierChange::AbilitySwap(swap) => {
                if let Some(slot) = unit
                    .abilities
                    .iter_mut()
                    .find(|ability| ability.id() == swap.from)
                {
                    swapped_out.push(std::mem::replace(slot, swap.to.clone()));
                }
            }
            ModifierChange::Status(_) => {}
        }
    }

    unit.modifiers.push(AppliedModifier {
        handle_id: application.handle_id,
        modifier_id: application.modifier_id,
        changes: application.changes.clone(),
        duration_remaining: application.duration,
        swapped_out,
        applied_shifts,
    });
    let following = ModifierHandleId::new(application.handle_id.get().saturating_add(1));
    battle.next_modifier_handle = battle.next_modifier_handle.max(following);
}

fn detach_modifier(battle: &mut Battle, unit_id: UnitId, handle_id: ModifierHandleId) {
    let Some(unit) = battle.units.get_mut(&unit_id) else {
        return;
    };
    let Some(position) = unit
        .modifiers
        .iter()
        .position(|modifier| modifier.handle_id == handle_id)
    else {
        return;
    };

    let modifier = unit.modifiers.remove(position);
    let mut displaced = modifier.swapped_out;
    let mut applied_shifts = modifier.applied_shifts.iter().rev();
    for change in modifier.changes.iter().rev() {
        match change {
            ModifierChange::Field(field) => {
                let applied = applied_shifts.next().copied().unwrap_or(field.amount);
                let _ = shift_field(unit, field.field, applied.saturating_neg());
            }
            ModifierChange::AbilitySwap(swap) => {
                let Some(original) = displaced
                    .iter()
                    .position(|ability| ability.id() == swap.from)
                    .map(|index| displaced.remove(index))
                else {
                    continue;
                };
                let installed = swap.to.id();
                if let Some(slot) = unit
                    .abilities
                    .iter_mut()
                    .find(|ability| ability.id() == installed)
                {
                    *slot = original;
                }
            }
            ModifierChange::Status(_) => {}
        }
    }
}

/// Moves one stat by `amount` and returns how far it actually moved.
fn shift_field(unit: &mut Unit, field: UnitField, amount: i64) -> i64 {
    let (before, after) = match field {
        UnitField::MaxHealth => {
            let before = unit.max_health;
            unit.max_health = shifted(before, amount).max(1);
            unit.health = unit.health.min(unit.max_health);
            (before, unit.max_health)
        }
        UnitField::MaxMana => {
            let before = unit.max_mana;
            unit.max_mana = shifted(before, amount);
            unit.mana = unit.mana.min(unit.max_mana);
            (before, unit.max_mana)
        }
        UnitField::MaxMovePoints => {
            let before = unit.max_move_points;
            unit.max_move_points = shifted(before, amount);
            unit.move_points = unit.move_points.min(unit.max_move_points);
            (before, unit.max_move_points)
        }
        UnitField::AttackDamage => {
            let before = unit.attack_damage;
            unit.attack_damage = shifted(before, amount);
            (before, unit.attack_damage)
        }
    };
    i64::from(after) - i64::from(before)
}

fn shifted(value: u32, amount: i64) -> u32 {
    let shifted = i64::from(value).saturating_add(amount).max(0);
    u32::try_from(shifted).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use skirmish_core::{
        catalog::{Hero, BASIC_ATTACK},
        delta::ManaChange,
        model::{AbilitySwap, FieldChange, StatusChange},
        BattleSnapshot, CellRect, CellRectSize, ModifierId, StatusFlag, TargetHit,
    };

    use super::*;

    const RED: PlayerId = PlayerId::new(1);
    const BLUE: PlayerId = PlayerId::new(2);

    fn player(id: PlayerId) -> Player {
        Player {
            id,
            gold: 0,
            deployment_zone: CellRect::from_origin_and_size(
                CellCoord::new(0, 0),
                CellRectSize::new(5, 1),
            ),
            hand: Vec::new(),
            has_used_a_card_this_turn: false,
        }
    }

    fn spawn(id: u32, hero: Hero, owner: PlayerId, column: u32, row: u32) -> Delta {
        Delta::UnitSpawn(UnitSpawn {
            unit: hero.blueprint(UnitId::new(id), owner, CellCoord::new(column, row)),
        })
    }

    /// Red butcher at (0,0), red creep at (1,1), blue warden at (2,2), blue creep at (4,4).
    fn battle() -> Battle {
        let mut battle = Battle::new();
        let setup = [
            Delta::ConfigureGrid(ConfigureGrid {
                columns: 5,
                rows: 5,
            }),
            Delta::PlayerJoin(PlayerJoin { player: player(RED) }),
            Delta::PlayerJoin(PlayerJoin {
                player: player(BLUE),
            }),
            spawn(1, Hero::Butcher, RED, 0, 0),
            spawn(2, Hero::Creep, RED, 1, 1),
            spawn(3, Hero::Warden, BLUE, 2, 2),
            spawn(4, Hero::Creep, BLUE, 4, 4),
            Delta::GameStart(GameStart {
                first_player_id: RED,
            }),
        ];
        for delta in &setup {
            assert_eq!(collapse(&mut battle, delta), Collapse::Applied);
        }
        battle
    }

    fn health(target: u32, new_value: u32) -> HealthChange {
        HealthChange {
            target_id: UnitId::new(target),
            source_id: None,
            new_value,
            change: 0,
        }
    }

    fn unit(battle: &Battle, id: u32) -> &Unit {
        query::unit(battle, UnitId::new(id)).expect("unit exists")
    }

    fn stun(handle: u32, turns: u32) -> ModifierApplication {
        ModifierApplication {
            handle_id: ModifierHandleId::new(handle),
            modifier_id: ModifierId::new(1),
            changes: vec![ModifierChange::Status(StatusChange {
                flag: StatusFlag::Stunned,
            })],
            duration: Some(turns),
        }
    }

    #[test]
    fn setup_deltas_build_a_started_battle() {
        let battle = battle();
        assert_eq!(query::delta_head(&battle), 8);
        assert_eq!(query::phase(&battle), BattlePhase::InProgress);
        assert_eq!(query::turning_player(&battle).map(|p| p.id), Some(RED));
        assert_eq!(query::next_unit_id(&battle), UnitId::new(5));
        assert!(query::occupancy_is_consistent(&battle));
    }

    #[test]
    fn lethal_health_change_kills_and_frees_the_cell() {
        let mut battle = battle();
        let delta = Delta::HealthChange(health(3, 0));
        assert_eq!(collapse(&mut battle, &delta), Collapse::Applied);

        let warden = unit(&battle, 3);
        assert!(warden.dead);
        assert_eq!(warden.health, 0);
        assert!(!query::grid(&battle)
            .cell(CellCoord::new(2, 2))
            .expect("in bounds")
            .is_occupied());
        assert!(query::occupancy_is_consistent(&battle));
    }

    #[test]
    fn health_change_is_absolute() {
        let mut battle = battle();
        let delta = Delta::HealthChange(health(3, 40));
        let _ = collapse(&mut battle, &delta);
        let _ = collapse(&mut battle, &delta);
        assert_eq!(unit(&battle, 3).health, 40);
    }

    #[test]
    fn unknown_references_skip_but_advance_the_head() {
        let mut battle = battle();
        let before = query::snapshot(&battle);
        let delta = Delta::HealthChange(health(99, 0));
        assert_eq!(
            collapse(&mut battle, &delta),
            Collapse::Skipped(CollapseGap::UnknownUnit(UnitId::new(99)))
        );
        let after = query::snapshot(&battle);
        assert_eq!(after.delta_head, before.delta_head + 1);
        assert_eq!(after.units, before.units);
    }

    #[test]
    fn partially_resolvable_effects_are_not_applied_at_all() {
        let mut battle = battle();
        let delta = Delta::NoTargetAbility(NoTargetAbility {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(2),
            effect: AbilityEffect::Damage(DamageEffect {
                hits: vec![
                    TargetHit {
                        health: health(3, 10),
                        modifier: None,
                    },
                    TargetHit {
                        health: health(42, 0),
                        modifier: None,
                    },
                ],
            }),
        });
        assert!(matches!(
            collapse(&mut battle, &delta),
            Collapse::Skipped(CollapseGap::UnknownUnit(_))
        ));
        assert_eq!(unit(&battle, 3).health, unit(&battle, 3).max_health);
        assert!(!unit(&battle, 1).has_taken_an_action_this_turn);
    }

    #[test]
    fn moves_update_occupancy_and_move_points() {
        let mut battle = battle();
        let delta = Delta::UnitMove(UnitMove {
            unit_id: UnitId::new(1),
            to: CellCoord::new(0, 2),
            move_cost: 2,
        });
        assert_eq!(collapse(&mut battle, &delta), Collapse::Applied);
        assert_eq!(unit(&battle, 1).position, CellCoord::new(0, 2));
        assert_eq!(unit(&battle, 1).move_points, 1);
        assert_eq!(
            query::grid(&battle).occupant(CellCoord::new(0, 2)),
            Some(UnitId::new(1))
        );
        assert_eq!(query::grid(&battle).occupant(CellCoord::new(0, 0)), None);
        assert!(query::occupancy_is_consistent(&battle));
    }

    #[test]
    fn moves_onto_occupied_cells_are_skipped() {
        let mut battle = battle();
        let delta = Delta::UnitMove(UnitMove {
            unit_id: UnitId::new(1),
            to: CellCoord::new(1, 1),
            move_cost: 1,
        });
        assert_eq!(
            collapse(&mut battle, &delta),
            Collapse::Skipped(CollapseGap::CellOccupied(CellCoord::new(1, 1)))
        );
        assert_eq!(unit(&battle, 1).position, CellCoord::new(0, 0));
    }

    #[test]
    fn ability_use_spends_cooldown_mana_and_the_action() {
        let mut battle = battle();
        let delta = Delta::NoTargetAbility(NoTargetAbility {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(2),
            effect: AbilityEffect::Damage(DamageEffect { hits: Vec::new() }),
        });
        assert_eq!(collapse(&mut battle, &delta), Collapse::Applied);

        let butcher = unit(&battle, 1);
        let stomp = butcher
            .ability(AbilityId::new(2))
            .and_then(Ability::as_active)
            .expect("active ability");
        assert!(butcher.has_taken_an_action_this_turn);
        assert_eq!(stomp.cooldown_remaining, stomp.cooldown);
        assert_eq!(butcher.mana, butcher.max_mana - stomp.mana_cost);
    }

    #[test]
    fn attacks_set_the_target_health() {
        let mut battle = battle();
        let delta = Delta::UnitAttack(UnitAttack {
            attacker_id: UnitId::new(2),
            ability_id: BASIC_ATTACK,
            health: health(3, 94),
        });
        assert_eq!(collapse(&mut battle, &delta), Collapse::Applied);
        assert_eq!(unit(&battle, 3).health, 94);
        assert!(unit(&battle, 2).has_taken_an_action_this_turn);
    }

    #[test]
    fn end_turn_refreshes_only_the_next_players_units() {
        let mut battle = battle();
        let moves = [
            Delta::UnitMove(UnitMove {
                unit_id: UnitId::new(1),
                to: CellCoord::new(0, 1),
                move_cost: 1,
            }),
            Delta::ManaChange(ManaChange {
                unit_id: UnitId::new(3),
                new_value: 0,
                change: -60,
            }),
            Delta::EndTurn(EndTurn {
                player_id: RED,
                next_player_id: BLUE,
            }),
        ];
        for delta in &moves {
            assert_eq!(collapse(&mut battle, delta), Collapse::Applied);
        }

        assert_eq!(query::turning_player(&battle).map(|p| p.id), Some(BLUE));
        assert_eq!(unit(&battle, 1).move_points, 2);
        assert_eq!(unit(&battle, 3).move_points, unit(&battle, 3).max_move_points);
        assert_eq!(unit(&battle, 3).mana, 0);
    }

    #[test]
    fn modifiers_tick_when_their_owner_ends_a_turn() {
        let mut battle = battle();
        let deltas = [
            Delta::ModifierApplied(ModifierApplied {
                unit_id: UnitId::new(3),
                application: stun(7, 1),
            }),
            Delta::EndTurn(EndTurn {
                player_id: RED,
                next_player_id: BLUE,
            }),
        ];
        for delta in &deltas {
            assert_eq!(collapse(&mut battle, delta), Collapse::Applied);
        }
        assert!(unit(&battle, 3).has_status(StatusFlag::Stunned));
        assert_eq!(unit(&battle, 3).modifiers[0].duration_remaining, Some(1));

        let end = Delta::EndTurn(EndTurn {
            player_id: BLUE,
            next_player_id: RED,
        });
        assert_eq!(collapse(&mut battle, &end), Collapse::Applied);
        assert_eq!(unit(&battle, 3).modifiers[0].duration_remaining, Some(0));
        assert_eq!(query::next_modifier_handle(&battle), ModifierHandleId::new(8));

        let removal = Delta::ModifierRemoved(ModifierRemoved {
            handle_id: ModifierHandleId::new(7),
        });
        assert_eq!(collapse(&mut battle, &removal), Collapse::Applied);
        assert!(!unit(&battle, 3).has_status(StatusFlag::Stunned));
    }

    #[test]
    fn removing_a_modifier_reverts_fields_and_swaps() {
        let mut battle = battle();
        let mut replacement = unit(&battle, 1)
            .ability(AbilityId::new(1))
            .cloned()
            .expect("butcher hook");
        if let Ability::Active(active) = &mut replacement {
            active.id = AbilityId::new(7);
            active.mana_cost = 0;
        }
        let application = ModifierApplication {
            handle_id: ModifierHandleId::new(3),
            modifier_id: ModifierId::new(9),
            changes: vec![
                ModifierChange::Field(FieldChange {
                    field: UnitField::AttackDamage,
                    amount: 4,
                }),
                ModifierChange::AbilitySwap(AbilitySwap {
                    from: AbilityId::new(1),
                    to: replacement,
                }),
            ],
            duration: None,
        };
        let original = unit(&battle, 1).clone();

        let apply = Delta::ModifierApplied(ModifierApplied {
            unit_id: UnitId::new(1),
            application,
        });
        assert_eq!(collapse(&mut battle, &apply), Collapse::Applied);
        assert_eq!(unit(&battle, 1).attack_damage, original.attack_damage + 4);
        assert_eq!(unit(&battle, 1).ability(AbilityId::new(1)), None);
        assert!(unit(&battle, 1).ability(AbilityId::new(7)).is_some());

        let remove = Delta::ModifierRemoved(ModifierRemoved {
            handle_id: ModifierHandleId::new(3),
        });
        assert_eq!(collapse(&mut battle, &remove), Collapse::Applied);
        assert_eq!(unit(&battle, 1).abilities, original.abilities);
        assert_eq!(unit(&battle, 1).attack_damage, original.attack_damage);
        assert!(unit(&battle, 1).modifiers.is_empty());
    }

    #[test]
    fn removing_a_clamped_penalty_restores_the_original_stat() {
        let mut battle = battle();
        let slow = |handle: u32, amount: i64| {
            Delta::ModifierApplied(ModifierApplied {
                unit_id: UnitId::new(2),
                application: ModifierApplication {
                    handle_id: ModifierHandleId::new(handle),
                    modifier_id: ModifierId::new(4),
                    changes: vec![ModifierChange::Field(FieldChange {
                        field: UnitField::MaxMovePoints,
                        amount,
                    })],
                    duration: None,
                },
            })
        };
        let remove = |handle: u32| {
            Delta::ModifierRemoved(ModifierRemoved {
                handle_id: ModifierHandleId::new(handle),
            })
        };
        assert_eq!(unit(&battle, 2).max_move_points, 2);

        assert_eq!(collapse(&mut battle, &slow(4, -5)), Collapse::Applied);
        assert_eq!(unit(&battle, 2).max_move_points, 0);
        assert_eq!(unit(&battle, 2).modifiers[0].applied_shifts, vec![-2]);

        assert_eq!(collapse(&mut battle, &slow(5, 1)), Collapse::Applied);
        assert_eq!(unit(&battle, 2).max_move_points, 1);

        assert_eq!(collapse(&mut battle, &remove(4)), Collapse::Applied);
        assert_eq!(unit(&battle, 2).max_move_points, 3);
        assert_eq!(collapse(&mut battle, &remove(5)), Collapse::Applied);
        assert_eq!(unit(&battle, 2).max_move_points, 2);
        assert!(unit(&battle, 2).modifiers.is_empty());
    }

    #[test]
    fn duplicate_modifier_handles_are_skipped() {
        let mut battle = battle();
        let apply = Delta::ModifierApplied(ModifierApplied {
            unit_id: UnitId::new(3),
            application: stun(5, 1),
        });
        assert_eq!(collapse(&mut battle, &apply), Collapse::Applied);
        assert_eq!(
            collapse(&mut battle, &apply),
            Collapse::Skipped(CollapseGap::DuplicateModifier(ModifierHandleId::new(5)))
        );
        assert_eq!(unit(&battle, 3).modifiers.len(), 1);
    }

    #[test]
    fn last_surviving_owner_wins() {
        let mut battle = battle();
        let _ = collapse(&mut battle, &Delta::HealthChange(health(3, 0)));
        assert_eq!(query::phase(&battle), BattlePhase::InProgress);
        let _ = collapse(&mut battle, &Delta::HealthChange(health(4, 0)));
        assert_eq!(query::phase(&battle), BattlePhase::Finished);
        assert_eq!(query::winner(&battle), Some(RED));
    }

    #[test]
    fn snapshot_restores_an_identical_battle() {
        let mut battle = battle();
        let _ = collapse(
            &mut battle,
            &Delta::ModifierApplied(ModifierApplied {
                unit_id: UnitId::new(4),
                application: stun(2, 2),
            }),
        );
        let restored = Battle::from_snapshot(&query::snapshot(&battle));
        assert_eq!(restored, battle);
    }

    #[test]
    fn snapshot_survives_its_json_form() {
        let mut battle = battle();
        let _ = collapse(
            &mut battle,
            &Delta::ModifierApplied(ModifierApplied {
                unit_id: UnitId::new(3),
                application: stun(7, 3),
            }),
        );
        let _ = collapse(&mut battle, &Delta::HealthChange(health(4, 0)));

        let json = serde_json::to_string(&query::snapshot(&battle)).expect("encode snapshot");
        let decoded: BattleSnapshot = serde_json::from_str(&json).expect("decode snapshot");

        assert_eq!(decoded, query::snapshot(&battle));
        assert_eq!(Battle::from_snapshot(&decoded), battle);
    }
}
