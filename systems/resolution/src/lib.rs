#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turns validated permissions into the deltas that record their outcome.
//!
//! Resolution reads the battle through the permission it is handed and never
//! mutates it. Every random roll is drawn here, once, from the generator the
//! caller supplies; its result is written into the produced deltas so that
//! replaying consumers never roll again.

use std::collections::BTreeMap;

use rand::Rng;
use skirmish_core::{
    catalog::{double_damage_modifier, BOUNTY_RUNE_GOLD},
    delta::{
        BlinkEffect, BountyRuneEffect, DamageEffect, DoubleDamageRuneEffect, EndTurn, GoldChange,
        GroundTargetAbility, HealEffect, HookEffect, HookHit, HookMiss, LevelChange,
        ModifierEffect, ModifierRemoved, NoTargetAbility, PurchaseItem, RegenerationRuneEffect,
        RunePickUp, UnitAttack, UnitMove, UnitTargetAbility, UseHeroCard,
    },
    model::{AreaDamage, Heal, Hook, Selector, SplitDamage, UnitDamage},
    AbilityEffect, AbilityError, AbilityKind, ActionError, CellCoord, Delta, HealthChange,
    HookOutcome, ModifierApplication, ModifierHandleId, ModifierTemplate, RuneEffect, RuneKind,
    TargetHit, Unit, UnitBlueprint, UnitId, KILL_BOUNTY, MAX_LEVEL,
};
use skirmish_system_authorization::{
    CardPermission, CastPermission, CastTarget, EndTurnPermission, MovePermission, Permission,
    PurchasePermission, RunePermission,
};
use skirmish_system_targeting::{affected_units, Direction};
use skirmish_world::{query, Battle};

/// Computes the deltas recording the outcome of an authorized action.
///
/// The returned batch is ordered: collapsing it front to back against the
/// battle the permission was checked on applies every delta. An ability
/// aimed in a way its mechanism cannot resolve is refused rather than
/// committed as an empty batch.
pub fn resolve<R>(permission: &Permission<'_>, rng: &mut R) -> Result<Vec<Delta>, ActionError>
where
    R: Rng + ?Sized,
{
    let deltas = match permission {
        Permission::Move(step) => vec![resolve_move(step)],
        Permission::Cast(cast) => resolve_cast(cast, rng)?,
        Permission::Card(card) => vec![resolve_card(card)],
        Permission::Rune(pick_up) => vec![resolve_rune(pick_up)],
        Permission::Purchase(purchase) => vec![resolve_purchase(purchase)],
        Permission::EndTurn(end) => resolve_end_turn(end),
    };
    tracing::debug!(deltas = deltas.len(), "resolved action");
    Ok(deltas)
}

fn resolve_move(step: &MovePermission<'_>) -> Delta {
    Delta::UnitMove(UnitMove {
        unit_id: step.unit().unit().id,
        to: step.to(),
        move_cost: step.cost(),
    })
}

/// Hands the turn over, then retires modifiers whose final owner turn just ended.
fn resolve_end_turn(end: &EndTurnPermission<'_>) -> Vec<Delta> {
    let battle = end.player().battle();
    let player_id = end.player().player().id;
    let mut deltas = vec![Delta::EndTurn(EndTurn {
        player_id,
        next_player_id: end.next_player().id,
    })];
    deltas.extend(
        query::living_units(battle)
            .filter(|unit| unit.owner == player_id)
            .flat_map(|unit| &unit.modifiers)
            .filter(|modifier| matches!(modifier.duration_remaining, Some(turns) if turns <= 1))
            .map(|modifier| {
                Delta::ModifierRemoved(ModifierRemoved {
                    handle_id: modifier.handle_id,
                })
            }),
    );
    deltas
}

fn resolve_card(card: &CardPermission<'_>) -> Delta {
    let player = card.player().player();
    let hero = card.card();
    Delta::UseHeroCard(UseHeroCard {
        player_id: player.id,
        card_id: hero.id,
        unit: UnitBlueprint {
            id: query::next_unit_id(card.player().battle()),
            owner: player.id,
            position: card.at(),
            stats: hero.stats,
            abilities: hero.abilities.clone(),
        },
    })
}

fn resolve_rune(pick_up: &RunePermission<'_>) -> Delta {
    let unit = pick_up.unit().unit();
    let rune = pick_up.rune();
    let effect = match rune.kind {
        RuneKind::Bounty => {
            let player = pick_up.unit().player().player();
            let new_gold = player.gold.saturating_add(BOUNTY_RUNE_GOLD);
            RuneEffect::Bounty(BountyRuneEffect {
                player_id: player.id,
                new_gold,
                change: signed_change(player.gold, new_gold),
            })
        }
        RuneKind::Regeneration => RuneEffect::Regeneration(RegenerationRuneEffect {
            health: HealthChange {
                target_id: unit.id,
                source_id: None,
                new_value: unit.max_health,
                change: signed_change(unit.health, unit.max_health),
            },
            new_mana: unit.max_mana,
        }),
        RuneKind::DoubleDamage => RuneEffect::DoubleDamage(DoubleDamageRuneEffect {
            application: double_damage_modifier()
                .instantiate(query::next_modifier_handle(pick_up.unit().battle())),
        }),
    };
    Delta::RunePickUp(RunePickUp {
        unit_id: unit.id,
        rune_id: rune.id,
        move_cost: pick_up.cost(),
        effect,
    })
}

fn resolve_purchase(purchase: &PurchasePermission<'_>) -> Delta {
    let gold = purchase.unit().player().player().gold;
    Delta::PurchaseItem(PurchaseItem {
        unit_id: purchase.unit().unit().id,
        shop_id: purchase.shop().id,
        item: purchase.item().clone(),
        new_gold: gold.saturating_sub(purchase.item().cost),
    })
}

/// Sequential allocator for modifier handles within one batch.
struct Handles(ModifierHandleId);

impl Handles {
    fn starting_at(battle: &Battle) -> Self {
        Self(query::next_modifier_handle(battle))
    }

    fn instantiate(&mut self, template: &ModifierTemplate) -> ModifierApplication {
        let handle_id = self.0;
        self.0 = ModifierHandleId::new(handle_id.get().saturating_add(1));
        template.instantiate(handle_id)
    }
}

/// Damage bookkeeping shared by every damaging ability.
struct Strike<'a> {
    battle: &'a Battle,
    caster: &'a Unit,
    kills: u32,
}

impl<'a> Strike<'a> {
    fn new(battle: &'a Battle, caster: &'a Unit) -> Self {
        Self {
            battle,
            caster,
            kills: 0,
        }
    }

    /// Health update of `target` after taking `damage` from the caster.
    fn hit(&mut self, target: &Unit, damage: u32) -> HealthChange {
        let new_value = target.health.saturating_sub(damage);
        if new_value == 0 && target.is_alive() && target.owner != self.caster.owner {
            self.kills += 1;
        }
        HealthChange {
            target_id: target.id,
            source_id: Some(self.caster.id),
            new_value,
            change: signed_change(target.health, new_value),
        }
    }

    /// Level and gold rewards for the enemies killed by this strike.
    fn rewards(&self) -> Vec<Delta> {
        if self.kills == 0 {
            return Vec::new();
        }
        let mut deltas = Vec::new();
        let new_level = self
            .caster
            .level
            .saturating_add(self.kills)
            .min(MAX_LEVEL)
            .max(self.caster.level);
        if new_level != self.caster.level {
            deltas.push(Delta::LevelChange(LevelChange {
                unit_id: self.caster.id,
                new_level,
            }));
        }
        if let Some(owner) = query::player(self.battle, self.caster.owner) {
            let new_value = owner
                .gold
                .saturating_add(KILL_BOUNTY.saturating_mul(self.kills));
            deltas.push(Delta::GoldChange(GoldChange {
                player_id: owner.id,
                new_value,
                change: signed_change(owner.gold, new_value),
            }));
        }
        tracing::debug!(caster = %self.caster.id, kills = self.kills, "kill rewards");
        deltas
    }
}

fn resolve_cast<R>(cast: &CastPermission<'_>, rng: &mut R) -> Result<Vec<Delta>, ActionError>
where
    R: Rng + ?Sized,
{
    let ability = cast.ability().ability();
    let battle = cast.ability().unit().battle();
    let caster = cast.ability().unit().unit();
    let mut strike = Strike::new(battle, caster);
    let mut handles = Handles::starting_at(battle);

    let effect = match (&ability.kind, cast.target()) {
        (AbilityKind::BasicAttack(_), CastTarget::Unit(target)) => {
            let health = strike.hit(target, caster.basic_attack_damage());
            let mut deltas = vec![Delta::UnitAttack(UnitAttack {
                attacker_id: caster.id,
                ability_id: ability.id,
                health,
            })];
            deltas.extend(strike.rewards());
            return Ok(deltas);
        }
        (AbilityKind::AreaDamage(AreaDamage { damage, modifier }), _) => {
            let hits = enemies_in_footprint(battle, caster, &ability.selector, cast.aim())
                .map(|target| {
                    let health = strike.hit(target, *damage);
                    let modifier = modifier
                        .as_ref()
                        .filter(|_| health.new_value > 0)
                        .map(|template| handles.instantiate(template));
                    TargetHit { health, modifier }
                })
                .collect();
            AbilityEffect::Damage(DamageEffect { hits })
        }
        (AbilityKind::UnitDamage(UnitDamage { damage, modifier }), CastTarget::Unit(target)) => {
            let health = strike.hit(target, *damage);
            let modifier = modifier
                .as_ref()
                .filter(|_| health.new_value > 0)
                .map(|template| handles.instantiate(template));
            AbilityEffect::Damage(DamageEffect {
                hits: vec![TargetHit { health, modifier }],
            })
        }
        (AbilityKind::Heal(Heal { amount }), CastTarget::Unit(target)) => {
            let new_value = target.health.saturating_add(*amount).min(target.max_health);
            AbilityEffect::Heal(HealEffect {
                health: HealthChange {
                    target_id: target.id,
                    source_id: Some(caster.id),
                    new_value,
                    change: signed_change(target.health, new_value),
                },
            })
        }
        (AbilityKind::Hook(hook), CastTarget::Ground(aim)) => AbilityEffect::Hook(HookEffect {
            outcome: throw_hook(&mut strike, hook, &ability.selector, aim, rng),
        }),
        (AbilityKind::Blink(_), CastTarget::Ground(to)) => AbilityEffect::Blink(BlinkEffect {
            from: caster.position,
            to,
        }),
        (AbilityKind::SplitDamage(SplitDamage { total_damage }), _) => {
            let targets: Vec<&Unit> =
                enemies_in_footprint(battle, caster, &ability.selector, cast.aim()).collect();
            let shares = split(&targets, *total_damage, rng);
            let hits = targets
                .iter()
                .zip(shares)
                .filter(|(_, share)| *share > 0)
                .map(|(target, share)| TargetHit {
                    health: strike.hit(target, share),
                    modifier: None,
                })
                .collect();
            AbilityEffect::Damage(DamageEffect { hits })
        }
        (AbilityKind::ApplyModifier(apply), CastTarget::Unit(target)) => {
            AbilityEffect::Modifier(ModifierEffect {
                target_id: target.id,
                application: handles.instantiate(&apply.modifier),
            })
        }
        (
            AbilityKind::BasicAttack(_)
            | AbilityKind::UnitDamage(_)
            | AbilityKind::Heal(_)
            | AbilityKind::ApplyModifier(_),
            CastTarget::Ground(_) | CastTarget::NoTarget,
        )
        | (
            AbilityKind::Hook(_) | AbilityKind::Blink(_),
            CastTarget::Unit(_) | CastTarget::NoTarget,
        ) => {
            return Err(AbilityError::UnsupportedTargetType.into());
        }
    };

    let mut deltas = vec![cast_delta(cast, effect)];
    deltas.extend(strike.rewards());
    Ok(deltas)
}

fn cast_delta(cast: &CastPermission<'_>, effect: AbilityEffect) -> Delta {
    let unit_id = cast.ability().unit().unit().id;
    let ability_id = cast.ability().ability().id;
    match cast.target() {
        CastTarget::Ground(target) => Delta::GroundTargetAbility(GroundTargetAbility {
            unit_id,
            ability_id,
            target,
            effect,
        }),
        CastTarget::Unit(target) => Delta::UnitTargetAbility(UnitTargetAbility {
            unit_id,
            ability_id,
            target_id: target.id,
            effect,
        }),
        CastTarget::NoTarget => Delta::NoTargetAbility(NoTargetAbility {
            unit_id,
            ability_id,
            effect,
        }),
    }
}

/// Targetable enemies of the caster inside the footprint, in ascending id order.
fn enemies_in_footprint<'a>(
    battle: &'a Battle,
    caster: &'a Unit,
    selector: &Selector,
    aim: CellCoord,
) -> impl Iterator<Item = &'a Unit> + 'a {
    let affected = affected_units(selector, caster.position, aim, query::living_units(battle));
    affected
        .into_iter()
        .filter_map(move |unit_id| query::unit(battle, unit_id))
        .filter(move |unit| unit.owner != caster.owner)
}

/// Flies along the line toward `aim` and rolls once against the first unit in the way.
///
/// Any occupied cell ends the flight, but only a targetable occupant is
/// caught. A caught unit is dragged to the free cell nearest to the caster
/// on the line; allies are dragged without taking damage. Otherwise the
/// projectile rests at the last free cell it reached.
fn throw_hook<R>(
    strike: &mut Strike<'_>,
    hook: &Hook,
    selector: &Selector,
    aim: CellCoord,
    rng: &mut R,
) -> HookOutcome
where
    R: Rng + ?Sized,
{
    let battle = strike.battle;
    let caster = strike.caster;
    let reach = match selector {
        Selector::Line(line) => line.length,
        _ => caster.position.manhattan_distance(aim),
    };
    let Some(direction) = Direction::between(caster.position, aim) else {
        return HookOutcome::Miss(HookMiss {
            final_point: caster.position,
        });
    };
    let grid = query::grid(battle);

    let mut flight = Vec::new();
    let mut caught = None;
    for step in 1..=i64::from(reach) {
        let Some(cell) = caster
            .position
            .offset(direction.columns() * step, direction.rows() * step)
            .filter(|cell| grid.contains(*cell))
        else {
            break;
        };
        if grid.occupant(cell).is_some() {
            caught = query::unit_at(battle, cell).filter(|unit| unit.is_targetable());
            break;
        }
        flight.push(cell);
    }

    let final_point = flight.last().copied().unwrap_or(caster.position);
    let Some(target) = caught else {
        return HookOutcome::Miss(HookMiss { final_point });
    };

    let roll: u8 = rng.gen_range(0..100);
    if roll >= hook.hit_chance_percent {
        return HookOutcome::Miss(HookMiss {
            final_point: target.position,
        });
    }

    let damage = if target.owner == caster.owner {
        0
    } else {
        hook.damage
    };
    let moved_to = flight
        .iter()
        .copied()
        .find(|cell| grid.rune(*cell).is_none())
        .unwrap_or(target.position);
    HookOutcome::Hit(HookHit {
        target_id: target.id,
        health: strike.hit(target, damage),
        moved_to,
    })
}

/// Deals `total` damage one point at a time to random targets that are still standing.
fn split<R>(targets: &[&Unit], total: u32, rng: &mut R) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    let mut shares = vec![0_u32; targets.len()];
    for _ in 0..total {
        let standing: Vec<usize> = (0..targets.len())
            .filter(|&index| shares[index] < targets[index].health)
            .collect();
        if standing.is_empty() {
            break;
        }
        let pick = standing[rng.gen_range(0..standing.len())];
        shares[pick] += 1;
    }
    shares
}

fn signed_change(before: u32, after: u32) -> i64 {
    i64::from(after) - i64::from(before)
}

/// Total health lost per unit across a batch, for logging and tests.
#[must_use]
pub fn damage_dealt(deltas: &[Delta]) -> BTreeMap<UnitId, i64> {
    let mut totals = BTreeMap::new();
    let mut record = |health: &HealthChange| {
        if health.change < 0 {
            *totals.entry(health.target_id).or_insert(0) -= health.change;
        }
    };
    for delta in deltas {
        match delta {
            Delta::UnitAttack(attack) => record(&attack.health),
            Delta::HealthChange(health) => record(health),
            Delta::GroundTargetAbility(GroundTargetAbility { effect, .. })
            | Delta::UnitTargetAbility(UnitTargetAbility { effect, .. })
            | Delta::NoTargetAbility(NoTargetAbility { effect, .. }) => match effect {
                AbilityEffect::Damage(damage) => {
                    damage.hits.iter().for_each(|hit| record(&hit.health));
                }
                AbilityEffect::Hook(HookEffect {
                    outcome: HookOutcome::Hit(hit),
                }) => record(&hit.health),
                _ => {}
            },
            _ => {}
        }
    }
    totals
}
