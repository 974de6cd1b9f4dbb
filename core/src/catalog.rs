//! Sample hero, item and modifier definitions.
//!
//! Balance values are data rather than mechanism; this catalog exists so that
//! demos and tests can stand up realistic battles. Nothing in the replicated
//! path reads it: spawn deltas carry complete unit descriptions.

use crate::delta::{ConfigureGrid, GameStart, PlayerJoin, RuneSpawn, ShopSpawn, UnitSpawn};
use crate::model::{
    AbilitySwap, ActiveAbility, ApplyModifier, AreaDamage, BasicAttack, Blink, FieldChange, Heal,
    Hook, PassiveAbility, SplitDamage, StatusChange, UnitDamage,
};
use crate::{
    Ability, AbilityId, AbilityKind, AbilityTargetType, Card, CardId, CellCoord, CellRect,
    CellRectSize, Delta, Item, ItemId, ModifierChange, ModifierId, ModifierTemplate, Player,
    PlayerId, Rune, RuneId, RuneKind, Selector, Shop, ShopId, StatusFlag, Targeting,
    UnitBlueprint, UnitField, UnitId, UnitStats,
};

/// Modifier kind applied by stuns.
pub const STUN_MODIFIER: ModifierId = ModifierId::new(1);
/// Modifier kind applied by silences.
pub const SILENCE_MODIFIER: ModifierId = ModifierId::new(2);
/// Modifier kind applied by roots.
pub const ROOT_MODIFIER: ModifierId = ModifierId::new(3);
/// Modifier kind granted by double damage runes.
pub const DOUBLE_DAMAGE_MODIFIER: ModifierId = ModifierId::new(4);
/// Modifier kind applied by the warden's overgrowth form.
pub const OVERGROWTH_MODIFIER: ModifierId = ModifierId::new(5);

/// Gold granted by a bounty rune.
pub const BOUNTY_RUNE_GOLD: u32 = 75;
/// Owner turns a double damage rune modifier lasts.
pub const DOUBLE_DAMAGE_TURNS: u32 = 2;

/// Ability identifier every hero uses for its basic attack.
pub const BASIC_ATTACK: AbilityId = AbilityId::new(0);

/// Heroes available in the sample catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hero {
    /// Melee bruiser with a hook and a stun.
    Butcher,
    /// Ranged caster with area damage, blink and a split damage ultimate.
    Sorcerer,
    /// Support with healing, silence and a T-shaped sweep.
    Warden,
    /// Plain melee unit with a basic attack only.
    Creep,
}

impl Hero {
    /// Base statistics of the hero.
    #[must_use]
    pub const fn stats(self) -> UnitStats {
        match self {
            Self::Butcher => UnitStats {
                max_health: 120,
                max_mana: 40,
                max_move_points: 3,
                attack_damage: 12,
                level: 1,
            },
            Self::Sorcerer => UnitStats {
                max_health: 80,
                max_mana: 80,
                max_move_points: 3,
                attack_damage: 8,
                level: 1,
            },
            Self::Warden => UnitStats {
                max_health: 100,
                max_mana: 60,
                max_move_points: 3,
                attack_damage: 10,
                level: 1,
            },
            Self::Creep => UnitStats {
                max_health: 40,
                max_mana: 0,
                max_move_points: 2,
                attack_damage: 6,
                level: 1,
            },
        }
    }

    /// Abilities the hero spawns with.
    #[must_use]
    pub fn abilities(self) -> Vec<Ability> {
        match self {
            Self::Butcher => vec![
                basic_attack(1),
                active(
                    1,
                    AbilityKind::Hook(Hook {
                        damage: 25,
                        hit_chance_percent: 75,
                    }),
                    AbilityTargetType::GroundTarget,
                    Targeting::line(5),
                    Selector::line(5),
                    (3, 15, 1),
                ),
                active(
                    2,
                    AbilityKind::AreaDamage(AreaDamage {
                        damage: 15,
                        modifier: Some(status_modifier(STUN_MODIFIER, StatusFlag::Stunned, 1)),
                    }),
                    AbilityTargetType::NoTarget,
                    Targeting::rectangle(1),
                    Selector::rectangle(1),
                    (3, 10, 2),
                ),
                Ability::Passive(PassiveAbility {
                    id: AbilityId::new(3),
                    available_since_level: 1,
                }),
            ],
            Self::Sorcerer => vec![
                basic_attack(2),
                active(
                    1,
                    AbilityKind::AreaDamage(AreaDamage {
                        damage: 20,
                        modifier: None,
                    }),
                    AbilityTargetType::GroundTarget,
                    Targeting::manhattan(4),
                    Selector::rectangle(1),
                    (2, 20, 1),
                ),
                active(
                    2,
                    AbilityKind::Blink(Blink {}),
                    AbilityTargetType::GroundTarget,
                    Targeting::manhattan(4),
                    Selector::single(),
                    (3, 10, 2),
                ),
                active(
                    3,
                    AbilityKind::SplitDamage(SplitDamage { total_damage: 30 }),
                    AbilityTargetType::NoTarget,
                    Targeting::rectangle(3),
                    Selector::rectangle(3),
                    (5, 40, 3),
                ),
            ],
            Self::Warden => vec![
                basic_attack(1),
                active(
                    1,
                    AbilityKind::Heal(Heal { amount: 30 }),
                    AbilityTargetType::UnitTarget,
                    Targeting::manhattan(3),
                    Selector::single(),
                    (2, 15, 1),
                ),
                active(
                    2,
                    AbilityKind::ApplyModifier(ApplyModifier {
                        modifier: status_modifier(SILENCE_MODIFIER, StatusFlag::Silenced, 2),
                        targets_allies: false,
                    }),
                    AbilityTargetType::UnitTarget,
                    Targeting::manhattan(3),
                    Selector::single(),
                    (3, 20, 1),
                ),
                active(
                    3,
                    AbilityKind::AreaDamage(AreaDamage {
                        damage: 18,
                        modifier: None,
                    }),
                    AbilityTargetType::GroundTarget,
                    Targeting::line(4),
                    Selector::t_shape(2, 1),
                    (2, 15, 2),
                ),
                active(
                    4,
                    AbilityKind::UnitDamage(UnitDamage {
                        damage: 10,
                        modifier: Some(status_modifier(ROOT_MODIFIER, StatusFlag::Rooted, 1)),
                    }),
                    AbilityTargetType::UnitTarget,
                    Targeting::manhattan(3),
                    Selector::single(),
                    (3, 15, 3),
                ),
                active(
                    5,
                    AbilityKind::ApplyModifier(ApplyModifier {
                        modifier: overgrowth_form(),
                        targets_allies: true,
                    }),
                    AbilityTargetType::UnitTarget,
                    Targeting::manhattan(0),
                    Selector::single(),
                    (6, 30, 4),
                ),
            ],
            Self::Creep => vec![basic_attack(1)],
        }
    }

    /// Complete spawn description of the hero.
    #[must_use]
    pub fn blueprint(self, id: UnitId, owner: PlayerId, position: CellCoord) -> UnitBlueprint {
        UnitBlueprint {
            id,
            owner,
            position,
            stats: self.stats(),
            abilities: self.abilities(),
        }
    }

    /// Hero card deploying this hero.
    #[must_use]
    pub fn card(self, id: CardId) -> Card {
        Card {
            id,
            stats: self.stats(),
            abilities: self.abilities(),
        }
    }
}

/// Modifier granted by a double damage rune.
#[must_use]
pub fn double_damage_modifier() -> ModifierTemplate {
    status_modifier(
        DOUBLE_DAMAGE_MODIFIER,
        StatusFlag::DoubleDamage,
        DOUBLE_DAMAGE_TURNS,
    )
}

/// Items stocked by the sample shop.
#[must_use]
pub fn shop_items() -> Vec<Item> {
    vec![
        Item {
            id: ItemId::new(1),
            cost: 150,
            changes: vec![FieldChange {
                field: UnitField::AttackDamage,
                amount: 5,
            }],
        },
        Item {
            id: ItemId::new(2),
            cost: 100,
            changes: vec![FieldChange {
                field: UnitField::MaxMovePoints,
                amount: 1,
            }],
        },
        Item {
            id: ItemId::new(3),
            cost: 250,
            changes: vec![FieldChange {
                field: UnitField::MaxHealth,
                amount: 40,
            }],
        },
    ]
}

/// Player acting first in the demo battle, deploying along the top row.
pub const DEMO_RED: PlayerId = PlayerId::new(1);
/// Player acting second in the demo battle, deploying along the bottom row.
pub const DEMO_BLUE: PlayerId = PlayerId::new(2);

/// Setup deltas of an 8x8 demo battle.
///
/// Red fields a butcher at (1,1) and a sorcerer at (3,1) as units 1 and 2.
/// Blue fields a warden at (3,5) and a creep at (1,6) as units 3 and 4.
/// Runes lie at (5,3) (bounty), (2,3) (regeneration) and (6,5) (double
/// damage); a shop stands at (0,4). Each player holds one creep card and
/// 200 gold.
#[must_use]
pub fn demo_battle() -> Vec<Delta> {
    let demo_player = |id: PlayerId, row: u32| Player {
        id,
        gold: 200,
        deployment_zone: CellRect::from_origin_and_size(
            CellCoord::new(0, row),
            CellRectSize::new(8, 1),
        ),
        hand: vec![Hero::Creep.card(CardId::new(1))],
        has_used_a_card_this_turn: false,
    };
    let spawn = |id: u32, hero: Hero, owner: PlayerId, column: u32, row: u32| {
        Delta::UnitSpawn(UnitSpawn {
            unit: hero.blueprint(UnitId::new(id), owner, CellCoord::new(column, row)),
        })
    };
    let rune = |id: u32, kind: RuneKind, column: u32, row: u32| {
        Delta::RuneSpawn(RuneSpawn {
            rune: Rune {
                id: RuneId::new(id),
                kind,
                position: CellCoord::new(column, row),
            },
        })
    };

    vec![
        Delta::ConfigureGrid(ConfigureGrid {
            columns: 8,
            rows: 8,
        }),
        Delta::PlayerJoin(PlayerJoin {
            player: demo_player(DEMO_RED, 0),
        }),
        Delta::PlayerJoin(PlayerJoin {
            player: demo_player(DEMO_BLUE, 7),
        }),
        spawn(1, Hero::Butcher, DEMO_RED, 1, 1),
        spawn(2, Hero::Sorcerer, DEMO_RED, 3, 1),
        spawn(3, Hero::Warden, DEMO_BLUE, 3, 5),
        spawn(4, Hero::Creep, DEMO_BLUE, 1, 6),
        rune(1, RuneKind::Bounty, 5, 3),
        rune(2, RuneKind::Regeneration, 2, 3),
        rune(3, RuneKind::DoubleDamage, 6, 5),
        Delta::ShopSpawn(ShopSpawn {
            shop: Shop {
                id: ShopId::new(1),
                position: CellCoord::new(0, 4),
                items: shop_items(),
            },
        }),
        Delta::GameStart(GameStart {
            first_player_id: DEMO_RED,
        }),
    ]
}

fn status_modifier(modifier_id: ModifierId, flag: StatusFlag, turns: u32) -> ModifierTemplate {
    ModifierTemplate {
        modifier_id,
        changes: vec![ModifierChange::Status(StatusChange { flag })],
        duration: Some(turns),
    }
}

/// Swaps the warden's sweep for a wider one and hardens its bark for two turns.
fn overgrowth_form() -> ModifierTemplate {
    ModifierTemplate {
        modifier_id: OVERGROWTH_MODIFIER,
        changes: vec![
            ModifierChange::Field(FieldChange {
                field: UnitField::MaxHealth,
                amount: 30,
            }),
            ModifierChange::AbilitySwap(AbilitySwap {
                from: AbilityId::new(3),
                to: active(
                    6,
                    AbilityKind::AreaDamage(AreaDamage {
                        damage: 24,
                        modifier: None,
                    }),
                    AbilityTargetType::GroundTarget,
                    Targeting::line(4),
                    Selector::t_shape(3, 2),
                    (2, 10, 1),
                ),
            }),
        ],
        duration: Some(2),
    }
}

fn basic_attack(range: u32) -> Ability {
    active(
        BASIC_ATTACK.get(),
        AbilityKind::BasicAttack(BasicAttack {}),
        AbilityTargetType::UnitTarget,
        Targeting::manhattan(range),
        Selector::single(),
        (0, 0, 1),
    )
}

/// Builds an active ability; `costs` is `(cooldown, mana_cost, available_since_level)`.
fn active(
    id: u32,
    kind: AbilityKind,
    target_type: AbilityTargetType,
    targeting: Targeting,
    selector: Selector,
    costs: (u32, u32, u32),
) -> Ability {
    let (cooldown, mana_cost, available_since_level) = costs;
    Ability::Active(ActiveAbility {
        id: AbilityId::new(id),
        kind,
        target_type,
        targeting,
        selector,
        cooldown,
        cooldown_remaining: 0,
        mana_cost,
        available_since_level,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_hero_has_a_basic_attack_and_unique_ability_ids() {
        for hero in [Hero::Butcher, Hero::Sorcerer, Hero::Warden, Hero::Creep] {
            let abilities = hero.abilities();
            let ids: HashSet<_> = abilities.iter().map(Ability::id).collect();
            assert_eq!(ids.len(), abilities.len(), "{hero:?} repeats an ability id");
            let attack = abilities
                .iter()
                .find(|ability| ability.id() == BASIC_ATTACK)
                .and_then(Ability::as_active)
                .expect("basic attack present");
            assert!(matches!(attack.kind, AbilityKind::BasicAttack(_)));
        }
    }

    #[test]
    fn every_active_ability_is_aimed_the_way_its_kind_resolves() {
        for hero in [Hero::Butcher, Hero::Sorcerer, Hero::Warden, Hero::Creep] {
            for ability in hero.abilities() {
                if let Some(active) = ability.as_active() {
                    assert!(
                        active.kind.supports(active.target_type),
                        "{hero:?} ability {} is aimed as {:?}",
                        active.id,
                        active.target_type
                    );
                }
            }
        }
    }

    #[test]
    fn demo_battle_starts_with_configuration_and_ends_with_game_start() {
        let setup = demo_battle();
        assert!(matches!(setup.first(), Some(Delta::ConfigureGrid(_))));
        assert!(matches!(setup.last(), Some(Delta::GameStart(_))));
        let spawned = setup
            .iter()
            .filter(|delta| matches!(delta, Delta::UnitSpawn(_)))
            .count();
        assert_eq!(spawned, 4);
    }

    #[test]
    fn cards_deploy_the_same_hero_as_blueprints() {
        let card = Hero::Warden.card(CardId::new(1));
        let blueprint =
            Hero::Warden.blueprint(UnitId::new(5), PlayerId::new(2), CellCoord::new(0, 0));
        assert_eq!(card.stats, blueprint.stats);
        assert_eq!(card.abilities, blueprint.abilities);
    }
}
