#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Side-effect-free permission chain that validates turn actions.
//!
//! Each step narrows the previous permission into a richer one or rejects
//! the request with a typed error. Permissions borrow the battle they were
//! checked against and cannot be built any other way, so holding one proves
//! the checks ran against that exact state.

use skirmish_core::{
    action::{
        GroundTargetAction, MoveAction, NoTargetAction, PickUpRuneAction, PurchaseItemAction,
        UnitTargetAction, UseHeroCardAction,
    },
    AbilityError, AbilityId, AbilityKind, AbilityTargetType, ActionError, ActiveAbility,
    BattlePhase, Card, CardError, CardId, CellCoord, Item, ItemId, MoveError, Player, PlayerError,
    PlayerId, PurchaseError, Rune, RuneError, RuneId, Shop, ShopId, StatusFlag, TurnAction, Unit,
    UnitError, UnitId, MAX_ITEMS,
};
use skirmish_system_targeting::targeting_fits;
use skirmish_world::{query, Battle, Traversal};

/// The requesting player may act now.
#[derive(Clone, Copy, Debug)]
pub struct PlayerPermission<'a> {
    battle: &'a Battle,
    player: &'a Player,
}

impl<'a> PlayerPermission<'a> {
    /// Battle the permission was checked against.
    #[must_use]
    pub const fn battle(&self) -> &'a Battle {
        self.battle
    }

    /// Acting player.
    #[must_use]
    pub const fn player(&self) -> &'a Player {
        self.player
    }
}

/// The acting player may command the unit.
#[derive(Clone, Copy, Debug)]
pub struct UnitPermission<'a> {
    player: PlayerPermission<'a>,
    unit: &'a Unit,
}

impl<'a> UnitPermission<'a> {
    /// Permission of the commanding player.
    #[must_use]
    pub const fn player(&self) -> PlayerPermission<'a> {
        self.player
    }

    /// Commanded unit.
    #[must_use]
    pub const fn unit(&self) -> &'a Unit {
        self.unit
    }

    /// Battle the permission was checked against.
    #[must_use]
    pub const fn battle(&self) -> &'a Battle {
        self.player.battle
    }
}

/// The unit may walk to the destination.
#[derive(Clone, Copy, Debug)]
pub struct MovePermission<'a> {
    unit: UnitPermission<'a>,
    to: CellCoord,
    cost: u32,
}

impl<'a> MovePermission<'a> {
    /// Permission of the moving unit.
    #[must_use]
    pub const fn unit(&self) -> UnitPermission<'a> {
        self.unit
    }

    /// Destination cell.
    #[must_use]
    pub const fn to(&self) -> CellCoord {
        self.to
    }

    /// Move points the walk costs.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }
}

/// The unit may use the ability, pending target checks.
#[derive(Clone, Copy, Debug)]
pub struct AbilityPermission<'a> {
    unit: UnitPermission<'a>,
    ability: &'a ActiveAbility,
}

impl<'a> AbilityPermission<'a> {
    /// Permission of the casting unit.
    #[must_use]
    pub const fn unit(&self) -> UnitPermission<'a> {
        self.unit
    }

    /// Ability about to be used.
    #[must_use]
    pub const fn ability(&self) -> &'a ActiveAbility {
        self.ability
    }
}

/// Validated target of an ability use.
#[derive(Clone, Copy, Debug)]
pub enum CastTarget<'a> {
    /// A grid cell.
    Ground(CellCoord),
    /// A unit.
    Unit(&'a Unit),
    /// The caster's own position.
    NoTarget,
}

/// The ability may be used on the target.
#[derive(Clone, Copy, Debug)]
pub struct CastPermission<'a> {
    ability: AbilityPermission<'a>,
    target: CastTarget<'a>,
}

impl<'a> CastPermission<'a> {
    /// Permission of the ability.
    #[must_use]
    pub const fn ability(&self) -> AbilityPermission<'a> {
        self.ability
    }

    /// Validated target.
    #[must_use]
    pub const fn target(&self) -> CastTarget<'a> {
        self.target
    }

    /// Cell the ability is aimed at.
    #[must_use]
    pub const fn aim(&self) -> CellCoord {
        match self.target {
            CastTarget::Ground(cell) => cell,
            CastTarget::Unit(unit) => unit.position,
            CastTarget::NoTarget => self.ability.unit.unit.position,
        }
    }
}

/// The player may deploy the card onto the cell.
#[derive(Clone, Copy, Debug)]
pub struct CardPermission<'a> {
    player: PlayerPermission<'a>,
    card: &'a Card,
    at: CellCoord,
}

impl<'a> CardPermission<'a> {
    /// Permission of the deploying player.
    #[must_use]
    pub const fn player(&self) -> PlayerPermission<'a> {
        self.player
    }

    /// Card being played.
    #[must_use]
    pub const fn card(&self) -> &'a Card {
        self.card
    }

    /// Deployment cell.
    #[must_use]
    pub const fn at(&self) -> CellCoord {
        self.at
    }
}

/// The unit may walk onto the rune and consume it.
#[derive(Clone, Copy, Debug)]
pub struct RunePermission<'a> {
    unit: UnitPermission<'a>,
    rune: &'a Rune,
    cost: u32,
}

impl<'a> RunePermission<'a> {
    /// Permission of the collecting unit.
    #[must_use]
    pub const fn unit(&self) -> UnitPermission<'a> {
        self.unit
    }

    /// Rune being collected.
    #[must_use]
    pub const fn rune(&self) -> &'a Rune {
        self.rune
    }

    /// Move points the walk costs.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }
}

/// The unit may buy the item.
#[derive(Clone, Copy, Debug)]
pub struct PurchasePermission<'a> {
    unit: UnitPermission<'a>,
    shop: &'a Shop,
    item: &'a Item,
}

impl<'a> PurchasePermission<'a> {
    /// Permission of the receiving unit.
    #[must_use]
    pub const fn unit(&self) -> UnitPermission<'a> {
        self.unit
    }

    /// Shop selling the item.
    #[must_use]
    pub const fn shop(&self) -> &'a Shop {
        self.shop
    }

    /// Item being bought.
    #[must_use]
    pub const fn item(&self) -> &'a Item {
        self.item
    }
}

/// The player may pass the turn.
#[derive(Clone, Copy, Debug)]
pub struct EndTurnPermission<'a> {
    player: PlayerPermission<'a>,
    next_player: &'a Player,
}

impl<'a> EndTurnPermission<'a> {
    /// Permission of the player ending the turn.
    #[must_use]
    pub const fn player(&self) -> PlayerPermission<'a> {
        self.player
    }

    /// Player acting next.
    #[must_use]
    pub const fn next_player(&self) -> &'a Player {
        self.next_player
    }
}

/// Final permission produced for any turn action.
#[derive(Clone, Copy, Debug)]
pub enum Permission<'a> {
    /// Walk to a cell.
    Move(MovePermission<'a>),
    /// Use an ability.
    Cast(CastPermission<'a>),
    /// Deploy a hero card.
    Card(CardPermission<'a>),
    /// Collect a rune.
    Rune(RunePermission<'a>),
    /// Buy an item.
    Purchase(PurchasePermission<'a>),
    /// Pass the turn.
    EndTurn(EndTurnPermission<'a>),
}

impl<'a> Permission<'a> {
    /// Battle the permission was checked against.
    #[must_use]
    pub const fn battle(&self) -> &'a Battle {
        match self {
            Self::Move(permission) => permission.unit.player.battle,
            Self::Cast(permission) => permission.ability.unit.player.battle,
            Self::Card(permission) => permission.player.battle,
            Self::Rune(permission) => permission.unit.player.battle,
            Self::Purchase(permission) => permission.unit.player.battle,
            Self::EndTurn(permission) => permission.player.battle,
        }
    }
}

/// Runs the full chain for a turn action submitted by `player_id`.
pub fn authorize<'a>(
    battle: &'a Battle,
    player_id: PlayerId,
    action: &TurnAction,
) -> Result<Permission<'a>, ActionError> {
    let player = authorize_action_by_player(battle, player_id)?;
    let permission = match action {
        TurnAction::Move(MoveAction { unit_id, to }) => {
            let unit = authorize_act_on_unit(player, *unit_id)?;
            Permission::Move(authorize_move(unit, *to)?)
        }
        TurnAction::EndTurn(_) => Permission::EndTurn(authorize_end_turn(player)?),
        TurnAction::GroundTargetAbility(GroundTargetAction {
            unit_id,
            ability_id,
            target,
        }) => {
            let ability = authorize_ability(authorize_act_on_unit(player, *unit_id)?, *ability_id)?;
            Permission::Cast(authorize_ground_target(ability, *target)?)
        }
        TurnAction::UnitTargetAbility(UnitTargetAction {
            unit_id,
            ability_id,
            target_id,
        }) => {
            let ability = authorize_ability(authorize_act_on_unit(player, *unit_id)?, *ability_id)?;
            Permission::Cast(authorize_unit_target(ability, *target_id)?)
        }
        TurnAction::NoTargetAbility(NoTargetAction {
            unit_id,
            ability_id,
        }) => {
            let ability = authorize_ability(authorize_act_on_unit(player, *unit_id)?, *ability_id)?;
            Permission::Cast(authorize_no_target(ability)?)
        }
        TurnAction::UseHeroCard(UseHeroCardAction { card_id, at }) => {
            Permission::Card(authorize_hero_card(player, *card_id, *at)?)
        }
        TurnAction::PickUpRune(PickUpRuneAction { unit_id, rune_id }) => {
            let unit = authorize_act_on_unit(player, *unit_id)?;
            Permission::Rune(authorize_rune_pick_up(unit, *rune_id)?)
        }
        TurnAction::PurchaseItem(PurchaseItemAction {
            unit_id,
            shop_id,
            item_id,
        }) => {
            let unit = authorize_act_on_unit(player, *unit_id)?;
            Permission::Purchase(authorize_purchase(unit, *shop_id, *item_id)?)
        }
    };
    Ok(permission)
}

/// Checks that the battle is running and that it is the player's turn.
pub fn authorize_action_by_player(
    battle: &Battle,
    player_id: PlayerId,
) -> Result<PlayerPermission<'_>, ActionError> {
    let player = query::player(battle, player_id).ok_or(PlayerError::UnknownPlayer)?;
    match query::phase(battle) {
        BattlePhase::Setup => return Err(PlayerError::GameNotStarted.into()),
        BattlePhase::Finished => return Err(PlayerError::GameOver.into()),
        BattlePhase::InProgress => {}
    }
    let turning = query::turning_player(battle).map(|turning| turning.id);
    if turning != Some(player_id) {
        return Err(PlayerError::NotYourTurn.into());
    }
    Ok(PlayerPermission { battle, player })
}

/// Checks that the unit exists, belongs to the player and is able to act.
pub fn authorize_act_on_unit(
    player: PlayerPermission<'_>,
    unit_id: UnitId,
) -> Result<UnitPermission<'_>, ActionError> {
    let unit = query::unit(player.battle, unit_id).ok_or(UnitError::UnknownUnit)?;
    if unit.owner != player.player.id {
        return Err(UnitError::NotYourUnit.into());
    }
    if !unit.is_alive() {
        return Err(UnitError::Dead.into());
    }
    if unit.has_status(StatusFlag::OutOfTheGame) {
        return Err(UnitError::OutOfTheGame.into());
    }
    if unit.has_status(StatusFlag::Stunned) {
        return Err(UnitError::Stunned.into());
    }
    Ok(UnitPermission { player, unit })
}

/// Checks that the unit can walk to the destination with its remaining move points.
pub fn authorize_move(
    unit: UnitPermission<'_>,
    to: CellCoord,
) -> Result<MovePermission<'_>, ActionError> {
    let battle = unit.battle();
    let mover = unit.unit;
    if mover.has_status(StatusFlag::Rooted) {
        return Err(MoveError::Rooted.into());
    }
    let cell = query::grid(battle).cell(to).ok_or(MoveError::OutOfBounds)?;
    if mover.position == to {
        return Err(MoveError::AlreadyThere.into());
    }
    if cell.is_occupied() {
        return Err(MoveError::CellOccupied.into());
    }
    if cell.rune().is_some() {
        return Err(MoveError::CellHasRune.into());
    }
    let reach = query::reachable(
        battle,
        mover.position,
        to,
        mover.move_points,
        Traversal::WALK,
    );
    if !reach.reachable {
        return Err(MoveError::Unreachable.into());
    }
    Ok(MovePermission {
        unit,
        to,
        cost: reach.cost,
    })
}

/// Checks that the unit can use the ability this turn.
pub fn authorize_ability(
    unit: UnitPermission<'_>,
    ability_id: AbilityId,
) -> Result<AbilityPermission<'_>, ActionError> {
    let caster = unit.unit;
    let ability = caster
        .ability(ability_id)
        .ok_or(AbilityError::UnknownAbility)?;
    let active = ability.as_active().ok_or(AbilityError::Passive)?;
    if !active.kind.supports(active.target_type) {
        return Err(AbilityError::UnsupportedTargetType.into());
    }
    if caster.level < active.available_since_level {
        return Err(AbilityError::NotLearned.into());
    }
    if matches!(active.kind, AbilityKind::BasicAttack(_)) {
        if caster.has_status(StatusFlag::Disarmed) {
            return Err(AbilityError::Disarmed.into());
        }
    } else if caster.has_status(StatusFlag::Silenced) {
        return Err(AbilityError::Silenced.into());
    }
    if caster.has_taken_an_action_this_turn {
        return Err(AbilityError::HasAlreadyActed.into());
    }
    if active.cooldown_remaining > 0 {
        return Err(AbilityError::OnCooldown.into());
    }
    if caster.mana < active.mana_cost {
        return Err(AbilityError::NotEnoughMana.into());
    }
    Ok(AbilityPermission {
        unit,
        ability: active,
    })
}

/// Checks a cell target against the ability's targeting shape.
pub fn authorize_ground_target(
    ability: AbilityPermission<'_>,
    target: CellCoord,
) -> Result<CastPermission<'_>, ActionError> {
    expect_target_type(ability, AbilityTargetType::GroundTarget)?;
    let battle = ability.unit.battle();
    let cell = query::grid(battle)
        .cell(target)
        .ok_or(AbilityError::OutOfBounds)?;
    if !targeting_fits(&ability.ability.targeting, ability.unit.unit.position, target) {
        return Err(AbilityError::OutOfRange.into());
    }
    if matches!(ability.ability.kind, AbilityKind::Blink(_))
        && (cell.is_occupied() || cell.rune().is_some())
    {
        return Err(AbilityError::CellOccupied.into());
    }
    Ok(CastPermission {
        ability,
        target: CastTarget::Ground(target),
    })
}

/// Checks a unit target's state, allegiance and distance.
pub fn authorize_unit_target(
    ability: AbilityPermission<'_>,
    target_id: UnitId,
) -> Result<CastPermission<'_>, ActionError> {
    expect_target_type(ability, AbilityTargetType::UnitTarget)?;
    let battle = ability.unit.battle();
    let caster = ability.unit.unit;
    let target = query::unit(battle, target_id).ok_or(AbilityError::UnknownTarget)?;
    if !target.is_alive() {
        return Err(AbilityError::TargetDead.into());
    }
    if target.has_status(StatusFlag::OutOfTheGame) {
        return Err(AbilityError::TargetOutOfTheGame.into());
    }
    let is_ally = target.owner == caster.owner;
    let wants_ally = match &ability.ability.kind {
        AbilityKind::Heal(_) => true,
        AbilityKind::ApplyModifier(modifier) => modifier.targets_allies,
        _ => false,
    };
    if is_ally != wants_ally {
        return Err(AbilityError::InvalidTarget.into());
    }
    if !targeting_fits(&ability.ability.targeting, caster.position, target.position) {
        return Err(AbilityError::OutOfRange.into());
    }
    Ok(CastPermission {
        ability,
        target: CastTarget::Unit(target),
    })
}

/// Checks that the ability is centered on its caster.
pub fn authorize_no_target(
    ability: AbilityPermission<'_>,
) -> Result<CastPermission<'_>, ActionError> {
    expect_target_type(ability, AbilityTargetType::NoTarget)?;
    Ok(CastPermission {
        ability,
        target: CastTarget::NoTarget,
    })
}

fn expect_target_type(
    ability: AbilityPermission<'_>,
    expected: AbilityTargetType,
) -> Result<(), ActionError> {
    if ability.ability.target_type == expected {
        Ok(())
    } else {
        Err(AbilityError::WrongTargetType.into())
    }
}

/// Checks that the card can be deployed onto the cell this turn.
pub fn authorize_hero_card(
    player: PlayerPermission<'_>,
    card_id: CardId,
    at: CellCoord,
) -> Result<CardPermission<'_>, ActionError> {
    if player.player.has_used_a_card_this_turn {
        return Err(CardError::HasUsedACardThisTurn.into());
    }
    let card = player.player.card(card_id).ok_or(CardError::UnknownCard)?;
    let cell = query::grid(player.battle)
        .cell(at)
        .ok_or(CardError::OutOfBounds)?;
    if !player.player.deployment_zone.contains(at) {
        return Err(CardError::NotInDeploymentZone.into());
    }
    if cell.is_occupied() {
        return Err(CardError::CellOccupied.into());
    }
    if cell.rune().is_some() {
        return Err(CardError::CellHasRune.into());
    }
    Ok(CardPermission { player, card, at })
}

/// Checks that the unit can walk onto the rune.
pub fn authorize_rune_pick_up(
    unit: UnitPermission<'_>,
    rune_id: RuneId,
) -> Result<RunePermission<'_>, ActionError> {
    let battle = unit.battle();
    let collector = unit.unit;
    if collector.has_status(StatusFlag::Rooted) {
        return Err(RuneError::Rooted.into());
    }
    let rune = query::rune(battle, rune_id).ok_or(RuneError::UnknownRune)?;
    let reach = query::reachable(
        battle,
        collector.position,
        rune.position,
        collector.move_points,
        Traversal::THROUGH_RUNES,
    );
    if !reach.reachable {
        return Err(RuneError::Unreachable.into());
    }
    Ok(RunePermission {
        unit,
        rune,
        cost: reach.cost,
    })
}

/// Checks that the unit stands next to the shop and its owner can afford the item.
pub fn authorize_purchase(
    unit: UnitPermission<'_>,
    shop_id: ShopId,
    item_id: ItemId,
) -> Result<PurchasePermission<'_>, ActionError> {
    let buyer = unit.unit;
    let shop = query::shop(unit.battle(), shop_id).ok_or(PurchaseError::UnknownShop)?;
    let item = shop.item(item_id).ok_or(PurchaseError::UnknownItem)?;
    if buyer.position.chebyshev_distance(shop.position) > 1 {
        return Err(PurchaseError::NotInShopRange.into());
    }
    if buyer.items.len() >= MAX_ITEMS {
        return Err(PurchaseError::InventoryFull.into());
    }
    if unit.player.player.gold < item.cost {
        return Err(PurchaseError::NotEnoughGold.into());
    }
    Ok(PurchasePermission { unit, shop, item })
}

/// Resolves the player acting after the current one.
pub fn authorize_end_turn(
    player: PlayerPermission<'_>,
) -> Result<EndTurnPermission<'_>, ActionError> {
    let next_player =
        query::player_after(player.battle, player.player.id).ok_or(PlayerError::UnknownPlayer)?;
    Ok(EndTurnPermission {
        player,
        next_player,
    })
}

#[cfg(test)]
mod tests {
    use skirmish_core::{
        catalog::{demo_battle, Hero, BASIC_ATTACK, DEMO_BLUE, DEMO_RED},
        delta::{EndTurn, ModifierApplied, UnitMove, UnitSpawn},
        model::StatusChange,
        Ability, Delta, ModifierApplication, ModifierChange, ModifierId,
    };
    use skirmish_world::{collapse, Collapse};

    use super::*;

    fn battle() -> Battle {
        let mut battle = Battle::new();
        for delta in demo_battle() {
            assert_eq!(collapse(&mut battle, &delta), Collapse::Applied);
        }
        battle
    }

    fn commit(battle: &mut Battle, delta: Delta) {
        assert_eq!(collapse(battle, &delta), Collapse::Applied);
    }

    fn status(battle: &mut Battle, unit: u32, flag: StatusFlag) {
        let handle_id = query::next_modifier_handle(battle);
        commit(
            battle,
            Delta::ModifierApplied(ModifierApplied {
                unit_id: UnitId::new(unit),
                application: ModifierApplication {
                    handle_id,
                    modifier_id: ModifierId::new(1),
                    changes: vec![ModifierChange::Status(StatusChange { flag })],
                    duration: Some(1),
                },
            }),
        );
    }

    fn rejection(battle: &Battle, player: PlayerId, action: TurnAction) -> ActionError {
        match authorize(battle, player, &action) {
            Ok(permission) => panic!("unexpected permission {permission:?}"),
            Err(error) => error,
        }
    }

    fn move_to(unit: u32, column: u32, row: u32) -> TurnAction {
        TurnAction::move_unit(UnitId::new(unit), CellCoord::new(column, row))
    }

    fn attack(unit: u32, target: u32) -> TurnAction {
        TurnAction::UnitTargetAbility(UnitTargetAction {
            unit_id: UnitId::new(unit),
            ability_id: BASIC_ATTACK,
            target_id: UnitId::new(target),
        })
    }

    #[test]
    fn only_the_turning_player_may_act() {
        let battle = battle();
        assert_eq!(
            rejection(&battle, DEMO_BLUE, TurnAction::end_turn()),
            ActionError::Player(PlayerError::NotYourTurn)
        );
        assert_eq!(
            rejection(&battle, PlayerId::new(9), TurnAction::end_turn()),
            ActionError::Player(PlayerError::UnknownPlayer)
        );
        let permission = authorize(&battle, DEMO_RED, &TurnAction::end_turn()).expect("allowed");
        let Permission::EndTurn(end) = permission else {
            panic!("expected end turn permission");
        };
        assert_eq!(end.next_player().id, DEMO_BLUE);
    }

    #[test]
    fn actions_before_game_start_are_rejected() {
        let mut battle = Battle::new();
        let setup = demo_battle();
        for delta in &setup[..setup.len() - 1] {
            let _ = collapse(&mut battle, delta);
        }
        assert_eq!(
            rejection(&battle, DEMO_RED, TurnAction::end_turn()),
            ActionError::Player(PlayerError::GameNotStarted)
        );
    }

    #[test]
    fn units_must_belong_to_the_player_and_be_able_to_act() {
        let mut battle = battle();
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(3, 3, 4)),
            ActionError::Unit(UnitError::NotYourUnit)
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(9, 3, 4)),
            ActionError::Unit(UnitError::UnknownUnit)
        );
        status(&mut battle, 1, StatusFlag::Stunned);
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(1, 1, 2)),
            ActionError::Unit(UnitError::Stunned)
        );
    }

    #[test]
    fn moves_respect_occupancy_runes_and_budget() {
        let mut battle = battle();
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(1, 3, 1)),
            ActionError::Move(MoveError::CellOccupied)
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(1, 2, 3)),
            ActionError::Move(MoveError::CellHasRune)
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(1, 1, 5)),
            ActionError::Move(MoveError::Unreachable)
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(1, 8, 1)),
            ActionError::Move(MoveError::OutOfBounds)
        );

        let permission = authorize(&battle, DEMO_RED, &move_to(1, 1, 4)).expect("allowed");
        let Permission::Move(step) = permission else {
            panic!("expected move permission");
        };
        assert_eq!(step.cost(), 3);

        status(&mut battle, 1, StatusFlag::Rooted);
        assert_eq!(
            rejection(&battle, DEMO_RED, move_to(1, 1, 2)),
            ActionError::Move(MoveError::Rooted)
        );
    }

    #[test]
    fn basic_attacks_need_an_enemy_in_range() {
        let mut battle = battle();
        assert_eq!(
            rejection(&battle, DEMO_RED, attack(1, 2)),
            ActionError::Ability(AbilityError::InvalidTarget)
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, attack(1, 3)),
            ActionError::Ability(AbilityError::OutOfRange)
        );

        commit(
            &mut battle,
            Delta::UnitMove(UnitMove {
                unit_id: UnitId::new(1),
                to: CellCoord::new(3, 4),
                move_cost: 3,
            }),
        );
        assert!(authorize(&battle, DEMO_RED, &attack(1, 3)).is_ok());

        status(&mut battle, 1, StatusFlag::Disarmed);
        assert_eq!(
            rejection(&battle, DEMO_RED, attack(1, 3)),
            ActionError::Ability(AbilityError::Disarmed)
        );
    }

    #[test]
    fn abilities_declared_with_an_aim_their_kind_cannot_resolve_are_refused() {
        let mut battle = battle();
        let mut blueprint = Hero::Butcher.blueprint(UnitId::new(9), DEMO_RED, CellCoord::new(4, 1));
        for ability in &mut blueprint.abilities {
            if let Ability::Active(active) = ability {
                if active.id == AbilityId::new(1) {
                    active.target_type = AbilityTargetType::NoTarget;
                }
            }
        }
        commit(&mut battle, Delta::UnitSpawn(UnitSpawn { unit: blueprint }));

        let hook_on_the_spot = TurnAction::NoTargetAbility(NoTargetAction {
            unit_id: UnitId::new(9),
            ability_id: AbilityId::new(1),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, hook_on_the_spot),
            ActionError::Ability(AbilityError::UnsupportedTargetType)
        );
    }

    #[test]
    fn ability_gates_cover_level_silence_and_target_type() {
        let mut battle = battle();
        let stomp = TurnAction::NoTargetAbility(NoTargetAction {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(2),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, stomp),
            ActionError::Ability(AbilityError::NotLearned)
        );

        let hook_as_unit_target = TurnAction::UnitTargetAbility(UnitTargetAction {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(1),
            target_id: UnitId::new(3),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, hook_as_unit_target),
            ActionError::Ability(AbilityError::WrongTargetType)
        );

        let passive = TurnAction::NoTargetAbility(NoTargetAction {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(3),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, passive),
            ActionError::Ability(AbilityError::Passive)
        );

        let hook = TurnAction::GroundTargetAbility(GroundTargetAction {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(1),
            target: CellCoord::new(1, 6),
        });
        assert!(authorize(&battle, DEMO_RED, &hook).is_ok());
        let crooked_hook = TurnAction::GroundTargetAbility(GroundTargetAction {
            unit_id: UnitId::new(1),
            ability_id: AbilityId::new(1),
            target: CellCoord::new(2, 6),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, crooked_hook),
            ActionError::Ability(AbilityError::OutOfRange)
        );

        status(&mut battle, 1, StatusFlag::Silenced);
        assert_eq!(
            rejection(&battle, DEMO_RED, hook),
            ActionError::Ability(AbilityError::Silenced)
        );
    }

    #[test]
    fn hero_cards_deploy_once_per_turn_inside_the_zone() {
        let battle = battle();
        let outside = TurnAction::UseHeroCard(UseHeroCardAction {
            card_id: CardId::new(1),
            at: CellCoord::new(0, 2),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, outside),
            ActionError::Card(CardError::NotInDeploymentZone)
        );
        let missing = TurnAction::UseHeroCard(UseHeroCardAction {
            card_id: CardId::new(5),
            at: CellCoord::new(0, 0),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, missing),
            ActionError::Card(CardError::UnknownCard)
        );
        let inside = TurnAction::UseHeroCard(UseHeroCardAction {
            card_id: CardId::new(1),
            at: CellCoord::new(0, 0),
        });
        assert!(authorize(&battle, DEMO_RED, &inside).is_ok());
    }

    #[test]
    fn runes_must_be_within_walking_distance() {
        let battle = battle();
        let near = TurnAction::PickUpRune(PickUpRuneAction {
            unit_id: UnitId::new(1),
            rune_id: RuneId::new(2),
        });
        let Ok(Permission::Rune(pick_up)) = authorize(&battle, DEMO_RED, &near) else {
            panic!("expected rune permission");
        };
        assert_eq!(pick_up.cost(), 2);

        let far = TurnAction::PickUpRune(PickUpRuneAction {
            unit_id: UnitId::new(1),
            rune_id: RuneId::new(3),
        });
        assert_eq!(
            rejection(&battle, DEMO_RED, far),
            ActionError::Rune(RuneError::Unreachable)
        );
    }

    #[test]
    fn purchases_require_proximity_and_gold() {
        let mut battle = battle();
        let buy = |item: u32| {
            TurnAction::PurchaseItem(PurchaseItemAction {
                unit_id: UnitId::new(1),
                shop_id: ShopId::new(1),
                item_id: ItemId::new(item),
            })
        };
        assert_eq!(
            rejection(&battle, DEMO_RED, buy(1)),
            ActionError::Purchase(PurchaseError::NotInShopRange)
        );

        commit(
            &mut battle,
            Delta::UnitMove(UnitMove {
                unit_id: UnitId::new(1),
                to: CellCoord::new(1, 4),
                move_cost: 3,
            }),
        );
        assert!(authorize(&battle, DEMO_RED, &buy(1)).is_ok());
        assert_eq!(
            rejection(&battle, DEMO_RED, buy(3)),
            ActionError::Purchase(PurchaseError::NotEnoughGold)
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, buy(9)),
            ActionError::Purchase(PurchaseError::UnknownItem)
        );
    }

    #[test]
    fn acted_units_cannot_use_another_ability() {
        let mut battle = battle();
        commit(
            &mut battle,
            Delta::UnitMove(UnitMove {
                unit_id: UnitId::new(1),
                to: CellCoord::new(3, 4),
                move_cost: 3,
            }),
        );
        let Ok(Permission::Cast(cast)) = authorize(&battle, DEMO_RED, &attack(1, 3)) else {
            panic!("expected cast permission");
        };
        assert_eq!(cast.aim(), CellCoord::new(3, 5));

        commit(
            &mut battle,
            Delta::UnitAttack(skirmish_core::delta::UnitAttack {
                attacker_id: UnitId::new(1),
                ability_id: BASIC_ATTACK,
                health: skirmish_core::HealthChange {
                    target_id: UnitId::new(3),
                    source_id: Some(UnitId::new(1)),
                    new_value: 88,
                    change: -12,
                },
            }),
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, attack(1, 3)),
            ActionError::Ability(AbilityError::HasAlreadyActed)
        );

        commit(
            &mut battle,
            Delta::EndTurn(EndTurn {
                player_id: DEMO_RED,
                next_player_id: DEMO_BLUE,
            }),
        );
        assert_eq!(
            rejection(&battle, DEMO_RED, attack(1, 3)),
            ActionError::Player(PlayerError::NotYourTurn)
        );
    }
}
