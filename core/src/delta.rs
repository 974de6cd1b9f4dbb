//! Replicated state transitions.
//!
//! Every [`Delta`] carries the outcome of an authoritative decision, never
//! the inputs that produced it: damage is written as an absolute new health
//! value, random rolls are written as their results, and spawned entities
//! carry their complete description. Replaying a delta therefore needs
//! nothing beyond looking entities up by identifier.

use serde::{Deserialize, Serialize};

use crate::{
    model::{ModifierApplication, Player, Rune, Shop},
    AbilityId, CardId, CellCoord, Item, ModifierHandleId, PlayerId, RuneId, ShopId, UnitBlueprint,
    UnitId,
};

/// Absolute health update of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChange {
    /// Unit whose health changes.
    pub target_id: UnitId,
    /// Unit responsible for the change, if any.
    pub source_id: Option<UnitId>,
    /// Health after the change; collapsing sets this value verbatim.
    pub new_value: u32,
    /// Signed difference for display purposes only.
    pub change: i64,
}

/// Effect of an ability on one affected unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHit {
    /// Health update of the affected unit.
    pub health: HealthChange,
    /// Modifier applied to the unit, if it survived and the ability applies one.
    pub modifier: Option<ModifierApplication>,
}

/// Hook connected with a unit and dragged it next to the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookHit {
    /// Unit caught by the hook.
    pub target_id: UnitId,
    /// Health update of the caught unit.
    pub health: HealthChange,
    /// Cell the caught unit is dragged to.
    pub moved_to: CellCoord,
}

/// Hook did not connect with any unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookMiss {
    /// Cell where the projectile came to rest.
    pub final_point: CellCoord,
}

tagged_union! {
    /// Resolved outcome of a hook projectile.
    pub enum HookOutcome {
        /// The hook connected.
        Hit(HookHit) = 0,
        /// The hook missed.
        Miss(HookMiss) = 1,
    }
}

/// Damage dealt to every affected unit, in ascending unit id order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEffect {
    /// Per-unit outcomes.
    pub hits: Vec<TargetHit>,
}

/// Health restored to a single unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealEffect {
    /// Health update of the healed unit.
    pub health: HealthChange,
}

/// Resolved hook projectile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEffect {
    /// Hit or miss payload.
    pub outcome: HookOutcome,
}

/// Caster relocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkEffect {
    /// Cell the caster left.
    pub from: CellCoord,
    /// Cell the caster arrived on.
    pub to: CellCoord,
}

/// Modifier attached to a single unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierEffect {
    /// Unit receiving the modifier.
    pub target_id: UnitId,
    /// Modifier instance attached.
    pub application: ModifierApplication,
}

tagged_union! {
    /// Resolved effect nested inside an ability delta.
    pub enum AbilityEffect {
        /// Damage to one or more units.
        Damage(DamageEffect) = 0,
        /// Healing of one unit.
        Heal(HealEffect) = 1,
        /// Hook projectile outcome.
        Hook(HookEffect) = 2,
        /// Caster relocation.
        Blink(BlinkEffect) = 3,
        /// Modifier attachment.
        Modifier(ModifierEffect) = 4,
    }
}

/// Gold granted by a bounty rune.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyRuneEffect {
    /// Player receiving the gold.
    pub player_id: PlayerId,
    /// Gold after the pick up.
    pub new_gold: u32,
    /// Gold granted.
    pub change: i64,
}

/// Health and mana restored by a regeneration rune.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationRuneEffect {
    /// Health update of the unit.
    pub health: HealthChange,
    /// Mana after the pick up.
    pub new_mana: u32,
}

/// Modifier granted by a double damage rune.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleDamageRuneEffect {
    /// Modifier instance attached to the unit.
    pub application: ModifierApplication,
}

tagged_union! {
    /// Resolved effect of picking up a rune.
    pub enum RuneEffect {
        /// Gold for the owner.
        Bounty(BountyRuneEffect) = 0,
        /// Health and mana restoration.
        Regeneration(RegenerationRuneEffect) = 1,
        /// Double damage modifier.
        DoubleDamage(DoubleDamageRuneEffect) = 2,
    }
}

/// Sets the grid dimensions; always the first delta of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureGrid {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
}

/// Adds a player to the turn order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoin {
    /// Complete player description.
    pub player: Player,
}

/// Creates a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpawn {
    /// Complete unit description.
    pub unit: UnitBlueprint,
}

/// Places a rune on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneSpawn {
    /// Complete rune description.
    pub rune: Rune,
}

/// Places a shop on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSpawn {
    /// Complete shop description.
    pub shop: Shop,
}

/// Ends the setup phase and hands the first turn out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    /// Player acting first.
    pub first_player_id: PlayerId,
}

/// Relocates a unit along a path it could afford.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMove {
    /// Unit moving.
    pub unit_id: UnitId,
    /// Destination cell.
    pub to: CellCoord,
    /// Move points spent.
    pub move_cost: u32,
}

/// Basic attack of one unit on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAttack {
    /// Attacking unit.
    pub attacker_id: UnitId,
    /// Basic attack ability used.
    pub ability_id: AbilityId,
    /// Health update of the attacked unit.
    pub health: HealthChange,
}

/// Sets a unit's mana to an absolute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaChange {
    /// Unit whose mana changes.
    pub unit_id: UnitId,
    /// Mana after the change.
    pub new_value: u32,
    /// Signed difference for display purposes only.
    pub change: i64,
}

/// Use of an ability aimed at a grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTargetAbility {
    /// Casting unit.
    pub unit_id: UnitId,
    /// Ability used.
    pub ability_id: AbilityId,
    /// Aimed cell.
    pub target: CellCoord,
    /// Resolved effect.
    pub effect: AbilityEffect,
}

/// Use of an ability aimed at a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTargetAbility {
    /// Casting unit.
    pub unit_id: UnitId,
    /// Ability used.
    pub ability_id: AbilityId,
    /// Aimed unit.
    pub target_id: UnitId,
    /// Resolved effect.
    pub effect: AbilityEffect,
}

/// Use of an ability centered on its caster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoTargetAbility {
    /// Casting unit.
    pub unit_id: UnitId,
    /// Ability used.
    pub ability_id: AbilityId,
    /// Resolved effect.
    pub effect: AbilityEffect,
}

/// Attaches a modifier outside of an ability use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierApplied {
    /// Unit receiving the modifier.
    pub unit_id: UnitId,
    /// Modifier instance attached.
    pub application: ModifierApplication,
}

/// Detaches a modifier instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierRemoved {
    /// Handle of the modifier instance to remove.
    pub handle_id: ModifierHandleId,
}

/// Sets a unit's level to an absolute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    /// Unit whose level changes.
    pub unit_id: UnitId,
    /// Level after the change.
    pub new_level: u32,
}

/// Sets a player's gold to an absolute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldChange {
    /// Player whose gold changes.
    pub player_id: PlayerId,
    /// Gold after the change.
    pub new_value: u32,
    /// Signed difference for display purposes only.
    pub change: i64,
}

/// Deploys a hero from a card in the player's hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseHeroCard {
    /// Player playing the card.
    pub player_id: PlayerId,
    /// Card consumed from the hand.
    pub card_id: CardId,
    /// Complete description of the deployed hero.
    pub unit: UnitBlueprint,
}

/// Walks a unit onto a rune and consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunePickUp {
    /// Unit picking the rune up.
    pub unit_id: UnitId,
    /// Rune consumed.
    pub rune_id: RuneId,
    /// Move points spent walking onto the rune.
    pub move_cost: u32,
    /// Resolved effect.
    pub effect: RuneEffect,
}

/// Buys an item for a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    /// Unit receiving the item.
    pub unit_id: UnitId,
    /// Shop selling the item.
    pub shop_id: ShopId,
    /// Item bought, including its stat changes.
    pub item: Item,
    /// Owner's gold after the purchase.
    pub new_gold: u32,
}

/// Passes the turn to the next player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTurn {
    /// Player ending its turn.
    pub player_id: PlayerId,
    /// Player about to act.
    pub next_player_id: PlayerId,
}

/// Declares the battle finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    /// Player owning every remaining living unit, if any unit survived.
    pub winner: Option<PlayerId>,
}

tagged_union! {
    /// One committed, replayable state transition.
    pub enum Delta {
        /// Grid dimensions.
        ConfigureGrid(ConfigureGrid) = 0,
        /// Player joins the turn order.
        PlayerJoin(PlayerJoin) = 1,
        /// Unit creation.
        UnitSpawn(UnitSpawn) = 2,
        /// Rune placement.
        RuneSpawn(RuneSpawn) = 3,
        /// Shop placement.
        ShopSpawn(ShopSpawn) = 4,
        /// First turn handed out.
        GameStart(GameStart) = 5,
        /// Unit movement.
        UnitMove(UnitMove) = 6,
        /// Basic attack.
        UnitAttack(UnitAttack) = 7,
        /// Absolute health update.
        HealthChange(HealthChange) = 8,
        /// Absolute mana update.
        ManaChange(ManaChange) = 9,
        /// Ground targeted ability use.
        GroundTargetAbility(GroundTargetAbility) = 10,
        /// Unit targeted ability use.
        UnitTargetAbility(UnitTargetAbility) = 11,
        /// Caster centered ability use.
        NoTargetAbility(NoTargetAbility) = 12,
        /// Modifier attachment.
        ModifierApplied(ModifierApplied) = 13,
        /// Modifier detachment.
        ModifierRemoved(ModifierRemoved) = 14,
        /// Absolute level update.
        LevelChange(LevelChange) = 15,
        /// Absolute gold update.
        GoldChange(GoldChange) = 16,
        /// Hero deployment from a card.
        UseHeroCard(UseHeroCard) = 17,
        /// Rune pick up.
        RunePickUp(RunePickUp) = 18,
        /// Item purchase.
        PurchaseItem(PurchaseItem) = 19,
        /// Turn boundary.
        EndTurn(EndTurn) = 20,
        /// Battle finished.
        GameOver(GameOver) = 21,
    }
}
