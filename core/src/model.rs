//! Domain model value types describing units, abilities, modifiers and the
//! economy entities that populate a battle.

use serde::{Deserialize, Serialize};

use crate::{
    AbilityId, CardId, CellCoord, CellRect, ItemId, ModifierHandleId, ModifierId, PlayerId,
    RuneId, ShopId, UnitId,
};

wire_enum! {
    /// Unit stat that modifiers and items can adjust.
    pub enum UnitField {
        /// Upper bound of the unit's health pool.
        MaxHealth = 0,
        /// Upper bound of the unit's mana pool.
        MaxMana = 1,
        /// Move points restored at the start of the owner's turn.
        MaxMovePoints = 2,
        /// Damage dealt by basic attacks.
        AttackDamage = 3,
    }
}

wire_enum! {
    /// Behavioral status a modifier can impose on a unit.
    pub enum StatusFlag {
        /// The unit can neither move nor act.
        Stunned = 0,
        /// The unit cannot use abilities other than its basic attack.
        Silenced = 1,
        /// The unit cannot use its basic attack.
        Disarmed = 2,
        /// The unit cannot move.
        Rooted = 3,
        /// The unit is removed from play: it cannot act and cannot be targeted.
        OutOfTheGame = 4,
        /// Basic attacks deal twice the unit's attack damage.
        DoubleDamage = 5,
    }
}

wire_enum! {
    /// Kind of target an active ability is aimed at.
    pub enum AbilityTargetType {
        /// The ability is centered on its caster.
        NoTarget = 0,
        /// The ability is aimed at a grid cell.
        GroundTarget = 1,
        /// The ability is aimed at a unit.
        UnitTarget = 2,
    }
}

wire_enum! {
    /// Kind of rune that can be picked up from the grid.
    pub enum RuneKind {
        /// Grants gold to the owner of the unit picking it up.
        Bounty = 0,
        /// Restores the unit to full health and mana.
        Regeneration = 1,
        /// Applies a timed double-damage modifier.
        DoubleDamage = 2,
    }
}

/// Line targeting: the target must share a row or column with the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTargeting {
    /// Maximum distance along the shared axis.
    pub line_length: u32,
}

/// Disc targeting measured in Manhattan distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManhattanTargeting {
    /// Maximum Manhattan distance from the caster.
    pub distance: u32,
}

/// Square targeting centered on the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTargeting {
    /// Maximum Chebyshev distance from the caster.
    pub area_radius: u32,
}

tagged_union! {
    /// Shape determining where an ability may be aimed.
    pub enum Targeting {
        /// Collinear with the caster on one axis.
        Line(LineTargeting) = 0,
        /// Within a Manhattan distance of the caster.
        UnitInManhattanDistance(ManhattanTargeting) = 1,
        /// Within a square around the caster.
        RectangleAroundCaster(AreaTargeting) = 2,
    }
}

impl Targeting {
    /// Line targeting reaching `line_length` cells along one axis.
    #[must_use]
    pub const fn line(line_length: u32) -> Self {
        Self::Line(LineTargeting { line_length })
    }

    /// Manhattan disc targeting of the provided radius.
    #[must_use]
    pub const fn manhattan(distance: u32) -> Self {
        Self::UnitInManhattanDistance(ManhattanTargeting { distance })
    }

    /// Square targeting of the provided Chebyshev radius.
    #[must_use]
    pub const fn rectangle(area_radius: u32) -> Self {
        Self::RectangleAroundCaster(AreaTargeting { area_radius })
    }
}

/// Affects exactly the aimed cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSelector {}

/// Affects a square around the aimed cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectangleSelector {
    /// Chebyshev radius around the aim point.
    pub radius: u32,
}

/// Affects a ray leaving the caster toward the aim point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSelector {
    /// Number of cells covered by the ray, excluding the caster's own cell.
    pub length: u32,
}

/// Affects a stem leaving the caster plus a perpendicular arm at its end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TShapeSelector {
    /// Number of cells covered by the stem, excluding the caster's own cell.
    pub stem_length: u32,
    /// Number of cells the arm extends to either side of the stem's end.
    pub arm_length: u32,
}

tagged_union! {
    /// Shape determining which cells an aimed ability affects.
    pub enum Selector {
        /// Only the aimed cell.
        Single(SingleSelector) = 0,
        /// A square around the aimed cell.
        Rectangle(RectangleSelector) = 1,
        /// A ray from the caster toward the aimed cell.
        Line(LineSelector) = 2,
        /// A stem from the caster with a perpendicular arm at its end.
        TShape(TShapeSelector) = 3,
    }
}

impl Selector {
    /// Selector affecting only the aimed cell.
    #[must_use]
    pub const fn single() -> Self {
        Self::Single(SingleSelector {})
    }

    /// Selector affecting a square of the provided radius around the aim point.
    #[must_use]
    pub const fn rectangle(radius: u32) -> Self {
        Self::Rectangle(RectangleSelector { radius })
    }

    /// Selector affecting a ray of the provided length.
    #[must_use]
    pub const fn line(length: u32) -> Self {
        Self::Line(LineSelector { length })
    }

    /// Selector affecting a T-shaped footprint.
    #[must_use]
    pub const fn t_shape(stem_length: u32, arm_length: u32) -> Self {
        Self::TShape(TShapeSelector {
            stem_length,
            arm_length,
        })
    }
}

/// Adjusts a numeric unit stat by a signed amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Stat being adjusted.
    pub field: UnitField,
    /// Signed adjustment applied while the change is active.
    pub amount: i64,
}

/// Replaces one of the unit's abilities while the modifier is active.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySwap {
    /// Ability removed from the unit.
    pub from: AbilityId,
    /// Ability installed in its place.
    pub to: Ability,
}

/// Imposes a behavioral status while the modifier is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Status imposed on the unit.
    pub flag: StatusFlag,
}

tagged_union! {
    /// A single effect carried by a modifier.
    pub enum ModifierChange {
        /// Numeric stat adjustment.
        Field(FieldChange) = 0,
        /// Ability replacement.
        AbilitySwap(AbilitySwap) = 1,
        /// Behavioral status.
        Status(StatusChange) = 2,
    }
}

/// Description of a modifier an ability or rune applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierTemplate {
    /// Kind of modifier applied.
    pub modifier_id: ModifierId,
    /// Effects carried by the modifier.
    pub changes: Vec<ModifierChange>,
    /// Number of owner turns the modifier lasts; `None` is permanent.
    pub duration: Option<u32>,
}

impl ModifierTemplate {
    /// Instantiates the template under a freshly allocated handle.
    #[must_use]
    pub fn instantiate(&self, handle_id: ModifierHandleId) -> ModifierApplication {
        ModifierApplication {
            handle_id,
            modifier_id: self.modifier_id,
            changes: self.changes.clone(),
            duration: self.duration,
        }
    }
}

/// A concrete modifier instance as carried inside a delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierApplication {
    /// Handle unique to this application instance.
    pub handle_id: ModifierHandleId,
    /// Kind of modifier applied.
    pub modifier_id: ModifierId,
    /// Effects carried by the modifier.
    pub changes: Vec<ModifierChange>,
    /// Number of owner turns the modifier lasts; `None` is permanent.
    pub duration: Option<u32>,
}

/// A modifier currently attached to a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedModifier {
    /// Handle unique to this application instance.
    pub handle_id: ModifierHandleId,
    /// Kind of modifier applied.
    pub modifier_id: ModifierId,
    /// Effects carried by the modifier.
    pub changes: Vec<ModifierChange>,
    /// Owner turns left before the authority removes the modifier.
    pub duration_remaining: Option<u32>,
    /// Abilities displaced by swaps, restored when the modifier is removed.
    pub swapped_out: Vec<Ability>,
    /// How far each field change actually moved its stat, in change order.
    ///
    /// Stats clamp at their floor, so removal reverts by these amounts rather
    /// than by the declared ones.
    pub applied_shifts: Vec<i64>,
}

/// Basic attack using the caster's attack damage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAttack {}

/// Damage dealt to every enemy inside the selector footprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDamage {
    /// Damage dealt to each affected enemy.
    pub damage: u32,
    /// Modifier additionally applied to each surviving enemy.
    pub modifier: Option<ModifierTemplate>,
}

/// Damage dealt to a single targeted enemy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDamage {
    /// Damage dealt to the target.
    pub damage: u32,
    /// Modifier additionally applied to the target if it survives.
    pub modifier: Option<ModifierTemplate>,
}

/// Health restored to a single targeted ally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heal {
    /// Health restored, capped by the target's maximum health.
    pub amount: u32,
}

/// Projectile that pulls the first unit along its line next to the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    /// Damage dealt to a hooked enemy.
    pub damage: u32,
    /// Chance in percent that the projectile connects with a unit in its path.
    pub hit_chance_percent: u8,
}

/// Instant relocation of the caster to the aimed cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blink {}

/// Damage split at random among enemies inside the selector footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDamage {
    /// Total damage distributed one point at a time.
    pub total_damage: u32,
}

/// Modifier applied to a single targeted unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyModifier {
    /// Modifier applied to the target.
    pub modifier: ModifierTemplate,
    /// Whether the modifier targets allies instead of enemies.
    pub targets_allies: bool,
}

tagged_union! {
    /// Mechanism an active ability resolves through.
    pub enum AbilityKind {
        /// Basic attack.
        BasicAttack(BasicAttack) = 0,
        /// Damage to every enemy in the footprint.
        AreaDamage(AreaDamage) = 1,
        /// Damage to a single target.
        UnitDamage(UnitDamage) = 2,
        /// Healing of a single ally.
        Heal(Heal) = 3,
        /// Hook projectile with a miss chance.
        Hook(Hook) = 4,
        /// Caster relocation.
        Blink(Blink) = 5,
        /// Randomly split damage.
        SplitDamage(SplitDamage) = 6,
        /// Modifier on a single target.
        ApplyModifier(ApplyModifier) = 7,
    }
}

impl AbilityKind {
    /// Reports whether the mechanism can resolve when aimed the provided way.
    ///
    /// Single-target mechanisms need a unit, hooks and blinks need a cell,
    /// and area mechanisms work from any aim.
    #[must_use]
    pub const fn supports(&self, target_type: AbilityTargetType) -> bool {
        match self {
            Self::BasicAttack(_) | Self::UnitDamage(_) | Self::Heal(_) | Self::ApplyModifier(_) => {
                matches!(target_type, AbilityTargetType::UnitTarget)
            }
            Self::Hook(_) | Self::Blink(_) => {
                matches!(target_type, AbilityTargetType::GroundTarget)
            }
            Self::AreaDamage(_) | Self::SplitDamage(_) => true,
        }
    }
}

/// Ability that is used explicitly by the owning player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAbility {
    /// Identifier unique within the owning unit.
    pub id: AbilityId,
    /// Mechanism the ability resolves through.
    pub kind: AbilityKind,
    /// Kind of target the ability is aimed at.
    pub target_type: AbilityTargetType,
    /// Where the ability may be aimed.
    pub targeting: Targeting,
    /// Which cells the ability affects once aimed.
    pub selector: Selector,
    /// Owner turns the ability is unavailable after use.
    pub cooldown: u32,
    /// Owner turns left until the ability can be used again.
    pub cooldown_remaining: u32,
    /// Mana deducted on use.
    pub mana_cost: u32,
    /// Unit level required before the ability can be used.
    pub available_since_level: u32,
}

/// Ability with no explicit use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveAbility {
    /// Identifier unique within the owning unit.
    pub id: AbilityId,
    /// Unit level required before the ability takes effect.
    pub available_since_level: u32,
}

tagged_union! {
    /// An ability owned by a unit.
    pub enum Ability {
        /// Ability with no explicit use.
        Passive(PassiveAbility) = 0,
        /// Ability used explicitly.
        Active(ActiveAbility) = 1,
    }
}

impl Ability {
    /// Identifier of the ability within its unit.
    #[must_use]
    pub const fn id(&self) -> AbilityId {
        match self {
            Self::Passive(passive) => passive.id,
            Self::Active(active) => active.id,
        }
    }

    /// Unit level required before the ability becomes available.
    #[must_use]
    pub const fn available_since_level(&self) -> u32 {
        match self {
            Self::Passive(passive) => passive.available_since_level,
            Self::Active(active) => active.available_since_level,
        }
    }

    /// Active payload of the ability, if it is active.
    #[must_use]
    pub const fn as_active(&self) -> Option<&ActiveAbility> {
        match self {
            Self::Passive(_) => None,
            Self::Active(active) => Some(active),
        }
    }
}

/// Base statistics of a unit as it enters the battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum and starting health.
    pub max_health: u32,
    /// Maximum and starting mana.
    pub max_mana: u32,
    /// Move points restored every owner turn.
    pub max_move_points: u32,
    /// Damage dealt by basic attacks.
    pub attack_damage: u32,
    /// Starting level.
    pub level: u32,
}

/// Complete description of a unit carried by spawn deltas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBlueprint {
    /// Identifier allocated to the unit.
    pub id: UnitId,
    /// Player controlling the unit.
    pub owner: PlayerId,
    /// Cell the unit spawns on.
    pub position: CellCoord,
    /// Base statistics.
    pub stats: UnitStats,
    /// Abilities the unit owns.
    pub abilities: Vec<Ability>,
}

/// Full state of a unit taking part in a battle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier.
    pub id: UnitId,
    /// Player controlling the unit.
    pub owner: PlayerId,
    /// Cell the unit occupies.
    pub position: CellCoord,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Current mana.
    pub mana: u32,
    /// Maximum mana.
    pub max_mana: u32,
    /// Move points left this turn.
    pub move_points: u32,
    /// Move points restored every owner turn.
    pub max_move_points: u32,
    /// Damage dealt by basic attacks.
    pub attack_damage: u32,
    /// Current level.
    pub level: u32,
    /// Dead units stay in the roster so their identifiers remain resolvable.
    pub dead: bool,
    /// Whether the unit used an ability during the current turn.
    pub has_taken_an_action_this_turn: bool,
    /// Abilities the unit owns.
    pub abilities: Vec<Ability>,
    /// Modifiers currently attached to the unit, in application order.
    pub modifiers: Vec<AppliedModifier>,
    /// Items the unit carries, in purchase order.
    pub items: Vec<Item>,
}

impl Unit {
    /// Builds a fresh unit at full health and mana from its blueprint.
    #[must_use]
    pub fn from_blueprint(blueprint: &UnitBlueprint) -> Self {
        let stats = blueprint.stats;
        Self {
            id: blueprint.id,
            owner: blueprint.owner,
            position: blueprint.position,
            health: stats.max_health,
            max_health: stats.max_health,
            mana: stats.max_mana,
            max_mana: stats.max_mana,
            move_points: stats.max_move_points,
            max_move_points: stats.max_move_points,
            attack_damage: stats.attack_damage,
            level: stats.level,
            dead: false,
            has_taken_an_action_this_turn: false,
            abilities: blueprint.abilities.clone(),
            modifiers: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Reports whether the unit is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Reports whether any attached modifier imposes the provided status.
    #[must_use]
    pub fn has_status(&self, flag: StatusFlag) -> bool {
        self.modifiers.iter().any(|modifier| {
            modifier
                .changes
                .iter()
                .any(|change| matches!(change, ModifierChange::Status(status) if status.flag == flag))
        })
    }

    /// Looks up an ability by identifier.
    #[must_use]
    pub fn ability(&self, ability_id: AbilityId) -> Option<&Ability> {
        self.abilities
            .iter()
            .find(|ability| ability.id() == ability_id)
    }

    /// Damage a basic attack from this unit deals.
    #[must_use]
    pub fn basic_attack_damage(&self) -> u32 {
        if self.has_status(StatusFlag::DoubleDamage) {
            self.attack_damage.saturating_mul(2)
        } else {
            self.attack_damage
        }
    }

    /// Reports whether the unit is a valid target for abilities.
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        self.is_alive() && !self.has_status(StatusFlag::OutOfTheGame)
    }
}

/// Item sold by shops, carrying permanent stat adjustments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Kind of item.
    pub id: ItemId,
    /// Gold price.
    pub cost: u32,
    /// Stat adjustments granted to the carrier.
    pub changes: Vec<FieldChange>,
}

/// Hero card a player can deploy onto the grid once per turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Identifier of the card within the hand.
    pub id: CardId,
    /// Base statistics of the deployed hero.
    pub stats: UnitStats,
    /// Abilities of the deployed hero.
    pub abilities: Vec<Ability>,
}

/// Player taking part in the battle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Gold available for purchases.
    pub gold: u32,
    /// Region where the player's hero cards may be deployed.
    pub deployment_zone: CellRect,
    /// Cards not yet played.
    pub hand: Vec<Card>,
    /// Whether a card was played during the current turn.
    pub has_used_a_card_this_turn: bool,
}

impl Player {
    /// Looks up a card in the player's hand.
    #[must_use]
    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.hand.iter().find(|card| card.id == card_id)
    }
}

/// Rune lying on the grid waiting to be picked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rune {
    /// Identifier of the rune.
    pub id: RuneId,
    /// Effect granted on pick up.
    pub kind: RuneKind,
    /// Cell the rune lies on.
    pub position: CellCoord,
}

/// Shop placed on the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    /// Identifier of the shop.
    pub id: ShopId,
    /// Cell the shop stands on.
    pub position: CellCoord,
    /// Items for sale.
    pub items: Vec<Item>,
}

impl Shop {
    /// Looks up an item for sale.
    #[must_use]
    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn stunned() -> AppliedModifier {
        AppliedModifier {
            handle_id: ModifierHandleId::new(1),
            modifier_id: ModifierId::new(9),
            changes: vec![ModifierChange::Status(StatusChange {
                flag: StatusFlag::Stunned,
            })],
            duration_remaining: Some(1),
            swapped_out: Vec::new(),
            applied_shifts: Vec::new(),
        }
    }

    fn blueprint() -> UnitBlueprint {
        UnitBlueprint {
            id: UnitId::new(3),
            owner: PlayerId::new(1),
            position: CellCoord::new(2, 2),
            stats: UnitStats {
                max_health: 50,
                max_mana: 20,
                max_move_points: 3,
                attack_damage: 7,
                level: 1,
            },
            abilities: Vec::new(),
        }
    }

    #[test]
    fn units_spawn_at_full_resources() {
        let unit = Unit::from_blueprint(&blueprint());
        assert_eq!(unit.health, 50);
        assert_eq!(unit.mana, 20);
        assert_eq!(unit.move_points, 3);
        assert!(unit.is_alive());
    }

    #[test]
    fn status_flags_are_derived_from_modifiers() {
        let mut unit = Unit::from_blueprint(&blueprint());
        assert!(!unit.has_status(StatusFlag::Stunned));
        unit.modifiers.push(stunned());
        assert!(unit.has_status(StatusFlag::Stunned));
        assert!(!unit.has_status(StatusFlag::Silenced));
    }

    #[test]
    fn double_damage_doubles_basic_attacks() {
        let mut unit = Unit::from_blueprint(&blueprint());
        unit.modifiers.push(AppliedModifier {
            changes: vec![ModifierChange::Status(StatusChange {
                flag: StatusFlag::DoubleDamage,
            })],
            ..stunned()
        });
        assert_eq!(unit.basic_attack_damage(), 14);
    }

    #[test]
    fn single_target_kinds_need_a_unit_aim() {
        let heal = AbilityKind::Heal(Heal { amount: 5 });
        assert!(heal.supports(AbilityTargetType::UnitTarget));
        assert!(!heal.supports(AbilityTargetType::GroundTarget));
        assert!(!heal.supports(AbilityTargetType::NoTarget));

        let blink = AbilityKind::Blink(Blink {});
        assert!(blink.supports(AbilityTargetType::GroundTarget));
        assert!(!blink.supports(AbilityTargetType::NoTarget));

        let split = AbilityKind::SplitDamage(SplitDamage { total_damage: 10 });
        assert!(split.supports(AbilityTargetType::NoTarget));
    }

    #[test]
    fn targeting_travels_with_numeric_type() {
        let value = serde_json::to_value(Targeting::line(5)).expect("serialize");
        assert_eq!(value, json!({ "type": 0, "line_length": 5 }));
        let decoded: Targeting = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, Targeting::line(5));
    }

    #[test]
    fn field_less_enums_travel_as_codes() {
        let value = serde_json::to_value(StatusFlag::Rooted).expect("serialize");
        assert_eq!(value, json!(3));
        assert!(serde_json::from_value::<StatusFlag>(json!(42)).is_err());
    }
}
