//! Closed rejection reasons produced by the authorization chain.
//!
//! Every action kind has its own field-less enumeration so that clients can
//! render each rejection without a catch-all. On the wire an [`ActionError`]
//! is an object `{ "type": <group>, "kind": <code> }`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

wire_enum! {
    /// Rejections raised while checking the acting player.
    #[derive(Error)]
    pub enum PlayerError {
        /// The player does not take part in the battle.
        #[error("unknown player")]
        UnknownPlayer = 0,
        /// Another player is acting.
        #[error("it is not your turn")]
        NotYourTurn = 1,
        /// The battle has not started yet.
        #[error("the battle has not started")]
        GameNotStarted = 2,
        /// The battle is over.
        #[error("the battle is over")]
        GameOver = 3,
    }
}

wire_enum! {
    /// Rejections raised while checking the acting unit.
    #[derive(Error)]
    pub enum UnitError {
        /// No unit with the provided identifier exists.
        #[error("unknown unit")]
        UnknownUnit = 0,
        /// The unit belongs to another player.
        #[error("the unit belongs to another player")]
        NotYourUnit = 1,
        /// The unit is dead.
        #[error("the unit is dead")]
        Dead = 2,
        /// The unit is out of the game.
        #[error("the unit is out of the game")]
        OutOfTheGame = 3,
        /// The unit is stunned.
        #[error("the unit is stunned")]
        Stunned = 4,
    }
}

wire_enum! {
    /// Rejections specific to movement.
    #[derive(Error)]
    pub enum MoveError {
        /// The destination lies outside the grid.
        #[error("the destination is outside the grid")]
        OutOfBounds = 0,
        /// Another unit stands on the destination.
        #[error("the destination is occupied")]
        CellOccupied = 1,
        /// The destination cannot be reached with the remaining move points.
        #[error("the destination is out of reach")]
        Unreachable = 2,
        /// The unit is rooted.
        #[error("the unit is rooted")]
        Rooted = 3,
        /// A rune lies on the destination; it must be picked up instead.
        #[error("a rune lies on the destination")]
        CellHasRune = 4,
        /// The unit already stands on the destination.
        #[error("the unit already stands there")]
        AlreadyThere = 5,
    }
}

wire_enum! {
    /// Rejections specific to ability use.
    #[derive(Error)]
    pub enum AbilityError {
        /// The unit has no ability with the provided identifier.
        #[error("unknown ability")]
        UnknownAbility = 0,
        /// Passive abilities cannot be used.
        #[error("the ability is passive")]
        Passive = 1,
        /// The unit's level is too low.
        #[error("the ability is not learned yet")]
        NotLearned = 2,
        /// The ability is on cooldown.
        #[error("the ability is on cooldown")]
        OnCooldown = 3,
        /// The unit lacks mana.
        #[error("not enough mana")]
        NotEnoughMana = 4,
        /// The unit is silenced.
        #[error("the unit is silenced")]
        Silenced = 5,
        /// The unit is disarmed.
        #[error("the unit is disarmed")]
        Disarmed = 6,
        /// The unit already acted this turn.
        #[error("the unit has already acted this turn")]
        HasAlreadyActed = 7,
        /// The ability is aimed differently than requested.
        #[error("the ability is not used that way")]
        WrongTargetType = 8,
        /// The target does not fit the ability's targeting shape.
        #[error("the target is out of range")]
        OutOfRange = 9,
        /// The aimed cell lies outside the grid.
        #[error("the target is outside the grid")]
        OutOfBounds = 10,
        /// No unit with the provided identifier exists.
        #[error("unknown target")]
        UnknownTarget = 11,
        /// The targeted unit is dead.
        #[error("the target is dead")]
        TargetDead = 12,
        /// The targeted unit is out of the game.
        #[error("the target is out of the game")]
        TargetOutOfTheGame = 13,
        /// The targeted unit has the wrong allegiance for this ability.
        #[error("the ability cannot target that unit")]
        InvalidTarget = 14,
        /// The aimed cell must be free.
        #[error("the target cell is occupied")]
        CellOccupied = 15,
        /// The ability's mechanism cannot resolve when aimed the way it is declared.
        #[error("the ability cannot be aimed that way")]
        UnsupportedTargetType = 16,
    }
}

wire_enum! {
    /// Rejections specific to hero card deployment.
    #[derive(Error)]
    pub enum CardError {
        /// The card is not in the player's hand.
        #[error("unknown card")]
        UnknownCard = 0,
        /// A card was already played this turn.
        #[error("a card was already played this turn")]
        HasUsedACardThisTurn = 1,
        /// The cell lies outside the player's deployment zone.
        #[error("the cell is outside the deployment zone")]
        NotInDeploymentZone = 2,
        /// Another unit stands on the cell.
        #[error("the cell is occupied")]
        CellOccupied = 3,
        /// The cell lies outside the grid.
        #[error("the cell is outside the grid")]
        OutOfBounds = 4,
        /// A rune lies on the cell.
        #[error("a rune lies on the cell")]
        CellHasRune = 5,
    }
}

wire_enum! {
    /// Rejections specific to rune pick up.
    #[derive(Error)]
    pub enum RuneError {
        /// No rune with the provided identifier lies on the grid.
        #[error("unknown rune")]
        UnknownRune = 0,
        /// The rune cannot be reached with the remaining move points.
        #[error("the rune is out of reach")]
        Unreachable = 1,
        /// The unit is rooted.
        #[error("the unit is rooted")]
        Rooted = 2,
    }
}

wire_enum! {
    /// Rejections specific to item purchases.
    #[derive(Error)]
    pub enum PurchaseError {
        /// No shop with the provided identifier exists.
        #[error("unknown shop")]
        UnknownShop = 0,
        /// The shop does not sell the item.
        #[error("unknown item")]
        UnknownItem = 1,
        /// The unit does not stand next to the shop.
        #[error("the unit is not next to the shop")]
        NotInShopRange = 2,
        /// The owner cannot afford the item.
        #[error("not enough gold")]
        NotEnoughGold = 3,
        /// The unit carries the maximum number of items.
        #[error("the inventory is full")]
        InventoryFull = 4,
    }
}

/// Any rejection an action submission can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum ActionError {
    /// The access token does not identify a player.
    #[error("invalid access token")]
    InvalidAccessToken,
    /// The battle identifier does not match a hosted battle.
    #[error("unknown battle")]
    UnknownBattle,
    /// Acting player rejection.
    #[error(transparent)]
    Player(#[from] PlayerError),
    /// Acting unit rejection.
    #[error(transparent)]
    Unit(#[from] UnitError),
    /// Movement rejection.
    #[error(transparent)]
    Move(#[from] MoveError),
    /// Ability rejection.
    #[error(transparent)]
    Ability(#[from] AbilityError),
    /// Hero card rejection.
    #[error(transparent)]
    Card(#[from] CardError),
    /// Rune rejection.
    #[error(transparent)]
    Rune(#[from] RuneError),
    /// Purchase rejection.
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
}

const SESSION_GROUP: u8 = 0;
const PLAYER_GROUP: u8 = 1;
const UNIT_GROUP: u8 = 2;
const MOVE_GROUP: u8 = 3;
const ABILITY_GROUP: u8 = 4;
const CARD_GROUP: u8 = 5;
const RUNE_GROUP: u8 = 6;
const PURCHASE_GROUP: u8 = 7;

impl ActionError {
    /// Numeric group and kind codes identifying the rejection on the wire.
    #[must_use]
    pub fn codes(&self) -> (u8, u8) {
        match self {
            Self::InvalidAccessToken => (SESSION_GROUP, 0),
            Self::UnknownBattle => (SESSION_GROUP, 1),
            Self::Player(error) => (PLAYER_GROUP, error.code()),
            Self::Unit(error) => (UNIT_GROUP, error.code()),
            Self::Move(error) => (MOVE_GROUP, error.code()),
            Self::Ability(error) => (ABILITY_GROUP, error.code()),
            Self::Card(error) => (CARD_GROUP, error.code()),
            Self::Rune(error) => (RUNE_GROUP, error.code()),
            Self::Purchase(error) => (PURCHASE_GROUP, error.code()),
        }
    }

    fn from_codes(group: u8, kind: u8) -> Result<Self, String> {
        let error = match group {
            SESSION_GROUP => match kind {
                0 => Self::InvalidAccessToken,
                1 => Self::UnknownBattle,
                other => return Err(format!("unknown session error kind {other}")),
            },
            PLAYER_GROUP => Self::Player(PlayerError::try_from(kind).map_err(|e| e.to_string())?),
            UNIT_GROUP => Self::Unit(UnitError::try_from(kind).map_err(|e| e.to_string())?),
            MOVE_GROUP => Self::Move(MoveError::try_from(kind).map_err(|e| e.to_string())?),
            ABILITY_GROUP => {
                Self::Ability(AbilityError::try_from(kind).map_err(|e| e.to_string())?)
            }
            CARD_GROUP => Self::Card(CardError::try_from(kind).map_err(|e| e.to_string())?),
            RUNE_GROUP => Self::Rune(RuneError::try_from(kind).map_err(|e| e.to_string())?),
            PURCHASE_GROUP => {
                Self::Purchase(PurchaseError::try_from(kind).map_err(|e| e.to_string())?)
            }
            other => return Err(format!("unknown action error group {other}")),
        };
        Ok(error)
    }
}

#[derive(Serialize, Deserialize)]
struct WireActionError {
    #[serde(rename = "type")]
    group: u8,
    kind: u8,
}

impl Serialize for ActionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (group, kind) = self.codes();
        WireActionError { group, kind }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActionError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireActionError::deserialize(deserializer)?;
        Self::from_codes(wire.group, wire.kind).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn action_errors_travel_as_group_and_kind() {
        let error = ActionError::from(CardError::NotInDeploymentZone);
        let value = serde_json::to_value(error).expect("serialize");
        assert_eq!(value, json!({ "type": 5, "kind": 2 }));
        let decoded: ActionError = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, error);
    }

    #[test]
    fn unknown_error_codes_are_rejected() {
        assert!(serde_json::from_value::<ActionError>(json!({ "type": 1, "kind": 40 })).is_err());
        assert!(serde_json::from_value::<ActionError>(json!({ "type": 12, "kind": 0 })).is_err());
    }

    #[test]
    fn nested_errors_render_their_own_message() {
        let error = ActionError::from(PlayerError::NotYourTurn);
        assert_eq!(error.to_string(), "it is not your turn");
    }
}
