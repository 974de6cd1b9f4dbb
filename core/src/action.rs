//! Player intents and the request/response envelopes exchanged with the authority.

use serde::{Deserialize, Serialize};

use crate::{
    AbilityId, BattleId, CardId, CellCoord, Delta, ItemId, RuneId, ShopId, UnitId,
};

/// Moves a unit to a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAction {
    /// Unit to move.
    pub unit_id: UnitId,
    /// Destination cell.
    pub to: CellCoord,
}

/// Ends the acting player's turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTurnAction {}

/// Uses an ability aimed at a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTargetAction {
    /// Casting unit.
    pub unit_id: UnitId,
    /// Ability to use.
    pub ability_id: AbilityId,
    /// Aimed cell.
    pub target: CellCoord,
}

/// Uses an ability aimed at a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTargetAction {
    /// Casting unit.
    pub unit_id: UnitId,
    /// Ability to use.
    pub ability_id: AbilityId,
    /// Aimed unit.
    pub target_id: UnitId,
}

/// Uses an ability centered on the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoTargetAction {
    /// Casting unit.
    pub unit_id: UnitId,
    /// Ability to use.
    pub ability_id: AbilityId,
}

/// Deploys a hero card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseHeroCardAction {
    /// Card to play.
    pub card_id: CardId,
    /// Cell to deploy the hero on.
    pub at: CellCoord,
}

/// Walks a unit onto a rune and picks it up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickUpRuneAction {
    /// Unit picking the rune up.
    pub unit_id: UnitId,
    /// Rune to pick up.
    pub rune_id: RuneId,
}

/// Buys an item from a shop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItemAction {
    /// Unit receiving the item.
    pub unit_id: UnitId,
    /// Shop selling the item.
    pub shop_id: ShopId,
    /// Item to buy.
    pub item_id: ItemId,
}

tagged_union! {
    /// Intent submitted by a player; carries only identifiers and coordinates.
    pub enum TurnAction {
        /// Unit movement.
        Move(MoveAction) = 0,
        /// Turn hand over.
        EndTurn(EndTurnAction) = 1,
        /// Ground targeted ability.
        GroundTargetAbility(GroundTargetAction) = 2,
        /// Unit targeted ability.
        UnitTargetAbility(UnitTargetAction) = 3,
        /// Caster centered ability.
        NoTargetAbility(NoTargetAction) = 4,
        /// Hero card deployment.
        UseHeroCard(UseHeroCardAction) = 5,
        /// Rune pick up.
        PickUpRune(PickUpRuneAction) = 6,
        /// Item purchase.
        PurchaseItem(PurchaseItemAction) = 7,
    }
}

impl TurnAction {
    /// Shorthand for a movement intent.
    #[must_use]
    pub const fn move_unit(unit_id: UnitId, to: CellCoord) -> Self {
        Self::Move(MoveAction { unit_id, to })
    }

    /// Shorthand for ending the turn.
    #[must_use]
    pub const fn end_turn() -> Self {
        Self::EndTurn(EndTurnAction {})
    }
}

/// Action submission sent by a client to the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Token identifying the submitting player.
    pub access_token: String,
    /// Intent to validate and commit.
    pub action: TurnAction,
}

/// Deltas committed in response to an accepted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Log length before the deltas were appended.
    pub previous_head: u32,
    /// Committed deltas, starting at index `previous_head`.
    pub deltas: Vec<Delta>,
}

/// Polling request for the log suffix starting at `since_delta`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Token identifying the polling player.
    pub access_token: String,
    /// Battle being followed.
    pub battle_id: BattleId,
    /// First delta index the consumer has not applied yet.
    pub since_delta: u32,
}

/// Contiguous log suffix answering a [`PullRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Deltas starting at the requested index, possibly truncated.
    pub deltas: Vec<Delta>,
    /// Authority's log length when the response was produced.
    pub head: u32,
}
