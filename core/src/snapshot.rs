//! Whole-state snapshots used to fast-forward lagging consumers.

use serde::{Deserialize, Serialize};

use crate::{GridSize, ModifierHandleId, Player, PlayerId, Rune, Shop, Unit, UnitId};

wire_enum! {
    /// Lifecycle stage of a battle.
    pub enum BattlePhase {
        /// Grid, players and initial units are being set up.
        Setup = 0,
        /// Players are taking turns.
        InProgress = 1,
        /// Every living unit belongs to a single player, or none survived.
        Finished = 2,
    }
}

impl Default for BattlePhase {
    fn default() -> Self {
        Self::Setup
    }
}

/// Complete, enumerable battle state at a given log position.
///
/// Replacing a consumer's battle with a snapshot and resuming incremental
/// pulls from [`BattleSnapshot::delta_head`] yields the same state as
/// replaying every delta up to that head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Number of deltas already collapsed into this state.
    pub delta_head: u32,
    /// Grid dimensions.
    pub grid: GridSize,
    /// Lifecycle stage.
    pub phase: BattlePhase,
    /// Winner once the battle finished, if any unit survived.
    pub winner: Option<PlayerId>,
    /// Players in turn order.
    pub players: Vec<Player>,
    /// Index into `players` of the acting player.
    pub turning_player_index: u32,
    /// Every unit ever spawned, dead ones included, in ascending id order.
    pub units: Vec<Unit>,
    /// Runes lying on the grid.
    pub runes: Vec<Rune>,
    /// Shops placed on the grid.
    pub shops: Vec<Shop>,
    /// Next unit identifier the authority will allocate.
    pub next_unit_id: UnitId,
    /// Next modifier handle the authority will allocate.
    pub next_modifier_handle: ModifierHandleId,
}
