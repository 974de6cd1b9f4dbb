#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish battle engine.
//!
//! This crate defines the message surface that connects every runtime taking
//! part in a battle. Clients submit [`TurnAction`] values describing an
//! intent, the authority validates them and answers with [`Delta`] records,
//! and every consumer (the authority included) advances its own copy of the
//! battle by collapsing those deltas in strictly increasing index order.
//! Nothing but serialized deltas and snapshots ever crosses a runtime
//! boundary; all entities are referenced by stable numeric identifiers.

#[macro_use]
mod wire;

pub mod action;
pub mod catalog;
pub mod delta;
pub mod error;
pub mod model;
pub mod snapshot;

use serde::{Deserialize, Serialize};

pub use action::{ActionRequest, ActionResponse, PullRequest, PullResponse, TurnAction};
pub use delta::{AbilityEffect, Delta, HealthChange, HookOutcome, RuneEffect, TargetHit};
pub use error::{
    AbilityError, ActionError, CardError, MoveError, PlayerError, PurchaseError, RuneError,
    UnitError,
};
pub use model::{
    Ability, AbilityKind, AbilityTargetType, ActiveAbility, AppliedModifier, Card, Item,
    ModifierApplication, ModifierChange, ModifierTemplate, PassiveAbility, Player, Rune,
    RuneKind, Selector, Shop, StatusFlag, Targeting, Unit, UnitBlueprint, UnitField, UnitStats,
};
pub use snapshot::{BattlePhase, BattleSnapshot};
pub use wire::UnknownCode;

/// Highest level a unit can reach through kill rewards.
pub const MAX_LEVEL: u32 = 6;

/// Gold awarded to a player whenever one of its units kills an enemy unit.
pub const KILL_BOUNTY: u32 = 100;

/// Maximum number of items a single unit may carry.
pub const MAX_ITEMS: usize = 6;

define_id! {
    /// Stable identifier of a unit; assigned once by a spawn delta and never reused.
    UnitId
}

define_id! {
    /// Identifier of a player taking part in the battle.
    PlayerId
}

define_id! {
    /// Identifier of an ability, unique within the unit that owns it.
    AbilityId
}

define_id! {
    /// Identifier of a modifier kind; several instances of one kind may coexist.
    ModifierId
}

define_id! {
    /// Identifier of a single modifier application instance.
    ModifierHandleId
}

define_id! {
    /// Identifier of a purchasable item kind.
    ItemId
}

define_id! {
    /// Identifier of a hero card held in a player's hand.
    CardId
}

define_id! {
    /// Identifier of a rune lying on the grid.
    RuneId
}

define_id! {
    /// Identifier of a shop placed on the grid.
    ShopId
}

define_id! {
    /// Identifier of a battle hosted by an authority.
    BattleId
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the Chebyshev (king move) distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }

    /// Signed column and row difference from `self` to `other`.
    #[must_use]
    pub fn delta_to(self, other: CellCoord) -> (i64, i64) {
        (
            i64::from(other.column()) - i64::from(self.column()),
            i64::from(other.row()) - i64::from(self.row()),
        )
    }

    /// Returns the cell displaced by the signed offsets, if it stays non-negative.
    #[must_use]
    pub fn offset(self, columns: i64, rows: i64) -> Option<CellCoord> {
        let column = u32::try_from(i64::from(self.column()).checked_add(columns)?).ok()?;
        let row = u32::try_from(i64::from(self.row()).checked_add(rows)?).ok()?;
        Some(CellCoord::new(column, row))
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the cell lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let column = u64::from(cell.column());
        let row = u64::from(cell.row());
        let left = u64::from(self.origin.column());
        let top = u64::from(self.origin.row());
        column >= left
            && row >= top
            && column < left + u64::from(self.size.width())
            && row < top + u64::from(self.size.height())
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Dimensions of the battle grid measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridSize {
    columns: u32,
    rows: u32,
}

impl GridSize {
    /// Creates a new grid size.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies within the grid bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Row-major index of the cell, if it lies within the grid bounds.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        usize::try_from(u64::from(self.columns) * u64::from(self.rows)).unwrap_or(0)
    }
}
