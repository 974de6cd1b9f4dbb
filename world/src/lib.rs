#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Battle state owned by a single runtime.
//!
//! A [`Battle`] only ever changes through [`collapse`], one delta at a time in
//! increasing index order. Every other crate reads it through [`query`].

mod collapse;
mod navigation;

use std::collections::BTreeMap;

use skirmish_core::{
    BattlePhase, BattleSnapshot, CellCoord, GridSize, ModifierHandleId, Player, PlayerId, Rune,
    RuneId, Shop, ShopId, Unit, UnitId,
};

pub use collapse::{collapse, Collapse, CollapseGap};
pub use navigation::{PathCell, Reachability, Traversal};

/// Contents of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    occupant: Option<UnitId>,
    rune: Option<RuneId>,
}

impl Cell {
    /// Living unit standing on the cell, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    /// Rune lying on the cell, if any.
    #[must_use]
    pub const fn rune(&self) -> Option<RuneId> {
        self.rune
    }

    /// Reports whether a living unit stands on the cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

/// Dense row-major cell array derived from unit and rune positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    size: GridSize,
    cells: Vec<Cell>,
}

impl Grid {
    pub(crate) fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size.cell_count()],
        }
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Reports whether the cell lies within the grid bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        self.size.contains(cell)
    }

    /// Contents of the cell, if it lies within the grid bounds.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.size.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Living unit standing on the cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<UnitId> {
        self.cell(cell).and_then(Cell::occupant)
    }

    /// Rune lying on the cell, if any.
    #[must_use]
    pub fn rune(&self, cell: CellCoord) -> Option<RuneId> {
        self.cell(cell).and_then(Cell::rune)
    }

    fn slot_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        let index = self.size.index(cell)?;
        self.cells.get_mut(index)
    }

    pub(crate) fn occupy(&mut self, unit_id: UnitId, cell: CellCoord) {
        if let Some(slot) = self.slot_mut(cell) {
            slot.occupant = Some(unit_id);
        }
    }

    pub(crate) fn vacate(&mut self, cell: CellCoord) {
        if let Some(slot) = self.slot_mut(cell) {
            slot.occupant = None;
        }
    }

    pub(crate) fn place_rune(&mut self, rune_id: RuneId, cell: CellCoord) {
        if let Some(slot) = self.slot_mut(cell) {
            slot.rune = Some(rune_id);
        }
    }

    pub(crate) fn clear_rune(&mut self, cell: CellCoord) {
        if let Some(slot) = self.slot_mut(cell) {
            slot.rune = None;
        }
    }

    fn rebuild<'a>(
        size: GridSize,
        units: impl Iterator<Item = &'a Unit>,
        runes: impl Iterator<Item = &'a Rune>,
    ) -> Self {
        let mut grid = Self::new(size);
        for unit in units.filter(|unit| unit.is_alive()) {
            grid.occupy(unit.id, unit.position);
        }
        for rune in runes {
            grid.place_rune(rune.id, rune.position);
        }
        grid
    }
}

/// Complete state of one battle as seen by one runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Battle {
    delta_head: u32,
    grid: Grid,
    phase: BattlePhase,
    winner: Option<PlayerId>,
    players: Vec<Player>,
    turning_player_index: usize,
    units: BTreeMap<UnitId, Unit>,
    runes: BTreeMap<RuneId, Rune>,
    shops: BTreeMap<ShopId, Shop>,
    next_unit_id: UnitId,
    next_modifier_handle: ModifierHandleId,
}

impl Battle {
    /// Creates an empty battle awaiting its setup deltas.
    #[must_use]
    pub fn new() -> Self {
        Self {
            delta_head: 0,
            grid: Grid::default(),
            phase: BattlePhase::Setup,
            winner: None,
            players: Vec::new(),
            turning_player_index: 0,
            units: BTreeMap::new(),
            runes: BTreeMap::new(),
            shops: BTreeMap::new(),
            next_unit_id: UnitId::new(1),
            next_modifier_handle: ModifierHandleId::new(1),
        }
    }

    /// Rebuilds a battle from a snapshot, deriving grid occupancy from unit positions.
    #[must_use]
    pub fn from_snapshot(snapshot: &BattleSnapshot) -> Self {
        let units: BTreeMap<UnitId, Unit> = snapshot
            .units
            .iter()
            .map(|unit| (unit.id, unit.clone()))
            .collect();
        let runes: BTreeMap<RuneId, Rune> = snapshot
            .runes
            .iter()
            .map(|rune| (rune.id, *rune))
            .collect();
        let shops = snapshot
            .shops
            .iter()
            .map(|shop| (shop.id, shop.clone()))
            .collect();
        let grid = Grid::rebuild(snapshot.grid, units.values(), runes.values());

        Self {
            delta_head: snapshot.delta_head,
            grid,
            phase: snapshot.phase,
            winner: snapshot.winner,
            players: snapshot.players.clone(),
            turning_player_index: usize::try_from(snapshot.turning_player_index).unwrap_or(0),
            units,
            runes,
            shops,
            next_unit_id: snapshot.next_unit_id,
            next_modifier_handle: snapshot.next_modifier_handle,
        }
    }

    fn player_index(&self, player_id: PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == player_id)
    }

    fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == player_id)
    }

    fn unit_holding(&self, handle_id: ModifierHandleId) -> Option<UnitId> {
        self.units.values().find_map(|unit| {
            unit.modifiers
                .iter()
                .any(|modifier| modifier.handle_id == handle_id)
                .then_some(unit.id)
        })
    }
}

/// Query functions that provide read-only access to the battle state.
pub mod query {
    use std::collections::BTreeSet;

    use skirmish_core::{
        BattlePhase, BattleSnapshot, CellCoord, ModifierHandleId, Player, PlayerId, Rune, RuneId,
        Shop, ShopId, Unit, UnitId,
    };

    use super::{navigation, Battle, Grid, PathCell, Reachability, Traversal};

    /// Index of the next delta the battle expects to collapse.
    #[must_use]
    pub fn delta_head(battle: &Battle) -> u32 {
        battle.delta_head
    }

    /// Provides read-only access to the grid.
    #[must_use]
    pub fn grid(battle: &Battle) -> &Grid {
        &battle.grid
    }

    /// Lifecycle stage of the battle.
    #[must_use]
    pub fn phase(battle: &Battle) -> BattlePhase {
        battle.phase
    }

    /// Winner of a finished battle, if any unit survived.
    #[must_use]
    pub fn winner(battle: &Battle) -> Option<PlayerId> {
        battle.winner
    }

    /// Players in turn order.
    #[must_use]
    pub fn players(battle: &Battle) -> &[Player] {
        &battle.players
    }

    /// Looks up a player by identifier.
    #[must_use]
    pub fn player(battle: &Battle, player_id: PlayerId) -> Option<&Player> {
        battle.players.iter().find(|player| player.id == player_id)
    }

    /// Player whose turn it is, once the battle started.
    #[must_use]
    pub fn turning_player(battle: &Battle) -> Option<&Player> {
        if battle.phase == BattlePhase::Setup {
            return None;
        }
        battle.players.get(battle.turning_player_index)
    }

    /// Player acting after the provided one in turn order.
    #[must_use]
    pub fn player_after(battle: &Battle, player_id: PlayerId) -> Option<&Player> {
        let index = battle.player_index(player_id)?;
        battle.players.get((index + 1) % battle.players.len())
    }

    /// Looks up a unit by identifier, dead units included.
    #[must_use]
    pub fn unit(battle: &Battle, unit_id: UnitId) -> Option<&Unit> {
        battle.units.get(&unit_id)
    }

    /// Every unit ever spawned in ascending identifier order.
    pub fn units(battle: &Battle) -> impl Iterator<Item = &Unit> {
        battle.units.values()
    }

    /// Living units in ascending identifier order.
    pub fn living_units(battle: &Battle) -> impl Iterator<Item = &Unit> {
        battle.units.values().filter(|unit| unit.is_alive())
    }

    /// Living unit standing on the cell, if any.
    #[must_use]
    pub fn unit_at(battle: &Battle, cell: CellCoord) -> Option<&Unit> {
        battle
            .grid
            .occupant(cell)
            .and_then(|unit_id| battle.units.get(&unit_id))
    }

    /// Unit carrying the modifier instance, if any.
    #[must_use]
    pub fn modifier_holder(battle: &Battle, handle_id: ModifierHandleId) -> Option<&Unit> {
        battle
            .unit_holding(handle_id)
            .and_then(|unit_id| battle.units.get(&unit_id))
    }

    /// Runes lying on the grid in ascending identifier order.
    pub fn runes(battle: &Battle) -> impl Iterator<Item = &Rune> {
        battle.runes.values()
    }

    /// Looks up a rune by identifier.
    #[must_use]
    pub fn rune(battle: &Battle, rune_id: RuneId) -> Option<&Rune> {
        battle.runes.get(&rune_id)
    }

    /// Shops in ascending identifier order.
    pub fn shops(battle: &Battle) -> impl Iterator<Item = &Shop> {
        battle.shops.values()
    }

    /// Looks up a shop by identifier.
    #[must_use]
    pub fn shop(battle: &Battle, shop_id: ShopId) -> Option<&Shop> {
        battle.shops.get(&shop_id)
    }

    /// Identifier the next spawned unit receives.
    #[must_use]
    pub fn next_unit_id(battle: &Battle) -> UnitId {
        battle.next_unit_id
    }

    /// Handle the next applied modifier receives.
    #[must_use]
    pub fn next_modifier_handle(battle: &Battle) -> ModifierHandleId {
        battle.next_modifier_handle
    }

    /// Decides whether `to` can be reached from `from` within `budget` steps.
    #[must_use]
    pub fn reachable(
        battle: &Battle,
        from: CellCoord,
        to: CellCoord,
        budget: u32,
        traversal: Traversal,
    ) -> Reachability {
        navigation::reachable(&battle.grid, from, to, budget, traversal)
    }

    /// Shortest path between two cells, both included, if one exists.
    #[must_use]
    pub fn path(
        battle: &Battle,
        from: CellCoord,
        to: CellCoord,
        traversal: Traversal,
    ) -> Option<Vec<PathCell>> {
        navigation::path(&battle.grid, from, to, traversal)
    }

    /// Captures the complete battle state.
    #[must_use]
    pub fn snapshot(battle: &Battle) -> BattleSnapshot {
        BattleSnapshot {
            delta_head: battle.delta_head,
            grid: battle.grid.size(),
            phase: battle.phase,
            winner: battle.winner,
            players: battle.players.clone(),
            turning_player_index: u32::try_from(battle.turning_player_index).unwrap_or(0),
            units: battle.units.values().cloned().collect(),
            runes: battle.runes.values().copied().collect(),
            shops: battle.shops.values().cloned().collect(),
            next_unit_id: battle.next_unit_id,
            next_modifier_handle: battle.next_modifier_handle,
        }
    }

    /// Owners of at least one living unit, in ascending identifier order.
    #[must_use]
    pub fn surviving_owners(battle: &Battle) -> BTreeSet<PlayerId> {
        living_units(battle).map(|unit| unit.owner).collect()
    }

    /// Checks that a cell is occupied exactly when a living unit stands on it.
    #[must_use]
    pub fn occupancy_is_consistent(battle: &Battle) -> bool {
        let expected = Grid::rebuild(
            battle.grid.size(),
            battle.units.values(),
            battle.runes.values(),
        );
        let mut positions = BTreeSet::new();
        let unique = living_units(battle).all(|unit| positions.insert(unit.position));
        unique && expected == battle.grid
    }
}
