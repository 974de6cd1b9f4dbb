//! Breadth-first reachability and path queries over the battle grid.
//!
//! Every step costs one move point regardless of direction. Units may step
//! onto any of the eight surrounding cells. Neighbors are always visited in
//! the same order so that reconstructed paths are identical on every runtime.

use skirmish_core::CellCoord;

use crate::Grid;

/// Neighbor offsets in visitation order: +x, -x, +y, -y, then the diagonals.
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Rules governing which cells a search may pass through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Traversal {
    /// Whether cells holding runes may be crossed on the way to another cell.
    pub runes_passable: bool,
}

impl Traversal {
    /// Walking rules: runes are dead ends unless they are the destination.
    pub const WALK: Self = Self {
        runes_passable: false,
    };

    /// Rune collection rules: other runes may be crossed.
    pub const THROUGH_RUNES: Self = Self {
        runes_passable: true,
    };
}

/// Outcome of a bounded reachability query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reachability {
    /// Whether the destination can be reached within the budget.
    pub reachable: bool,
    /// Number of steps needed when reachable, zero otherwise.
    pub cost: u32,
}

impl Reachability {
    const UNREACHABLE: Self = Self {
        reachable: false,
        cost: 0,
    };
}

/// One cell along a reconstructed path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathCell {
    /// Position of the cell.
    pub position: CellCoord,
    /// Whether a unit occupies the cell.
    pub occupied: bool,
    /// Number of steps from the start of the path.
    pub cost: u32,
}

/// Decides whether `to` can be reached from `from` in at most `budget` steps.
pub(crate) fn reachable(
    grid: &Grid,
    from: CellCoord,
    to: CellCoord,
    budget: u32,
    traversal: Traversal,
) -> Reachability {
    match search(grid, from, to, budget, traversal) {
        Some(found) => Reachability {
            reachable: true,
            cost: found.cost,
        },
        None => Reachability::UNREACHABLE,
    }
}

/// Shortest path from `from` to `to`, both included, if one exists.
pub(crate) fn path(
    grid: &Grid,
    from: CellCoord,
    to: CellCoord,
    traversal: Traversal,
) -> Option<Vec<PathCell>> {
    let found = search(grid, from, to, u32::MAX, traversal)?;
    let size = grid.size();

    let mut reversed = Vec::new();
    let mut current = size.index(to)?;
    loop {
        let position = found.positions[current]?;
        reversed.push(position);
        match found.parents[current] {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Some(
        reversed
            .into_iter()
            .rev()
            .enumerate()
            .map(|(step, position)| PathCell {
                position,
                occupied: grid.occupant(position).is_some(),
                cost: u32::try_from(step).unwrap_or(u32::MAX),
            })
            .collect(),
    )
}

struct Found {
    cost: u32,
    parents: Vec<Option<usize>>,
    positions: Vec<Option<CellCoord>>,
}

fn search(
    grid: &Grid,
    from: CellCoord,
    to: CellCoord,
    budget: u32,
    traversal: Traversal,
) -> Option<Found> {
    let size = grid.size();
    let start = size.index(from)?;
    let goal = size.index(to)?;
    let cell_count = size.cell_count();

    let mut parents = vec![None; cell_count];
    let mut positions = vec![None; cell_count];
    positions[start] = Some(from);

    if from == to {
        return Some(Found {
            cost: 0,
            parents,
            positions,
        });
    }

    if grid.occupant(to).is_some() {
        return None;
    }

    let mut visited = vec![false; cell_count];
    visited[start] = true;
    let mut frontier = vec![from];
    let mut layer: u32 = 0;

    while !frontier.is_empty() && layer <= budget {
        let mut next = Vec::new();
        for cell in frontier {
            if cell == to {
                return Some(Found {
                    cost: layer,
                    parents,
                    positions,
                });
            }

            let Some(current) = size.index(cell) else {
                continue;
            };

            for (columns, rows) in NEIGHBOR_OFFSETS {
                let Some(neighbor) = cell.offset(columns, rows) else {
                    continue;
                };
                let Some(index) = size.index(neighbor) else {
                    continue;
                };
                if visited[index] || is_dead_end(grid, neighbor, index == goal, traversal) {
                    continue;
                }

                visited[index] = true;
                parents[index] = Some(current);
                positions[index] = Some(neighbor);
                next.push(neighbor);
            }
        }
        frontier = next;
        layer = layer.saturating_add(1);
        if layer == u32::MAX {
            break;
        }
    }

    None
}

fn is_dead_end(grid: &Grid, cell: CellCoord, is_goal: bool, traversal: Traversal) -> bool {
    if grid.occupant(cell).is_some() {
        return true;
    }
    !is_goal && !traversal.runes_passable && grid.rune(cell).is_some()
}
