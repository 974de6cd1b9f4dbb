#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure geometry deciding where abilities may be aimed and what they affect.
//!
//! Authorization and resolution both call into this crate, so a point that
//! is accepted as a target is always the point whose footprint gets resolved.

use skirmish_core::{
    model::{LineSelector, LineTargeting, RectangleSelector, TShapeSelector},
    CellCoord, GridSize, Selector, Targeting, Unit, UnitId,
};

/// Unit step along one grid axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Direction {
    columns: i64,
    rows: i64,
}

impl Direction {
    /// Dominant axis pointing from `from` toward `aim`, ties preferring columns.
    ///
    /// Returns `None` when both cells coincide.
    #[must_use]
    pub fn between(from: CellCoord, aim: CellCoord) -> Option<Self> {
        let (columns, rows) = from.delta_to(aim);
        if columns == 0 && rows == 0 {
            return None;
        }
        if columns.abs() >= rows.abs() {
            Some(Self {
                columns: columns.signum(),
                rows: 0,
            })
        } else {
            Some(Self {
                columns: 0,
                rows: rows.signum(),
            })
        }
    }

    /// Column component of the step.
    #[must_use]
    pub const fn columns(&self) -> i64 {
        self.columns
    }

    /// Row component of the step.
    #[must_use]
    pub const fn rows(&self) -> i64 {
        self.rows
    }

    /// Splits an offset into its distance along and across the direction.
    fn project(self, columns: i64, rows: i64) -> (i64, i64) {
        if self.columns != 0 {
            (columns * self.columns, rows)
        } else {
            (rows * self.rows, columns)
        }
    }
}

/// Reports whether `to` is a legal aim point for an ability cast from `from`.
#[must_use]
pub fn targeting_fits(targeting: &Targeting, from: CellCoord, to: CellCoord) -> bool {
    match targeting {
        Targeting::Line(LineTargeting { line_length }) => {
            let collinear = from.column() == to.column() || from.row() == to.row();
            from != to && collinear && from.manhattan_distance(to) <= *line_length
        }
        Targeting::UnitInManhattanDistance(disc) => from.manhattan_distance(to) <= disc.distance,
        Targeting::RectangleAroundCaster(area) => from.chebyshev_distance(to) <= area.area_radius,
    }
}

/// Reports whether `candidate` lies inside the selector footprint.
#[must_use]
pub fn selector_fits(
    selector: &Selector,
    cast_from: CellCoord,
    aim: CellCoord,
    candidate: CellCoord,
) -> bool {
    match selector {
        Selector::Single(_) => candidate == aim,
        Selector::Rectangle(RectangleSelector { radius }) => {
            aim.chebyshev_distance(candidate) <= *radius
        }
        Selector::Line(LineSelector { length }) => {
            let Some((along, across)) = ray_offset(cast_from, aim, candidate) else {
                return false;
            };
            across == 0 && (1..=i64::from(*length)).contains(&along)
        }
        Selector::TShape(TShapeSelector {
            stem_length,
            arm_length,
        }) => {
            let Some((along, across)) = ray_offset(cast_from, aim, candidate) else {
                return false;
            };
            if along == 0 && across == 0 {
                return false;
            }
            let stem = i64::from(*stem_length);
            let on_stem = across == 0 && (1..=stem).contains(&along);
            let on_arm = along == stem && across.abs() <= i64::from(*arm_length);
            on_stem || on_arm
        }
    }
}

/// Offset of `candidate` along and across the ray from `cast_from` toward `aim`.
fn ray_offset(cast_from: CellCoord, aim: CellCoord, candidate: CellCoord) -> Option<(i64, i64)> {
    let direction = Direction::between(cast_from, aim)?;
    let (columns, rows) = cast_from.delta_to(candidate);
    Some(direction.project(columns, rows))
}

/// Cells of the grid covered by the selector, in row-major order.
#[must_use]
pub fn footprint(
    selector: &Selector,
    cast_from: CellCoord,
    aim: CellCoord,
    grid: GridSize,
) -> Vec<CellCoord> {
    (0..grid.rows())
        .flat_map(|row| (0..grid.columns()).map(move |column| CellCoord::new(column, row)))
        .filter(|cell| selector_fits(selector, cast_from, aim, *cell))
        .collect()
}

/// Targetable units inside the selector footprint, in ascending identifier order.
#[must_use]
pub fn affected_units<'a>(
    selector: &Selector,
    cast_from: CellCoord,
    aim: CellCoord,
    units: impl IntoIterator<Item = &'a Unit>,
) -> Vec<UnitId> {
    let mut affected: Vec<UnitId> = units
        .into_iter()
        .filter(|unit| unit.is_targetable())
        .filter(|unit| selector_fits(selector, cast_from, aim, unit.position))
        .map(|unit| unit.id)
        .collect();
    affected.sort_unstable();
    affected
}

#[cfg(test)]
mod tests {
    use skirmish_core::{catalog::Hero, PlayerId};

    use super::*;

    fn cell(column: u32, row: u32) -> CellCoord {
        CellCoord::new(column, row)
    }

    #[test]
    fn line_targeting_requires_a_shared_axis() {
        let line = Targeting::line(5);
        assert!(targeting_fits(&line, cell(0, 0), cell(0, 5)));
        assert!(!targeting_fits(&line, cell(0, 0), cell(1, 5)));
        assert!(!targeting_fits(&line, cell(0, 0), cell(0, 6)));
        assert!(!targeting_fits(&line, cell(0, 0), cell(0, 0)));
    }

    #[test]
    fn manhattan_and_rectangle_targeting_measure_differently() {
        let disc = Targeting::manhattan(2);
        let square = Targeting::rectangle(2);
        assert!(!targeting_fits(&disc, cell(2, 2), cell(4, 4)));
        assert!(targeting_fits(&square, cell(2, 2), cell(4, 4)));
        assert!(targeting_fits(&disc, cell(2, 2), cell(2, 2)));
    }

    #[test]
    fn single_and_rectangle_selectors_center_on_the_aim() {
        let aim = cell(3, 3);
        assert!(selector_fits(&Selector::single(), cell(0, 0), aim, aim));
        assert!(!selector_fits(&Selector::single(), cell(0, 0), aim, cell(3, 4)));
        assert!(selector_fits(&Selector::rectangle(1), cell(0, 0), aim, cell(4, 2)));
        assert!(!selector_fits(&Selector::rectangle(1), cell(0, 0), aim, cell(5, 3)));
    }

    #[test]
    fn line_selector_extends_past_the_aim_point() {
        let line = Selector::line(4);
        let from = cell(1, 1);
        let aim = cell(3, 1);
        assert!(!selector_fits(&line, from, aim, from));
        assert!(selector_fits(&line, from, aim, cell(2, 1)));
        assert!(selector_fits(&line, from, aim, cell(5, 1)));
        assert!(!selector_fits(&line, from, aim, cell(6, 1)));
        assert!(!selector_fits(&line, from, aim, cell(0, 1)));
        assert!(!selector_fits(&line, from, from, cell(2, 1)));
    }

    #[test]
    fn dominant_axis_breaks_ties_toward_columns() {
        let direction = Direction::between(cell(2, 2), cell(4, 0)).expect("distinct cells");
        assert_eq!((direction.columns(), direction.rows()), (1, 0));
        let direction = Direction::between(cell(2, 2), cell(1, 5)).expect("distinct cells");
        assert_eq!((direction.columns(), direction.rows()), (0, 1));
    }

    #[test]
    fn t_shape_covers_stem_and_arm() {
        let shape = Selector::t_shape(2, 1);
        let covered = footprint(&shape, cell(2, 4), cell(2, 0), GridSize::new(5, 5));
        assert_eq!(
            covered,
            vec![cell(1, 2), cell(2, 2), cell(3, 2), cell(2, 3)]
        );
    }

    #[test]
    fn affected_units_are_sorted_and_skip_the_dead() {
        let owner = PlayerId::new(1);
        let mut units: Vec<Unit> = [(7, cell(1, 1)), (2, cell(2, 2)), (5, cell(2, 1))]
            .into_iter()
            .map(|(id, position)| {
                Unit::from_blueprint(&Hero::Creep.blueprint(UnitId::new(id), owner, position))
            })
            .collect();
        units[1].dead = true;

        let affected = affected_units(&Selector::rectangle(1), cell(0, 0), cell(2, 2), &units);
        assert_eq!(affected, vec![UnitId::new(5), UnitId::new(7)]);
    }

    #[test]
    fn accepted_line_aims_lie_inside_their_own_footprint() {
        let targeting = Targeting::line(4);
        let selector = Selector::line(4);
        let from = cell(4, 4);
        let grid = GridSize::new(9, 9);
        let mut accepted = 0;
        for aim in footprint(&Selector::rectangle(4), from, from, grid) {
            if targeting_fits(&targeting, from, aim) {
                accepted += 1;
                assert!(selector_fits(&selector, from, aim, aim), "{aim:?}");
            }
        }
        assert_eq!(accepted, 16);
    }
}
