use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::grid::{Grid, Point};
use crate::solver::SolveError;

/// A point was looked up outside the area of a `RiskMap`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct OutOfBounds {
    pub point: Point,
    pub height: usize,
    pub width: usize,
}

impl Display for OutOfBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "point {} is outside the {}x{} grid",
            self.point, self.height, self.width
        )
    }
}

impl Error for OutOfBounds {}

/// Anything which can tell the solver how risky it is to enter a
/// position.  Implementations must return values in 1..=9 for every
/// point inside `height()` x `width()`.
pub trait RiskMap {
    fn height(&self) -> usize;
    fn width(&self) -> usize;
    fn risk(&self, p: &Point) -> Result<usize, OutOfBounds>;

    fn contains(&self, p: &Point) -> bool {
        p.row < self.height() && p.col < self.width()
    }

    fn top_left(&self) -> Point {
        Point::new(0, 0)
    }

    fn bottom_right(&self) -> Point {
        Point::new(self.height() - 1, self.width() - 1)
    }
}

impl RiskMap for Grid {
    fn height(&self) -> usize {
        Grid::height(self)
    }

    fn width(&self) -> usize {
        Grid::width(self)
    }

    fn risk(&self, p: &Point) -> Result<usize, OutOfBounds> {
        if RiskMap::contains(self, p) {
            Ok(usize::from(self.get(p)))
        } else {
            Err(OutOfBounds {
                point: *p,
                height: Grid::height(self),
                width: Grid::width(self),
            })
        }
    }
}

/// The full cave: `repeat` copies of the scanned grid in each
/// direction.  Each step right or down adds one to the risk, wrapping
/// from 9 back to 1.  Cells are computed when asked for, never stored.
#[derive(Debug, Clone, Copy)]
pub struct TiledGrid<'a> {
    base: &'a Grid,
    repeat: usize,
    height: usize,
    width: usize,
}

impl<'a> TiledGrid<'a> {
    /// Fails if `repeat` is zero, or so large that the number of cells
    /// does not fit in a `usize`.
    pub fn new(base: &'a Grid, repeat: usize) -> Result<TiledGrid<'a>, SolveError> {
        if repeat == 0 {
            return Err(SolveError::InvalidRepeat(repeat));
        }
        let extent = base.height().checked_mul(repeat).and_then(|height| {
            base.width()
                .checked_mul(repeat)
                .filter(|width| height.checked_mul(*width).is_some())
                .map(|width| (height, width))
        });
        match extent {
            Some((height, width)) => Ok(TiledGrid {
                base,
                repeat,
                height,
                width,
            }),
            None => Err(SolveError::TooLarge {
                height: base.height(),
                width: base.width(),
                repeat,
            }),
        }
    }

    pub fn repeat(&self) -> usize {
        self.repeat
    }
}

fn wrap_risk(base: usize, tile_steps: usize) -> usize {
    (base - 1 + tile_steps) % 9 + 1
}

impl RiskMap for TiledGrid<'_> {
    fn height(&self) -> usize {
        self.height
    }

    fn width(&self) -> usize {
        self.width
    }

    fn risk(&self, p: &Point) -> Result<usize, OutOfBounds> {
        if !self.contains(p) {
            return Err(OutOfBounds {
                point: *p,
                height: self.height(),
                width: self.width(),
            });
        }
        let (bh, bw) = (self.base.height(), self.base.width());
        let local = Point::new(p.row % bh, p.col % bw);
        let tile_steps = p.row / bh + p.col / bw;
        Ok(wrap_risk(usize::from(self.base.get(&local)), tile_steps))
    }
}

impl Display for TiledGrid<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row in 0..self.height() {
            for col in 0..self.width() {
                match self.risk(&Point::new(row, col)) {
                    Ok(risk) => write!(f, "{}", risk)?,
                    Err(_) => return Err(fmt::Error),
                }
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
use crate::grid::{grid_from, EXAMPLE};

#[test]
fn test_wrap_risk() {
    assert_eq!(wrap_risk(8, 0), 8);
    assert_eq!(wrap_risk(8, 1), 9);
    assert_eq!(wrap_risk(8, 2), 1);
    assert_eq!(wrap_risk(9, 1), 1);
    assert_eq!(wrap_risk(9, 9), 9);
    assert_eq!(wrap_risk(1, 17), 9);
    for base in 1..=9 {
        for steps in 0..40 {
            let r = wrap_risk(base, steps);
            assert!((1..=9).contains(&r), "wrap_risk({}, {}) = {}", base, steps, r);
        }
    }
}

#[test]
fn test_first_tile_matches_base_grid() {
    let grid = grid_from(EXAMPLE);
    let tiled = TiledGrid::new(&grid, 5).expect("valid repeat");
    for row in 0..grid.height() {
        for col in 0..grid.width() {
            let p = Point::new(row, col);
            assert_eq!(tiled.risk(&p), Ok(usize::from(grid.get(&p))));
        }
    }
}

#[test]
fn test_single_cell_tiling() {
    let grid = grid_from(&["8"]);
    let tiled = TiledGrid::new(&grid, 5).expect("valid repeat");
    let expected = ["89123", "91234", "12345", "23456", "34567"];
    assert_eq!(tiled.to_string(), expected.join("\n") + "\n");
}

#[test]
fn test_example_tiling() {
    let grid = grid_from(EXAMPLE);
    let tiled = TiledGrid::new(&grid, 5).expect("valid repeat");
    assert_eq!(tiled.height(), 50);
    assert_eq!(tiled.width(), 50);
    let rendered = tiled.to_string();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 50);
    assert_eq!(
        lines[0],
        "11637517422274862853338597396444961841755517295286"
    );
    assert_eq!(
        lines[49],
        "67554889357866599146897761125791887223681299833479"
    );
    for line in lines {
        assert!(line.chars().all(|ch| ('1'..='9').contains(&ch)));
    }
}

#[test]
fn test_repeat_of_one_is_base_grid() {
    let grid = grid_from(EXAMPLE);
    let tiled = TiledGrid::new(&grid, 1).expect("valid repeat");
    assert_eq!(tiled.to_string(), grid.to_string());
    assert_eq!(RiskMap::bottom_right(&tiled), grid.bottom_right());
}

#[test]
fn test_out_of_bounds() {
    let grid = grid_from(&["12", "34"]);
    let tiled = TiledGrid::new(&grid, 2).expect("valid repeat");
    assert_eq!(tiled.risk(&Point::new(3, 3)), Ok(6));
    assert_eq!(
        tiled.risk(&Point::new(4, 0)),
        Err(OutOfBounds {
            point: Point::new(4, 0),
            height: 4,
            width: 4
        })
    );
    assert!(tiled.risk(&Point::new(0, 4)).is_err());
    assert!(grid.risk(&Point::new(2, 0)).is_err());
    assert_eq!(grid.risk(&Point::new(1, 1)), Ok(4));
}

#[test]
fn test_oversized_repeat_rejected() {
    let grid = grid_from(&["1"]);
    assert!(matches!(
        TiledGrid::new(&grid, usize::MAX / 2),
        Err(SolveError::TooLarge {
            height: 1,
            width: 1,
            ..
        })
    ));
    let wide = grid_from(&["12"]);
    assert!(matches!(
        TiledGrid::new(&wide, usize::MAX / 2 + 1),
        Err(SolveError::TooLarge { width: 2, .. })
    ));
    let tiled = TiledGrid::new(&wide, 3).expect("valid repeat");
    assert_eq!((tiled.height(), tiled.width()), (3, 6));
}

#[test]
fn test_zero_repeat_rejected() {
    let grid = grid_from(&["1"]);
    assert!(matches!(
        TiledGrid::new(&grid, 0),
        Err(SolveError::InvalidRepeat(0))
    ));
}
