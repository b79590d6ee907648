//! Lowest-risk paths through the chiton cave (Advent of Code 2021,
//! day 15), on the scanned grid or on the grid tiled into a larger
//! cave.

pub mod grid;
pub mod solver;
pub mod tile;

pub use grid::{Grid, ParseGridError, Point};
pub use solver::{lowest_risk, lowest_risk_route, solve, solve_with_path, Route, SolveError};
pub use tile::{OutOfBounds, RiskMap, TiledGrid};
