use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, span, Level};

use crate::grid::{neighbours, Grid, Point};
use crate::tile::{OutOfBounds, RiskMap, TiledGrid};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SolveError {
    InvalidRepeat(usize),
    TooLarge {
        height: usize,
        width: usize,
        repeat: usize,
    },
    OutOfBounds(OutOfBounds),
    Unreachable { destination: Point },
}

impl Display for SolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::InvalidRepeat(n) => {
                write!(f, "repeat factor must be at least 1, got {}", n)
            }
            SolveError::TooLarge {
                height,
                width,
                repeat,
            } => {
                write!(
                    f,
                    "a {}x{} grid repeated {} times is too large to search",
                    height, width, repeat
                )
            }
            SolveError::OutOfBounds(e) => write!(f, "internal error: {}", e),
            SolveError::Unreachable { destination } => {
                write!(f, "no path reaches {}", destination)
            }
        }
    }
}

impl Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SolveError::OutOfBounds(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OutOfBounds> for SolveError {
    fn from(e: OutOfBounds) -> SolveError {
        SolveError::OutOfBounds(e)
    }
}

/// A lowest-risk path.  `path` runs from the top-left to the
/// bottom-right, both included; `risk` excludes the starting cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub risk: usize,
    pub path: Vec<Point>,
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    distance: usize,
    previous: Option<usize>,
    finalized: bool,
}

/// Dijkstra over a `RiskMap`.  Nodes live in an arena indexed by
/// `row * width + col` and are only filled in once discovered.  The
/// frontier is a min-heap ordered by (distance, row, col); entries are
/// never removed early, so a popped entry is ignored if its node was
/// already finalized or has since found a shorter distance.
struct Search<'m, M: RiskMap> {
    map: &'m M,
    height: usize,
    width: usize,
    nodes: Vec<Option<NodeState>>,
    frontier: BinaryHeap<Reverse<(usize, usize, usize)>>,
    finalized: usize,
    stale: usize,
}

impl<'m, M: RiskMap> Search<'m, M> {
    fn new(map: &'m M) -> Result<Search<'m, M>, SolveError> {
        let (height, width) = (map.height(), map.width());
        if height == 0 || width == 0 {
            return Err(OutOfBounds {
                point: Point::new(0, 0),
                height,
                width,
            }
            .into());
        }
        let too_large = SolveError::TooLarge {
            height,
            width,
            repeat: 1,
        };
        let count = match height.checked_mul(width) {
            Some(count) => count,
            None => return Err(too_large),
        };
        let mut nodes: Vec<Option<NodeState>> = Vec::new();
        if nodes.try_reserve_exact(count).is_err() {
            return Err(too_large);
        }
        nodes.resize(count, None);
        Ok(Search {
            map,
            height,
            width,
            nodes,
            frontier: BinaryHeap::new(),
            finalized: 0,
            stale: 0,
        })
    }

    fn index(&self, p: &Point) -> usize {
        p.row * self.width + p.col
    }

    fn point(&self, index: usize) -> Point {
        Point::new(index / self.width, index % self.width)
    }

    fn relax(&mut self, p: Point, distance: usize, previous: Option<usize>) {
        let index = self.index(&p);
        let better = match &self.nodes[index] {
            None => true,
            Some(node) => !node.finalized && distance < node.distance,
        };
        if better {
            self.nodes[index] = Some(NodeState {
                distance,
                previous,
                finalized: false,
            });
            self.frontier.push(Reverse((distance, p.row, p.col)));
        }
    }

    /// Runs until the bottom-right corner is finalized, returning its
    /// distance and arena index.
    fn run(&mut self) -> Result<(usize, usize), SolveError> {
        let start = self.map.top_left();
        let destination = self.map.bottom_right();
        self.relax(start, 0, None);
        while let Some(Reverse((distance, row, col))) = self.frontier.pop() {
            let here = Point::new(row, col);
            let index = self.index(&here);
            match self.nodes[index].as_mut() {
                Some(node) if !node.finalized && node.distance == distance => {
                    node.finalized = true;
                }
                _ => {
                    self.stale += 1;
                    continue;
                }
            }
            self.finalized += 1;
            if here == destination {
                return Ok((distance, index));
            }
            for next in neighbours(&here, self.height, self.width) {
                let next_index = self.index(&next);
                if matches!(self.nodes[next_index], Some(node) if node.finalized) {
                    continue;
                }
                let candidate = distance + self.map.risk(&next)?;
                self.relax(next, candidate, Some(index));
            }
        }
        // Every cell of a rectangular map is connected, so this is
        // only reached if the frontier bookkeeping is broken.
        Err(SolveError::Unreachable { destination })
    }

    fn path_to(&self, index: usize) -> Vec<Point> {
        let mut path: Vec<Point> = Vec::new();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            path.push(self.point(i));
            cursor = self.nodes[i].and_then(|node| node.previous);
        }
        path.reverse();
        path
    }
}

fn search<M: RiskMap>(map: &M, want_path: bool) -> Result<Route, SolveError> {
    let span = span!(
        Level::DEBUG,
        "lowest_risk",
        height = map.height(),
        width = map.width()
    );
    let _enter = span.enter();
    let mut search = Search::new(map)?;
    let (risk, destination) = search.run()?;
    event!(
        Level::DEBUG,
        "lowest risk {} after finalizing {} nodes ({} stale frontier entries skipped)",
        risk,
        search.finalized,
        search.stale,
    );
    let path = if want_path {
        search.path_to(destination)
    } else {
        Vec::new()
    };
    Ok(Route { risk, path })
}

/// Lowest total risk of any path from the top-left to the bottom-right
/// of `map`.
pub fn lowest_risk<M: RiskMap>(map: &M) -> Result<usize, SolveError> {
    search(map, false).map(|route| route.risk)
}

pub fn lowest_risk_route<M: RiskMap>(map: &M) -> Result<Route, SolveError> {
    search(map, true)
}

/// Lowest total risk across `grid` tiled `repeat` times in each
/// direction.  A `repeat` of 1 is the grid as scanned.
pub fn solve(grid: &Grid, repeat: usize) -> Result<usize, SolveError> {
    lowest_risk(&TiledGrid::new(grid, repeat)?)
}

pub fn solve_with_path(grid: &Grid, repeat: usize) -> Result<Route, SolveError> {
    lowest_risk_route(&TiledGrid::new(grid, repeat)?)
}

#[cfg(test)]
use crate::grid::{grid_from, EXAMPLE};

/// Textbook Dijkstra picking the next node by scanning every
/// discovered node.  Slow, but obviously right.
#[cfg(test)]
fn linear_scan_lowest_risk<M: RiskMap>(map: &M) -> usize {
    let (h, w) = (map.height(), map.width());
    let mut distance: Vec<Option<usize>> = vec![None; h * w];
    let mut done: Vec<bool> = vec![false; h * w];
    distance[0] = Some(0);
    loop {
        let current = (0..h * w)
            .filter(|&i| !done[i])
            .filter_map(|i| distance[i].map(|d| (d, i)))
            .min()
            .expect("destination is reachable");
        let (d, i) = current;
        done[i] = true;
        if i == h * w - 1 {
            return d;
        }
        for next in neighbours(&Point::new(i / w, i % w), h, w) {
            let j = next.row * w + next.col;
            let candidate = d + map.risk(&next).expect("neighbour in bounds");
            if !done[j] && distance[j].map_or(true, |old| candidate < old) {
                distance[j] = Some(candidate);
            }
        }
    }
}

#[cfg(test)]
fn oracle_lowest_risk<M: RiskMap>(map: &M) -> usize {
    use pathfinding::directed::dijkstra::dijkstra;
    let (h, w) = (map.height(), map.width());
    let end = map.bottom_right();
    let successors = |p: &Point| -> Vec<(Point, usize)> {
        neighbours(p, h, w)
            .into_iter()
            .map(|n| (n, map.risk(&n).expect("neighbour in bounds")))
            .collect()
    };
    match dijkstra(&map.top_left(), successors, |p| *p == end) {
        Some((_path, cost)) => cost,
        None => panic!("no solution found"),
    }
}

/// Deterministic pseudo-random grids (a 64-bit LCG) for comparing
/// solvers.
#[cfg(test)]
fn generated_grid(seed: u64, height: usize, width: usize) -> Grid {
    let mut state = seed;
    let mut next_digit = || -> char {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        char::from(b'1' + ((state >> 33) % 9) as u8)
    };
    let lines: Vec<String> = (0..height)
        .map(|_| (0..width).map(|_| next_digit()).collect())
        .collect();
    Grid::try_from(lines.as_slice()).expect("generated grid is valid")
}

#[cfg(test)]
fn assert_valid_route<M: RiskMap>(map: &M, route: &Route) {
    assert_eq!(route.path.first(), Some(&map.top_left()));
    assert_eq!(route.path.last(), Some(&map.bottom_right()));
    let mut entered = 0;
    for step in route.path.windows(2) {
        let (a, b) = (step[0], step[1]);
        let dist = a.row.abs_diff(b.row) + a.col.abs_diff(b.col);
        assert_eq!(dist, 1, "{} -> {} is not a single cardinal move", a, b);
        entered += map.risk(&b).expect("path stays in bounds");
    }
    assert_eq!(entered, route.risk);
}

#[test]
fn test_example() {
    let grid = grid_from(EXAMPLE);
    assert_eq!(solve(&grid, 1), Ok(40));
    assert_eq!(lowest_risk(&grid), Ok(40));
}

#[test]
fn test_example_tiled() {
    let grid = grid_from(EXAMPLE);
    assert_eq!(solve(&grid, 5), Ok(315));
}

#[test]
fn test_example_route() {
    let grid = grid_from(EXAMPLE);
    for repeat in [1, 5] {
        let route = solve_with_path(&grid, repeat).expect("solvable");
        let tiled = TiledGrid::new(&grid, repeat).expect("valid repeat");
        assert_valid_route(&tiled, &route);
        // Several paths share the lowest risk, so we don't check
        // which one was chosen.
        assert_eq!(Ok(route.risk), solve(&grid, repeat));
    }
}

#[test]
fn test_single_cell() {
    let grid = grid_from(&["7"]);
    assert_eq!(solve(&grid, 1), Ok(0));
    assert_eq!(
        solve_with_path(&grid, 1),
        Ok(Route {
            risk: 0,
            path: vec![Point::new(0, 0)]
        })
    );
    assert_eq!(solve(&grid_from(&["8"]), 5), Ok(37));
}

#[test]
fn test_single_column() {
    let grid = grid_from(&["3", "4"]);
    assert_eq!(solve(&grid, 1), Ok(4));
    assert_eq!(
        solve_with_path(&grid, 1).expect("solvable").path,
        vec![Point::new(0, 0), Point::new(1, 0)]
    );
}

#[test]
fn test_small_tiled() {
    let grid = grid_from(&["12", "34"]);
    assert_eq!(solve(&grid, 2), Ok(21));
}

#[test]
fn test_growing_repeat_never_cheaper() {
    let grid = grid_from(EXAMPLE);
    let risks: Vec<usize> = (1..=6)
        .map(|repeat| solve(&grid, repeat).expect("solvable"))
        .collect();
    assert_eq!(risks, vec![40, 101, 170, 248, 315, 343]);
    for pair in risks.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn test_deterministic() {
    let grid = grid_from(EXAMPLE);
    let first = solve_with_path(&grid, 5).expect("solvable");
    let second = solve_with_path(&grid, 5).expect("solvable");
    assert_eq!(first, second);
    assert_eq!(solve(&grid, 1), solve(&grid, 1));
}

#[test]
fn test_ties_prefer_lower_rows() {
    // Every path of four steps costs 4; the first row is finalized
    // before the second, so the route hugs the top edge.
    let grid = grid_from(&["111", "111", "111"]);
    let route = solve_with_path(&grid, 1).expect("solvable");
    assert_eq!(route.risk, 4);
    assert_eq!(
        route.path,
        vec![
            Point::new(0, 0),
            Point::new(0, 1),
            Point::new(0, 2),
            Point::new(1, 2),
            Point::new(2, 2)
        ]
    );
}

#[test]
fn test_agrees_with_linear_scan() {
    for seed in 0..20 {
        let grid = generated_grid(seed, 1 + (seed as usize % 7), 1 + (seed as usize % 5));
        for repeat in 1..=3 {
            let tiled = TiledGrid::new(&grid, repeat).expect("valid repeat");
            assert_eq!(
                lowest_risk(&tiled),
                Ok(linear_scan_lowest_risk(&tiled)),
                "seed {} repeat {}:\n{}",
                seed,
                repeat,
                grid
            );
        }
    }
}

#[test]
fn test_agrees_with_pathfinding() {
    for seed in 100..110 {
        let grid = generated_grid(seed, 12, 9);
        for repeat in [1, 5] {
            let tiled = TiledGrid::new(&grid, repeat).expect("valid repeat");
            let route = lowest_risk_route(&tiled).expect("solvable");
            assert_eq!(route.risk, oracle_lowest_risk(&tiled));
            assert_valid_route(&tiled, &route);
        }
    }
}

#[test]
fn test_oversized_repeat() {
    let grid = grid_from(&["1"]);
    assert_eq!(
        solve(&grid, usize::MAX / 2),
        Err(SolveError::TooLarge {
            height: 1,
            width: 1,
            repeat: usize::MAX / 2
        })
    );
    assert!(matches!(
        solve_with_path(&grid_from(EXAMPLE), usize::MAX / 4),
        Err(SolveError::TooLarge { repeat, .. }) if repeat == usize::MAX / 4
    ));
}

/// Far too many cells to hold node state for, though the count itself
/// fits in a `usize`.
#[cfg(test)]
struct EndlessCorridor;

#[cfg(test)]
impl RiskMap for EndlessCorridor {
    fn height(&self) -> usize {
        usize::MAX / 2
    }

    fn width(&self) -> usize {
        1
    }

    fn risk(&self, _p: &Point) -> Result<usize, OutOfBounds> {
        Ok(1)
    }
}

#[test]
fn test_unallocatable_map() {
    assert_eq!(
        lowest_risk(&EndlessCorridor),
        Err(SolveError::TooLarge {
            height: usize::MAX / 2,
            width: 1,
            repeat: 1
        })
    );
}

#[test]
fn test_zero_repeat() {
    let grid = grid_from(EXAMPLE);
    assert_eq!(solve(&grid, 0), Err(SolveError::InvalidRepeat(0)));
}

/// A map whose bottom row cannot be looked up.
#[cfg(test)]
struct BrokenMap;

#[cfg(test)]
impl RiskMap for BrokenMap {
    fn height(&self) -> usize {
        3
    }

    fn width(&self) -> usize {
        3
    }

    fn risk(&self, p: &Point) -> Result<usize, OutOfBounds> {
        if p.row < 2 {
            Ok(1)
        } else {
            Err(OutOfBounds {
                point: *p,
                height: 2,
                width: 3,
            })
        }
    }
}

#[test]
fn test_lookup_failure_is_reported() {
    match lowest_risk(&BrokenMap) {
        Err(SolveError::OutOfBounds(e)) => {
            assert_eq!(e.point.row, 2);
        }
        other => panic!("expected OutOfBounds, got {:?}", other),
    }
}
