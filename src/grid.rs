use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use ndarray::prelude::*;
use nom::{
    character::complete::satisfy,
    combinator::{all_consuming, map},
    multi::many1,
    Finish, IResult,
};

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Point {
        Point { row, col }
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

fn clamp_range(val: usize, limit: usize) -> Option<usize> {
    if val < limit {
        Some(val)
    } else {
        None
    }
}

/// The cardinal neighbours of `p` inside a `rows` x `cols` area, in
/// the order N, W, E, S.
pub fn neighbours(p: &Point, rows: usize, cols: usize) -> Vec<Point> {
    let (r, c) = (p.row, p.col);
    let mut result: Vec<Point> = Vec::with_capacity(4);
    let prev_col: Option<usize> = c.checked_sub(1);
    let next_col: Option<usize> = c.checked_add(1).and_then(|val| clamp_range(val, cols));
    let prev_row: Option<usize> = r.checked_sub(1);
    let next_row: Option<usize> = r.checked_add(1).and_then(|val| clamp_range(val, rows));

    // We do not include NE, SE, SW, NW.
    if let Some(pr) = prev_row {
        result.push(Point::new(pr, c)); // North
    }
    if let Some(pc) = prev_col {
        result.push(Point::new(r, pc)); // West
    }
    // miss out myself
    if let Some(nc) = next_col {
        result.push(Point::new(r, nc)); // East
    }
    if let Some(nr) = next_row {
        result.push(Point::new(nr, c)); // South
    }
    result
}

#[test]
fn test_neighbours() {
    assert_eq!(
        neighbours(&Point::new(0, 0), 3, 3),
        vec![Point::new(0, 1), Point::new(1, 0)]
    );
    assert_eq!(
        neighbours(&Point::new(1, 1), 3, 3),
        vec![
            Point::new(0, 1),
            Point::new(1, 0),
            Point::new(1, 2),
            Point::new(2, 1)
        ]
    );
    assert_eq!(
        neighbours(&Point::new(2, 2), 3, 3),
        vec![Point::new(1, 2), Point::new(2, 1)]
    );
    assert!(neighbours(&Point::new(0, 0), 1, 1).is_empty());
    assert_eq!(neighbours(&Point::new(0, 0), 2, 1), vec![Point::new(1, 0)]);
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseGridError {
    Empty,
    BadCell {
        line: usize,
        column: usize,
        found: char,
    },
    ZeroRisk {
        line: usize,
        column: usize,
    },
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl Display for ParseGridError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseGridError::Empty => f.write_str("no data"),
            ParseGridError::BadCell {
                line,
                column,
                found,
            } => {
                write!(
                    f,
                    "line {}, column {}: invalid (non-numeric) cell '{}'",
                    line, column, found
                )
            }
            ParseGridError::ZeroRisk { line, column } => {
                write!(
                    f,
                    "line {}, column {}: risk level must be between 1 and 9",
                    line, column
                )
            }
            ParseGridError::Ragged {
                line,
                expected,
                found,
            } => {
                write!(
                    f,
                    "line {} has {} cells but line 1 has {}",
                    line, found, expected
                )
            }
        }
    }
}

impl Error for ParseGridError {}

/// The risk level of every position in the cavern.  Values are always
/// in 1..=9 and the grid always has at least one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    risk: Array2<u8>,
}

impl Grid {
    pub fn get(&self, p: &Point) -> u8 {
        self.risk[(p.row, p.col)]
    }

    pub fn height(&self) -> usize {
        self.risk.nrows()
    }

    pub fn width(&self) -> usize {
        self.risk.ncols()
    }

    pub fn top_left(&self) -> Point {
        Point::new(0, 0)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.height() - 1, self.width() - 1)
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for row in self.risk.rows() {
            for cell in row.iter() {
                write!(f, "{}", cell)?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn digits(input: &str) -> IResult<&str, Vec<u8>> {
    all_consuming(many1(map(satisfy(|ch| ch.is_ascii_digit()), |ch: char| {
        ch as u8 - b'0'
    })))(input)
}

fn parse_row(lineno: usize, line: &str) -> Result<Vec<u8>, ParseGridError> {
    if line.is_empty() {
        return Ok(Vec::new());
    }
    let cells = match digits(line).finish() {
        Ok((_, cells)) => cells,
        Err(e) => {
            // e.input is the unparsed tail, starting at the bad cell.
            let offset = line.len() - e.input.len();
            let found = e.input.chars().next().unwrap_or(' ');
            return Err(ParseGridError::BadCell {
                line: lineno,
                column: line[..offset].chars().count() + 1,
                found,
            });
        }
    };
    match cells.iter().position(|&risk| risk == 0) {
        Some(pos) => Err(ParseGridError::ZeroRisk {
            line: lineno,
            column: pos + 1,
        }),
        None => Ok(cells),
    }
}

impl TryFrom<&[String]> for Grid {
    type Error = ParseGridError;
    fn try_from(lines: &[String]) -> Result<Grid, ParseGridError> {
        let mut lines: &[String] = lines;
        while let Some((last, rest)) = lines.split_last() {
            if last.trim_end().is_empty() {
                lines = rest;
            } else {
                break;
            }
        }
        let mut rows: Vec<Vec<u8>> = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let row = parse_row(i + 1, line.trim_end_matches('\r'))?;
            if let Some(first) = rows.first() {
                if row.len() != first.len() {
                    return Err(ParseGridError::Ragged {
                        line: i + 1,
                        expected: first.len(),
                        found: row.len(),
                    });
                }
            }
            rows.push(row);
        }
        let height = rows.len();
        let width = rows.first().map(|row| row.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(ParseGridError::Empty);
        }
        let risk = Array::from_shape_fn((height, width), |(r, c)| rows[r][c]);
        Ok(Grid { risk })
    }
}

impl FromStr for Grid {
    type Err = ParseGridError;
    fn from_str(s: &str) -> Result<Grid, ParseGridError> {
        let lines: Vec<String> = s.lines().map(|line| line.to_string()).collect();
        Grid::try_from(lines.as_slice())
    }
}

#[cfg(test)]
pub(crate) fn grid_from(rows: &[&str]) -> Grid {
    let ns: Vec<String> = rows.iter().map(|line| line.to_string()).collect();
    Grid::try_from(ns.as_slice()).expect("valid test data")
}

#[cfg(test)]
pub(crate) const EXAMPLE: &[&str] = &[
    "1163751742",
    "1381373672",
    "2136511328",
    "3694931569",
    "7463417111",
    "1319128137",
    "1359912421",
    "3125421639",
    "1293138521",
    "2311944581",
];

#[test]
fn test_parse_grid() {
    let grid = grid_from(EXAMPLE);
    assert_eq!(grid.height(), 10);
    assert_eq!(grid.width(), 10);
    assert_eq!(grid.get(&Point::new(0, 2)), 6);
    assert_eq!(grid.get(&Point::new(1, 0)), 1);
    assert_eq!(grid.get(&Point::new(4, 0)), 7);
    assert_eq!(grid.get(&grid.bottom_right()), 1);
    assert_eq!(grid.to_string(), EXAMPLE.join("\n") + "\n");
}

#[test]
fn test_parse_grid_from_str() {
    let grid: Grid = "12\n34\n\n".parse().expect("valid test data");
    assert_eq!(grid.height(), 2);
    assert_eq!(grid.width(), 2);
    assert_eq!(grid.bottom_right(), Point::new(1, 1));
    assert_eq!(grid.get(&Point::new(1, 0)), 3);

    let crlf: Grid = "12\r\n34\r\n".parse().expect("valid test data");
    assert_eq!(crlf, grid);
}

#[test]
fn test_parse_grid_errors() {
    assert_eq!(Grid::from_str(""), Err(ParseGridError::Empty));
    assert_eq!(Grid::from_str("\n\n"), Err(ParseGridError::Empty));
    assert_eq!(
        Grid::from_str("123\n1x3\n"),
        Err(ParseGridError::BadCell {
            line: 2,
            column: 2,
            found: 'x'
        })
    );
    assert_eq!(
        Grid::from_str("1 2\n"),
        Err(ParseGridError::BadCell {
            line: 1,
            column: 2,
            found: ' '
        })
    );
    assert_eq!(
        Grid::from_str("x12\n"),
        Err(ParseGridError::BadCell {
            line: 1,
            column: 1,
            found: 'x'
        })
    );
    assert_eq!(
        Grid::from_str("11\n1\u{e9}\n"),
        Err(ParseGridError::BadCell {
            line: 2,
            column: 2,
            found: '\u{e9}'
        })
    );
    assert_eq!(
        Grid::from_str("123\n456\n780\n"),
        Err(ParseGridError::ZeroRisk { line: 3, column: 3 })
    );
    assert_eq!(
        Grid::from_str("123\n45\n"),
        Err(ParseGridError::Ragged {
            line: 2,
            expected: 3,
            found: 2
        })
    );
    assert_eq!(
        Grid::from_str("12\n\n34\n"),
        Err(ParseGridError::Ragged {
            line: 2,
            expected: 2,
            found: 0
        })
    );
    assert_eq!(
        Grid::from_str("12\n45\n8").unwrap_err().to_string(),
        "line 3 has 1 cells but line 1 has 2"
    );
}
