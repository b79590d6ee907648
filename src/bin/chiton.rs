use std::io;
use std::io::prelude::*;
use std::process;

use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use chiton::{solve, Grid};

const TILED_REPEAT: usize = 5;

fn init_logging() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

fn part1(grid: &Grid) -> Result<(), String> {
    let risk = solve(grid, 1).map_err(|e| e.to_string())?;
    println!("Day 15 part 1: {}", risk);
    Ok(())
}

fn part2(grid: &Grid) -> Result<(), String> {
    let risk = solve(grid, TILED_REPEAT).map_err(|e| e.to_string())?;
    println!("Day 15 part 2: {}", risk);
    Ok(())
}

fn run() -> Result<(), String> {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        return Err(format!("failed to read input: {}", e));
    }
    let grid: Grid = input.parse().map_err(|e| format!("bad input: {}", e))?;
    event!(
        Level::INFO,
        "read a {}x{} grid",
        grid.height(),
        grid.width()
    );
    part1(&grid)?;
    part2(&grid)
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("fail: {}", e);
        process::exit(1);
    }
}
