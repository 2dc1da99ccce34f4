#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Route resolution from spawn and zip-line cells to their terminals.
//!
//! Every start cell may branch into several parallel lanes. The resolver
//! enumerates each simple route from the start to a terminal cell (goal or
//! zip-line departure) and converts the visited cells into oriented
//! waypoints relative to the map anchor. Callers pick one route per wave in
//! round-robin order.

use ar_defense_core::{CreepPath, Direction, GridPosition, MapCell, MapGrid, OrientedCoordinate};
use thiserror::Error;

/// Upper bound on the routes enumerated from a single start cell.
pub const MAX_ROUTES: usize = 32;

/// Errors raised while resolving routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// The start cell lies outside the grid.
    #[error("start cell ({}, {}) lies outside the map", .0.row(), .0.column())]
    StartOutOfBounds(GridPosition),
    /// No walkable cell touches the start cell.
    #[error("no walkable cell leaves ({}, {})", .0.row(), .0.column())]
    NoRoute(GridPosition),
    /// A route stops on a non-terminal cell.
    #[error("route dead-ends at ({}, {})", .0.row(), .0.column())]
    DeadEnd(GridPosition),
    /// The start cell branches into more routes than supported.
    #[error("more than {} routes leave ({}, {})", MAX_ROUTES, .0.row(), .0.column())]
    TooManyRoutes(GridPosition),
}

/// Resolves every route leaving `start`, in deterministic exploration order.
///
/// # Errors
///
/// Returns [`PathError::DeadEnd`] when any branch stops before reaching a
/// terminal cell, which makes the owning map unusable.
pub fn resolve_paths(
    grid: &MapGrid,
    start: GridPosition,
    grid_diameter: f32,
) -> Result<Vec<CreepPath>, PathError> {
    if grid.cell(start).is_none() {
        return Err(PathError::StartOutOfBounds(start));
    }

    let mut explorer = Explorer {
        grid,
        start,
        visited: vec![start],
        routes: Vec::new(),
    };
    explorer.explore(start)?;

    Ok(explorer
        .routes
        .iter()
        .map(|cells| waypoints(grid, start, cells, grid_diameter))
        .collect())
}

struct Explorer<'a> {
    grid: &'a MapGrid,
    start: GridPosition,
    visited: Vec<GridPosition>,
    routes: Vec<Vec<GridPosition>>,
}

impl Explorer<'_> {
    fn explore(&mut self, current: GridPosition) -> Result<(), PathError> {
        if current != self.start && self.grid.cell(current).is_some_and(MapCell::is_terminal) {
            if self.routes.len() == MAX_ROUTES {
                return Err(PathError::TooManyRoutes(self.start));
            }
            // The start cell is the first visited entry and is not part of the route.
            self.routes.push(self.visited[1..].to_vec());
            return Ok(());
        }

        let next: Vec<GridPosition> = Direction::ALL
            .into_iter()
            .filter_map(|direction| current.step(direction))
            .filter(|candidate| {
                self.grid.cell(*candidate).is_some_and(MapCell::is_walkable)
                    && !self.visited.contains(candidate)
            })
            .collect();

        if next.is_empty() {
            return Err(if current == self.start {
                PathError::NoRoute(current)
            } else {
                PathError::DeadEnd(current)
            });
        }

        for candidate in next {
            self.visited.push(candidate);
            let outcome = self.explore(candidate);
            let _ = self.visited.pop();
            outcome?;
        }
        Ok(())
    }
}

fn waypoints(
    grid: &MapGrid,
    start: GridPosition,
    cells: &[GridPosition],
    grid_diameter: f32,
) -> CreepPath {
    let mut waypoints = Vec::with_capacity(cells.len() + 2);
    let mut previous = start;

    for &cell in cells {
        let heading = direction_between(previous, cell).map_or(0.0, Direction::heading);
        let from = grid.local_position(previous, grid_diameter);
        let to = grid.local_position(cell, grid_diameter);
        let legend = grid.cell(cell).unwrap_or(MapCell::LowerPath);

        if (from.y - to.y).abs() > f32::EPSILON {
            waypoints.push(OrientedCoordinate {
                coordinate: from.lerp(to, 0.5),
                heading,
                legend: MapCell::LowerPath,
            });
        }
        waypoints.push(OrientedCoordinate {
            coordinate: to,
            heading,
            legend,
        });
        previous = cell;
    }

    CreepPath::new(waypoints)
}

fn direction_between(from: GridPosition, to: GridPosition) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|direction| from.step(*direction) == Some(to))
}
