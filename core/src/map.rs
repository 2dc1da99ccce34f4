//! Map grid, legend and oriented waypoint types.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Edge length of one grid cell in world units.
pub const CELL_SIZE: f32 = 0.1;

/// Height of cells on the lower level.
pub const LOWER_ELEVATION: f32 = 0.0;

/// Height of cells on the higher level.
pub const HIGHER_ELEVATION: f32 = 0.1;

/// Legend of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapCell {
    /// Decorative ground without gameplay meaning.
    Neutral,
    /// Walkable path on the lower level.
    LowerPath,
    /// Walkable path on the higher level.
    HigherPath,
    /// Tower slot on the lower level.
    LowerPlacing,
    /// Tower slot on the higher level.
    HigherPlacing,
    /// Creep spawn point.
    Spawn,
    /// Creep destination; reaching it costs the player one hit point.
    Goal,
    /// Zip-line arrival point where teleported creeps resume.
    ZipLineIn,
    /// Zip-line departure point that teleports creeps.
    ZipLineOut,
    /// Walkable cell that damages creeps over time.
    Hazard,
}

impl MapCell {
    /// Resolves a legend from its configuration code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Neutral,
            1 => Self::LowerPath,
            2 => Self::HigherPath,
            3 => Self::LowerPlacing,
            4 => Self::HigherPlacing,
            5 => Self::Spawn,
            6 => Self::Goal,
            7 => Self::ZipLineIn,
            8 => Self::ZipLineOut,
            9 => Self::Hazard,
            _ => return None,
        })
    }

    /// Reports whether creeps may walk onto the cell.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(
            self,
            Self::LowerPath | Self::HigherPath | Self::Goal | Self::ZipLineOut | Self::Hazard
        )
    }

    /// Reports whether reaching the cell ends a route.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Goal | Self::ZipLineOut)
    }

    /// Reports whether the cell is a tower slot.
    #[must_use]
    pub const fn is_placing(self) -> bool {
        matches!(self, Self::LowerPlacing | Self::HigherPlacing)
    }

    /// Height at which entities standing on the cell are positioned.
    #[must_use]
    pub const fn elevation(self) -> f32 {
        match self {
            Self::HigherPath | Self::HigherPlacing => HIGHER_ELEVATION,
            _ => LOWER_ELEVATION,
        }
    }
}

/// Location of a single grid cell expressed as row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    row: u32,
    column: u32,
}

impl GridPosition {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Neighbouring position one step in `direction`, if it does not underflow.
    #[must_use]
    pub fn step(&self, direction: Direction) -> Option<Self> {
        let (row_delta, column_delta) = direction.offset();
        let row = self.row.checked_add_signed(row_delta)?;
        let column = self.column.checked_add_signed(column_delta)?;
        Some(Self::new(row, column))
    }
}

/// Cardinal movement directions across the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Towards lower row indices.
    North,
    /// Towards higher column indices.
    East,
    /// Towards higher row indices.
    South,
    /// Towards lower column indices.
    West,
}

impl Direction {
    /// Directions in exploration order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Row and column delta of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (-1, 0),
            Self::East => (0, 1),
            Self::South => (1, 0),
            Self::West => (0, -1),
        }
    }

    /// Yaw in radians of an entity walking in this direction.
    ///
    /// Rows map onto the x axis and columns onto the z axis.
    #[must_use]
    pub fn heading(self) -> f32 {
        match self {
            Self::North => -FRAC_PI_2,
            Self::East => 0.0,
            Self::South => FRAC_PI_2,
            Self::West => PI,
        }
    }
}

/// Rectangular matrix of map legends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapGrid {
    rows: u32,
    columns: u32,
    cells: Vec<MapCell>,
}

impl MapGrid {
    /// Builds a grid from row-major legends; returns `None` for empty or ragged input.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<MapCell>>) -> Option<Self> {
        let columns = rows.first()?.len();
        if columns == 0 || rows.iter().any(|row| row.len() != columns) {
            return None;
        }
        let row_count = u32::try_from(rows.len()).ok()?;
        let column_count = u32::try_from(columns).ok()?;
        Some(Self {
            rows: row_count,
            columns: column_count,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Legend at the provided position, if it lies inside the grid.
    #[must_use]
    pub fn cell(&self, position: GridPosition) -> Option<MapCell> {
        if position.row >= self.rows || position.column >= self.columns {
            return None;
        }
        let index = position.row as usize * self.columns as usize + position.column as usize;
        self.cells.get(index).copied()
    }

    /// Iterates over every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, MapCell)> + '_ {
        let columns = self.columns;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let index = index as u32;
            (GridPosition::new(index / columns, index % columns), *cell)
        })
    }

    /// Positions holding the provided legend in row-major order.
    #[must_use]
    pub fn positions_of(&self, legend: MapCell) -> Vec<GridPosition> {
        self.iter()
            .filter(|(_, cell)| *cell == legend)
            .map(|(position, _)| position)
            .collect()
    }

    /// Position of a cell centre relative to the map anchor.
    ///
    /// The grid is centred on the anchor and shifted by `grid_diameter` cells.
    #[must_use]
    pub fn local_position(&self, position: GridPosition, grid_diameter: f32) -> Vec3 {
        let half_rows = (self.rows / 2) as f32;
        let half_columns = (self.columns / 2) as f32;
        let elevation = self.cell(position).map_or(LOWER_ELEVATION, MapCell::elevation);
        Vec3::new(
            (position.row as f32 - (half_rows - grid_diameter)) * CELL_SIZE,
            elevation,
            (position.column as f32 - (half_columns - grid_diameter)) * CELL_SIZE,
        )
    }
}

/// Single waypoint of a creep route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientedCoordinate {
    /// Position relative to the map anchor.
    pub coordinate: Vec3,
    /// Yaw the creep faces while walking towards the waypoint.
    pub heading: f32,
    /// Legend that decides what happens when the waypoint is reached.
    pub legend: MapCell,
}

/// Ordered route from a start cell to a terminal cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepPath {
    waypoints: Vec<OrientedCoordinate>,
}

impl CreepPath {
    /// Wraps the provided waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<OrientedCoordinate>) -> Self {
        Self { waypoints }
    }

    /// Waypoint at the provided progress index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OrientedCoordinate> {
        self.waypoints.get(index)
    }

    /// Number of waypoints on the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the route has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Iterates over the waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &OrientedCoordinate> + '_ {
        self.waypoints.iter()
    }

    /// Final waypoint of the route.
    #[must_use]
    pub fn last(&self) -> Option<&OrientedCoordinate> {
        self.waypoints.last()
    }
}
