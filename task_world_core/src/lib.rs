use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod config;
pub mod episode;
pub mod layout;
pub mod map;
pub mod pathfinding;
pub mod snapshot;
pub mod world;

/// Width of the canonical grid.
pub const WIDTH: usize = 5;
/// Height of the canonical grid.
pub const HEIGHT: usize = 5;
/// Default inventory capacity.
pub const MAX_CARRY: usize = 3;

/// Represents a 2D coordinate, 0-based with the origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the neighbouring position one step in `direction`,
    /// or `None` when it would leave the non-negative quadrant.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four cardinal movement directions. `Up` decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(dx, dy)` unit offset of this direction.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction that leads from `from` to the 4-adjacent cell `to`.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        let dx = to.x as isize - from.x as isize;
        let dy = to.y as isize - from.y as isize;
        match (dx, dy) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Returned when a name does not match any variant of a kind enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{name}'")]
pub struct UnknownName {
    pub what: &'static str,
    pub name: String,
}

impl FromStr for Direction {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(UnknownName {
                what: "direction",
                name: s.to_string(),
            }),
        }
    }
}

/// Every kind of object a cell can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Wall,
    Brush,
    Key,
    Code,
    Door,
    Chair,
    Color,
    Table,
}

impl ObjectKind {
    pub const COUNT: usize = 8;

    pub const ALL: [ObjectKind; ObjectKind::COUNT] = [
        ObjectKind::Wall,
        ObjectKind::Brush,
        ObjectKind::Key,
        ObjectKind::Code,
        ObjectKind::Door,
        ObjectKind::Chair,
        ObjectKind::Color,
        ObjectKind::Table,
    ];

    /// Slot of this kind in a per-cell content array.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The pickable item this kind corresponds to, if any.
    pub fn as_item(self) -> Option<ItemKind> {
        match self {
            ObjectKind::Brush => Some(ItemKind::Brush),
            ObjectKind::Key => Some(ItemKind::Key),
            ObjectKind::Code => Some(ItemKind::Code),
            ObjectKind::Color => Some(ItemKind::Color),
            _ => None,
        }
    }

    pub fn is_pickable(self) -> bool {
        self.as_item().is_some()
    }
}

/// Objects that move between the ground and the agent's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    Brush,
    Key,
    Code,
    Color,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Brush,
        ItemKind::Key,
        ItemKind::Code,
        ItemKind::Color,
    ];

    pub fn object(self) -> ObjectKind {
        match self {
            ItemKind::Brush => ObjectKind::Brush,
            ItemKind::Key => ObjectKind::Key,
            ItemKind::Code => ObjectKind::Code,
            ItemKind::Color => ObjectKind::Color,
        }
    }
}

impl FromStr for ItemKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brush" => Ok(ItemKind::Brush),
            "key" => Ok(ItemKind::Key),
            "code" => Ok(ItemKind::Code),
            "color" | "colour" => Ok(ItemKind::Color),
            _ => Err(UnknownName {
                what: "item",
                name: s.to_string(),
            }),
        }
    }
}

/// The two fixtures that can be painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaintTarget {
    Table,
    Chair,
}

impl PaintTarget {
    pub fn object(self) -> ObjectKind {
        match self {
            PaintTarget::Table => ObjectKind::Table,
            PaintTarget::Chair => ObjectKind::Chair,
        }
    }
}

impl FromStr for PaintTarget {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(PaintTarget::Table),
            "chair" => Ok(PaintTarget::Chair),
            _ => Err(UnknownName {
                what: "paint target",
                name: s.to_string(),
            }),
        }
    }
}
