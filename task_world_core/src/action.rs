use serde::{Deserialize, Serialize};

use crate::{Direction, ItemKind, PaintTarget, Position};

/// Every operation a caller can ask the world to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    /// Take one step along a shortest path toward the target cell.
    MoveToward(Position),
    Pick(ItemKind),
    Drop(ItemKind),
    Paint(PaintTarget),
    OpenDoor,
    NoOp,
    Reset,
}

/// Why an action was rejected. Only used for logging; callers of the world
/// see a uniform failure outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalAction {
    #[error("{0} is outside the grid")]
    OutOfBounds(Position),
    #[error("cannot step off the grid")]
    OffGrid,
    #[error("{0} is a wall")]
    Wall(Position),
    #[error("no path from {from} to {to}")]
    NoPath { from: Position, to: Position },
    #[error("already standing on {0}")]
    AlreadyThere(Position),
    #[error("inventory is full ({capacity} items)")]
    InventoryFull { capacity: usize },
    #[error("no {item:?} at {position}")]
    ItemNotHere { item: ItemKind, position: Position },
    #[error("not carrying {0:?}")]
    NotCarrying(ItemKind),
    #[error("{0} already holds an item")]
    CellOccupied(Position),
    #[error("missing {0:?}")]
    MissingItem(ItemKind),
    #[error("no {target:?} at {position}")]
    TargetNotHere {
        target: PaintTarget,
        position: Position,
    },
    #[error("{0:?} is already painted")]
    AlreadyPainted(PaintTarget),
    #[error("door at {door} is {distance} steps away, must be adjacent")]
    DoorNotAdjacent { door: Position, distance: usize },
    #[error("layout has no door")]
    NoDoor,
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Result of one world operation: whether it took effect and its reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub reward: f64,
}

impl ActionOutcome {
    pub fn success(reward: f64) -> Self {
        ActionOutcome {
            success: true,
            reward,
        }
    }

    pub fn failure(reward: f64) -> Self {
        ActionOutcome {
            success: false,
            reward,
        }
    }
}

impl Action {
    /// Parses a named request such as `("pick", ["brush"])` or
    /// `("move_toward", ["3", "1"])`. Names are case-insensitive and
    /// coordinates are internal, 0-based, top-left.
    pub fn parse(name: &str, args: &[&str]) -> Result<Action, IllegalAction> {
        let name = name.trim().to_ascii_lowercase();
        let action = match (name.as_str(), args) {
            ("move", [direction]) => Action::Move(parse_arg(direction)?),
            ("move_toward", [x, y]) => Action::MoveToward(Position::new(
                parse_arg(x)?,
                parse_arg(y)?,
            )),
            ("pick", [item]) => Action::Pick(parse_arg(item)?),
            ("drop", [item]) => Action::Drop(parse_arg(item)?),
            ("paint", [target]) => Action::Paint(parse_arg(target)?),
            ("open_door", []) => Action::OpenDoor,
            ("no_op" | "skip", []) => Action::NoOp,
            ("reset", []) => Action::Reset,
            _ => {
                return Err(IllegalAction::Malformed(format!(
                    "{}/{}",
                    name,
                    args.len()
                )));
            }
        };
        Ok(action)
    }
}

fn parse_arg<T>(raw: &str) -> Result<T, IllegalAction>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| IllegalAction::Malformed(err.to_string()))
}
