//! Read-only view of a world for perception and rendering layers, plus the
//! external coordinate convention those layers speak.
//!
//! Externally, cells are 1-based with the origin at the bottom-left:
//! `external_x = x + 1`, `external_y = height - y`.

use serde::Serialize;

use crate::{ItemKind, ObjectKind, Position, world::WorldState};

/// Converts an internal position into external `(x, y)` coordinates.
pub fn to_external(position: Position, height: usize) -> (usize, usize) {
    (position.x + 1, height - position.y)
}

/// Converts external coordinates back, or `None` if they fall outside a
/// `width` by `height` grid.
pub fn from_external(x: usize, y: usize, width: usize, height: usize) -> Option<Position> {
    if !(1..=width).contains(&x) || !(1..=height).contains(&y) {
        return None;
    }
    Some(Position::new(x - 1, height - y))
}

/// Everything an observer may know about a world at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub width: usize,
    pub height: usize,
    pub agent: Position,
    /// Ground location of every pickable item; `None` while carried.
    pub items: Vec<(ItemKind, Option<Position>)>,
    pub door: Option<Position>,
    pub table: Option<Position>,
    pub chair: Option<Position>,
    pub inventory: Vec<ItemKind>,
    pub table_colored: bool,
    pub chair_colored: bool,
    pub door_open: bool,
    pub goal_reached: bool,
    pub walls: Vec<Position>,
}

impl WorldSnapshot {
    pub fn capture(world: &WorldState) -> Self {
        let walls = world
            .cells()
            .enumerate()
            .filter(|(_, cell)| cell.is_wall())
            .map(|(position, _)| position)
            .collect();
        WorldSnapshot {
            width: world.width(),
            height: world.height(),
            agent: world.agent_position(),
            items: ItemKind::ALL
                .into_iter()
                .map(|item| (item, world.locate(item.object())))
                .collect(),
            door: world.locate(ObjectKind::Door),
            table: world.locate(ObjectKind::Table),
            chair: world.locate(ObjectKind::Chair),
            inventory: world.inventory().to_vec(),
            table_colored: world.table_colored(),
            chair_colored: world.chair_colored(),
            door_open: world.door_open(),
            goal_reached: world.is_goal_reached(),
            walls,
        }
    }

    /// Ground location of `item`, if it is not being carried.
    pub fn item_position(&self, item: ItemKind) -> Option<Position> {
        self.items
            .iter()
            .find(|(kind, _)| *kind == item)
            .and_then(|(_, position)| *position)
    }

    /// The agent position in external coordinates.
    pub fn external_agent(&self) -> (usize, usize) {
        to_external(self.agent, self.height)
    }

    /// Wall cells in external coordinates.
    pub fn external_walls(&self) -> Vec<(usize, usize)> {
        self.walls
            .iter()
            .map(|wall| to_external(*wall, self.height))
            .collect()
    }
}
