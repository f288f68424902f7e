use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Direction, ItemKind, PaintTarget, Position, action::Action, pathfinding::find_path,
    world::WorldState,
};

/// Trait defining the behavior of an agent.
/// Agents decide which action the world should execute next.
pub trait Agent {
    /// Short label used in logs and the UI.
    fn name(&self) -> &str;

    /// Determines the next action from the current world state.
    /// `&mut self` allows the agent to keep internal state between ticks.
    fn choose_action(&mut self, world: &WorldState) -> Action;
}

/// Picks uniformly among a random move, a random pick, a random paint and
/// opening the door. Illegal choices are expected and simply penalized.
#[derive(Debug)]
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "random"
    }

    fn choose_action(&mut self, _world: &WorldState) -> Action {
        match self.rng.random_range(0..4) {
            0 => Action::Move(Direction::ALL[self.rng.random_range(0..Direction::ALL.len())]),
            1 => Action::Pick(ItemKind::ALL[self.rng.random_range(0..ItemKind::ALL.len())]),
            2 => {
                if self.rng.random_bool(0.5) {
                    Action::Paint(PaintTarget::Table)
                } else {
                    Action::Paint(PaintTarget::Chair)
                }
            }
            _ => Action::OpenDoor,
        }
    }
}

/// Works through the task in a fixed order: fetch brush and color, paint
/// the table then the chair, fetch key and code, open the door.
///
/// It re-plans from the world state on every tick, moving one step at a time
/// with [`Action::MoveToward`].
#[derive(Debug, Default)]
pub struct TaskPlanner;

impl TaskPlanner {
    pub fn new() -> Self {
        TaskPlanner
    }

    /// Walk to `item` and pick it up.
    fn fetch(world: &WorldState, item: ItemKind) -> Action {
        match world.locate(item.object()) {
            Some(position) if position == world.agent_position() => Action::Pick(item),
            Some(position) => Action::MoveToward(position),
            None => Action::NoOp,
        }
    }

    /// Drops an item no unfinished subtask needs, stepping off cells that
    /// already hold an item first.
    fn make_room(world: &WorldState) -> Option<Action> {
        let surplus = world
            .inventory()
            .iter()
            .copied()
            .find(|item| !world.is_needed(*item))?;
        let here = world.agent_position();
        let occupied = world.contents(here).is_some_and(|cell| cell.has_pickable());
        if !occupied {
            return Some(Action::Drop(surplus));
        }
        world
            .cells()
            .neighbors(here)
            .find(|next| {
                world
                    .contents(*next)
                    .is_some_and(|cell| !cell.is_wall() && !cell.has_pickable())
            })
            .and_then(|next| Direction::between(here, next))
            .map(Action::Move)
    }

    /// The walkable cell next to the door with the shortest route from the agent.
    fn door_approach(world: &WorldState, door: Position) -> Option<Position> {
        let blocked = world.blocked_grid();
        let here = world.agent_position();
        blocked
            .neighbors(door)
            .filter(|cell| !blocked[*cell])
            .filter_map(|cell| {
                let path = find_path(here, cell, &blocked);
                (!path.is_empty()).then_some((path.len(), cell))
            })
            .min()
            .map(|(_, cell)| cell)
    }
}

impl Agent for TaskPlanner {
    fn name(&self) -> &str {
        "planner"
    }

    fn choose_action(&mut self, world: &WorldState) -> Action {
        let here = world.agent_position();

        // 1. Painting stage
        if !(world.table_colored() && world.chair_colored()) {
            for tool in [ItemKind::Brush, ItemKind::Color] {
                if !world.is_carrying(tool) {
                    return Self::fetch(world, tool);
                }
            }
            let target = if world.table_colored() {
                PaintTarget::Chair
            } else {
                PaintTarget::Table
            };
            return match world.locate(target.object()) {
                Some(position) if position == here => Action::Paint(target),
                Some(position) => Action::MoveToward(position),
                None => Action::NoOp,
            };
        }

        // 2. Door stage
        if !world.door_open() {
            let missing: Vec<ItemKind> = [ItemKind::Key, ItemKind::Code]
                .into_iter()
                .filter(|tool| !world.is_carrying(*tool))
                .collect();
            if world.inventory().len() + missing.len() > world.config().max_carry {
                if let Some(action) = Self::make_room(world) {
                    return action;
                }
            }
            if let Some(tool) = missing.first() {
                return Self::fetch(world, *tool);
            }
            let Some(door) = world.door_position() else {
                return Action::NoOp;
            };
            if here.manhattan(door) == 1 {
                return Action::OpenDoor;
            }
            return match Self::door_approach(world, door) {
                Some(approach) => Action::MoveToward(approach),
                None => Action::NoOp,
            };
        }

        // 3. Done
        Action::NoOp
    }
}
