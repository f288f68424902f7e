use tracing::{debug, info};

use crate::{
    Direction, ItemKind, ObjectKind, PaintTarget, Position,
    action::{Action, ActionOutcome, IllegalAction},
    config::WorldConfig,
    layout::{Layout, LayoutError},
    map::{CellContents, Grid},
    pathfinding::find_path,
    snapshot::WorldSnapshot,
};

/// The complete state of one episode: cell contents, the agent, its
/// inventory and the task progress flags.
///
/// Every action operation either applies fully and returns a success outcome
/// or leaves the state untouched and returns the illegal-action penalty.
#[derive(Debug, Clone)]
pub struct WorldState {
    layout: Layout,
    config: WorldConfig,
    cells: Grid<CellContents>,
    agent: Position,
    inventory: Vec<ItemKind>,
    table_colored: bool,
    chair_colored: bool,
    door_open: bool,
}

impl WorldState {
    /// A world in the canonical layout.
    pub fn new(config: WorldConfig) -> Self {
        Self::from_valid_layout(Layout::canonical(), config)
    }

    /// A world that starts from, and resets to, `layout`.
    pub fn with_layout(layout: Layout, config: WorldConfig) -> Result<Self, LayoutError> {
        layout.validate()?;
        Ok(Self::from_valid_layout(layout, config))
    }

    fn from_valid_layout(layout: Layout, config: WorldConfig) -> Self {
        let cells = build_cells(&layout);
        WorldState {
            agent: layout.start(),
            layout,
            config,
            cells,
            inventory: Vec::new(),
            table_colored: false,
            chair_colored: false,
            door_open: false,
        }
    }

    /// Executes one action.
    pub fn execute(&mut self, action: Action) -> ActionOutcome {
        match action {
            Action::Move(direction) => self.move_step(direction),
            Action::MoveToward(target) => self.move_toward(target),
            Action::Pick(item) => self.pick(item),
            Action::Drop(item) => self.drop(item),
            Action::Paint(target) => self.paint(target),
            Action::OpenDoor => self.open_door(),
            Action::NoOp => self.no_op(),
            Action::Reset => self.reset(),
        }
    }

    /// Parses and executes a named request. Malformed requests are penalized
    /// like any other illegal action.
    pub fn execute_request(&mut self, name: &str, args: &[&str]) -> ActionOutcome {
        match Action::parse(name, args) {
            Ok(action) => self.execute(action),
            Err(reason) => self.settle("request", Err(reason), 0.0),
        }
    }

    pub fn move_step(&mut self, direction: Direction) -> ActionOutcome {
        let result = self.check_step(direction).map(|to| self.agent = to);
        self.settle("move", result, self.config.rewards.step)
    }

    pub fn move_toward(&mut self, target: Position) -> ActionOutcome {
        let result = self.check_toward(target).map(|to| self.agent = to);
        self.settle("move_toward", result, self.config.rewards.step)
    }

    pub fn pick(&mut self, item: ItemKind) -> ActionOutcome {
        let result = self.check_pick(item).map(|()| {
            self.cells[self.agent].remove(item.object());
            self.inventory.push(item);
        });
        self.settle("pick", result, self.config.rewards.step)
    }

    pub fn drop(&mut self, item: ItemKind) -> ActionOutcome {
        let result = self.check_drop(item).map(|index| {
            self.inventory.remove(index);
            self.cells[self.agent].insert(item.object());
        });
        self.settle("drop", result, self.config.rewards.step)
    }

    pub fn paint(&mut self, target: PaintTarget) -> ActionOutcome {
        let result = self.check_paint(target).map(|()| {
            match target {
                PaintTarget::Table => self.table_colored = true,
                PaintTarget::Chair => self.chair_colored = true,
            }
            info!(?target, "painted");
        });
        self.settle("paint", result, self.config.rewards.paint)
    }

    pub fn open_door(&mut self) -> ActionOutcome {
        let result = self.check_open_door().map(|()| {
            self.door_open = true;
            info!("door opened");
        });
        self.settle("open_door", result, self.config.rewards.open_door)
    }

    pub fn no_op(&mut self) -> ActionOutcome {
        ActionOutcome::success(self.config.rewards.idle)
    }

    /// Restores the layout this world was built from and clears inventory
    /// and progress.
    pub fn reset(&mut self) -> ActionOutcome {
        self.cells = build_cells(&self.layout);
        self.agent = self.layout.start();
        self.inventory.clear();
        self.table_colored = false;
        self.chair_colored = false;
        self.door_open = false;
        info!("world reset");
        ActionOutcome::success(self.config.rewards.idle)
    }

    /// Per-tick state reward derived from what the agent carries.
    pub fn carrying_reward(&self) -> f64 {
        let rewards = &self.config.rewards;
        let mut reward = if self.inventory.is_empty() {
            rewards.carry_empty
        } else {
            rewards.carry_per_item * self.inventory.len() as f64
        };
        if self.config.penalize_incompatible {
            let useless = self
                .inventory
                .iter()
                .filter(|item| !self.is_needed(**item))
                .count();
            reward += rewards.incompatible_per_item * useless as f64;
        }
        reward
    }

    pub fn is_goal_reached(&self) -> bool {
        self.table_colored && self.chair_colored && self.door_open
    }

    /// Whether an unfinished subtask still requires `item`.
    pub fn is_needed(&self, item: ItemKind) -> bool {
        match item {
            ItemKind::Brush | ItemKind::Color => !(self.table_colored && self.chair_colored),
            ItemKind::Key | ItemKind::Code => !self.door_open,
        }
    }

    /// True if the agent may stand on `position`.
    pub fn can_move_agent_to(&self, position: Position) -> bool {
        self.cells.get(position).is_some_and(|cell| !cell.is_wall())
    }

    /// Walls as a mask for the path finder.
    pub fn blocked_grid(&self) -> Grid<bool> {
        self.cells.map(CellContents::is_wall)
    }

    /// First cell, in row-major order, that holds `kind`.
    pub fn locate(&self, kind: ObjectKind) -> Option<Position> {
        self.cells
            .enumerate()
            .find(|(_, cell)| cell.has(kind))
            .map(|(position, _)| position)
    }

    pub fn door_position(&self) -> Option<Position> {
        self.locate(ObjectKind::Door)
    }

    pub fn contents(&self, position: Position) -> Option<&CellContents> {
        self.cells.get(position)
    }

    pub fn cells(&self) -> &Grid<CellContents> {
        &self.cells
    }

    pub fn agent_position(&self) -> Position {
        self.agent
    }

    pub fn inventory(&self) -> &[ItemKind] {
        &self.inventory
    }

    pub fn is_carrying(&self, item: ItemKind) -> bool {
        self.inventory.contains(&item)
    }

    pub fn table_colored(&self) -> bool {
        self.table_colored
    }

    pub fn chair_colored(&self) -> bool {
        self.chair_colored
    }

    pub fn is_painted(&self, target: PaintTarget) -> bool {
        match target {
            PaintTarget::Table => self.table_colored,
            PaintTarget::Chair => self.chair_colored,
        }
    }

    pub fn door_open(&self) -> bool {
        self.door_open
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self)
    }

    fn settle(
        &self,
        operation: &'static str,
        result: Result<(), IllegalAction>,
        reward: f64,
    ) -> ActionOutcome {
        match result {
            Ok(()) => ActionOutcome::success(reward),
            Err(reason) => {
                debug!(operation, %reason, agent = %self.agent, "illegal action");
                ActionOutcome::failure(self.config.rewards.illegal)
            }
        }
    }

    fn check_walkable(&self, position: Position) -> Result<(), IllegalAction> {
        match self.cells.get(position) {
            None => Err(IllegalAction::OutOfBounds(position)),
            Some(cell) if cell.is_wall() => Err(IllegalAction::Wall(position)),
            Some(_) => Ok(()),
        }
    }

    fn check_step(&self, direction: Direction) -> Result<Position, IllegalAction> {
        let to = self.agent.step(direction).ok_or(IllegalAction::OffGrid)?;
        self.check_walkable(to)?;
        Ok(to)
    }

    fn check_toward(&self, target: Position) -> Result<Position, IllegalAction> {
        self.check_walkable(target)?;
        if target == self.agent {
            return Err(IllegalAction::AlreadyThere(target));
        }
        let path = find_path(self.agent, target, &self.blocked_grid());
        debug!(from = %self.agent, to = %target, steps = path.len().saturating_sub(1), "planned");
        path.get(1).copied().ok_or(IllegalAction::NoPath {
            from: self.agent,
            to: target,
        })
    }

    fn check_pick(&self, item: ItemKind) -> Result<(), IllegalAction> {
        if self.inventory.len() >= self.config.max_carry {
            return Err(IllegalAction::InventoryFull {
                capacity: self.config.max_carry,
            });
        }
        if !self.cells[self.agent].has(item.object()) {
            return Err(IllegalAction::ItemNotHere {
                item,
                position: self.agent,
            });
        }
        Ok(())
    }

    fn check_drop(&self, item: ItemKind) -> Result<usize, IllegalAction> {
        let index = self
            .inventory
            .iter()
            .position(|held| *held == item)
            .ok_or(IllegalAction::NotCarrying(item))?;
        let cell = &self.cells[self.agent];
        if cell.is_wall() {
            return Err(IllegalAction::Wall(self.agent));
        }
        if cell.has_pickable() {
            return Err(IllegalAction::CellOccupied(self.agent));
        }
        Ok(index)
    }

    fn check_paint(&self, target: PaintTarget) -> Result<(), IllegalAction> {
        for tool in [ItemKind::Brush, ItemKind::Color] {
            if !self.is_carrying(tool) {
                return Err(IllegalAction::MissingItem(tool));
            }
        }
        if !self.cells[self.agent].has(target.object()) {
            return Err(IllegalAction::TargetNotHere {
                target,
                position: self.agent,
            });
        }
        if !self.config.allow_repaint && self.is_painted(target) {
            return Err(IllegalAction::AlreadyPainted(target));
        }
        Ok(())
    }

    fn check_open_door(&self) -> Result<(), IllegalAction> {
        for tool in [ItemKind::Key, ItemKind::Code] {
            if !self.is_carrying(tool) {
                return Err(IllegalAction::MissingItem(tool));
            }
        }
        let door = self.door_position().ok_or(IllegalAction::NoDoor)?;
        let distance = self.agent.manhattan(door);
        if distance != 1 {
            return Err(IllegalAction::DoorNotAdjacent { door, distance });
        }
        Ok(())
    }
}

impl Default for WorldState {
    fn default() -> Self {
        WorldState::new(WorldConfig::default())
    }
}

fn build_cells(layout: &Layout) -> Grid<CellContents> {
    let mut cells: Grid<CellContents> = Grid::new(layout.width(), layout.height());
    for wall in layout.walls() {
        if let Some(cell) = cells.get_mut(*wall) {
            cell.insert(ObjectKind::Wall);
        }
    }
    for (kind, position) in layout.objects() {
        if let Some(cell) = cells.get_mut(*position) {
            cell.insert(*kind);
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: Position = Position::new(4, 3);
    const DOOR: Position = Position::new(4, 0);

    fn world() -> WorldState {
        WorldState::default()
    }

    /// Walks the agent to `target` with `move_toward`, asserting progress.
    fn walk_to(world: &mut WorldState, target: Position) {
        for _ in 0..32 {
            if world.agent_position() == target {
                return;
            }
            assert!(world.move_toward(target).success, "stuck on the way to {target}");
        }
        panic!("did not reach {target}");
    }

    fn fetch(world: &mut WorldState, item: ItemKind) {
        let position = world.locate(item.object()).expect("item on the ground");
        walk_to(world, position);
        assert!(world.pick(item).success);
    }

    #[test]
    fn starts_in_canonical_layout() {
        let world = world();
        assert_eq!(world.agent_position(), Position::new(0, 4));
        assert!(world.inventory().is_empty());
        assert!(!world.is_goal_reached());
        assert_eq!(world.door_position(), Some(DOOR));
        assert_eq!(world.locate(ObjectKind::Table), Some(TABLE));
    }

    #[test]
    fn step_into_wall_or_off_grid_fails_without_moving() {
        let mut world = world();
        // (0,3) above the start is a wall.
        let outcome = world.move_step(Direction::Up);
        assert_eq!(outcome, ActionOutcome::failure(-0.03));
        let outcome = world.move_step(Direction::Left);
        assert_eq!(outcome, ActionOutcome::failure(-0.03));
        let outcome = world.move_step(Direction::Down);
        assert_eq!(outcome, ActionOutcome::failure(-0.03));
        assert_eq!(world.agent_position(), Position::new(0, 4));

        let outcome = world.move_step(Direction::Right);
        assert_eq!(outcome, ActionOutcome::success(-0.02));
        assert_eq!(world.agent_position(), Position::new(1, 4));
    }

    #[test]
    fn move_toward_takes_one_step_along_a_shortest_path() {
        let mut world = world();
        let outcome = world.move_toward(Position::new(0, 0));
        assert_eq!(outcome, ActionOutcome::success(-0.02));
        assert_eq!(world.agent_position(), Position::new(1, 4));
    }

    #[test]
    fn move_toward_rejects_walls_bounds_and_current_cell() {
        let mut world = world();
        for target in [Position::new(3, 0), Position::new(5, 2), Position::new(0, 4)] {
            assert_eq!(world.move_toward(target), ActionOutcome::failure(-0.03));
            assert_eq!(world.agent_position(), Position::new(0, 4));
        }
    }

    #[test]
    fn move_toward_fails_when_target_is_walled_off() {
        let layout = Layout::parse(
            "ST .. .. WL DR
             .. .. .. WL WL
             BR KY CD CL ..
             CH TB .. .. ..
             .. .. .. .. ..",
        )
        .unwrap();
        let mut world = WorldState::with_layout(layout, WorldConfig::default()).unwrap();
        assert_eq!(world.move_toward(DOOR), ActionOutcome::failure(-0.03));
        assert_eq!(world.agent_position(), Position::new(0, 0));
    }

    #[test]
    fn pick_requires_item_on_cell_and_free_capacity() {
        let mut world = world();
        assert_eq!(world.pick(ItemKind::Brush), ActionOutcome::failure(-0.03));
        world.move_step(Direction::Right);
        assert_eq!(world.pick(ItemKind::Key), ActionOutcome::failure(-0.03));
        assert_eq!(world.pick(ItemKind::Brush), ActionOutcome::success(-0.02));
        assert!(world.is_carrying(ItemKind::Brush));
        assert_eq!(world.locate(ObjectKind::Brush), None);
        // Nothing left to pick up here.
        assert_eq!(world.pick(ItemKind::Brush), ActionOutcome::failure(-0.03));
    }

    #[test]
    fn pick_at_capacity_does_not_mutate() {
        let config = WorldConfig {
            max_carry: 1,
            ..WorldConfig::default()
        };
        let mut world = WorldState::new(config);
        fetch(&mut world, ItemKind::Brush);
        let color = world.locate(ObjectKind::Color).unwrap();
        walk_to(&mut world, color);
        assert_eq!(world.pick(ItemKind::Color), ActionOutcome::failure(-0.03));
        assert_eq!(world.inventory(), &[ItemKind::Brush]);
        assert!(world.contents(color).unwrap().has(ObjectKind::Color));
    }

    #[test]
    fn drop_rules() {
        let mut world = world();
        assert_eq!(world.drop(ItemKind::Brush), ActionOutcome::failure(-0.03));
        fetch(&mut world, ItemKind::Brush);
        let color = world.locate(ObjectKind::Color).unwrap();
        walk_to(&mut world, color);
        // No stacking on a cell that already holds an item.
        assert_eq!(world.drop(ItemKind::Brush), ActionOutcome::failure(-0.03));
        assert!(world.is_carrying(ItemKind::Brush));
        // Fixtures do not block dropping.
        walk_to(&mut world, TABLE);
        assert_eq!(world.drop(ItemKind::Brush), ActionOutcome::success(-0.02));
        assert!(world.contents(TABLE).unwrap().has(ObjectKind::Brush));
        assert!(world.inventory().is_empty());
    }

    #[test]
    fn paint_preconditions() {
        // Missing brush.
        let mut world = world();
        fetch(&mut world, ItemKind::Color);
        walk_to(&mut world, TABLE);
        assert_eq!(world.paint(PaintTarget::Table), ActionOutcome::failure(-0.03));

        // Missing color.
        let mut world = self::world();
        fetch(&mut world, ItemKind::Brush);
        walk_to(&mut world, TABLE);
        assert_eq!(world.paint(PaintTarget::Table), ActionOutcome::failure(-0.03));

        // Wrong cell.
        let mut world = self::world();
        fetch(&mut world, ItemKind::Brush);
        fetch(&mut world, ItemKind::Color);
        assert_eq!(world.paint(PaintTarget::Table), ActionOutcome::failure(-0.03));
        assert_eq!(world.paint(PaintTarget::Chair), ActionOutcome::failure(-0.03));
        assert!(!world.table_colored());

        walk_to(&mut world, TABLE);
        assert_eq!(world.paint(PaintTarget::Chair), ActionOutcome::failure(-0.03));
        assert_eq!(world.paint(PaintTarget::Table), ActionOutcome::success(1.0));
        assert!(world.table_colored());
        assert!(!world.chair_colored());
    }

    #[test]
    fn repaint_is_gated_by_config() {
        let config = WorldConfig {
            allow_repaint: false,
            ..WorldConfig::default()
        };
        let mut world = WorldState::new(config);
        fetch(&mut world, ItemKind::Brush);
        fetch(&mut world, ItemKind::Color);
        walk_to(&mut world, TABLE);
        assert_eq!(world.paint(PaintTarget::Table), ActionOutcome::success(1.0));
        assert_eq!(world.paint(PaintTarget::Table), ActionOutcome::failure(-0.03));
        assert!(world.table_colored());
    }

    #[test]
    fn open_door_requires_tools_and_adjacency() {
        let mut world = world();
        fetch(&mut world, ItemKind::Key);
        fetch(&mut world, ItemKind::Code);

        // Distance 2.
        walk_to(&mut world, Position::new(4, 2));
        assert_eq!(world.open_door(), ActionOutcome::failure(-0.03));
        // Distance 0.
        walk_to(&mut world, DOOR);
        assert_eq!(world.open_door(), ActionOutcome::failure(-0.03));
        assert!(!world.door_open());
        // Distance 1.
        walk_to(&mut world, Position::new(4, 1));
        assert_eq!(world.open_door(), ActionOutcome::success(0.8));
        assert!(world.door_open());
        // The door stays on the grid.
        assert_eq!(world.door_position(), Some(DOOR));
    }

    #[test]
    fn open_door_without_code_fails() {
        let mut world = world();
        fetch(&mut world, ItemKind::Key);
        walk_to(&mut world, Position::new(4, 1));
        assert_eq!(world.open_door(), ActionOutcome::failure(-0.03));
    }

    #[test]
    fn carrying_reward_scales_with_inventory() {
        let mut world = world();
        assert_eq!(world.carrying_reward(), -0.01);
        fetch(&mut world, ItemKind::Brush);
        assert!((world.carrying_reward() - -0.02).abs() < 1e-12);
        fetch(&mut world, ItemKind::Color);
        assert!((world.carrying_reward() - -0.04).abs() < 1e-12);
    }

    #[test]
    fn incompatible_items_cost_extra_when_enabled() {
        let config = WorldConfig {
            penalize_incompatible: true,
            ..WorldConfig::default()
        };
        let mut world = WorldState::new(config);
        fetch(&mut world, ItemKind::Key);
        // Key is needed while the door is closed.
        assert!((world.carrying_reward() - -0.02).abs() < 1e-12);
        fetch(&mut world, ItemKind::Code);
        walk_to(&mut world, Position::new(4, 1));
        assert!(world.open_door().success);
        // Both door tools are now dead weight.
        assert!((world.carrying_reward() - (-0.04 - 0.06)).abs() < 1e-12);
    }

    #[test]
    fn reset_restores_everything() {
        let mut world = world();
        fetch(&mut world, ItemKind::Brush);
        fetch(&mut world, ItemKind::Color);
        walk_to(&mut world, TABLE);
        assert!(world.paint(PaintTarget::Table).success);

        assert_eq!(world.reset(), ActionOutcome::success(-0.01));
        assert_eq!(world.agent_position(), Position::new(0, 4));
        assert!(world.inventory().is_empty());
        assert!(!world.table_colored());
        assert_eq!(world.cells(), WorldState::default().cells());
    }

    #[test]
    fn no_op_always_succeeds() {
        let mut world = world();
        assert_eq!(world.no_op(), ActionOutcome::success(-0.01));
        assert_eq!(world.execute(Action::NoOp), ActionOutcome::success(-0.01));
    }

    #[test]
    fn requests_are_dispatched_and_malformed_ones_penalized() {
        let mut world = world();
        assert_eq!(
            world.execute_request("move", &["right"]),
            ActionOutcome::success(-0.02)
        );
        assert_eq!(
            world.execute_request("pick", &["brush"]),
            ActionOutcome::success(-0.02)
        );
        let before = world.snapshot();
        for (name, args) in [("dance", vec![]), ("pick", vec![]), ("move", vec!["sideways"])] {
            assert_eq!(
                world.execute_request(name, &args),
                ActionOutcome::failure(-0.03)
            );
        }
        assert_eq!(world.snapshot(), before);
    }
}
