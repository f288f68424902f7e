//! Shortest walkable routes on a 4-connected grid.
//!
//! The path finder keeps no state between calls: every query builds its
//! search from the `blocked` mask it is handed, so callers are free to change
//! obstacles between queries or run queries from several threads.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use tracing::trace;

use crate::{Direction, Position, map::Grid};

/// Open-set entry. Ordered so that `BinaryHeap` pops the lowest `f`, then the
/// lowest `h`, then the earliest inserted entry.
#[derive(Clone, Copy, Eq, PartialEq)]
struct Frontier {
    f: usize,
    h: usize,
    sequence: usize,
    position: Position,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns manhattan distance between two positions
pub fn manhattan_distance(a: Position, b: Position) -> usize {
    a.manhattan(b)
}

/// A* search from `start` to `goal` over the cells of `blocked` that are `false`.
///
/// The returned path includes both endpoints, so a route of `n` steps has
/// `n + 1` cells. `start == goal` yields `[start]`. The path is empty when
/// either endpoint is outside the grid or blocked, or when the goal cannot be
/// reached.
pub fn find_path(start: Position, goal: Position, blocked: &Grid<bool>) -> Vec<Position> {
    let walkable = |p: Position| matches!(blocked.get(p), Some(false));
    if !walkable(start) || !walkable(goal) {
        return Vec::new();
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost_so_far: HashMap<Position, usize> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();
    let mut sequence = 0;

    let h = manhattan_distance(start, goal);
    frontier.push(Frontier {
        f: h,
        h,
        sequence,
        position: start,
    });
    cost_so_far.insert(start, 0);

    let mut goal_reached = false;

    while let Some(Frontier {
        position: current, ..
    }) = frontier.pop()
    {
        if current == goal {
            goal_reached = true;
            break;
        }
        if !closed.insert(current) {
            continue;
        }

        let current_cost = cost_so_far.get(&current).copied().unwrap_or(usize::MAX);
        for neighbor in blocked.neighbors(current) {
            if !walkable(neighbor) || closed.contains(&neighbor) {
                continue;
            }
            let new_cost = current_cost + 1;
            let improves = cost_so_far
                .get(&neighbor)
                .is_none_or(|known| new_cost < *known);
            if improves {
                cost_so_far.insert(neighbor, new_cost);
                came_from.insert(neighbor, current);
                let h = manhattan_distance(neighbor, goal);
                sequence += 1;
                frontier.push(Frontier {
                    f: new_cost + h,
                    h,
                    sequence,
                    position: neighbor,
                });
            }
        }
    }

    if !goal_reached {
        trace!(%start, %goal, "no path");
        return Vec::new();
    }

    // Reconstruct path
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(previous) => {
                current = *previous;
                path.push(current);
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

/// Converts consecutive path cells into the directions that walk them.
/// Pairs that are not 4-adjacent are skipped.
pub fn path_to_directions(path: &[Position]) -> Vec<Direction> {
    path.windows(2)
        .filter_map(|pair| Direction::between(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> Grid<bool> {
        Grid::new(5, 5)
    }

    fn with_walls(walls: &[(usize, usize)]) -> Grid<bool> {
        let mut grid = open_grid();
        for &(x, y) in walls {
            grid[Position::new(x, y)] = true;
        }
        grid
    }

    fn assert_contiguous(path: &[Position]) {
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1, "jump in path {:?}", path);
        }
    }

    #[test]
    fn corner_to_corner_on_empty_grid() {
        let path = find_path(Position::new(0, 0), Position::new(4, 4), &open_grid());
        assert_eq!(path.len(), 9);
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&Position::new(4, 4)));
        assert_contiguous(&path);
    }

    #[test]
    fn start_equals_goal_is_single_cell() {
        let p = Position::new(2, 3);
        assert_eq!(find_path(p, p, &open_grid()), vec![p]);
    }

    #[test]
    fn blocked_endpoints_yield_empty() {
        let grid = with_walls(&[(0, 0), (4, 4)]);
        assert!(find_path(Position::new(0, 0), Position::new(2, 2), &grid).is_empty());
        assert!(find_path(Position::new(2, 2), Position::new(4, 4), &grid).is_empty());
    }

    #[test]
    fn out_of_bounds_endpoint_yields_empty() {
        assert!(find_path(Position::new(0, 0), Position::new(5, 0), &open_grid()).is_empty());
    }

    #[test]
    fn routes_around_a_wall() {
        // Vertical wall at x = 2 with a gap at the bottom row.
        let grid = with_walls(&[(2, 0), (2, 1), (2, 2), (2, 3)]);
        let path = find_path(Position::new(0, 0), Position::new(4, 0), &grid);
        assert_eq!(path.len(), 13);
        assert!(path.contains(&Position::new(2, 4)));
        assert_contiguous(&path);
    }

    #[test]
    fn unreachable_goal_yields_empty() {
        let grid = with_walls(&[(3, 4), (4, 3)]);
        assert!(find_path(Position::new(0, 0), Position::new(4, 4), &grid).is_empty());
    }

    #[test]
    fn equal_cost_ties_are_deterministic() {
        let a = find_path(Position::new(0, 0), Position::new(3, 3), &open_grid());
        let b = find_path(Position::new(0, 0), Position::new(3, 3), &open_grid());
        assert_eq!(a, b);
        // Right is expanded before down.
        assert_eq!(a[1], Position::new(1, 0));
    }

    #[test]
    fn directions_follow_the_path() {
        let path = [
            Position::new(1, 1),
            Position::new(2, 1),
            Position::new(2, 2),
            Position::new(1, 2),
            Position::new(1, 1),
            Position::new(3, 3),
        ];
        assert_eq!(
            path_to_directions(&path),
            vec![Direction::Right, Direction::Down, Direction::Left, Direction::Up]
        );
    }
}
