use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{Direction, ObjectKind, Position};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position {position} is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
}

/// A fixed-size 2D grid.
///
/// Cells are stored row-major in a flat vector. Dimensions never change after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        Grid {
            width,
            height,
            cells: vec![T::default(); width * height],
        }
    }

    /// Creates a grid whose cells are produced by `f`, called in row-major order.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Position { x, y }));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index_of(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then_some(position.y * self.width + position.x)
    }

    #[inline]
    fn position_of(&self, index: usize) -> Position {
        Position {
            x: index % self.width,
            y: index / self.width,
        }
    }

    /// Checks if `position` lies inside the grid.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).map(|index| &self.cells[index])
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        match self.index_of(position) {
            Some(index) => Some(&mut self.cells[index]),
            None => None,
        }
    }

    /// Overwrites the cell at `position`.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self.index_of(position).ok_or(GridError::OutOfBounds {
            position,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Yields `(position, &cell)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (self.position_of(index), cell))
    }

    /// Builds a grid of the same shape by applying `f` to every cell.
    pub fn map<U, F>(&self, mut f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(&mut f).collect(),
        }
    }

    /// In-bounds 4-neighbours of `position`, visited right, down, left, up.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        const ORDER: [Direction; 4] = [
            Direction::Right,
            Direction::Down,
            Direction::Left,
            Direction::Up,
        ];
        ORDER
            .into_iter()
            .filter_map(move |direction| position.step(direction))
            .filter(move |next| self.contains(*next))
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(index) => &self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(position) {
            Some(index) => &mut self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, width, height
            ),
        }
    }
}

/// The set of objects present on one cell, one flag per [`ObjectKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContents([bool; ObjectKind::COUNT]);

impl CellContents {
    pub fn has(&self, kind: ObjectKind) -> bool {
        self.0[kind.index()]
    }

    pub fn insert(&mut self, kind: ObjectKind) {
        self.0[kind.index()] = true;
    }

    pub fn remove(&mut self, kind: ObjectKind) {
        self.0[kind.index()] = false;
    }

    pub fn is_wall(&self) -> bool {
        self.has(ObjectKind::Wall)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|present| !present)
    }

    /// True when any pickable item lies on this cell.
    pub fn has_pickable(&self) -> bool {
        self.kinds().any(ObjectKind::is_pickable)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ObjectKind> + '_ {
        ObjectKind::ALL.into_iter().filter(|kind| self.has(*kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_out_of_bounds_is_an_error() {
        let mut grid: Grid<u8> = Grid::new(3, 2);
        let position = Position::new(3, 0);
        assert_eq!(
            grid.set(position, 1),
            Err(GridError::OutOfBounds {
                position,
                width: 3,
                height: 2
            })
        );
        assert!(grid.set(Position::new(2, 1), 7).is_ok());
        assert_eq!(grid[Position::new(2, 1)], 7);
    }

    #[test]
    fn enumerate_is_row_major() {
        let grid = Grid::from_generator(2, 2, |p| p.x + 10 * p.y);
        let seen: Vec<_> = grid.enumerate().map(|(p, v)| (p, *v)).collect();
        assert_eq!(
            seen,
            vec![
                (Position::new(0, 0), 0),
                (Position::new(1, 0), 1),
                (Position::new(0, 1), 10),
                (Position::new(1, 1), 11),
            ]
        );
    }

    #[test]
    fn neighbors_stay_in_bounds() {
        let grid: Grid<()> = Grid::new(5, 5);
        let corner: Vec<_> = grid.neighbors(Position::new(0, 0)).collect();
        assert_eq!(corner, vec![Position::new(1, 0), Position::new(0, 1)]);
        assert_eq!(grid.neighbors(Position::new(2, 2)).count(), 4);
        let far: Vec<_> = grid.neighbors(Position::new(4, 4)).collect();
        assert_eq!(far, vec![Position::new(3, 4), Position::new(4, 3)]);
    }

    #[test]
    fn cell_contents_track_kinds() {
        let mut cell = CellContents::default();
        assert!(cell.is_empty());
        cell.insert(ObjectKind::Table);
        assert!(!cell.has_pickable());
        cell.insert(ObjectKind::Brush);
        assert!(cell.has_pickable());
        assert_eq!(
            cell.kinds().collect::<Vec<_>>(),
            vec![ObjectKind::Brush, ObjectKind::Table]
        );
        cell.remove(ObjectKind::Brush);
        assert!(!cell.has(ObjectKind::Brush));
    }
}
