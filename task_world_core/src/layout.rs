//! Starting arrangements of walls, fixtures and items.

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;

use crate::{HEIGHT, ObjectKind, Position, WIDTH};

/// Object kinds other than `Wall`; a layout places each exactly once.
pub const PLACED_OBJECTS: [ObjectKind; 7] = [
    ObjectKind::Brush,
    ObjectKind::Color,
    ObjectKind::Key,
    ObjectKind::Code,
    ObjectKind::Table,
    ObjectKind::Chair,
    ObjectKind::Door,
];

/// The canonical layout in the text format accepted by [`Layout::parse`].
pub const CANONICAL_LAYOUT: &str = "\
CH .. KY WL DR
.. .. .. WL ..
CD .. CL .. ..
WL WL .. .. TB
ST BR .. .. ..
";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown layout code '{token}' at {position}")]
    UnknownToken { token: String, position: Position },
    #[error("multiple start positions ('ST') found")]
    MultipleStarts,
    #[error("no start position ('ST') found")]
    NoStart,
    #[error("{position} is outside the {width}x{height} layout")]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
    #[error("{0} is a wall")]
    OnWall(Position),
    #[error("{kind:?} appears {count} times, expected exactly once")]
    ObjectCount { kind: ObjectKind, count: usize },
}

/// A complete starting arrangement: grid size, walls, agent start and one
/// cell for each of the [`PLACED_OBJECTS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    width: usize,
    height: usize,
    walls: Vec<Position>,
    start: Position,
    objects: Vec<(ObjectKind, Position)>,
}

impl Layout {
    /// Builds a layout and checks it against the placement rules.
    pub fn new(
        width: usize,
        height: usize,
        walls: Vec<Position>,
        start: Position,
        objects: Vec<(ObjectKind, Position)>,
    ) -> Result<Self, LayoutError> {
        let layout = Layout {
            width,
            height,
            walls,
            start,
            objects,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// The single fixed arrangement every episode starts from by default.
    pub fn canonical() -> Self {
        Layout {
            width: WIDTH,
            height: HEIGHT,
            walls: canonical_walls(),
            start: Position::new(0, 4),
            objects: vec![
                (ObjectKind::Chair, Position::new(0, 0)),
                (ObjectKind::Key, Position::new(2, 0)),
                (ObjectKind::Door, Position::new(4, 0)),
                (ObjectKind::Code, Position::new(0, 2)),
                (ObjectKind::Color, Position::new(2, 2)),
                (ObjectKind::Table, Position::new(4, 3)),
                (ObjectKind::Brush, Position::new(1, 4)),
            ],
        }
    }

    /// Keeps the canonical walls and start cell and scatters the objects over
    /// distinct free cells.
    pub fn randomized<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let walls = canonical_walls();
        let start = Position::new(0, 4);
        let mut free: Vec<Position> = (0..HEIGHT)
            .flat_map(|y| (0..WIDTH).map(move |x| Position::new(x, y)))
            .filter(|p| *p != start && !walls.contains(p))
            .collect();
        free.shuffle(rng);
        let objects = PLACED_OBJECTS.into_iter().zip(free).collect();
        Layout {
            width: WIDTH,
            height: HEIGHT,
            walls,
            start,
            objects,
        }
    }

    /// Parses whitespace-separated two-letter codes, one grid row per line.
    ///
    /// `..` floor, `WL` wall, `ST` agent start, `BR` brush, `KY` key,
    /// `CD` code, `CL` color, `DR` door, `CH` chair, `TB` table.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let rows: Vec<Vec<&str>> = source
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect();
        let width = rows.first().map(Vec::len).ok_or(LayoutError::Empty)?;
        let height = rows.len();

        let mut walls = Vec::new();
        let mut start = None;
        let mut objects = Vec::new();

        for (y, tokens) in rows.iter().enumerate() {
            if tokens.len() != width {
                return Err(LayoutError::InconsistentWidth {
                    row: y,
                    expected: width,
                    found: tokens.len(),
                });
            }
            for (x, token) in tokens.iter().enumerate() {
                let position = Position::new(x, y);
                match *token {
                    ".." => {}
                    "WL" => walls.push(position),
                    "ST" => {
                        if start.replace(position).is_some() {
                            return Err(LayoutError::MultipleStarts);
                        }
                    }
                    code => {
                        let kind = object_for_code(code).ok_or_else(|| {
                            LayoutError::UnknownToken {
                                token: code.to_string(),
                                position,
                            }
                        })?;
                        objects.push((kind, position));
                    }
                }
            }
        }

        let start = start.ok_or(LayoutError::NoStart)?;
        Layout::new(width, height, walls, start, objects)
    }

    /// Checks bounds, that nothing sits on a wall and that every object kind
    /// appears exactly once.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let in_bounds = |position: Position| {
            if position.x < self.width && position.y < self.height {
                Ok(())
            } else {
                Err(LayoutError::OutOfBounds {
                    position,
                    width: self.width,
                    height: self.height,
                })
            }
        };

        for wall in &self.walls {
            in_bounds(*wall)?;
        }
        in_bounds(self.start)?;
        if self.walls.contains(&self.start) {
            return Err(LayoutError::OnWall(self.start));
        }
        for (_, position) in &self.objects {
            in_bounds(*position)?;
            if self.walls.contains(position) {
                return Err(LayoutError::OnWall(*position));
            }
        }
        for kind in PLACED_OBJECTS {
            let count = self.objects.iter().filter(|(k, _)| *k == kind).count();
            if count != 1 {
                return Err(LayoutError::ObjectCount { kind, count });
            }
        }
        if let Some((_, position)) = self.objects.iter().find(|(k, _)| *k == ObjectKind::Wall) {
            return Err(LayoutError::OnWall(*position));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn walls(&self) -> &[Position] {
        &self.walls
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn objects(&self) -> &[(ObjectKind, Position)] {
        &self.objects
    }

    pub fn position_of(&self, kind: ObjectKind) -> Option<Position> {
        self.objects
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, position)| *position)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::canonical()
    }
}

fn canonical_walls() -> Vec<Position> {
    vec![
        Position::new(3, 0),
        Position::new(3, 1),
        Position::new(0, 3),
        Position::new(1, 3),
    ]
}

fn object_for_code(code: &str) -> Option<ObjectKind> {
    match code {
        "BR" => Some(ObjectKind::Brush),
        "KY" => Some(ObjectKind::Key),
        "CD" => Some(ObjectKind::Code),
        "CL" => Some(ObjectKind::Color),
        "DR" => Some(ObjectKind::Door),
        "CH" => Some(ObjectKind::Chair),
        "TB" => Some(ObjectKind::Table),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn sorted(mut objects: Vec<(ObjectKind, Position)>) -> Vec<(ObjectKind, Position)> {
        objects.sort_by_key(|(_, p)| *p);
        objects
    }

    #[test]
    fn canonical_text_matches_canonical_layout() {
        let parsed = Layout::parse(CANONICAL_LAYOUT).unwrap();
        let canonical = Layout::canonical();
        assert_eq!(parsed.start(), canonical.start());
        assert_eq!(parsed.walls(), canonical.walls());
        assert_eq!(
            sorted(parsed.objects().to_vec()),
            sorted(canonical.objects().to_vec())
        );
        assert!(canonical.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(Layout::parse("  \n \n"), Err(LayoutError::Empty));
        assert_eq!(
            Layout::parse("ST ..\n.."),
            Err(LayoutError::InconsistentWidth {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            Layout::parse("ST ZZ"),
            Err(LayoutError::UnknownToken {
                token: "ZZ".into(),
                position: Position::new(1, 0)
            })
        );
        assert_eq!(
            Layout::parse("ST ST BR KY CD CL DR CH TB"),
            Err(LayoutError::MultipleStarts)
        );
        assert_eq!(
            Layout::parse("BR KY CD CL DR CH TB"),
            Err(LayoutError::NoStart)
        );
    }

    #[test]
    fn requires_each_object_once() {
        assert_eq!(
            Layout::parse("ST BR KY CD CL DR CH"),
            Err(LayoutError::ObjectCount {
                kind: ObjectKind::Table,
                count: 0
            })
        );
        assert_eq!(
            Layout::parse("ST BR BR KY CD CL DR CH TB"),
            Err(LayoutError::ObjectCount {
                kind: ObjectKind::Brush,
                count: 2
            })
        );
    }

    #[test]
    fn constructor_rejects_objects_on_walls() {
        let mut objects = Layout::canonical().objects().to_vec();
        objects[0].1 = Position::new(3, 0);
        assert_eq!(
            Layout::new(5, 5, canonical_walls(), Position::new(0, 4), objects),
            Err(LayoutError::OnWall(Position::new(3, 0)))
        );
    }

    #[test]
    fn randomized_layouts_are_valid_and_seeded() {
        for seed in 0..20 {
            let a = Layout::randomized(&mut StdRng::seed_from_u64(seed));
            let b = Layout::randomized(&mut StdRng::seed_from_u64(seed));
            assert_eq!(a, b);
            assert!(a.validate().is_ok());
            assert!(a.objects().iter().all(|(_, p)| *p != a.start()));
        }
    }
}
