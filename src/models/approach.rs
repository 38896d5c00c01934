use serde::{Deserialize, Serialize};

/// One directional entry into the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Approach {
    North,
    East,
    South,
    West,
}

impl Approach {
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::East,
        Approach::South,
        Approach::West,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Approach::North => "North",
            Approach::East => "East",
            Approach::South => "South",
            Approach::West => "West",
        }
    }

    /// Lowercase name, used for per-approach scene files.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Approach::North => "north",
            Approach::East => "east",
            Approach::South => "south",
            Approach::West => "west",
        }
    }
}

impl std::fmt::Display for Approach {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns the approach that follows `index` in a rotation order, wrapping around.
pub fn next_in_rotation(order: &[Approach], index: usize) -> Approach {
    order[(index + 1) % order.len()]
}
