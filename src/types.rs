//! Core types shared across the engine, stores, and providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// AssetId: fresh random identifier assigned when an asset is created
pub type AssetId = uuid::Uuid;

/// ProjectId: opaque project key owned by the calling service
pub type ProjectId = String;

/// Seed: 31-bit unsigned generation seed
pub type Seed = u32;

/// Largest valid seed (2^31 - 1)
pub const MAX_SEED: Seed = i32::MAX as Seed;

/// Number of rows and columns in a matrix
pub const GRID_SIZE: usize = 3;

/// Number of cells in a matrix
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Aspect ratios accepted by the generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 9] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        AspectRatio::Square
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| {
                let valid: Vec<&str> = AspectRatio::ALL.iter().map(|r| r.as_str()).collect();
                format!(
                    "Unsupported aspect ratio '{}' (valid: {})",
                    trimmed,
                    valid.join(", ")
                )
            })
    }
}

/// Fixed (row, col) position of a cell inside the 3x3 grid
///
/// Rows follow the camera-angle axis, columns the lighting axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridPosition {
    row: u8,
    col: u8,
}

impl GridPosition {
    /// Create a position, returning None when either index is outside 0..3
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < GRID_SIZE && col < GRID_SIZE {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn col(&self) -> usize {
        self.col as usize
    }

    /// Row-major slot index (0..9)
    pub fn index(&self) -> usize {
        self.row() * GRID_SIZE + self.col()
    }

    /// All nine positions in row-major order
    pub fn all() -> impl Iterator<Item = GridPosition> {
        (0..CELL_COUNT).map(|i| GridPosition {
            row: (i / GRID_SIZE) as u8,
            col: (i % GRID_SIZE) as u8,
        })
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for GridPosition {
    type Err = String;

    /// Parse the recorded "row,col" form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once(',')
            .ok_or_else(|| format!("Invalid matrix position '{}' (expected row,col)", s))?;
        let row: usize = row
            .trim()
            .parse()
            .map_err(|_| format!("Invalid matrix row in '{}'", s))?;
        let col: usize = col
            .trim()
            .parse()
            .map_err(|_| format!("Invalid matrix column in '{}'", s))?;
        GridPosition::new(row, col)
            .ok_or_else(|| format!("Matrix position '{}' outside the 3x3 grid", s))
    }
}

impl TryFrom<String> for GridPosition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GridPosition> for String {
    fn from(position: GridPosition) -> Self {
        position.to_string()
    }
}
