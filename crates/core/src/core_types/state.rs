//! Burn states for graph nodes, graph edges and raster cells

use serde::{Deserialize, Serialize};

/// Fire state of a graph node.
///
/// Legal transitions are `NotBurnt -> Burning -> Burnt`. `Empty` and `Burnt`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireState {
    /// No fuel at this grid position
    Empty,
    NotBurnt,
    Burning,
    Burnt,
}

impl FireState {
    /// Palette / raster code: empty=0, not_burnt=1, burning=2, burnt=3
    pub fn code(self) -> u8 {
        match self {
            FireState::Empty => 0,
            FireState::NotBurnt => 1,
            FireState::Burning => 2,
            FireState::Burnt => 3,
        }
    }

    /// Whether this node carries fuel at all
    pub fn is_occupied(self) -> bool {
        self != FireState::Empty
    }

    /// Whether `self -> next` is a legal transition (staying put is always legal)
    pub fn can_become(self, next: FireState) -> bool {
        matches!(
            (self, next),
            (FireState::NotBurnt, FireState::Burning) | (FireState::Burning, FireState::Burnt)
        ) || self == next
    }
}

/// Visual/propagation marker of a graph edge.
///
/// Edges start as `Base`, turn `Active` when fire crosses them and end `Burnt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMarker {
    Base,
    Active,
    Burnt,
}

/// Raster cell state. The discriminants are the values written to `GeoTIFF` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CellState {
    /// Non-burnable land, permanently terminal
    #[default]
    NoForest = 0,
    Forest = 1,
    Burning = 2,
    Burnt = 3,
}

impl CellState {
    /// Decode a raster class value. Unknown classes return `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CellState::NoForest),
            1 => Some(CellState::Forest),
            2 => Some(CellState::Burning),
            3 => Some(CellState::Burnt),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether `self -> next` is a legal transition (staying put is always legal)
    pub fn can_become(self, next: CellState) -> bool {
        matches!(
            (self, next),
            (CellState::Forest, CellState::Burning) | (CellState::Burning, CellState::Burnt)
        ) || self == next
    }
}
