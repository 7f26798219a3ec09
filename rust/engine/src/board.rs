use serde::{Deserialize, Serialize};

/// Number of cells on the shared ring all colors traverse.
pub const RING_CELLS: u8 = 52;

/// Highest color-relative progress that is still a ring cell.
/// A token entering at its start cell has progress 0 and turns into its
/// home lane after passing progress 50.
pub const RING_LAST_PROGRESS: u8 = 50;

/// Number of cells in each color's private home lane.
pub const LANE_CELLS: u8 = 5;

/// Color-relative progress of the finished position. A token travels
/// 51 ring cells, 5 lane cells, and must land here by exact count.
pub const HOME_PROGRESS: u8 = 56;

/// Ring cells where tokens of any color may coexist and captures never
/// occur: the four entry cells plus the four star cells between them.
pub const SAFE_CELLS: [u8; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

/// One of the four token colors, in fixed seat order.
/// Seat index and color are a bijection for the lifetime of a match.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Seat 0, enters the ring at cell 0
    Red,
    /// Seat 1, enters at cell 13
    Blue,
    /// Seat 2, enters at cell 26
    Green,
    /// Seat 3, enters at cell 39
    Yellow,
}

impl Color {
    pub fn from_seat(seat: usize) -> Color {
        match seat % 4 {
            0 => Color::Red,
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Color::Red => 0,
            Color::Blue => 1,
            Color::Green => 2,
            Color::Yellow => 3,
        }
    }

    /// Absolute ring cell where this color's tokens enter from the yard.
    pub fn start_cell(self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Blue => 13,
            Color::Green => 26,
            Color::Yellow => 39,
        }
    }
}

pub fn all_colors() -> [Color; 4] {
    [Color::Red, Color::Blue, Color::Green, Color::Yellow]
}

/// Maps a color-relative ring progress (0..=50) to the absolute ring cell.
pub fn ring_cell(color: Color, progress: u8) -> u8 {
    debug_assert!(progress <= RING_LAST_PROGRESS);
    (color.start_cell() + progress) % RING_CELLS
}

/// Inverse of [`ring_cell`]: the progress a color has made when standing
/// on the given absolute ring cell.
pub fn ring_progress(color: Color, cell: u8) -> u8 {
    debug_assert!(cell < RING_CELLS);
    (cell + RING_CELLS - color.start_cell()) % RING_CELLS
}

pub fn is_safe_cell(cell: u8) -> bool {
    SAFE_CELLS.contains(&cell)
}
