use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Width and height of one tile in pixels.
pub const TILE_SIZE: i32 = 16;

/// Room size used when a room omits its dimensions.
pub const DEFAULT_ROOM_WIDTH: i32 = 10;
pub const DEFAULT_ROOM_HEIGHT: i32 = 10;

/// Event id that addresses the player character.
pub const PLAYER_EVENT_ID: i32 = -1;

/// Event id that addresses "the event running this script".
pub const SELF_EVENT_ID: i32 = 0;

/// Facing direction. The numeric order is what scripts observe through
/// `set_variable` character lookups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum Dir {
    Up = 0,
    Right = 1,
    #[default]
    Down = 2,
    Left = 3,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn from_index(value: i64) -> Option<Self> {
        match value {
            0 => Some(Dir::Up),
            1 => Some(Dir::Right),
            2 => Some(Dir::Down),
            3 => Some(Dir::Left),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        self.rotate(2)
    }

    /// Rotates clockwise by `quarter_turns` steps of 90 degrees.
    pub fn rotate(self, quarter_turns: i32) -> Self {
        let index = (self as i32 + quarter_turns).rem_euclid(4);
        Self::ALL[index as usize]
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
        }
    }

    /// Direction of the dominant axis from one tile toward another.
    pub fn toward(from: (i32, i32), to: (i32, i32)) -> Option<Self> {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.abs() > dy.abs() {
            Some(if dx > 0 { Dir::Right } else { Dir::Left })
        } else {
            Some(if dy > 0 { Dir::Down } else { Dir::Up })
        }
    }
}

/// Movement speed level. Each level maps to a fixed number of frames per
/// tile transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize_repr, Deserialize_repr,
)]
#[repr(u8)]
pub enum Speed {
    Speed1 = 1,
    Speed2 = 2,
    #[default]
    Speed3 = 3,
    Speed4 = 4,
    Speed5 = 5,
    Speed6 = 6,
}

impl Speed {
    /// Speed used for the player when nothing else is configured.
    pub const PLAYER_DEFAULT: Speed = Speed::Speed5;

    pub fn frames(self) -> u32 {
        match self {
            Speed::Speed1 => 64,
            Speed::Speed2 => 32,
            Speed::Speed3 => 16,
            Speed::Speed4 => 12,
            Speed::Speed5 => 8,
            Speed::Speed6 => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Speed::Speed1),
            2 => Some(Speed::Speed2),
            3 => Some(Speed::Speed3),
            4 => Some(Speed::Speed4),
            5 => Some(Speed::Speed5),
            6 => Some(Speed::Speed6),
            _ => None,
        }
    }
}

/// Whether a numeric argument is a literal or the id of a variable holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Constant,
    Variable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_rotation_wraps_both_ways() {
        assert_eq!(Dir::Up.rotate(1), Dir::Right);
        assert_eq!(Dir::Left.rotate(1), Dir::Up);
        assert_eq!(Dir::Up.rotate(-1), Dir::Left);
        assert_eq!(Dir::Right.opposite(), Dir::Left);
        assert_eq!(Dir::from_index(4), None);
    }

    #[test]
    fn toward_prefers_the_longer_axis() {
        assert_eq!(Dir::toward((0, 0), (3, 1)), Some(Dir::Right));
        assert_eq!(Dir::toward((0, 0), (1, -3)), Some(Dir::Up));
        assert_eq!(Dir::toward((2, 2), (2, 2)), None);
    }

    #[test]
    fn speed_levels_decode_as_integers() {
        let speed: Speed = serde_json::from_str("5").expect("speed");
        assert_eq!(speed, Speed::Speed5);
        assert!(serde_json::from_str::<Speed>("0").is_err());
        assert!(Speed::Speed1.frames() > Speed::Speed6.frames());
    }
}
