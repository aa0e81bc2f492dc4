#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Stopped,
}

impl Direction {
    /// Travel direction needed to get from `from` to `to`.
    pub fn towards(from: u8, to: u8) -> Self {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Stopped
        }
    }
}
