use std::collections::BTreeSet;

use crate::direction::Direction;

/// Snapshot of one elevator's physical state as reported by its slave.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ElevData {
    pub floor: u8,
    pub direction: Direction,
    pub cabin_calls: BTreeSet<u8>,
}

impl ElevData {
    pub fn new() -> Self {
        ElevData {
            floor: 0,
            direction: Direction::Stopped,
            cabin_calls: BTreeSet::new(),
        }
    }
}

impl Default for ElevData {
    fn default() -> Self {
        Self::new()
    }
}
