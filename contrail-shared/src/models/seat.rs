use serde::{Deserialize, Serialize};
use std::fmt;

/// Cabin class of a ticket. Seats are counted per class, never assigned individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    First,
    Economy,
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatClass::First => write!(f, "FIRST"),
            SeatClass::Economy => write!(f, "ECONOMY"),
        }
    }
}
