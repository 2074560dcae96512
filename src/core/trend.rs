use crate::models::{Trend, TrendDirection};

/// Derive rank movement between the previous and current snapshot
///
/// A numerically smaller rank is better, so moving from 5 to 3 is "up 2".
pub fn determine_trend(current_rank: u32, previous_rank: Option<u32>) -> Trend {
    let Some(previous) = previous_rank else {
        return Trend {
            direction: TrendDirection::New,
            magnitude: 0,
        };
    };

    let change = previous as i64 - current_rank as i64;
    let direction = match change {
        c if c > 0 => TrendDirection::Up,
        c if c < 0 => TrendDirection::Down,
        _ => TrendDirection::Stable,
    };

    Trend {
        direction,
        magnitude: change.unsigned_abs() as u32,
    }
}

impl Trend {
    /// Signed movement, positive when the venue climbed
    pub fn signed_change(&self) -> i64 {
        match self.direction {
            TrendDirection::Up => self.magnitude as i64,
            TrendDirection::Down => -(self.magnitude as i64),
            TrendDirection::Stable | TrendDirection::New => 0,
        }
    }
}
