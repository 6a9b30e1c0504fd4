use std::fmt;

use serde::{Deserialize, Serialize};

const TICK_BITS: u32 = 8;
const TICK_MASK: u64 = (1 << TICK_BITS) - 1;

/// Default number of long ticks (economic settlements) per in-game day.
pub const LONG_TICKS_PER_DAY: u32 = 4;
/// Default number of short ticks (connectivity samples) per long tick.
pub const SHORT_TICKS_PER_LONG_TICK: u32 = 10;

/// Compact simulation timestamp encoding day and long-tick index in one `u64`.
///
/// Bit layout: `[day:56][long_tick:8]`. Natural `u64` ordering equals
/// chronological ordering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "TimestampRepr", from = "TimestampRepr")]
pub struct SimTimestamp(u64);

#[derive(Serialize, Deserialize)]
struct TimestampRepr {
    day: u64,
    tick: u32,
}

impl From<SimTimestamp> for TimestampRepr {
    fn from(ts: SimTimestamp) -> Self {
        TimestampRepr {
            day: ts.day(),
            tick: ts.tick(),
        }
    }
}

impl From<TimestampRepr> for SimTimestamp {
    fn from(repr: TimestampRepr) -> Self {
        SimTimestamp::new(repr.day, repr.tick)
    }
}

impl SimTimestamp {
    /// Create a timestamp from a day number and a long-tick index within that day.
    pub fn new(day: u64, tick: u32) -> Self {
        assert!(
            (tick as u64) <= TICK_MASK,
            "long tick index out of range: {tick}"
        );
        Self((day << TICK_BITS) | tick as u64)
    }

    pub fn from_day(day: u64) -> Self {
        Self::new(day, 0)
    }

    pub fn day(self) -> u64 {
        self.0 >> TICK_BITS
    }

    pub fn tick(self) -> u32 {
        (self.0 & TICK_MASK) as u32
    }

    /// The timestamp of the following long tick, rolling over to the next day.
    pub fn next(self, long_ticks_per_day: u32) -> Self {
        if self.tick() + 1 >= long_ticks_per_day {
            Self::new(self.day() + 1, 0)
        } else {
            Self::new(self.day(), self.tick() + 1)
        }
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for SimTimestamp {
    fn default() -> Self {
        Self::from_day(0)
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}.T{}", self.day(), self.tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_round_trip() {
        let ts = SimTimestamp::new(125, 3);
        assert_eq!(ts.day(), 125);
        assert_eq!(ts.tick(), 3);
    }

    #[test]
    fn next_rolls_over_day() {
        let ts = SimTimestamp::new(4, 3);
        assert_eq!(ts.next(4), SimTimestamp::new(5, 0));
        assert_eq!(SimTimestamp::new(4, 1).next(4), SimTimestamp::new(4, 2));
    }

    #[test]
    fn chronological_ordering() {
        let a = SimTimestamp::new(10, 0);
        let b = SimTimestamp::new(10, 3);
        let c = SimTimestamp::new(11, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn serde_shape() {
        let ts = SimTimestamp::new(12, 2);
        let value = serde_json::to_value(ts).unwrap();
        assert_eq!(value["day"], 12);
        assert_eq!(value["tick"], 2);
        let parsed: SimTimestamp = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn display_format() {
        assert_eq!(SimTimestamp::new(3, 1).to_string(), "D3.T1");
    }
}
