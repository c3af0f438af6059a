//! Value types shared by range reads and sync bookkeeping

use crate::identity::ElementId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending ids, strictly after the start id.
    Forward,
    /// Descending ids, strictly before the start id.
    Backward,
}

impl Direction {
    /// `reverse` flag as the remote API spells it.
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Direction::Backward)
    }
}

/// Which end of a verified range to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeEdge {
    Lower,
    Upper,
}

/// The verified slice `[lower, upper]` of a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeBounds {
    pub lower: ElementId,
    pub upper: ElementId,
}

impl RangeBounds {
    pub fn new(lower: ElementId, upper: ElementId) -> Self {
        Self { lower, upper }
    }

    /// Inclusive containment under the id ordering.
    pub fn contains(&self, id: &ElementId) -> bool {
        !id.is_after(&self.upper) && !self.lower.is_after(id)
    }

    pub fn is_inverted(&self) -> bool {
        self.lower.is_after(&self.upper)
    }
}

/// When the sync layer last recorded an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastUpdateTime {
    Never,
    Recorded(DateTime<Utc>),
}

impl LastUpdateTime {
    pub fn recorded(&self) -> Option<DateTime<Utc>> {
        match self {
            LastUpdateTime::Never => None,
            LastUpdateTime::Recorded(time) => Some(*time),
        }
    }
}

impl From<Option<DateTime<Utc>>> for LastUpdateTime {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(time) => LastUpdateTime::Recorded(time),
            None => LastUpdateTime::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(lower: &str, upper: &str) -> RangeBounds {
        RangeBounds::new(ElementId::from(lower), ElementId::from(upper))
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let b = bounds("10", "50");
        assert!(b.contains(&ElementId::from("10")));
        assert!(b.contains(&ElementId::from("30")));
        assert!(b.contains(&ElementId::from("50")));
        assert!(!b.contains(&ElementId::from("09")));
        assert!(!b.contains(&ElementId::from("51")));
        assert!(!b.contains(&ElementId::from("100")));
    }

    #[test]
    fn test_inverted_bounds() {
        assert!(bounds("50", "10").is_inverted());
        assert!(!bounds("10", "10").is_inverted());
    }

    #[test]
    fn test_direction_from_reverse() {
        assert_eq!(Direction::from_reverse(true), Direction::Backward);
        assert_eq!(Direction::from_reverse(false), Direction::Forward);
        assert!(Direction::Backward.is_reverse());
    }

    #[test]
    fn test_last_update_time_from_option() {
        assert_eq!(LastUpdateTime::from(None), LastUpdateTime::Never);
        let now = Utc::now();
        assert_eq!(LastUpdateTime::from(Some(now)).recorded(), Some(now));
    }
}
