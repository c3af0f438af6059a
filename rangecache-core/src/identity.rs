//! Identity types for cached entities
//!
//! All identifiers are opaque strings. Element ids additionally carry a total
//! order, built on [`first_bigger_than_second`], which is what list ranges are
//! sorted by.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Smallest id the server ever generates. Reading forward from it starts at
/// the beginning of a list.
pub const GENERATED_MIN_ID: &str = "------------";

/// Largest id the server ever generates. Reading backward from it starts at
/// the end of a list.
pub const GENERATED_MAX_ID: &str = "zzzzzzzzzzzz";

/// Returns true if `first` sorts strictly after `second`.
///
/// A longer id is always bigger; ids of the same length compare byte by byte.
/// Generated ids use an ASCII-sorted alphabet, so this matches creation order.
pub fn first_bigger_than_second(first: &str, second: &str) -> bool {
    match first.len().cmp(&second.len()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => first.as_bytes() > second.as_bytes(),
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a single entity, unique within its list (or its type for
    /// standalone entities). Ordered by [`first_bigger_than_second`].
    ElementId
);

string_id!(
    /// Identifier of a server-side list.
    ListId
);

string_id!(
    /// Ownership group of an entity. Bulk eviction and sync batches are keyed
    /// by group.
    GroupId
);

string_id!(
    /// Identity of the session owner.
    UserId
);

string_id!(
    /// Identifier of an entity-update batch processed by the sync layer.
    BatchId
);

impl ElementId {
    /// The [`GENERATED_MIN_ID`] sentinel.
    pub fn min_generated() -> Self {
        Self::new(GENERATED_MIN_ID)
    }

    /// The [`GENERATED_MAX_ID`] sentinel.
    pub fn max_generated() -> Self {
        Self::new(GENERATED_MAX_ID)
    }

    /// Strict "greater than" under the id ordering.
    pub fn is_after(&self, other: &ElementId) -> bool {
        first_bigger_than_second(&self.0, &other.0)
    }

    /// Strict "less than" under the id ordering.
    pub fn is_before(&self, other: &ElementId) -> bool {
        first_bigger_than_second(&other.0, &self.0)
    }
}

impl Ord for ElementId {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.is_after(other) {
            Ordering::Greater
        } else if other.is_after(self) {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl PartialOrd for ElementId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_longer_id_is_bigger() {
        assert!(first_bigger_than_second("100", "99"));
        assert!(!first_bigger_than_second("99", "100"));
    }

    #[test]
    fn test_same_length_is_lexicographic() {
        assert!(first_bigger_than_second("b", "a"));
        assert!(!first_bigger_than_second("a", "b"));
        assert!(!first_bigger_than_second("a", "a"));
    }

    #[test]
    fn test_generated_sentinels_bracket_ids() {
        let id = ElementId::new("MzQ-1l2--3-0");
        assert!(id.is_after(&ElementId::min_generated()));
        assert!(id.is_before(&ElementId::max_generated()));
    }

    #[test]
    fn test_sort_uses_id_ordering() {
        let mut ids: Vec<ElementId> = ["50", "9", "100", "10"]
            .into_iter()
            .map(ElementId::from)
            .collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(ElementId::as_str).collect();
        assert_eq!(sorted, vec!["9", "10", "50", "100"]);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ListId::new("list-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"list-1\"");
    }

    proptest! {
        #[test]
        fn prop_ordering_is_total_and_antisymmetric(a in "[a-z0-9]{0,6}", b in "[a-z0-9]{0,6}") {
            let x = ElementId::new(a.clone());
            let y = ElementId::new(b.clone());
            let greater = x.is_after(&y);
            let less = x.is_before(&y);
            prop_assert!(!(greater && less));
            prop_assert_eq!(!greater && !less, a == b);
        }
    }
}
