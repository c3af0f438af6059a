//! Range record for a single cached list.
//!
//! A [`ListRange`] holds the verified slice `[lower, upper]` of a server list,
//! the ids known to exist inside it, and every loaded body of the list
//! (including bodies loaded individually outside the slice).
//!
//! # Invariant
//!
//! For every id inside the bounds, the id is in `known_ids` iff the element
//! exists remotely. `known_ids` is strictly ascending and every known id has
//! a body. Ids outside the bounds are never tracked, because tracking them
//! would claim completeness for a region nobody verified.

use rangecache_core::{Direction, ElementId, Entity, GroupId, RangeBounds, RangeEdge};
use std::collections::HashMap;

/// Cache for a single range-tracked list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRange {
    known_ids: Vec<ElementId>,
    bounds: RangeBounds,
    elements: HashMap<ElementId, Entity>,
}

impl ListRange {
    /// Record created by the first write to a list: the element alone forms
    /// the verified slice.
    pub fn with_first_element(entity: Entity) -> Self {
        let id = entity.element_id().clone();
        let mut elements = HashMap::new();
        elements.insert(id.clone(), entity);
        Self {
            known_ids: vec![id.clone()],
            bounds: RangeBounds::new(id.clone(), id),
            elements,
        }
    }

    /// Empty record with the given verified slice.
    pub fn with_bounds(bounds: RangeBounds) -> Self {
        Self {
            known_ids: Vec::new(),
            bounds,
            elements: HashMap::new(),
        }
    }

    pub fn bounds(&self) -> &RangeBounds {
        &self.bounds
    }

    pub fn known_ids(&self) -> &[ElementId] {
        &self.known_ids
    }

    pub fn contains_in_bounds(&self, id: &ElementId) -> bool {
        self.bounds.contains(id)
    }

    pub fn get(&self, id: &ElementId) -> Option<&Entity> {
        self.elements.get(id)
    }

    pub fn body_count(&self) -> usize {
        self.elements.len()
    }

    /// Store a body, overwriting any previous one. The id becomes known only
    /// if it lies inside the bounds.
    pub fn put(&mut self, entity: Entity) {
        let id = entity.element_id().clone();
        self.elements.insert(id.clone(), entity);
        if self.bounds.contains(&id) {
            insert_into_range(&mut self.known_ids, id);
        }
    }

    /// Remove a body and its known id. Bounds are untouched: a deletion inside
    /// the slice is itself verified information.
    pub fn remove(&mut self, id: &ElementId) -> Option<Entity> {
        self.known_ids.retain(|known| known != id);
        self.elements.remove(id)
    }

    /// Replace the verified slice. Known ids are dropped, bodies are kept.
    pub fn reset_bounds(&mut self, bounds: RangeBounds) {
        self.bounds = bounds;
        self.known_ids.clear();
    }

    /// Move one edge of the slice to `id`.
    ///
    /// Known ids that end up outside the new slice are dropped (their bodies
    /// stay), so the known ids never escape the bounds. Returns the candidate
    /// bounds without applying them if the move would invert the slice.
    pub fn set_edge(&mut self, edge: RangeEdge, id: ElementId) -> Result<(), RangeBounds> {
        let candidate = match edge {
            RangeEdge::Lower => RangeBounds::new(id, self.bounds.upper.clone()),
            RangeEdge::Upper => RangeBounds::new(self.bounds.lower.clone(), id),
        };
        if candidate.is_inverted() {
            return Err(candidate);
        }
        self.known_ids.retain(|known| candidate.contains(known));
        self.bounds = candidate;
        Ok(())
    }

    /// Up to `count` copies strictly beyond `start` in `direction`, taken only
    /// from the known ids. Backward results are in descending order.
    pub fn provide(&self, start: &ElementId, count: usize, direction: Direction) -> Vec<Entity> {
        let ids: Vec<&ElementId> = match direction {
            Direction::Forward => {
                let first = self.known_ids.partition_point(|id| !id.is_after(start));
                self.known_ids[first..].iter().take(count).collect()
            }
            Direction::Backward => {
                let end = self.known_ids.partition_point(|id| id.is_before(start));
                let begin = end.saturating_sub(count);
                self.known_ids[begin..end].iter().rev().collect()
            }
        };
        ids.into_iter()
            .filter_map(|id| self.elements.get(id).cloned())
            .collect()
    }

    /// Copies of every body in the known range, ascending.
    pub fn whole_list(&self) -> Vec<Entity> {
        self.known_ids
            .iter()
            .filter_map(|id| self.elements.get(id).cloned())
            .collect()
    }

    /// True if any loaded body, in range or not, belongs to `group`.
    pub fn has_owner(&self, group: &GroupId) -> bool {
        self.elements.values().any(|entity| entity.is_owned_by(group))
    }
}

/// Insert keeping ascending order; no-op if already present.
fn insert_into_range(known_ids: &mut Vec<ElementId>, id: ElementId) {
    if let Err(position) = known_ids.binary_search(&id) {
        known_ids.insert(position, id);
    }
}

/// Cache for a blob-element list: bodies only, no ordering claims.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobList {
    elements: HashMap<ElementId, Entity>,
}

impl BlobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ElementId) -> Option<&Entity> {
        self.elements.get(id)
    }

    pub fn put(&mut self, entity: Entity) {
        self.elements.insert(entity.element_id().clone(), entity);
    }

    pub fn remove(&mut self, id: &ElementId) -> Option<Entity> {
        self.elements.remove(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn has_owner(&self, group: &GroupId) -> bool {
        self.elements.values().any(|entity| entity.is_owned_by(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangecache_core::{EntityKey, ListId, TypeRef};
    use serde_json::json;

    fn mail(id: &str) -> Entity {
        Entity::new(
            TypeRef::new("tutanota", "Mail"),
            EntityKey::List(ListId::new("inbox"), ElementId::from(id)),
            json!({ "subject": format!("mail {}", id) }),
        )
        .with_owner("owner")
    }

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.element_id().as_str()).collect()
    }

    fn range_10_to_50() -> ListRange {
        let mut range = ListRange::with_bounds(RangeBounds::new("10".into(), "50".into()));
        for id in ["10", "20", "30", "40", "50"] {
            range.put(mail(id));
        }
        range
    }

    #[test]
    fn test_first_element_forms_range() {
        let range = ListRange::with_first_element(mail("42"));
        assert_eq!(range.bounds(), &RangeBounds::new("42".into(), "42".into()));
        assert_eq!(range.known_ids(), &[ElementId::from("42")]);
    }

    #[test]
    fn test_put_keeps_known_ids_sorted_without_duplicates() {
        let mut range = ListRange::with_bounds(RangeBounds::new("10".into(), "99".into()));
        for id in ["30", "10", "50", "20", "30"] {
            range.put(mail(id));
        }
        let known: Vec<&str> = range.known_ids().iter().map(ElementId::as_str).collect();
        assert_eq!(known, vec!["10", "20", "30", "50"]);
    }

    #[test]
    fn test_put_outside_bounds_is_not_tracked() {
        let mut range = range_10_to_50();
        range.put(mail("60"));
        assert!(range.get(&ElementId::from("60")).is_some());
        assert!(!range.known_ids().contains(&ElementId::from("60")));
    }

    #[test]
    fn test_provide_forward() {
        let range = range_10_to_50();
        let result = range.provide(&ElementId::from("20"), 2, Direction::Forward);
        assert_eq!(ids(&result), vec!["30", "40"]);
    }

    #[test]
    fn test_provide_forward_past_end_is_empty() {
        let range = range_10_to_50();
        assert!(range.provide(&ElementId::from("50"), 5, Direction::Forward).is_empty());
    }

    #[test]
    fn test_provide_backward_runs_off_the_front() {
        let range = range_10_to_50();
        let result = range.provide(&ElementId::from("30"), 10, Direction::Backward);
        assert_eq!(ids(&result), vec!["20", "10"]);
    }

    #[test]
    fn test_provide_backward_from_start_before_range_is_empty() {
        let range = range_10_to_50();
        assert!(range.provide(&ElementId::from("10"), 3, Direction::Backward).is_empty());
    }

    #[test]
    fn test_provide_never_returns_out_of_range_bodies() {
        let mut range = range_10_to_50();
        range.put(mail("70"));
        let result = range.provide(&ElementId::from("40"), 10, Direction::Forward);
        assert_eq!(ids(&result), vec!["50"]);
    }

    #[test]
    fn test_extend_upper_then_insert() {
        let mut range = range_10_to_50();
        range.set_edge(RangeEdge::Upper, ElementId::from("60")).unwrap();
        range.put(mail("55"));
        let result = range.provide(&ElementId::from("50"), 5, Direction::Forward);
        assert_eq!(ids(&result), vec!["55"]);
    }

    #[test]
    fn test_narrowing_edge_drops_known_ids_outside() {
        let mut range = range_10_to_50();
        range.set_edge(RangeEdge::Upper, ElementId::from("30")).unwrap();
        let known: Vec<&str> = range.known_ids().iter().map(ElementId::as_str).collect();
        assert_eq!(known, vec!["10", "20", "30"]);
        assert!(range.get(&ElementId::from("40")).is_some());
    }

    #[test]
    fn test_inverting_edge_is_rejected() {
        let mut range = range_10_to_50();
        let rejected = range.set_edge(RangeEdge::Lower, ElementId::from("60")).unwrap_err();
        assert!(rejected.is_inverted());
        assert_eq!(range.bounds(), &RangeBounds::new("10".into(), "50".into()));
    }

    #[test]
    fn test_reset_bounds_keeps_bodies() {
        let mut range = range_10_to_50();
        range.reset_bounds(RangeBounds::new("20".into(), "40".into()));
        assert!(range.known_ids().is_empty());
        assert_eq!(range.body_count(), 5);
    }

    #[test]
    fn test_remove_keeps_bounds() {
        let mut range = ListRange::with_first_element(mail("42"));
        assert!(range.remove(&ElementId::from("42")).is_some());
        assert!(range.known_ids().is_empty());
        assert_eq!(range.bounds(), &RangeBounds::new("42".into(), "42".into()));
    }

    #[test]
    fn test_whole_list_is_known_range_only() {
        let mut range = range_10_to_50();
        range.put(mail("90"));
        assert_eq!(ids(&range.whole_list()), vec!["10", "20", "30", "40", "50"]);
    }

    #[test]
    fn test_has_owner_considers_out_of_range_bodies() {
        let mut range = ListRange::with_bounds(RangeBounds::new("10".into(), "20".into()));
        range.put(mail("90").with_owner("other"));
        assert!(range.has_owner(&GroupId::from("other")));
        assert!(!range.has_owner(&GroupId::from("owner")));
    }

    #[test]
    fn test_blob_list_put_get_remove() {
        let mut blobs = BlobList::new();
        blobs.put(mail("1"));
        assert_eq!(blobs.len(), 1);
        assert!(blobs.has_owner(&GroupId::from("owner")));
        assert!(blobs.remove(&ElementId::from("1")).is_some());
        assert!(blobs.is_empty());
    }
}
