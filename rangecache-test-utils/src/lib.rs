//! rangecache Test Utilities
//!
//! Shared test infrastructure for the rangecache workspace:
//! - Proptest generators for ids and entities
//! - Fixtures for a small mail-client type model
//! - Tracing setup for test output

pub use rangecache_core::{
    CacheError, CacheResult, ElementId, Entity, EntityKey, GroupId, ListId, RangeBounds,
    StaticTypeResolver, StorageError, TypeKind, TypeRef,
};
pub use rangecache_storage::{CacheStorage, EphemeralCacheStorage};

use std::sync::Arc;

/// Install a test-writer tracing subscriber, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for rangecache types.

    use super::*;
    use proptest::prelude::*;

    /// Element ids of a fixed width, so id order equals string order.
    pub fn arb_element_id() -> impl Strategy<Value = ElementId> {
        "[0-9a-z]{4}".prop_map(ElementId::new)
    }

    /// Element ids of one to three characters, so `"9" < "10" < "100"` and
    /// string order differs from id order.
    pub fn arb_mixed_width_element_id() -> impl Strategy<Value = ElementId> {
        "[0-9a-z]{1,3}".prop_map(ElementId::new)
    }

    /// Distinct mixed-width ids, ascending in id order.
    pub fn arb_sorted_element_ids(max: usize) -> impl Strategy<Value = Vec<ElementId>> {
        prop::collection::hash_set(arb_mixed_width_element_id(), 0..max).prop_map(|ids| {
            let mut ids: Vec<ElementId> = ids.into_iter().collect();
            ids.sort();
            ids
        })
    }

    pub fn arb_group_id() -> impl Strategy<Value = GroupId> {
        prop_oneof![Just("g1"), Just("g2"), Just("g3")].prop_map(GroupId::from)
    }

    /// Lower/upper pair of mixed-width ids with `lower <= upper`.
    pub fn arb_range_bounds() -> impl Strategy<Value = RangeBounds> {
        (arb_mixed_width_element_id(), arb_mixed_width_element_id()).prop_map(|(a, b)| {
            if a <= b {
                RangeBounds::new(a, b)
            } else {
                RangeBounds::new(b, a)
            }
        })
    }

    /// A mail in `list_id` with a random id and owner.
    pub fn arb_mail(list_id: &'static str) -> impl Strategy<Value = Entity> {
        (arb_element_id(), arb_group_id(), "[a-z ]{0,16}").prop_map(move |(id, owner, subject)| {
            let mut mail = super::fixtures::mail(list_id, id.as_str(), owner.as_str());
            mail.body = serde_json::json!({ "subject": subject });
            mail
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! A small mail-client type model and entity builders over it.

    use super::*;
    use serde_json::json;

    pub fn mail_type() -> TypeRef {
        TypeRef::new("tutanota", "Mail")
    }

    pub fn contact_type() -> TypeRef {
        TypeRef::new("tutanota", "Contact")
    }

    pub fn mail_details_type() -> TypeRef {
        TypeRef::new("tutanota", "MailDetailsBlob")
    }

    pub fn mail_address_type() -> TypeRef {
        TypeRef::new("tutanota", "MailAddress")
    }

    /// Resolver knowing one type of every kind.
    pub fn resolver() -> StaticTypeResolver {
        StaticTypeResolver::new()
            .with_type(mail_type(), TypeKind::ListElement)
            .with_type(contact_type(), TypeKind::Element)
            .with_type(mail_details_type(), TypeKind::BlobElement)
            .with_type(mail_address_type(), TypeKind::Aggregated)
    }

    pub fn storage() -> EphemeralCacheStorage {
        EphemeralCacheStorage::with_defaults(Arc::new(resolver()))
    }

    pub fn mail(list_id: &str, id: &str, owner: &str) -> Entity {
        Entity::new(
            mail_type(),
            EntityKey::List(ListId::from(list_id), ElementId::from(id)),
            json!({ "subject": format!("mail {}", id) }),
        )
        .with_owner(owner)
    }

    pub fn contact(id: &str, owner: &str) -> Entity {
        Entity::new(
            contact_type(),
            EntityKey::Element(ElementId::from(id)),
            json!({ "name": id }),
        )
        .with_owner(owner)
    }

    pub fn mail_details(list_id: &str, id: &str, owner: &str) -> Entity {
        Entity::new(
            mail_details_type(),
            EntityKey::List(ListId::from(list_id), ElementId::from(id)),
            json!({ "body": "<p>hi</p>" }),
        )
        .with_owner(owner)
    }

    /// Ids of `entities`, in order.
    pub fn ids(entities: &[Entity]) -> Vec<ElementId> {
        entities.iter().map(|e| e.element_id().clone()).collect()
    }
}
