//! Cached entity records and type metadata
//!
//! The cache stores entities as dynamic [`Entity`] records: a type reference,
//! a key, an owner group and a JSON body. Domain structs opt in through
//! [`CacheableEntity`] and are converted at the boundary.

use crate::error::{CacheResult, SerializationError};
use crate::identity::{ElementId, GroupId, ListId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to an entity type, e.g. `mail/Mail`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub app: String,
    pub type_name: String,
}

impl TypeRef {
    pub fn new(app: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            type_name: type_name.into(),
        }
    }

    /// Path form `app/TypeName`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.app, self.type_name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app, self.type_name)
    }
}

/// Storage classification of an entity type.
///
/// Only the first three kinds are persistent and can live in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Standalone entity, addressed by id alone.
    Element,
    /// Member of an ordered server list; range-tracked.
    ListElement,
    /// Member of a list whose position is not range-tracked.
    BlobElement,
    /// Value embedded inside another entity.
    Aggregated,
    /// Request/response payload, never stored.
    DataTransfer,
}

impl TypeKind {
    pub fn is_persistent(&self) -> bool {
        match self {
            TypeKind::Element | TypeKind::ListElement | TypeKind::BlobElement => true,
            TypeKind::Aggregated | TypeKind::DataTransfer => false,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeKind::Element => "Element",
            TypeKind::ListElement => "ListElement",
            TypeKind::BlobElement => "BlobElement",
            TypeKind::Aggregated => "Aggregated",
            TypeKind::DataTransfer => "DataTransfer",
        };
        f.write_str(s)
    }
}

/// Metadata the external resolver returns for a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeModel {
    pub type_ref: TypeRef,
    pub kind: TypeKind,
}

impl TypeModel {
    pub fn new(type_ref: TypeRef, kind: TypeKind) -> Self {
        Self { type_ref, kind }
    }
}

/// Primary key of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    /// Standalone entities.
    Element(ElementId),
    /// List and blob elements: `(list id, element id)`.
    List(ListId, ElementId),
}

impl EntityKey {
    pub fn element_id(&self) -> &ElementId {
        match self {
            EntityKey::Element(id) => id,
            EntityKey::List(_, id) => id,
        }
    }

    pub fn list_id(&self) -> Option<&ListId> {
        match self {
            EntityKey::Element(_) => None,
            EntityKey::List(list_id, _) => Some(list_id),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Element(id) => write!(f, "{}", id),
            EntityKey::List(list_id, id) => write!(f, "{}/{}", list_id, id),
        }
    }
}

/// An entity as the cache stores it.
///
/// Cloning produces a deep, independent copy, which is how the cache hands
/// entities in and out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub type_ref: TypeRef,
    pub key: EntityKey,
    pub owner_group: Option<GroupId>,
    pub body: serde_json::Value,
}

impl Entity {
    pub fn new(type_ref: TypeRef, key: EntityKey, body: serde_json::Value) -> Self {
        Self {
            type_ref,
            key,
            owner_group: None,
            body,
        }
    }

    /// Set the owner group.
    pub fn with_owner(mut self, owner_group: impl Into<GroupId>) -> Self {
        self.owner_group = Some(owner_group.into());
        self
    }

    pub fn element_id(&self) -> &ElementId {
        self.key.element_id()
    }

    pub fn list_id(&self) -> Option<&ListId> {
        self.key.list_id()
    }

    pub fn is_owned_by(&self, group: &GroupId) -> bool {
        self.owner_group.as_ref() == Some(group)
    }

    /// Build a record from a typed entity.
    pub fn from_cacheable<T: CacheableEntity>(entity: &T) -> CacheResult<Self> {
        let body = serde_json::to_value(entity).map_err(|e| SerializationError::Encode {
            type_ref: T::type_ref().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            type_ref: T::type_ref(),
            key: entity.key(),
            owner_group: entity.owner_group(),
            body,
        })
    }

    /// Decode the body back into a typed entity.
    pub fn to_cacheable<T: CacheableEntity>(&self) -> CacheResult<T> {
        if self.type_ref != T::type_ref() {
            return Err(SerializationError::TypeMismatch {
                expected: T::type_ref().to_string(),
                actual: self.type_ref.to_string(),
            }
            .into());
        }
        let decoded = serde_json::from_value(self.body.clone()).map_err(|e| {
            SerializationError::Decode {
                type_ref: self.type_ref.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(decoded)
    }
}

/// Marker trait for domain types that can be stored in the cache.
///
/// - `type_ref()` must be the same for every instance
/// - `key()` must match the classification the resolver returns for the type
pub trait CacheableEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn type_ref() -> TypeRef;

    fn key(&self) -> EntityKey;

    fn owner_group(&self) -> Option<GroupId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Contact {
        id: String,
        owner: String,
        name: String,
    }

    impl CacheableEntity for Contact {
        fn type_ref() -> TypeRef {
            TypeRef::new("tutanota", "Contact")
        }

        fn key(&self) -> EntityKey {
            EntityKey::Element(ElementId::new(self.id.clone()))
        }

        fn owner_group(&self) -> Option<GroupId> {
            Some(GroupId::new(self.owner.clone()))
        }
    }

    #[test]
    fn test_type_ref_path() {
        let type_ref = TypeRef::new("tutanota", "Mail");
        assert_eq!(type_ref.path(), "tutanota/Mail");
        assert_eq!(type_ref.to_string(), "tutanota/Mail");
    }

    #[test]
    fn test_persistent_kinds() {
        assert!(TypeKind::Element.is_persistent());
        assert!(TypeKind::ListElement.is_persistent());
        assert!(TypeKind::BlobElement.is_persistent());
        assert!(!TypeKind::Aggregated.is_persistent());
        assert!(!TypeKind::DataTransfer.is_persistent());
    }

    #[test]
    fn test_entity_key_accessors() {
        let key = EntityKey::List(ListId::new("l"), ElementId::new("e"));
        assert_eq!(key.list_id(), Some(&ListId::new("l")));
        assert_eq!(key.element_id(), &ElementId::new("e"));
        assert_eq!(key.to_string(), "l/e");
    }

    #[test]
    fn test_cacheable_conversion() {
        let contact = Contact {
            id: "c1".to_string(),
            owner: "g1".to_string(),
            name: "Ada".to_string(),
        };
        let entity = Entity::from_cacheable(&contact).unwrap();
        assert_eq!(entity.element_id(), &ElementId::new("c1"));
        assert!(entity.is_owned_by(&GroupId::new("g1")));
        assert_eq!(entity.body["name"], json!("Ada"));

        let back: Contact = entity.to_cacheable().unwrap();
        assert_eq!(back, contact);
    }

    #[test]
    fn test_cacheable_type_mismatch() {
        let entity = Entity::new(
            TypeRef::new("tutanota", "Mail"),
            EntityKey::Element(ElementId::new("x")),
            json!({}),
        );
        let err = entity.to_cacheable::<Contact>().unwrap_err();
        assert!(matches!(
            err,
            CacheError::Serialization(SerializationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Entity::new(
            TypeRef::new("tutanota", "Contact"),
            EntityKey::Element(ElementId::new("c1")),
            json!({"name": "Ada"}),
        );
        let mut copy = original.clone();
        copy.body["name"] = json!("Grace");
        assert_eq!(original.body["name"], json!("Ada"));
    }
}
