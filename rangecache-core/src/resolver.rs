//! Type metadata resolution
//!
//! The surrounding system owns the type catalogue. The cache only asks it how
//! a type is stored.

use crate::entity::{TypeKind, TypeModel, TypeRef};
use crate::error::{CacheResult, StorageError};
use std::collections::HashMap;

/// Resolves a [`TypeRef`] to its [`TypeModel`].
///
/// A failure means the caller handed the cache a type it does not know, which
/// is a bug on the caller's side.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, type_ref: &TypeRef) -> CacheResult<TypeModel>;
}

/// Resolver backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticTypeResolver {
    models: HashMap<TypeRef, TypeKind>,
}

impl StaticTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type.
    pub fn with_type(mut self, type_ref: TypeRef, kind: TypeKind) -> Self {
        self.models.insert(type_ref, kind);
        self
    }

    pub fn register(&mut self, type_ref: TypeRef, kind: TypeKind) {
        self.models.insert(type_ref, kind);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl TypeResolver for StaticTypeResolver {
    fn resolve(&self, type_ref: &TypeRef) -> CacheResult<TypeModel> {
        self.models
            .get(type_ref)
            .map(|kind| TypeModel::new(type_ref.clone(), *kind))
            .ok_or_else(|| {
                StorageError::UnresolvableType {
                    type_ref: type_ref.to_string(),
                    reason: "type not registered".to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[test]
    fn test_static_resolver_known_type() {
        let mail = TypeRef::new("tutanota", "Mail");
        let resolver = StaticTypeResolver::new().with_type(mail.clone(), TypeKind::ListElement);

        let model = resolver.resolve(&mail).unwrap();
        assert_eq!(model.kind, TypeKind::ListElement);
        assert_eq!(model.type_ref, mail);
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_static_resolver_unknown_type() {
        let resolver = StaticTypeResolver::new();
        assert!(resolver.is_empty());

        let err = resolver
            .resolve(&TypeRef::new("tutanota", "Nope"))
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Storage(StorageError::UnresolvableType { .. })
        ));
    }
}
