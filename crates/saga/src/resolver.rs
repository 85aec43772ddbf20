//! Role lookup by exact name.

use common::RecordId;
use domain::{Role, RoleName};
use resource_store::{Collection, Filter, ResourceStore, ResourceStoreExt, StoreError};
use serde_json::json;

use crate::error::StepError;

/// Resolves roles from the roles collection.
///
/// A missing role is reported as [`StepError::RoleNotFound`]; whether that
/// is fatal is the caller's decision.
#[derive(Debug, Clone)]
pub struct RoleResolver<S> {
    store: S,
}

impl<S: ResourceStore> RoleResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Looks up a role by name.
    pub async fn resolve(&self, name: RoleName) -> Result<Role, StepError> {
        self.store
            .find_one(Collection::Roles, Filter::new().eq("name", name.as_str()))
            .await?
            .ok_or_else(|| StepError::RoleNotFound(name.to_string()))
    }

    /// Looks up a role by id.
    pub async fn by_id(&self, id: RecordId) -> Result<Role, StepError> {
        self.store
            .fetch(Collection::Roles, id)
            .await?
            .ok_or_else(|| StepError::RoleNotFound(id.to_string()))
    }

    /// Inserts any of the fixed roles that are missing. Returns how many
    /// were created.
    pub async fn ensure_defaults(&self) -> Result<usize, StoreError> {
        let mut created = 0;
        for name in RoleName::ALL {
            let existing = self
                .store
                .query(Collection::Roles, Filter::new().eq("name", name.as_str()).limit(1))
                .await?;
            if existing.is_empty() {
                let row = json!({ "name": name.as_str() });
                let _: Role = self.store.create(Collection::Roles, &row).await?;
                created += 1;
            }
        }
        if created > 0 {
            tracing::info!(created, "seeded missing roles");
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use resource_store::InMemoryResourceStore;

    use super::*;

    #[tokio::test]
    async fn resolves_seeded_roles() {
        let resolver = RoleResolver::new(InMemoryResourceStore::property_management());
        assert_eq!(resolver.ensure_defaults().await.unwrap(), RoleName::ALL.len());

        let owner = resolver.resolve(RoleName::Owner).await.unwrap();
        assert_eq!(owner.name, "owner");
        assert_eq!(resolver.by_id(owner.id).await.unwrap(), owner);
    }

    #[tokio::test]
    async fn ensure_defaults_is_idempotent() {
        let resolver = RoleResolver::new(InMemoryResourceStore::property_management());
        resolver.ensure_defaults().await.unwrap();

        assert_eq!(resolver.ensure_defaults().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_role_is_reported() {
        let resolver = RoleResolver::new(InMemoryResourceStore::new());

        let err = resolver.resolve(RoleName::Superadmin).await.unwrap_err();
        assert!(matches!(err, StepError::RoleNotFound(name) if name == "superadmin"));
    }
}
