//! Schema emulation for the in-memory store.
//!
//! The hosted relational store enforces column sets, check constraints and
//! unique keys. [`Schema::property_management`] mirrors
//! `migrations/001_create_property_management_tables.sql` closely enough
//! that the in-memory store fails in the same places the database would.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::{Collection, Result, StoreError, store::Row};

/// A named predicate every row in a collection must satisfy.
#[derive(Clone)]
pub struct CheckConstraint {
    pub name: String,
    pub predicate: fn(&Row) -> bool,
}

impl std::fmt::Debug for CheckConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckConstraint")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A named set of columns whose combined values must be unique.
///
/// Rows with a null or missing value in any key column never conflict.
#[derive(Debug, Clone)]
pub struct UniqueKey {
    pub name: String,
    pub columns: Vec<String>,
}

/// Rules for a single collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionSchema {
    /// Known columns. `None` accepts any column.
    pub columns: Option<BTreeSet<String>>,
    pub checks: Vec<CheckConstraint>,
    pub unique: Vec<UniqueKey>,
}

impl CollectionSchema {
    /// Restricts the collection to the given columns.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Adds a check constraint.
    pub fn with_check(mut self, name: &str, predicate: fn(&Row) -> bool) -> Self {
        self.checks.push(CheckConstraint {
            name: name.to_string(),
            predicate,
        });
        self
    }

    /// Adds a unique key.
    pub fn with_unique(mut self, name: &str, columns: &[&str]) -> Self {
        self.unique.push(UniqueKey {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Validates a candidate row against this schema and the rows it must
    /// not collide with.
    pub fn validate<'a>(
        &self,
        collection: Collection,
        row: &Row,
        others: impl Iterator<Item = &'a Row> + Clone,
    ) -> Result<()> {
        if let Some(columns) = &self.columns
            && let Some(unknown) = row.keys().find(|k| !columns.contains(*k))
        {
            return Err(StoreError::UnknownColumn {
                collection,
                column: unknown.clone(),
            });
        }

        if let Some(check) = self.checks.iter().find(|c| !(c.predicate)(row)) {
            return Err(StoreError::CheckViolation {
                collection,
                constraint: check.name.clone(),
            });
        }

        for key in &self.unique {
            let Some(values) = key_values(row, &key.columns) else {
                continue;
            };
            if others
                .clone()
                .any(|other| key_values(other, &key.columns).as_ref() == Some(&values))
            {
                return Err(StoreError::Conflict {
                    collection,
                    constraint: key.name.clone(),
                });
            }
        }

        Ok(())
    }
}

fn key_values<'a>(row: &'a Row, columns: &[String]) -> Option<Vec<&'a Value>> {
    columns
        .iter()
        .map(|c| row.get(c).filter(|v| !v.is_null()))
        .collect()
}

/// Rules for every collection. Collections without an entry accept
/// anything.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    collections: HashMap<Collection, CollectionSchema>,
}

impl Schema {
    /// A schema that accepts any row in any collection.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Sets the rules for one collection.
    pub fn with(mut self, collection: Collection, schema: CollectionSchema) -> Self {
        self.collections.insert(collection, schema);
        self
    }

    /// Returns the rules for a collection, if any.
    pub fn get(&self, collection: Collection) -> Option<&CollectionSchema> {
        self.collections.get(&collection)
    }

    /// The property-management schema, matching the SQL migrations.
    pub fn property_management() -> Self {
        Self::permissive()
            .with(
                Collection::Organizations,
                CollectionSchema::default().with_columns(&[
                    "id",
                    "name",
                    "subscription_status",
                    "created_at",
                ]),
            )
            .with(
                Collection::UserProfiles,
                CollectionSchema::default().with_columns(&[
                    "id",
                    "email",
                    "first_name",
                    "last_name",
                    "phone",
                    "organization_id",
                    "status",
                    "created_at",
                ]),
            )
            .with(
                Collection::Roles,
                CollectionSchema::default()
                    .with_columns(&["id", "name", "created_at"])
                    .with_unique("roles_name_key", &["name"]),
            )
            .with(
                Collection::RoleAssignments,
                CollectionSchema::default()
                    .with_columns(&["id", "user_id", "role_id", "organization_id", "created_at"])
                    .with_unique(
                        "user_roles_user_id_role_id_organization_id_key",
                        &["user_id", "role_id", "organization_id"],
                    ),
            )
            .with(
                Collection::Properties,
                CollectionSchema::default()
                    .with_columns(&[
                        "id",
                        "name",
                        "address",
                        "city",
                        "state",
                        "zip_code",
                        "property_type",
                        "description",
                        "year_built",
                        "total_units",
                        "owner_id",
                        "organization_id",
                        "created_at",
                    ])
                    .with_check("properties_total_units_check", |row| {
                        row.get("total_units")
                            .and_then(Value::as_i64)
                            .is_some_and(|n| n > 0)
                    }),
            )
            .with(
                Collection::Units,
                CollectionSchema::default()
                    .with_columns(&[
                        "id",
                        "unit_number",
                        "rent_amount",
                        "status",
                        "bedrooms",
                        "bathrooms",
                        "square_feet",
                        "floor_plan",
                        "smart_lock_enabled",
                        "property_id",
                        "organization_id",
                        "created_at",
                    ])
                    .with_check("units_status_check", |row| {
                        matches!(
                            row.get("status").and_then(Value::as_str),
                            None | Some("Available") | Some("Occupied")
                        )
                    }),
            )
            .with(
                Collection::Invitations,
                CollectionSchema::default()
                    .with_columns(&[
                        "id",
                        "email",
                        "organization_id",
                        "role_id",
                        "invited_by",
                        "status",
                        "token",
                        "expires_at",
                        "created_at",
                    ])
                    .with_check("organization_invitations_status_check", |row| {
                        matches!(
                            row.get("status").and_then(Value::as_str),
                            None | Some("pending") | Some("accepted")
                        )
                    }),
            )
    }
}
