//! Resource store for the property-management back office.
//!
//! The store is a generic keyed CRUD service over a closed set of
//! [`Collection`]s. Rows travel as JSON objects; the [`ResourceStoreExt`]
//! extension trait converts them to and from typed models.
//!
//! Two implementations are provided:
//! - [`InMemoryResourceStore`] for tests and local runs, with optional
//!   schema/constraint emulation and failure injection
//! - [`PostgresResourceStore`] backed by relational tables via sqlx

pub mod collection;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod schema;
pub mod store;

pub use collection::Collection;
pub use common::RecordId;
pub use error::{Result, StoreError};
pub use memory::InMemoryResourceStore;
pub use postgres::PostgresResourceStore;
pub use query::Filter;
pub use schema::{CheckConstraint, CollectionSchema, Schema, UniqueKey};
pub use store::{Operation, ResourceStore, ResourceStoreExt, Row, from_row, to_row};
