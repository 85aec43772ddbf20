use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    Collection, Filter, RecordId, Result, Schema, StoreError,
    store::{Operation, ResourceStore, Row, ensure_id, row_id},
};

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Collection, Vec<Row>>,
    failures: HashSet<(Collection, Operation)>,
}

impl MemoryState {
    fn check_failure(&self, collection: Collection, operation: Operation) -> Result<()> {
        if self.failures.contains(&(collection, operation)) {
            return Err(StoreError::Unavailable {
                collection,
                operation,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn table(&self, collection: Collection) -> &[Row] {
        self.tables
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn position(&self, collection: Collection, id: RecordId) -> Option<usize> {
        let id = Value::String(id.to_string());
        self.table(collection)
            .iter()
            .position(|row| row.get("id") == Some(&id))
    }
}

/// In-memory resource store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. When
/// built with [`Schema::property_management`] it also rejects unknown
/// columns, check-constraint violations and duplicate unique keys the way
/// the database does. Individual operations can be forced to fail with
/// [`InMemoryResourceStore::set_fail_on`].
#[derive(Clone, Default)]
pub struct InMemoryResourceStore {
    state: Arc<RwLock<MemoryState>>,
    schema: Arc<Schema>,
}

impl InMemoryResourceStore {
    /// Creates an empty store that accepts any row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store enforcing the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            state: Arc::default(),
            schema: Arc::new(schema),
        }
    }

    /// Creates an empty store enforcing the property-management schema.
    pub fn property_management() -> Self {
        Self::with_schema(Schema::property_management())
    }

    /// Makes every subsequent `operation` on `collection` fail (or stop
    /// failing when `fail` is false).
    pub async fn set_fail_on(&self, collection: Collection, operation: Operation, fail: bool) {
        let mut state = self.state.write().await;
        if fail {
            state.failures.insert((collection, operation));
        } else {
            state.failures.remove(&(collection, operation));
        }
    }

    /// Returns the number of rows in a collection.
    pub async fn count(&self, collection: Collection) -> usize {
        self.state.read().await.table(collection).len()
    }

    /// Returns a copy of every row in a collection.
    pub async fn rows(&self, collection: Collection) -> Vec<Row> {
        self.state.read().await.table(collection).to_vec()
    }

    /// Clears all rows and injected failures.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.tables.clear();
        state.failures.clear();
    }

    fn prepare(&self, collection: Collection, mut row: Row) -> Result<Row> {
        ensure_id(collection, &mut row)?;
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        Ok(row)
    }

    fn validate(&self, collection: Collection, row: &Row, others: &[Row]) -> Result<()> {
        let id = row.get("id");
        if others.iter().any(|other| other.get("id") == id) {
            return Err(StoreError::Conflict {
                collection,
                constraint: format!("{collection}_pkey"),
            });
        }
        match self.schema.get(collection) {
            Some(schema) => schema.validate(collection, row, others.iter()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn insert(&self, collection: Collection, row: Row) -> Result<Row> {
        let mut state = self.state.write().await;
        state.check_failure(collection, Operation::Insert)?;

        let row = self.prepare(collection, row)?;
        self.validate(collection, &row, state.table(collection))?;

        state.tables.entry(collection).or_default().push(row.clone());
        Ok(row)
    }

    async fn insert_many(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut state = self.state.write().await;
        state.check_failure(collection, Operation::Insert)?;

        // Validate the whole batch before storing anything
        let mut staged = state.table(collection).to_vec();
        let existing = staged.len();
        for row in rows {
            let row = self.prepare(collection, row)?;
            self.validate(collection, &row, &staged)?;
            staged.push(row);
        }

        let inserted = staged.split_off(existing);
        state
            .tables
            .entry(collection)
            .or_default()
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn get(&self, collection: Collection, id: RecordId) -> Result<Option<Row>> {
        let state = self.state.read().await;
        state.check_failure(collection, Operation::Get)?;

        Ok(state
            .position(collection, id)
            .map(|index| state.table(collection)[index].clone()))
    }

    async fn update(&self, collection: Collection, id: RecordId, patch: Row) -> Result<Row> {
        let mut state = self.state.write().await;
        state.check_failure(collection, Operation::Update)?;

        let index = state
            .position(collection, id)
            .ok_or(StoreError::NotFound { collection, id })?;

        let table = state.table(collection);
        let mut merged = table[index].clone();
        merged.extend(patch.into_iter().filter(|(column, _)| column != "id"));

        let others: Vec<Row> = table
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, row)| row.clone())
            .collect();
        self.validate(collection, &merged, &others)?;

        state.tables.entry(collection).or_default()[index] = merged.clone();
        Ok(merged)
    }

    async fn upsert(&self, collection: Collection, row: Row) -> Result<Row> {
        let existing = {
            let state = self.state.read().await;
            state.check_failure(collection, Operation::Upsert)?;
            match row_id(collection, &row)? {
                Some(id) => state.position(collection, id).map(|_| id),
                None => None,
            }
        };

        match existing {
            Some(id) => self.update(collection, id, row).await,
            None => self.insert(collection, row).await,
        }
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_failure(collection, Operation::Delete)?;

        if let Some(index) = state.position(collection, id) {
            state.tables.entry(collection).or_default().remove(index);
        }
        Ok(())
    }

    async fn query(&self, collection: Collection, filter: Filter) -> Result<Vec<Row>> {
        let state = self.state.read().await;
        state.check_failure(collection, Operation::Query)?;

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(state
            .table(collection)
            .iter()
            .filter(|row| filter.matches(row))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
