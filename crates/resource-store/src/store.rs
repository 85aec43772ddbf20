use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Collection, Filter, RecordId, Result, StoreError};

/// A stored row: a JSON object keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Kind of store call, used for failure injection and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Get,
    Update,
    Upsert,
    Delete,
    Query,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::Query => "query",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait for resource store implementations.
///
/// Every call touches exactly one collection and is atomic on its own;
/// there is no transaction spanning calls. Callers that need several
/// writes to behave as one unit must compensate by hand.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Inserts a row and returns it as stored.
    ///
    /// A missing `id` is assigned by the store.
    async fn insert(&self, collection: Collection, row: Row) -> Result<Row>;

    /// Inserts several rows in one call. Either all rows are stored or
    /// none are.
    async fn insert_many(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Reads a row by id.
    async fn get(&self, collection: Collection, id: RecordId) -> Result<Option<Row>>;

    /// Merges `patch` into an existing row.
    ///
    /// Fails with [`StoreError::NotFound`] if the row does not exist.
    async fn update(&self, collection: Collection, id: RecordId, patch: Row) -> Result<Row>;

    /// Inserts the row, or merges it into the existing row with the same id.
    async fn upsert(&self, collection: Collection, row: Row) -> Result<Row>;

    /// Deletes a row by id. Deleting a missing row is not an error.
    async fn delete(&self, collection: Collection, id: RecordId) -> Result<()>;

    /// Returns the rows matching the filter, oldest first.
    async fn query(&self, collection: Collection, filter: Filter) -> Result<Vec<Row>>;
}

/// Extension trait providing typed convenience methods for stores.
#[async_trait]
pub trait ResourceStoreExt: ResourceStore {
    /// Inserts a serializable value and decodes the stored row.
    async fn create<N, T>(&self, collection: Collection, new: &N) -> Result<T>
    where
        N: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let row = to_row(collection, new)?;
        from_row(self.insert(collection, row).await?)
    }

    /// Inserts several values in one call and decodes the stored rows.
    async fn create_many<N, T>(&self, collection: Collection, new: &[N]) -> Result<Vec<T>>
    where
        N: Serialize + Sync,
        T: DeserializeOwned,
    {
        let rows = new
            .iter()
            .map(|value| to_row(collection, value))
            .collect::<Result<Vec<_>>>()?;
        self.insert_many(collection, rows)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Reads and decodes a row by id.
    async fn fetch<T>(&self, collection: Collection, id: RecordId) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get(collection, id).await?.map(from_row).transpose()
    }

    /// Reads and decodes all rows matching the filter.
    async fn find<T>(&self, collection: Collection, filter: Filter) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.query(collection, filter)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Reads and decodes the first row matching the filter.
    async fn find_one<T>(&self, collection: Collection, filter: Filter) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.query(collection, filter.limit(1))
            .await?
            .into_iter()
            .next()
            .map(from_row)
            .transpose()
    }

    /// Applies a serializable patch to a row and decodes the result.
    async fn patch<P, T>(&self, collection: Collection, id: RecordId, patch: &P) -> Result<T>
    where
        P: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let patch = to_row(collection, patch)?;
        from_row(self.update(collection, id, patch).await?)
    }

    /// Upserts a serializable value and decodes the stored row.
    async fn put<N, T>(&self, collection: Collection, value: &N) -> Result<T>
    where
        N: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let row = to_row(collection, value)?;
        from_row(self.upsert(collection, row).await?)
    }
}

// Blanket implementation for all ResourceStore implementations
impl<T: ResourceStore + ?Sized> ResourceStoreExt for T {}

/// Serializes a value into a row. The value must serialize to a JSON object.
pub fn to_row<N: Serialize + ?Sized>(collection: Collection, value: &N) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::InvalidRow {
            collection,
            reason: format!("expected a JSON object, got {other}"),
        }),
    }
}

/// Decodes a stored row into a typed model.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Reads the `id` column of a row, if present.
pub(crate) fn row_id(collection: Collection, row: &Row) -> Result<Option<RecordId>> {
    match row.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some).map_err(|_| StoreError::InvalidRow {
            collection,
            reason: format!("id '{s}' is not a UUID"),
        }),
        Some(other) => Err(StoreError::InvalidRow {
            collection,
            reason: format!("id must be a string, got {other}"),
        }),
    }
}

/// Ensures the row carries an id, assigning a fresh one when absent.
pub(crate) fn ensure_id(collection: Collection, row: &mut Row) -> Result<RecordId> {
    match row_id(collection, row)? {
        Some(id) => Ok(id),
        None => {
            let id = RecordId::new();
            row.insert("id".to_string(), Value::String(id.to_string()));
            Ok(id)
        }
    }
}

/// Validates that every column name is a plain lowercase identifier.
pub(crate) fn validate_columns<'a>(
    collection: Collection,
    columns: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
    for column in columns {
        let mut chars = column.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(StoreError::InvalidRow {
                collection,
                reason: format!("'{column}' is not a valid column name"),
            });
        }
    }
    Ok(())
}
