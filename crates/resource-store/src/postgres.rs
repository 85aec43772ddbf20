use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row as _, postgres::PgRow};

use crate::{
    Collection, Filter, RecordId, Result, StoreError,
    store::{ResourceStore, Row, ensure_id, validate_columns},
};

/// PostgreSQL-backed resource store implementation.
///
/// Each collection is a real table. Rows are written through
/// `jsonb_populate_record` so the JSON payload is typed by the table
/// definition, and read back with `to_jsonb`, which keeps the store
/// generic over collections without per-table SQL.
#[derive(Clone)]
pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    /// Creates a new PostgreSQL resource store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn decode(row: PgRow) -> Result<Row> {
        match row.try_get::<Value, _>("row")? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Serialization(serde::de::Error::custom(format!(
                "expected a JSON object row, got {other}"
            )))),
        }
    }

    fn insert_sql(collection: Collection, row: &Row) -> Result<String> {
        validate_columns(collection, row.keys())?;
        let table = collection.as_str();
        let columns = column_list(row.keys());
        Ok(format!(
            "INSERT INTO {table} ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
             RETURNING to_jsonb({table}.*) AS row"
        ))
    }
}

fn column_list<'a>(columns: impl IntoIterator<Item = &'a String>) -> String {
    columns
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps database errors onto the store's constraint vocabulary.
fn classify(collection: Collection, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            // undefined_column
            Some("42703") => {
                return StoreError::UnknownColumn {
                    collection,
                    column: quoted_name(db_err.message()).unwrap_or_default(),
                };
            }
            // check_violation
            Some("23514") => {
                return StoreError::CheckViolation {
                    collection,
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
            // unique_violation
            Some("23505") => {
                return StoreError::Conflict {
                    collection,
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

/// Extracts the first double-quoted name from a Postgres message such as
/// `column "nickname" does not exist`.
fn quoted_name(message: &str) -> Option<String> {
    let start = message.find('"')? + 1;
    let len = message[start..].find('"')?;
    Some(message[start..start + len].to_string())
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    async fn insert(&self, collection: Collection, mut row: Row) -> Result<Row> {
        ensure_id(collection, &mut row)?;
        let sql = Self::insert_sql(collection, &row)?;

        let stored = sqlx::query(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;

        Self::decode(stored)
    }

    async fn insert_many(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = Vec::with_capacity(rows.len());
        for mut row in rows {
            ensure_id(collection, &mut row)?;
            let sql = Self::insert_sql(collection, &row)?;
            let stored = sqlx::query(&sql)
                .bind(Value::Object(row))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| classify(collection, e))?;
            inserted.push(Self::decode(stored)?);
        }

        tx.commit().await?;
        tracing::debug!(%collection, count = inserted.len(), "bulk insert committed");
        Ok(inserted)
    }

    async fn get(&self, collection: Collection, id: RecordId) -> Result<Option<Row>> {
        let table = collection.as_str();
        let sql = format!("SELECT to_jsonb(t.*) AS row FROM {table} t WHERE t.id = $1");

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;

        row.map(Self::decode).transpose()
    }

    async fn update(&self, collection: Collection, id: RecordId, mut patch: Row) -> Result<Row> {
        patch.remove("id");
        if patch.is_empty() {
            return self
                .get(collection, id)
                .await?
                .ok_or(StoreError::NotFound { collection, id });
        }
        validate_columns(collection, patch.keys())?;

        let table = collection.as_str();
        let columns = column_list(patch.keys());
        let sql = format!(
            "UPDATE {table} SET ({columns}) = \
             (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)) \
             WHERE id = $2 \
             RETURNING to_jsonb({table}.*) AS row"
        );

        let row = sqlx::query(&sql)
            .bind(Value::Object(patch))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;

        row.map(Self::decode)
            .transpose()?
            .ok_or(StoreError::NotFound { collection, id })
    }

    async fn upsert(&self, collection: Collection, mut row: Row) -> Result<Row> {
        ensure_id(collection, &mut row)?;
        validate_columns(collection, row.keys())?;

        let table = collection.as_str();
        let columns = column_list(row.keys());
        let updates: Vec<&str> = row
            .keys()
            .map(String::as_str)
            .filter(|c| *c != "id")
            .collect();
        let on_conflict = if updates.is_empty() {
            "DO UPDATE SET id = EXCLUDED.id".to_string()
        } else {
            let excluded = updates
                .iter()
                .map(|c| format!("EXCLUDED.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET ({}) = ROW({excluded})", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO {table} ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
             ON CONFLICT (id) {on_conflict} \
             RETURNING to_jsonb({table}.*) AS row"
        );

        let stored = sqlx::query(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;

        Self::decode(stored)
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", collection.as_str());

        sqlx::query(&sql)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;

        Ok(())
    }

    async fn query(&self, collection: Collection, filter: Filter) -> Result<Vec<Row>> {
        validate_columns(collection, filter.conditions.iter().map(|(c, _)| c))?;

        let table = collection.as_str();
        let sql = format!(
            "SELECT to_jsonb(t.*) AS row FROM {table} t \
             WHERE to_jsonb(t.*) @> $1 \
             ORDER BY t.created_at ASC, t.id ASC \
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query(&sql)
            .bind(Value::Object(filter.as_object()))
            .bind(filter.limit.map(|n| n as i64))
            .bind(filter.offset.unwrap_or(0) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;

        rows.into_iter().map(Self::decode).collect()
    }
}
