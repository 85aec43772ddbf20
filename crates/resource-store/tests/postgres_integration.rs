//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p resource-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use resource_store::{
    Collection, Filter, PostgresResourceStore, RecordId, ResourceStore, ResourceStoreExt, Row,
    StoreError,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_property_management_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresResourceStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation; roles are seed data and stay
    sqlx::query(
        "TRUNCATE TABLE units, properties, user_roles, organization_invitations, \
         user_profiles, organizations",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresResourceStore::new(pool)
}

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn id_of(row: &Row) -> RecordId {
    row["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn insert_and_get_organization() {
    let store = get_test_store().await;

    let stored = store
        .insert(
            Collection::Organizations,
            row(json!({"name": "Acme", "subscription_status": "active"})),
        )
        .await
        .unwrap();
    assert_eq!(stored["name"], json!("Acme"));
    assert!(stored["created_at"].is_string());

    let fetched = store
        .get(Collection::Organizations, id_of(&stored))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched["subscription_status"], json!("active"));
}

#[tokio::test]
async fn roles_are_seeded_by_migration() {
    let store = get_test_store().await;

    let owner = store
        .query(Collection::Roles, Filter::new().eq("name", "owner"))
        .await
        .unwrap();
    assert_eq!(owner.len(), 1);
}

#[tokio::test]
async fn unknown_column_is_a_schema_mismatch() {
    let store = get_test_store().await;

    let err = store
        .insert(
            Collection::Organizations,
            row(json!({"name": "Acme", "nickname": "acme"})),
        )
        .await
        .unwrap_err();

    assert!(err.is_schema_mismatch());
    assert!(matches!(
        err,
        StoreError::UnknownColumn { ref column, .. } if column == "nickname"
    ));
}

#[tokio::test]
async fn total_units_check_constraint_is_reported() {
    let store = get_test_store().await;

    let err = store
        .insert(
            Collection::Properties,
            row(json!({
                "name": "Elm Street",
                "total_units": 0,
                "organization_id": RecordId::new(),
            })),
        )
        .await
        .unwrap_err();

    assert!(err.violates_check("properties_total_units_check"));
}

#[tokio::test]
async fn insert_many_rolls_back_whole_batch() {
    let store = get_test_store().await;
    let organization_id = RecordId::new();
    let property = store
        .insert(
            Collection::Properties,
            row(json!({"name": "Elm", "total_units": 2, "organization_id": organization_id})),
        )
        .await
        .unwrap();
    let property_id = id_of(&property);

    let unit = |number: &str, status: &str| {
        row(json!({
            "unit_number": number,
            "rent_amount": 1500.0,
            "status": status,
            "bedrooms": 2,
            "bathrooms": 1.0,
            "square_feet": 800,
            "property_id": property_id,
            "organization_id": organization_id,
        }))
    };

    let err = store
        .insert_many(
            Collection::Units,
            vec![unit("1A", "Available"), unit("1B", "Reserved")],
        )
        .await
        .unwrap_err();
    assert!(err.violates_check("units_status_check"));

    let units = store
        .query(
            Collection::Units,
            Filter::new().eq("property_id", property_id.to_string()),
        )
        .await
        .unwrap();
    assert!(units.is_empty());
}

#[tokio::test]
async fn insert_many_reads_back_in_submission_order() {
    let store = get_test_store().await;
    let organization_id = RecordId::new();
    let property = store
        .insert(
            Collection::Properties,
            row(json!({"name": "Birch", "total_units": 6, "organization_id": organization_id})),
        )
        .await
        .unwrap();
    let property_id = id_of(&property);

    let numbers = ["6", "1", "5", "2", "4", "3"];
    let units = numbers
        .iter()
        .map(|number| {
            row(json!({
                "unit_number": number,
                "rent_amount": 900.0,
                "status": "Available",
                "bedrooms": 1,
                "bathrooms": 1.0,
                "square_feet": 500,
                "property_id": property_id,
                "organization_id": organization_id,
            }))
        })
        .collect();
    store.insert_many(Collection::Units, units).await.unwrap();

    let stored = store
        .query(
            Collection::Units,
            Filter::new().eq("property_id", property_id.to_string()),
        )
        .await
        .unwrap();
    let order: Vec<&str> = stored
        .iter()
        .map(|unit| unit["unit_number"].as_str().unwrap())
        .collect();
    assert_eq!(order, numbers);
}

#[tokio::test]
async fn upsert_merges_existing_profile() {
    let store = get_test_store().await;
    let id = RecordId::new();

    store
        .upsert(
            Collection::UserProfiles,
            row(json!({"id": id, "email": "jane@co.com", "first_name": "Jane"})),
        )
        .await
        .unwrap();
    let merged = store
        .upsert(
            Collection::UserProfiles,
            row(json!({"id": id, "email": "jane@co.com", "last_name": "Doe"})),
        )
        .await
        .unwrap();

    assert_eq!(merged["first_name"], json!("Jane"));
    assert_eq!(merged["last_name"], json!("Doe"));
}

#[tokio::test]
async fn update_missing_row_is_not_found() {
    let store = get_test_store().await;

    let err = store
        .update(
            Collection::Invitations,
            RecordId::new(),
            row(json!({"status": "accepted"})),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn delete_cascades_units_and_is_idempotent() {
    let store = get_test_store().await;
    let organization_id = RecordId::new();
    let property = store
        .insert(
            Collection::Properties,
            row(json!({"name": "Oak", "total_units": 1, "organization_id": organization_id})),
        )
        .await
        .unwrap();
    let property_id = id_of(&property);
    store
        .insert(
            Collection::Units,
            row(json!({
                "unit_number": "1",
                "rent_amount": 900,
                "bedrooms": 1,
                "bathrooms": 1,
                "square_feet": 500,
                "property_id": property_id,
                "organization_id": organization_id,
            })),
        )
        .await
        .unwrap();

    store
        .delete(Collection::Properties, property_id)
        .await
        .unwrap();
    store
        .delete(Collection::Properties, property_id)
        .await
        .unwrap();

    let units = store
        .query(
            Collection::Units,
            Filter::new().eq("property_id", property_id.to_string()),
        )
        .await
        .unwrap();
    assert!(units.is_empty());
}

#[tokio::test]
async fn find_one_decodes_typed_rows() {
    #[derive(serde::Deserialize)]
    struct Role {
        id: RecordId,
        name: String,
    }

    let store = get_test_store().await;

    let role: Role = store
        .find_one(Collection::Roles, Filter::new().eq("name", "tenant"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(role.name, "tenant");
    assert!(
        store
            .get(Collection::Roles, role.id)
            .await
            .unwrap()
            .is_some()
    );
}
