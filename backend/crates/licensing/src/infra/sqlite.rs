//! SQLite Repository Implementation
//!
//! Stores record ids and feature maps as TEXT; timestamps go through
//! sqlx's chrono support. Everything above this layer sees the same
//! `License` shape the PostgreSQL adapter produces.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use kernel::id::LicenseId;

use crate::domain::entity::license::License;
use crate::domain::repository::LicenseRepository;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::{LicenseError, LicenseResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS licenses (
    id TEXT PRIMARY KEY,
    license_key TEXT UNIQUE NOT NULL,
    customer TEXT NOT NULL,
    machine_id TEXT NOT NULL,
    features TEXT NOT NULL DEFAULT '{}',
    expires_at TEXT NOT NULL,
    revoked INTEGER NOT NULL DEFAULT 0,
    last_seen_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

const SELECT_COLUMNS: &str = r#"
SELECT
    id,
    license_key,
    customer,
    machine_id,
    features,
    expires_at,
    revoked,
    last_seen_at,
    created_at,
    updated_at
FROM licenses
"#;

/// SQLite-backed license repository
#[derive(Clone)]
pub struct SqliteLicenseRepository {
    pool: SqlitePool,
}

impl SqliteLicenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply the idempotent schema
    pub async fn migrate(&self) -> LicenseResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct LicenseRow {
    id: String,
    license_key: String,
    customer: String,
    machine_id: String,
    features: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    last_seen_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LicenseRow {
    fn into_license(self) -> LicenseResult<License> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| LicenseError::Internal(format!("bad record id in store: {e}")))?;
        let license_key = LicenseKey::parse(&self.license_key)
            .ok_or_else(|| LicenseError::Internal("empty license_key in store".to_string()))?;
        // a feature column that fails to parse degrades to an empty map
        let features = serde_json::from_str::<Value>(&self.features)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        Ok(License {
            id: LicenseId::from_uuid(id),
            license_key,
            customer: self.customer,
            machine_id: self.machine_id,
            features,
            expires_at: self.expires_at,
            revoked: self.revoked,
            last_seen_at: self.last_seen_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl LicenseRepository for SqliteLicenseRepository {
    async fn insert(&self, license: &License) -> LicenseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO licenses (
                id,
                license_key,
                customer,
                machine_id,
                features,
                expires_at,
                revoked,
                last_seen_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(license.id.as_uuid().to_string())
        .bind(license.license_key.as_str())
        .bind(&license.customer)
        .bind(&license.machine_id)
        .bind(Value::Object(license.features.clone()).to_string())
        .bind(license.expires_at)
        .bind(license.revoked)
        .bind(license.last_seen_at)
        .bind(license.created_at)
        .bind(license.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_key(&self, key: &LicenseKey) -> LicenseResult<Option<License>> {
        let row = sqlx::query_as::<_, LicenseRow>(&format!(
            "{SELECT_COLUMNS} WHERE license_key = $1"
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(LicenseRow::into_license).transpose()
    }

    async fn mark_revoked(&self, key: &LicenseKey) -> LicenseResult<u64> {
        let result = sqlx::query(
            "UPDATE licenses SET revoked = TRUE, updated_at = $2 WHERE license_key = $1",
        )
        .bind(key.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn record_heartbeat(&self, key: &LicenseKey) -> LicenseResult<u64> {
        let result = sqlx::query(
            "UPDATE licenses SET last_seen_at = $2, updated_at = $2 WHERE license_key = $1",
        )
        .bind(key.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn update_terms(
        &self,
        key: &LicenseKey,
        expires_at: Option<DateTime<Utc>>,
        features: Option<&Map<String, Value>>,
    ) -> LicenseResult<u64> {
        let mut query = QueryBuilder::<Sqlite>::new("UPDATE licenses SET updated_at = ");
        query.push_bind(Utc::now());
        if let Some(expires_at) = expires_at {
            query.push(", expires_at = ").push_bind(expires_at);
        }
        if let Some(features) = features {
            query
                .push(", features = ")
                .push_bind(Value::Object(features.clone()).to_string());
        }
        query.push(" WHERE license_key = ").push_bind(key.as_str());

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn list(&self) -> LicenseResult<Vec<License>> {
        let rows = sqlx::query_as::<_, LicenseRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LicenseRow::into_license).collect()
    }
}
