//! PostgreSQL Repository Implementation

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use kernel::id::LicenseId;

use crate::domain::entity::license::License;
use crate::domain::repository::LicenseRepository;
use crate::domain::value_object::license_key::LicenseKey;
use crate::error::{LicenseError, LicenseResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS licenses (
    id UUID PRIMARY KEY,
    license_key TEXT UNIQUE NOT NULL,
    customer TEXT NOT NULL,
    machine_id TEXT NOT NULL,
    features JSONB NOT NULL DEFAULT '{}',
    expires_at TIMESTAMPTZ NOT NULL,
    revoked BOOLEAN NOT NULL DEFAULT FALSE,
    last_seen_at TIMESTAMPTZ NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
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

/// PostgreSQL-backed license repository
#[derive(Clone)]
pub struct PgLicenseRepository {
    pool: PgPool,
}

impl PgLicenseRepository {
    pub fn new(pool: PgPool) -> Self {
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
    id: Uuid,
    license_key: String,
    customer: String,
    machine_id: String,
    features: Value,
    expires_at: DateTime<Utc>,
    revoked: bool,
    last_seen_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LicenseRow {
    fn into_license(self) -> LicenseResult<License> {
        let license_key = LicenseKey::parse(&self.license_key)
            .ok_or_else(|| LicenseError::Internal("empty license_key in store".to_string()))?;
        let features = match self.features {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(License {
            id: LicenseId::from_uuid(self.id),
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

impl LicenseRepository for PgLicenseRepository {
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
        .bind(license.id.as_uuid())
        .bind(license.license_key.as_str())
        .bind(&license.customer)
        .bind(&license.machine_id)
        .bind(Value::Object(license.features.clone()))
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
        let mut query = QueryBuilder::<Postgres>::new("UPDATE licenses SET updated_at = ");
        query.push_bind(Utc::now());
        if let Some(expires_at) = expires_at {
            query.push(", expires_at = ").push_bind(expires_at);
        }
        if let Some(features) = features {
            query
                .push(", features = ")
                .push_bind(Value::Object(features.clone()));
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
