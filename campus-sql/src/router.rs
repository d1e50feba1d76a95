//! Resource Router.
//!
//! A resource key resolves once to a [`Resource`]; every operation then
//! dispatches on the variant:
//!
//! - `Structured` → the table's rows, written through the [`UpsertEngine`]
//! - `Settings`   → one column of the tenant's `settings` row
//! - `Opaque`     → one `(school, key)` document in `school_data`

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use campus_auth::PasswordHasher;
use campus_core::errors::CampusError;
use campus_core::manifest::{TableSpec, SCHOOL_DATA, SETTINGS, TENANT_COLUMN, USERS};
use campus_core::{
    Resource, ResourceMap, ResourceService, Role, SettingsPartition, TenantContext, WriteOutcome,
};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{quote_ident, storage_error};
use crate::rows::{decode_row, delete_scoped, fetch_scoped};
use crate::upsert::UpsertEngine;

pub struct ResourceRouter {
    pool: SqlitePool,
    engine: Arc<UpsertEngine>,
    map: ResourceMap,
    hasher: PasswordHasher,
}

/// A single object becomes a one-element batch; arrays are taken as-is.
fn into_records(key: &str, payload: Value) -> Result<Vec<Value>> {
    let records = match payload {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => {
            return Err(CampusError::bad_request(format!(
                "Payload for `{key}` must be an object or a list of objects"
            ))
            .into_anyhow())
        }
    };

    if let Some(index) = records.iter().position(|r| !r.is_object()) {
        return Err(CampusError::bad_request(format!(
            "Entry {index} of `{key}` is not an object"
        ))
        .into_anyhow());
    }
    Ok(records)
}

/// SuperAdmin accounts are provisioned by the system, never by a school.
fn reject_super_admins(ctx: &TenantContext, records: &[Value]) -> Result<()> {
    if ctx.is_system() {
        return Ok(());
    }
    let promoted = records.iter().position(|r| {
        r.get("role")
            .and_then(Value::as_str)
            .is_some_and(|role| Role::from(role.to_string()).is_super_admin())
    });
    if let Some(index) = promoted {
        return Err(CampusError::bad_request(format!(
            "Entry {index} of `users` asks for the SuperAdmin role, which schools cannot grant"
        ))
        .into_anyhow());
    }
    Ok(())
}

impl ResourceRouter {
    pub fn new(pool: SqlitePool, engine: Arc<UpsertEngine>, hasher: PasswordHasher) -> Self {
        Self {
            pool,
            engine,
            map: ResourceMap::standard(),
            hasher,
        }
    }

    pub fn resolve(&self, key: &str) -> Resource {
        self.map.resolve(key)
    }

    async fn write_structured(
        &self,
        spec: &TableSpec,
        ctx: &TenantContext,
        key: &str,
        payload: Value,
    ) -> Result<WriteOutcome> {
        let records = into_records(key, payload)?;
        if spec.name == USERS.name {
            reject_super_admins(ctx, &records)?;
        }
        let records = records
            .into_iter()
            .map(|r| self.hasher.hash_secret_fields(r, spec.secret_columns()))
            .collect::<Result<Vec<_>>>()?;
        self.engine.upsert(spec, ctx, records).await
    }

    async fn read_partition(&self, ctx: &TenantContext, partition: SettingsPartition) -> Result<Value> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            quote_ident(partition.column()),
            quote_ident(SETTINGS.name),
            quote_ident(TENANT_COLUMN)
        );
        let row = sqlx::query(&sql)
            .bind(ctx.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error(e, SETTINGS.name))?;

        Ok(match row {
            Some(row) => decode_row(Some(&SETTINGS), &row)?
                .remove(partition.column())
                .unwrap_or(Value::Null),
            None => Value::Null,
        })
    }

    async fn write_partition(
        &self,
        ctx: &TenantContext,
        partition: SettingsPartition,
        payload: Value,
    ) -> Result<WriteOutcome> {
        let mut row = Map::new();
        row.insert(TENANT_COLUMN.to_string(), Value::String(ctx.id().to_string()));
        row.insert(partition.column().to_string(), payload);
        self.engine.upsert(&SETTINGS, ctx, vec![Value::Object(row)]).await
    }

    async fn read_document(&self, ctx: &TenantContext, data_key: &str) -> Result<Value> {
        let row = sqlx::query(
            r#"SELECT "dataValue" FROM "school_data" WHERE "schoolId" = ?1 AND "dataKey" = ?2"#,
        )
        .bind(ctx.id())
        .bind(data_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error(e, SCHOOL_DATA.name))?;

        let Some(row) = row else {
            return Ok(Value::Null);
        };
        let raw: Option<String> = row
            .try_get("dataValue")
            .map_err(|e| storage_error(e, SCHOOL_DATA.name))?;
        Ok(raw
            .map(|text| SCHOOL_DATA.codec_for("dataValue").decode(Value::String(text)))
            .unwrap_or(Value::Null))
    }

    async fn write_document(
        &self,
        ctx: &TenantContext,
        data_key: &str,
        payload: Value,
    ) -> Result<WriteOutcome> {
        let mut row = Map::new();
        row.insert(TENANT_COLUMN.to_string(), Value::String(ctx.id().to_string()));
        row.insert("dataKey".to_string(), Value::String(data_key.to_string()));
        row.insert("dataValue".to_string(), payload);
        self.engine.upsert(&SCHOOL_DATA, ctx, vec![Value::Object(row)]).await
    }
}

#[async_trait]
impl ResourceService for ResourceRouter {
    async fn read(&self, ctx: &TenantContext, key: &str) -> Result<Value> {
        match self.resolve(key) {
            Resource::Structured(spec) => Ok(Value::Array(fetch_scoped(&self.pool, spec, ctx).await?)),
            Resource::Settings(partition) => self.read_partition(ctx, partition).await,
            Resource::Opaque(data_key) => self.read_document(ctx, &data_key).await,
        }
    }

    async fn write(&self, ctx: &TenantContext, key: &str, payload: Value) -> Result<WriteOutcome> {
        let resource = self.resolve(key);
        debug!(tenant = %ctx.tenant_id, key = %key, resource = ?resource, "resource.write");

        match resource {
            Resource::Structured(spec) => self.write_structured(spec, ctx, key, payload).await,
            Resource::Settings(partition) => self.write_partition(ctx, partition, payload).await,
            Resource::Opaque(data_key) if self.map.is_reserved(&data_key) => {
                Err(CampusError::unroutable(format!(
                    "`{data_key}` is a reserved section of the school snapshot"
                ))
                .into_anyhow())
            }
            Resource::Opaque(data_key) => self.write_document(ctx, &data_key, payload).await,
        }
    }

    async fn remove(&self, ctx: &TenantContext, key: &str, id: &str) -> Result<()> {
        let spec = match self.resolve(key) {
            Resource::Structured(spec) => spec,
            Resource::Settings(_) | Resource::Opaque(_) => {
                return Err(CampusError::unroutable(format!(
                    "`{key}` does not hold individually removable records"
                ))
                .into_anyhow())
            }
        };
        let Some(key_column) = spec.single_key() else {
            return Err(CampusError::unroutable(format!(
                "`{key}` has a composite key"
            ))
            .into_anyhow());
        };

        let removed = delete_scoped(&self.pool, spec, ctx, key_column, id).await?;
        if removed == 0 {
            return Err(CampusError::not_found(format!("No record with id '{id}' in `{key}`")).into_anyhow());
        }
        debug!(tenant = %ctx.tenant_id, table = %spec.name, id = %id, "resource.removed");
        Ok(())
    }
}
