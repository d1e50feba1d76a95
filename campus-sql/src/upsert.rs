//! Generic Upsert Engine.
//!
//! One `INSERT … ON CONFLICT … DO UPDATE` per record, projected onto the
//! table's live columns. Records run sequentially without a transaction: a
//! failure at record *i* leaves records `0..i` committed.

use std::sync::Arc;

use anyhow::Result;
use campus_core::codec::BoundValue;
use campus_core::errors::CampusError;
use campus_core::manifest::{Scope, TableSpec};
use campus_core::{TenantContext, WriteOutcome};
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{quote_ident, storage_error};
use crate::inspector::{SchemaInspector, TableColumns};
use crate::rows::bind_value;

/// A single prepared upsert: SQL text plus its positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertStatement {
    pub sql: String,
    pub columns: Vec<String>,
    /// Column values in `columns` order, then the tenant id when the
    /// conflict action carries an ownership guard.
    pub values: Vec<BoundValue>,
    /// A conflicting row owned by another tenant is left untouched, so zero
    /// affected rows means the record was refused.
    pub guarded: bool,
    /// Ownership check on the parent row of a parent-scoped record.
    pub parent: Option<ParentCheck>,
    key_label: String,
}

/// `SELECT 1` that finds the parent row only when the tenant owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentCheck {
    pub sql: String,
    pub parent: &'static str,
    pub parent_id: String,
    pub tenant_id: String,
}

fn is_missing(fields: &Map<String, Value>, column: &str) -> bool {
    fields.get(column).map_or(true, Value::is_null)
}

fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl UpsertStatement {
    pub fn build(
        spec: &TableSpec,
        live: &TableColumns,
        ctx: &TenantContext,
        record: Value,
    ) -> Result<Self, CampusError> {
        let Value::Object(mut fields) = record else {
            return Err(CampusError::bad_request(format!(
                "Records for `{}` must be JSON objects",
                spec.name
            )));
        };

        let forced_tenant = spec
            .tenant_column()
            .filter(|column| !ctx.is_system() && live.contains(column));
        if let Some(tenant_column) = forced_tenant {
            fields.insert(tenant_column.to_string(), Value::String(ctx.id().to_string()));
        }

        if let Some(key) = spec.single_key() {
            if live.contains(key) && is_missing(&fields, key) {
                fields.insert(key.to_string(), Value::String(Uuid::new_v4().to_string()));
            }
        }

        for key in spec.key {
            if !live.contains(key) {
                return Err(CampusError::schema_unavailable(format!(
                    "Key column `{key}` is missing from `{}`",
                    spec.name
                )));
            }
            if is_missing(&fields, key) {
                return Err(CampusError::bad_request(format!(
                    "Record for `{}` is missing key `{key}`",
                    spec.name
                )));
            }
        }
        let key_label = spec
            .key
            .iter()
            .filter_map(|k| fields.get(*k))
            .map(key_text)
            .collect::<Vec<_>>()
            .join(", ");

        let parent = match spec.scope {
            Scope::Parent {
                column,
                parent,
                parent_key,
                parent_tenant_column,
            } if !ctx.is_system() => {
                if is_missing(&fields, column) {
                    return Err(CampusError::bad_request(format!(
                        "Record for `{}` must reference its `{parent}` through `{column}`",
                        spec.name
                    )));
                }
                Some(ParentCheck {
                    sql: format!(
                        "SELECT 1 FROM {} WHERE {} = ?1 AND {} = ?2",
                        quote_ident(parent),
                        quote_ident(parent_key),
                        quote_ident(parent_tenant_column)
                    ),
                    parent,
                    parent_id: fields.get(column).map(key_text).unwrap_or_default(),
                    tenant_id: ctx.id().to_string(),
                })
            }
            _ => None,
        };

        // Live schema order; fields outside the schema are dropped.
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for column in live.iter() {
            if let Some(value) = fields.get(column) {
                values.push(spec.codec_for(column).encode(value)?);
                columns.push(column.to_string());
            }
        }

        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let conflict = spec
            .key
            .iter()
            .map(|k| quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = columns
            .iter()
            .filter(|c| !spec.is_key(c))
            .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
            .collect::<Vec<_>>();

        let table = quote_ident(spec.name);
        let mut guarded = false;
        let action = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let mut action = format!("DO UPDATE SET {}", updates.join(", "));
            // A conflicting row owned by another tenant is left alone.
            if let Some(tenant_column) = forced_tenant.filter(|c| !spec.is_key(c)) {
                action.push_str(&format!(
                    " WHERE {table}.{col} = excluded.{col}",
                    col = quote_ident(tenant_column)
                ));
                guarded = true;
            } else if let (
                Some(_),
                Scope::Parent {
                    column,
                    parent: parent_table,
                    parent_key,
                    parent_tenant_column,
                },
            ) = (&parent, spec.scope)
            {
                // Same for a conflicting row hanging off another tenant's parent.
                action.push_str(&format!(
                    " WHERE {table}.{} IN (SELECT {} FROM {} WHERE {} = ?{})",
                    quote_ident(column),
                    quote_ident(parent_key),
                    quote_ident(parent_table),
                    quote_ident(parent_tenant_column),
                    values.len() + 1
                ));
                values.push(BoundValue::Text(ctx.id().to_string()));
                guarded = true;
            }
            action
        };

        let sql = format!(
            "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) ON CONFLICT ({conflict}) {action}"
        );

        Ok(Self {
            sql,
            columns,
            values,
            guarded,
            parent,
            key_label,
        })
    }
}

pub struct UpsertEngine {
    pool: SqlitePool,
    inspector: Arc<SchemaInspector>,
}

impl UpsertEngine {
    pub fn new(pool: SqlitePool, inspector: Arc<SchemaInspector>) -> Self {
        Self { pool, inspector }
    }

    pub async fn upsert(
        &self,
        spec: &TableSpec,
        ctx: &TenantContext,
        records: Vec<Value>,
    ) -> Result<WriteOutcome> {
        let live = self.inspector.columns_of(spec.name).await?;
        let total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            if let Err(err) = self.upsert_one(spec, &live, ctx, record).await {
                warn!(
                    table = %spec.name,
                    tenant = %ctx.tenant_id,
                    failed_at = index,
                    committed = index,
                    error = %err,
                    "upsert.failed"
                );
                return Err(batch_failure(spec, index, total, err));
            }
        }

        debug!(table = %spec.name, tenant = %ctx.tenant_id, written = total, "upsert.done");
        Ok(WriteOutcome::new(spec.name, total))
    }

    async fn upsert_one(
        &self,
        spec: &TableSpec,
        live: &TableColumns,
        ctx: &TenantContext,
        record: Value,
    ) -> Result<()> {
        let statement =
            UpsertStatement::build(spec, live, ctx, record).map_err(CampusError::into_anyhow)?;

        if let Some(check) = &statement.parent {
            let owned = sqlx::query(&check.sql)
                .bind(check.parent_id.as_str())
                .bind(check.tenant_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error(e, check.parent))?;
            if owned.is_none() {
                return Err(CampusError::not_found(format!(
                    "No `{}` record with id '{}' in this school",
                    check.parent, check.parent_id
                ))
                .into_anyhow());
            }
        }

        let mut query = sqlx::query(&statement.sql);
        for value in statement.values {
            query = bind_value(query, value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(e, spec.name))?;

        if statement.guarded && result.rows_affected() == 0 {
            return Err(CampusError::constraint_violation(format!(
                "`{}` record '{}' belongs to another school",
                spec.name, statement.key_label
            ))
            .into_anyhow());
        }
        Ok(())
    }
}

/// Wrap the cause of a failed record, keeping its kind so the status code
/// still reflects what went wrong.
fn batch_failure(spec: &TableSpec, index: usize, total: usize, err: anyhow::Error) -> anyhow::Error {
    let cause = CampusError::normalize(err);
    let message = format!(
        "Write to `{}` failed at record {index} of {total} ({index} committed): {}",
        spec.name, cause.message
    );
    CampusError::new(cause.kind, message)
        .with_data(json!({
            "table": spec.name,
            "failedAt": index,
            "committed": index,
            "total": total,
        }))
        .with_source(cause.into_anyhow())
        .into_anyhow()
}
