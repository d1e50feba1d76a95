// Parameter binding, row decoding and tenant-scoped reads shared by the
// router, the snapshot reader and the tenant directory.

use anyhow::Result;
use campus_core::codec::{BoundValue, ColumnCodec};
use campus_core::manifest::{Scope, TableSpec};
use campus_core::TenantContext;
use serde_json::{Map, Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use crate::error::{quote_ident, storage_error};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

pub(crate) fn bind_value(query: SqliteQuery<'_>, value: BoundValue) -> SqliteQuery<'_> {
    match value {
        BoundValue::Null => query.bind(None::<String>),
        BoundValue::Text(s) => query.bind(s),
        BoundValue::Integer(i) => query.bind(i),
        BoundValue::Real(f) => query.bind(f),
        BoundValue::Bool(b) => query.bind(b),
    }
}

fn raw_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    Ok(match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
        "REAL" => {
            let f = row.try_get::<f64, _>(index)?;
            Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get::<String, _>(index)?),
    })
}

/// Decode a row into a JSON object. Columns are decoded through the table's
/// codecs when `spec` is given; secret columns are never returned.
pub(crate) fn decode_row(spec: Option<&TableSpec>, row: &SqliteRow) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for column in row.columns() {
        let name = column.name();
        let codec = spec.map(|s| s.codec_for(name)).unwrap_or(ColumnCodec::Auto);
        if codec == ColumnCodec::Secret {
            continue;
        }
        let stored =
            raw_value(row, column.ordinal()).map_err(|e| storage_error(e, "row decode"))?;
        out.insert(name.to_string(), codec.decode(stored));
    }
    Ok(out)
}

pub(crate) fn decode_rows(spec: &TableSpec, rows: &[SqliteRow]) -> Result<Vec<Value>> {
    rows.iter()
        .map(|row| decode_row(Some(spec), row).map(Value::Object))
        .collect()
}

/// Select clause and filter restricting `spec` to the tenant. `None` filter
/// means the table is not tenant-scoped.
fn scoped_select(spec: &TableSpec) -> (String, Option<String>) {
    let table = quote_ident(spec.name);
    match spec.scope {
        Scope::System => (format!("SELECT * FROM {table}"), None),
        Scope::Column(column) => (
            format!("SELECT * FROM {table}"),
            Some(format!("{} = ?1", quote_ident(column))),
        ),
        Scope::Parent {
            column,
            parent,
            parent_key,
            parent_tenant_column,
        } => (
            format!(
                "SELECT c.* FROM {table} AS c JOIN {} AS p ON c.{} = p.{}",
                quote_ident(parent),
                quote_ident(column),
                quote_ident(parent_key)
            ),
            Some(format!("p.{} = ?1", quote_ident(parent_tenant_column))),
        ),
    }
}

/// Every row of `spec` visible to the tenant, in insertion order.
pub(crate) async fn fetch_scoped(
    pool: &SqlitePool,
    spec: &TableSpec,
    ctx: &TenantContext,
) -> Result<Vec<Value>> {
    let (select, filter) = scoped_select(spec);
    let order = match spec.scope {
        Scope::Parent { .. } => "c.rowid",
        _ => "rowid",
    };

    let rows = match filter {
        Some(filter) => {
            let sql = format!("{select} WHERE {filter} ORDER BY {order}");
            sqlx::query(&sql).bind(ctx.id()).fetch_all(pool).await
        }
        None => {
            let sql = format!("{select} ORDER BY {order}");
            sqlx::query(&sql).fetch_all(pool).await
        }
    }
    .map_err(|e| storage_error(e, spec.name))?;

    decode_rows(spec, &rows)
}

/// Delete one row by its single-column key, within the tenant's scope.
/// Returns the number of rows removed.
pub(crate) async fn delete_scoped(
    pool: &SqlitePool,
    spec: &TableSpec,
    ctx: &TenantContext,
    key_column: &str,
    id: &str,
) -> Result<u64> {
    let table = quote_ident(spec.name);
    let key = quote_ident(key_column);
    let sql = match spec.scope {
        Scope::System => format!("DELETE FROM {table} WHERE {key} = ?1"),
        Scope::Column(column) => {
            format!("DELETE FROM {table} WHERE {key} = ?1 AND {} = ?2", quote_ident(column))
        }
        Scope::Parent {
            column,
            parent,
            parent_key,
            parent_tenant_column,
        } => format!(
            "DELETE FROM {table} WHERE {key} = ?1 AND {} IN (SELECT {} FROM {} WHERE {} = ?2)",
            quote_ident(column),
            quote_ident(parent_key),
            quote_ident(parent),
            quote_ident(parent_tenant_column)
        ),
    };

    let mut query = sqlx::query(&sql).bind(id);
    if !matches!(spec.scope, Scope::System) {
        query = query.bind(ctx.id());
    }
    let result = query
        .execute(pool)
        .await
        .map_err(|e| storage_error(e, spec.name))?;
    Ok(result.rows_affected())
}

/// String form of a key value for joining rows in memory.
pub(crate) fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
