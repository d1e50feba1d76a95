//! Full-Snapshot Reader: one school's whole state as a single document.
//!
//! ```text
//! {
//!   school, users, students[].payments, turmas, academicYears, expenses,
//!   payments, notifications, discussionTopics[].messages, discussionMessages,
//!   settings, financial, <opaque documents…>
//! }
//! ```
//!
//! Each table is read independently; there is no cross-table isolation.

use std::collections::HashMap;

use anyhow::Result;
use campus_core::errors::CampusError;
use campus_core::manifest::{
    DISCUSSION_MESSAGES, DISCUSSION_TOPICS, DOMAIN_TABLES, PAYMENTS, SCHOOLS, SCHOOL_DATA, SETTINGS,
    STUDENTS,
};
use campus_core::{SettingsPartition, TenantContext, SCHOOL_KEY};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::storage_error;
use crate::rows::{decode_row, fetch_scoped, key_string};

#[derive(Clone)]
pub struct SnapshotReader {
    pool: SqlitePool,
}

/// Attach to each parent the children whose `foreign_key` matches its id.
fn attach_children(parents: &mut Value, children: &Value, foreign_key: &str, field: &str) {
    let mut by_parent: HashMap<String, Vec<Value>> = HashMap::new();
    for child in children.as_array().into_iter().flatten() {
        if let Some(parent_id) = child.get(foreign_key).and_then(key_string) {
            by_parent.entry(parent_id).or_default().push(child.clone());
        }
    }

    for parent in parents.as_array_mut().into_iter().flatten() {
        let owned = parent
            .get("id")
            .and_then(key_string)
            .and_then(|id| by_parent.get(&id).cloned())
            .unwrap_or_default();
        if let Some(obj) = parent.as_object_mut() {
            obj.insert(field.to_string(), Value::Array(owned));
        }
    }
}

impl SnapshotReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn school(&self, ctx: &TenantContext) -> Result<Value> {
        let row = sqlx::query(r#"SELECT * FROM "schools" WHERE "id" = ?1"#)
            .bind(ctx.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error(e, SCHOOLS.name))?;

        match row {
            Some(row) => Ok(Value::Object(decode_row(Some(&SCHOOLS), &row)?)),
            None => Err(CampusError::not_found(format!("No school with id '{}'", ctx.id())).into_anyhow()),
        }
    }

    async fn settings(&self, ctx: &TenantContext, doc: &mut Map<String, Value>) -> Result<()> {
        let row = sqlx::query(r#"SELECT * FROM "settings" WHERE "schoolId" = ?1"#)
            .bind(ctx.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error(e, SETTINGS.name))?;
        let mut stored = match row {
            Some(row) => decode_row(Some(&SETTINGS), &row)?,
            None => Map::new(),
        };

        for partition in SettingsPartition::ALL {
            let value = stored.remove(partition.column()).unwrap_or(Value::Null);
            doc.insert(partition.key().to_string(), value);
        }
        Ok(())
    }

    /// Opaque documents never shadow a structured resource or settings key.
    async fn documents(&self, ctx: &TenantContext, doc: &mut Map<String, Value>) -> Result<()> {
        let rows = sqlx::query(
            r#"SELECT "dataKey", "dataValue" FROM "school_data" WHERE "schoolId" = ?1 ORDER BY rowid"#,
        )
        .bind(ctx.id())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(e, SCHOOL_DATA.name))?;

        let codec = SCHOOL_DATA.codec_for("dataValue");
        for row in rows {
            let key: String = row
                .try_get("dataKey")
                .map_err(|e| storage_error(e, SCHOOL_DATA.name))?;
            let raw: Option<String> = row
                .try_get("dataValue")
                .map_err(|e| storage_error(e, SCHOOL_DATA.name))?;
            let value = raw
                .map(|text| codec.decode(Value::String(text)))
                .unwrap_or(Value::Null);
            doc.entry(key).or_insert(value);
        }
        Ok(())
    }

    pub async fn snapshot(&self, ctx: &TenantContext) -> Result<Value> {
        let mut doc = Map::new();
        doc.insert(SCHOOL_KEY.to_string(), self.school(ctx).await?);

        for spec in DOMAIN_TABLES {
            let rows = fetch_scoped(&self.pool, spec, ctx).await?;
            doc.insert(spec.resource.to_string(), Value::Array(rows));
        }

        let payments = doc.get(PAYMENTS.resource).cloned().unwrap_or_default();
        if let Some(students) = doc.get_mut(STUDENTS.resource) {
            attach_children(students, &payments, "studentId", "payments");
        }
        let messages = doc.get(DISCUSSION_MESSAGES.resource).cloned().unwrap_or_default();
        if let Some(topics) = doc.get_mut(DISCUSSION_TOPICS.resource) {
            attach_children(topics, &messages, "topicId", "messages");
        }

        self.settings(ctx, &mut doc).await?;
        self.documents(ctx, &mut doc).await?;

        debug!(tenant = %ctx.tenant_id, sections = doc.len(), "snapshot.built");
        Ok(Value::Object(doc))
    }
}
