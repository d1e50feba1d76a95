use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use campus_core::errors::CampusError;
use campus_core::manifest::SCHOOLS;
use campus_core::{TenantContext, TenantService, WriteOutcome};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use crate::rows::{delete_scoped, fetch_scoped};
use crate::snapshot::SnapshotReader;
use crate::upsert::UpsertEngine;

/// The school directory: system-level CRUD over `schools` plus snapshots.
pub struct TenantDirectory {
    pool: SqlitePool,
    engine: Arc<UpsertEngine>,
    snapshots: SnapshotReader,
}

impl TenantDirectory {
    pub fn new(pool: SqlitePool, engine: Arc<UpsertEngine>) -> Self {
        Self {
            snapshots: SnapshotReader::new(pool.clone()),
            pool,
            engine,
        }
    }
}

#[async_trait]
impl TenantService for TenantDirectory {
    async fn list(&self) -> Result<Vec<Value>> {
        fetch_scoped(&self.pool, &SCHOOLS, &TenantContext::system()).await
    }

    async fn sync(&self, records: Vec<Value>) -> Result<WriteOutcome> {
        let outcome = self.engine.upsert(&SCHOOLS, &TenantContext::system(), records).await?;
        info!(written = outcome.written, "tenants.synced");
        Ok(outcome)
    }

    /// Deleting a school cascades to every row it owns.
    async fn remove(&self, id: &str) -> Result<()> {
        let removed = delete_scoped(&self.pool, &SCHOOLS, &TenantContext::system(), "id", id).await?;
        if removed == 0 {
            return Err(CampusError::not_found(format!("No school with id '{id}'")).into_anyhow());
        }
        info!(school = %id, "tenants.removed");
        Ok(())
    }

    async fn snapshot(&self, ctx: &TenantContext) -> Result<Value> {
        self.snapshots.snapshot(ctx).await
    }
}
