use async_trait::async_trait;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::errors::CampusError;
use crate::principal::{LoginRequest, Principal};
use crate::tenant::TenantContext;

/// What a bulk write did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    /// Table or document store that received the write.
    pub target: String,
    pub written: usize,
}

impl WriteOutcome {
    pub fn new(target: impl Into<String>, written: usize) -> Self {
        Self {
            target: target.into(),
            written,
        }
    }
}

/// Generic per-tenant resource access:
///
/// - `read`   → a table's rows, a settings partition, or an opaque document
/// - `write`  → upsert rows / replace a partition or document
/// - `remove` → delete one row of a dedicated table
///
/// All methods have default implementations that return
/// `NotImplemented`, so a service can override only what it supports.
#[async_trait]
pub trait ResourceService: Send + Sync {
    async fn read(&self, _ctx: &TenantContext, _key: &str) -> Result<Value> {
        Err(CampusError::not_implemented("Method not implemented: read").into_anyhow())
    }

    async fn write(&self, _ctx: &TenantContext, _key: &str, _payload: Value) -> Result<WriteOutcome> {
        Err(CampusError::not_implemented("Method not implemented: write").into_anyhow())
    }

    async fn remove(&self, _ctx: &TenantContext, _key: &str, _id: &str) -> Result<()> {
        Err(CampusError::not_implemented("Method not implemented: remove").into_anyhow())
    }
}

/// The school directory plus the per-school snapshot.
#[async_trait]
pub trait TenantService: Send + Sync {
    async fn list(&self) -> Result<Vec<Value>> {
        Err(CampusError::not_implemented("Method not implemented: list").into_anyhow())
    }

    async fn sync(&self, _records: Vec<Value>) -> Result<WriteOutcome> {
        Err(CampusError::not_implemented("Method not implemented: sync").into_anyhow())
    }

    async fn remove(&self, _id: &str) -> Result<()> {
        Err(CampusError::not_implemented("Method not implemented: remove").into_anyhow())
    }

    async fn snapshot(&self, _ctx: &TenantContext) -> Result<Value> {
        Err(CampusError::not_implemented("Method not implemented: snapshot").into_anyhow())
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &LoginRequest) -> Result<Principal>;
}
