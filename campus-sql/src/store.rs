use std::sync::Arc;

use anyhow::Result;
use campus_auth::{AuthGate, AuthGateOptions, PasswordHasher};
use campus_core::manifest::ALL_TABLES;
use campus_core::CampusServices;
use sqlx::SqlitePool;

use crate::inspector::SchemaInspector;
use crate::pool::SqlStoreFactory;
use crate::principals::{ensure_super_admin, SqlPrincipalResolver};
use crate::router::ResourceRouter;
use crate::schema;
use crate::tenants::TenantDirectory;
use crate::upsert::UpsertEngine;

/// One connection pool with the inspector and upsert engine built over it.
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
    inspector: Arc<SchemaInspector>,
    engine: Arc<UpsertEngine>,
}

impl SqlStore {
    /// Wrap an existing pool without touching the schema.
    pub fn from_pool(pool: SqlitePool) -> Self {
        let inspector = Arc::new(SchemaInspector::sqlite(pool.clone()));
        let engine = Arc::new(UpsertEngine::new(pool.clone(), inspector.clone()));
        Self {
            pool,
            inspector,
            engine,
        }
    }

    /// Bootstrap the schema on `pool` and warm the column cache.
    pub async fn provision(pool: SqlitePool) -> Result<Self> {
        schema::bootstrap(&pool).await?;
        let store = Self::from_pool(pool);
        store.inspector.warm(ALL_TABLES).await?;
        Ok(store)
    }

    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlStoreFactory::connect(url, max_connections).await?;
        Self::provision(pool).await
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlStoreFactory::connect_memory().await?;
        Self::provision(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn inspector(&self) -> &Arc<SchemaInspector> {
        &self.inspector
    }

    pub fn engine(&self) -> &Arc<UpsertEngine> {
        &self.engine
    }

    pub fn router(&self, hasher: PasswordHasher) -> ResourceRouter {
        ResourceRouter::new(self.pool.clone(), self.engine.clone(), hasher)
    }

    pub fn tenants(&self) -> TenantDirectory {
        TenantDirectory::new(self.pool.clone(), self.engine.clone())
    }

    pub fn resolver(&self) -> SqlPrincipalResolver {
        SqlPrincipalResolver::new(self.pool.clone())
    }

    pub async fn ensure_super_admin(
        &self,
        hasher: &PasswordHasher,
        email: &str,
        password: &str,
    ) -> Result<bool> {
        ensure_super_admin(&self.pool, &self.engine, hasher, email, password).await
    }

    /// The full service set for the app container.
    pub fn services(&self, hasher: PasswordHasher, options: AuthGateOptions) -> CampusServices {
        let gate = AuthGate::new(Arc::new(self.resolver()), hasher).with_options(options);
        CampusServices {
            resources: Arc::new(self.router(hasher)),
            tenants: Arc::new(self.tenants()),
            auth: Arc::new(gate),
        }
    }
}
