//! Schema Inspector.
//!
//! Column sets come from the storage catalog, never from request payloads.
//! The first lookup per table queries the catalog; later lookups are served
//! from the cache until the entry is invalidated.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use campus_core::errors::CampusError;
use campus_core::manifest::TableSpec;
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::storage_error;

/// Source of live column names, in declaration order.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn probe_columns(&self, table: &str) -> Result<Vec<String>>;
}

pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaCatalog for SqliteCatalog {
    async fn probe_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(e, "schema probe"))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| storage_error(e, "schema probe"))
            })
            .collect()
    }
}

/// Ordered column names of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    names: Vec<String>,
}

impl TableColumns {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.names.iter().any(|n| n == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

pub struct SchemaInspector {
    catalog: Arc<dyn SchemaCatalog>,
    cache: RwLock<HashMap<String, Arc<TableColumns>>>,
}

impl SchemaInspector {
    pub fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            catalog,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn sqlite(pool: SqlitePool) -> Self {
        Self::new(Arc::new(SqliteCatalog::new(pool)))
    }

    pub async fn columns_of(&self, table: &str) -> Result<Arc<TableColumns>> {
        if let Some(hit) = self.cache.read().await.get(table) {
            return Ok(hit.clone());
        }

        let names = self.catalog.probe_columns(table).await?;
        if names.is_empty() {
            return Err(CampusError::schema_unavailable(format!(
                "No columns visible for table `{table}`"
            ))
            .into_anyhow());
        }
        debug!(table = %table, columns = names.len(), "schema.cached");

        // Two concurrent misses probe twice; whichever lands first wins.
        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(TableColumns::new(names)));
        Ok(entry.clone())
    }

    /// Populate the cache for `tables` up front.
    pub async fn warm(&self, tables: &[&TableSpec]) -> Result<()> {
        for spec in tables {
            self.columns_of(spec.name).await?;
        }
        Ok(())
    }

    pub async fn invalidate(&self, table: &str) {
        self.cache.write().await.remove(table);
    }

    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    pub async fn is_cached(&self, table: &str) -> bool {
        self.cache.read().await.contains_key(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCatalog {
        calls: AtomicUsize,
        columns: Vec<String>,
    }

    #[async_trait]
    impl SchemaCatalog for CountingCatalog {
        async fn probe_columns(&self, _table: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.columns.clone())
        }
    }

    fn spy(columns: &[&str]) -> Arc<CountingCatalog> {
        Arc::new(CountingCatalog {
            calls: AtomicUsize::new(0),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let catalog = spy(&["id", "schoolId", "name"]);
        let inspector = SchemaInspector::new(catalog.clone());

        let first = inspector.columns_of("students").await.unwrap();
        let second = inspector.columns_of("students").await.unwrap();

        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.iter().collect::<Vec<_>>(), vec!["id", "schoolId", "name"]);
    }

    #[tokio::test]
    async fn invalidation_forces_a_new_probe() {
        let catalog = spy(&["id"]);
        let inspector = SchemaInspector::new(catalog.clone());

        inspector.columns_of("turmas").await.unwrap();
        inspector.invalidate("turmas").await;
        assert!(!inspector.is_cached("turmas").await);
        inspector.columns_of("turmas").await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);

        inspector.invalidate_all().await;
        inspector.columns_of("turmas").await.unwrap();
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_catalog_answer_is_schema_unavailable() {
        let catalog = spy(&[]);
        let inspector = SchemaInspector::new(catalog.clone());

        let err = inspector.columns_of("ghosts").await.unwrap_err();
        assert_eq!(CampusError::kind_of(&err), ErrorKind::SchemaUnavailable);
        assert!(!inspector.is_cached("ghosts").await);
    }
}
