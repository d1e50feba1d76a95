//! campus-sql: SQLite storage for the campus backend.
//!
//! Write path: [`ResourceRouter`] → [`UpsertEngine`] → [`SchemaInspector`].
//! Read path: [`ResourceRouter`] for one resource, [`SnapshotReader`] for a
//! whole school. [`SqlStore`] wires them over one connection pool.

mod error;
mod rows;

pub mod inspector;
pub mod pool;
pub mod principals;
pub mod router;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod tenants;
pub mod upsert;

pub use inspector::{SchemaCatalog, SchemaInspector, SqliteCatalog, TableColumns};
pub use pool::SqlStoreFactory;
pub use principals::{ensure_super_admin, SqlPrincipalResolver};
pub use router::ResourceRouter;
pub use snapshot::SnapshotReader;
pub use store::SqlStore;
pub use tenants::TenantDirectory;
pub use upsert::{UpsertEngine, UpsertStatement};
