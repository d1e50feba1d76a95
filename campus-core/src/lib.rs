//! campus-core: framework-agnostic core for the campus school backend.
//!
//! Storage and transport crates build on the types defined here:
//! tenant context, the error taxonomy, the config store, the table
//! manifest with its value codecs, and the service traits the HTTP
//! adapter calls.

pub mod app;
pub mod codec;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod principal;
pub mod resource;
pub mod service;
pub mod tenant;

pub use app::{CampusApp, CampusServices};
pub use codec::{BoundValue, ColumnCodec};
pub use config::{load_env_config, CampusConfig, CampusConfigSnapshot};
pub use errors::{CampusError, ErrorKind};
pub use manifest::{ColumnSpec, Scope, TableSpec};
pub use principal::{LoginRequest, Principal, Role};
pub use resource::{Resource, ResourceMap, SettingsPartition, SCHOOL_KEY};
pub use service::{Authenticator, ResourceService, TenantService, WriteOutcome};
pub use tenant::{TenantContext, TenantId};
