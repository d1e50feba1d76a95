use std::sync::Arc;

use anyhow::Result;

use crate::errors::CampusError;
use crate::service::{Authenticator, ResourceService, TenantService};
use crate::{CampusConfig, CampusConfigSnapshot};

/// The storage-backed services. Absent when the store could not be reached.
#[derive(Clone)]
pub struct CampusServices {
    pub resources: Arc<dyn ResourceService>,
    pub tenants: Arc<dyn TenantService>,
    pub auth: Arc<dyn Authenticator>,
}

struct CampusAppInner {
    config: CampusConfigSnapshot,
    services: Option<CampusServices>,
}

/// CampusApp is the central application container.
///
/// Framework-agnostic. Holds:
/// - the frozen config
/// - the storage-backed services, if storage is connected
#[derive(Clone)]
pub struct CampusApp {
    inner: Arc<CampusAppInner>,
}

impl CampusApp {
    /// A degraded app: config only, no storage.
    pub fn new(config: &CampusConfig) -> Self {
        Self {
            inner: Arc::new(CampusAppInner {
                config: config.snapshot(),
                services: None,
            }),
        }
    }

    pub fn with_services(config: &CampusConfig, services: CampusServices) -> Self {
        Self {
            inner: Arc::new(CampusAppInner {
                config: config.snapshot(),
                services: Some(services),
            }),
        }
    }

    /// `app.get(key)`
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.config.get_string(key)
    }

    pub fn config(&self) -> &CampusConfigSnapshot {
        &self.inner.config
    }

    pub fn is_connected(&self) -> bool {
        self.inner.services.is_some()
    }

    pub fn services(&self) -> Result<&CampusServices> {
        self.inner
            .services
            .as_ref()
            .ok_or_else(|| CampusError::unavailable("storage disconnected").into_anyhow())
    }
}
