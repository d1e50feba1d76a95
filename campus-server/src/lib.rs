pub mod config;

use anyhow::Result;
use campus_auth::{AuthGateOptions, PasswordHasher};
use campus_axum::{axum, AxumApp};
use campus_core::{CampusApp, CampusConfig, CampusConfigSnapshot, CampusServices};
use campus_sql::SqlStore;
use tracing::{error, info};

pub use config::campus_config;

/// Connect storage and build the HTTP app. A storage failure is logged and
/// the app starts degraded: `/health` answers, data routes return 503.
pub async fn build(config: CampusConfig) -> Result<AxumApp> {
    let app = match connect(&config.snapshot()).await {
        Ok(services) => CampusApp::with_services(&config, services),
        Err(err) => {
            error!(error = %err, "storage.connect_failed; starting without storage");
            CampusApp::new(&config)
        }
    };
    Ok(axum(app))
}

async fn connect(config: &CampusConfigSnapshot) -> Result<CampusServices> {
    let url = config
        .get_string("database.url")
        .unwrap_or_else(|| "sqlite://campus.db".to_string());
    let max_connections = config.get_u32("database.max_connections").unwrap_or(5);
    let store = SqlStore::open(&url, max_connections).await?;

    let hasher = config
        .get_u32("auth.hash_cost")
        .map(PasswordHasher::with_cost)
        .unwrap_or_default();

    if let (Some(email), Some(password)) = (
        config.get_string("auth.admin.email"),
        config.get_string("auth.admin.password"),
    ) {
        store.ensure_super_admin(&hasher, &email, &password).await?;
    }

    let mut options = AuthGateOptions::default();
    if let Some(statuses) = config.get_list("auth.blocked_statuses") {
        options.blocked_statuses = statuses;
    }

    info!(url = %url, "storage.ready");
    Ok(store.services(hasher, options))
}
