use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::Router;
use campus_core::CampusApp;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::rest;
use crate::CampusAxumState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request bodies up to this size are accepted unless `http.body_limit_bytes` says otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AxumApp {
    pub app: CampusApp,
    pub router: Router<()>,
}

impl AxumApp {
    pub fn new(app: CampusApp) -> Self {
        let body_limit = app
            .config()
            .get_usize("http.body_limit_bytes")
            .unwrap_or(DEFAULT_BODY_LIMIT);
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

        let router = rest::campus_router(CampusAxumState::new(app.clone()))
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

        Self { app, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "http.listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn axum(app: CampusApp) -> AxumApp {
    AxumApp::new(app)
}
