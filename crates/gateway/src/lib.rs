//! Thin axum wiring over the MoxApp core: the `/sim/*` inbound
//! adapter (§6.3) and the management REST surface (§6.4). No business
//! logic lives here — every handler calls straight through to
//! `moxapp-config`/`moxapp-auth`/`moxapp-scheduler`/`moxapp-metrics`/
//! `moxapp-inbound`.

pub mod management;
pub mod sim;
pub mod state;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

/// Build the full router: `/health`, `/sim/*`, and `/api/*`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(sim::router())
        .nest("/api", management::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") }))
}

/// Bind and serve the router, passing connection info through so
/// `/sim/*` can read the remote address.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use moxapp_auth::TokenManager;
    use moxapp_client::HttpClient;
    use moxapp_config::{ConfigData, ConfigStore};
    use moxapp_core::{FakeEnv, SystemClock, SystemRandom};
    use moxapp_inbound::InboundResponder;
    use moxapp_metrics::{InboundCollector, OutgoingCollector};
    use moxapp_scheduler::OutgoingScheduler;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        state_for(Arc::new(ConfigStore::new(ConfigData::default())))
    }

    fn state_for(config: Arc<ConfigStore>) -> AppState {
        let env = Arc::new(FakeEnv::new());
        let clock = Arc::new(SystemClock);
        let random = Arc::new(SystemRandom);
        let auth = Arc::new(TokenManager::new(env.clone(), clock.clone()));
        let client = Arc::new(HttpClient::new(10, env, clock.clone(), random.clone(), auth.clone()));
        let outgoing_metrics = Arc::new(OutgoingCollector::default());
        let sink = {
            let metrics = Arc::clone(&outgoing_metrics);
            Arc::new(move |r| metrics.record(&r)) as moxapp_scheduler::ResultSink
        };
        let scheduler = OutgoingScheduler::new(Arc::clone(&config), client, clock.clone(), sink);
        let inbound_metrics = Arc::new(InboundCollector::default());
        let inbound = Arc::new(InboundResponder::new(Arc::clone(&config), random, clock, Arc::clone(&inbound_metrics)));

        AppState { config, auth, scheduler, inbound, outgoing_metrics, inbound_metrics }
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = build_router(test_state());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sim_on_unconfigured_route_is_404() {
        let app = build_router(test_state());
        let mut req = Request::builder().uri("/sim/nope").body(Body::empty()).unwrap();
        req.extensions_mut().insert(axum::extract::ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reload_without_configured_path_is_an_error() {
        let app = build_router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/incoming/routes/reload")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reload_picks_up_changes_written_to_the_config_file() {
        use moxapp_config::file;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moxapp.yaml");
        file::save_yaml(&path, &ConfigData::default()).unwrap();

        let config = Arc::new(ConfigStore::new(ConfigData::default()));
        config.set_config_path(path.clone());
        let app = build_router(state_for(Arc::clone(&config)));

        let mut on_disk = ConfigData::default();
        on_disk.incoming_routes.push(moxapp_config::InboundRoute {
            name: "added-on-disk".into(),
            path: "/added".into(),
            method: "*".into(),
            responses: vec![moxapp_config::ResponseSpec { status: 200, share: 1.0, min_response_ms: 0, max_response_ms: 0 }],
            enabled: true,
        });
        file::save_yaml(&path, &on_disk).unwrap();

        let req = Request::builder().method("POST").uri("/api/incoming/routes/reload").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let routes = config.list_incoming().await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].name, "added-on-disk");
    }
}
