use axum::{
    Router,
    routing::{get, post},
};
use config::RelayConfig;
use forwarder::DeviceForwarder;
use service::RelayService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod forwarder;
mod handlers;
mod service;
pub mod shared_types;
mod transform;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
}

fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/path", post(handlers::submit_path))
        .route("/api/status", get(handlers::get_status))
        .route("/api/path/current", get(handlers::get_current_path))
        .route("/api/esp32/config", post(handlers::update_device_config))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env()?;
    info!("Board URL: {}", config.device_url);
    info!("Allowed origins: {:?}", config.allowed_origins);

    let forwarder = DeviceForwarder::new(config.device_timeout, config.simulation_delay);
    let state = AppState {
        relay: Arc::new(RelayService::new(config.device_url.clone(), forwarder)),
    };

    let app = app(state, config.cors_layer());

    // Listen on all interfaces so the relay is reachable from other hosts/containers.
    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarder::device_url_for;
    use axum::{Json, http::header};
    use serde_json::{Value, json};
    use std::{net::SocketAddr, sync::Mutex, time::Duration};

    async fn spawn(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        device_url_for(&addr.to_string())
    }

    async fn spawn_relay(device_url: String) -> String {
        let state = AppState {
            relay: Arc::new(RelayService::new(
                device_url,
                DeviceForwarder::new(Duration::from_millis(500), Duration::ZERO),
            )),
        };
        let addr = spawn(app(state, RelayConfig::default().cors_layer())).await;
        format!("http://{}", addr)
    }

    fn drawn_path(len: usize) -> Value {
        let points: Vec<Value> = (0..len)
            .map(|i| json!({ "x": i as f64 * 8.0, "y": 300.0 }))
            .collect();
        json!({ "path": points, "timestamp": "2024-05-01T10:00:00Z" })
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let base = spawn_relay(unreachable_url().await).await;
        let body: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
        assert_eq!(body["message"], "Board control API server is running");
    }

    #[tokio::test]
    async fn submission_succeeds_in_simulation_mode() {
        let base = spawn_relay(unreachable_url().await).await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{}/api/path", base))
            .json(&drawn_path(60))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["points_received"], 60);
        assert_eq!(body["board_response"]["mode"], "simulation");
        assert_eq!(body["board_response"]["processed_points"], 6);
        assert!(body["timestamp"].is_string());

        let current: Value = client
            .get(format!("{}/api/path/current", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(current["points_count"], 60);
        assert_eq!(current["path"][1], json!({ "x": 8.0, "y": 300.0 }));

        let status: Value = client
            .get(format!("{}/api/status", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["status"], "active");
        assert_eq!(status["current_path_points"], 60);
    }

    #[tokio::test]
    async fn submission_relays_board_response() {
        let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
        let sink = seen.clone();
        let board = Router::new().route(
            "/api/move",
            post(move |Json(body): Json<Value>| async move {
                sink.lock().unwrap().push(body);
                Json(json!({ "success": true, "message": "moving" }))
            }),
        );
        let board_addr = spawn(board).await;
        let base = spawn_relay(unreachable_url().await).await;
        let client = reqwest::Client::new();

        let config: Value = client
            .post(format!("{}/api/esp32/config", base))
            .json(&json!({ "ip_address": board_addr.to_string(), "note": "bench" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(config["success"], true);
        assert_eq!(config["esp32_url"], format!("http://{}", board_addr));

        let body: Value = client
            .post(format!("{}/api/path", base))
            .json(&drawn_path(2))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            body["board_response"],
            json!({ "success": true, "message": "moving" })
        );

        let commands = seen.lock().unwrap().clone();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["command"], "move_path");
        assert_eq!(commands[0]["total_points"], 2);
        assert_eq!(commands[0]["points"][1], json!({ "x": 1, "y": 50 }));
    }

    #[tokio::test]
    async fn config_without_ip_address_keeps_url() {
        let device_url = unreachable_url().await;
        let base = spawn_relay(device_url.clone()).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/esp32/config", base))
            .json(&json!({ "port": 80 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["esp32_url"], device_url);
    }

    #[tokio::test]
    async fn malformed_submission_is_rejected() {
        let base = spawn_relay(unreachable_url().await).await;

        let res = reqwest::Client::new()
            .post(format!("{}/api/path", base))
            .json(&json!({ "path": [{ "x": "left" }] }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = res.json().await.unwrap();
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn submission_without_timestamp_is_rejected() {
        let base = spawn_relay(unreachable_url().await).await;

        let res = reqwest::Client::new()
            .post(format!("{}/api/path", base))
            .json(&json!({ "path": [{ "x": 1.0, "y": 2.0 }] }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn cors_allows_listed_origins_only() {
        let base = spawn_relay(unreachable_url().await).await;
        let client = reqwest::Client::new();

        let allowed = client
            .get(format!("{}/api/status", base))
            .header(header::ORIGIN, "https://demo.azurestaticapps.net")
            .send()
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://demo.azurestaticapps.net"
        );
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );

        let denied = client
            .get(format!("{}/api/status", base))
            .header(header::ORIGIN, "https://elsewhere.example")
            .send()
            .await
            .unwrap();
        assert!(
            denied
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn handler_panic_becomes_server_error() {
        async fn explode() -> &'static str {
            panic!("board exploded")
        }
        let router = Router::new()
            .route("/boom", get(explode))
            .layer(CatchPanicLayer::custom(handlers::panic_response));
        let addr = spawn(router).await;

        let res = reqwest::get(format!("http://{}/boom", addr)).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = res.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("board exploded"));
    }
}
