//! Server Startup Tests
//!
//! Tests for application state creation, configuration handling and route
//! assembly at startup.

use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use tempfile::TempDir;
use tower::util::ServiceExt;

use realtime_console::{
    ServerConfig, config::TlsConfig, core::credentials::CredentialProvider, routes,
    state::AppState,
};

/// Helper function to create a minimal test configuration
fn create_minimal_config(port: u16) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = port;
    config.proxy.target = None;
    config
}

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// The server boots without an API key or built site
#[tokio::test]
async fn test_minimal_config_boot() {
    let config = create_minimal_config(find_available_port());
    let app_state = AppState::new(config).await;

    let app = routes::api::create_api_router().with_state(app_state);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_address_parsing() {
    let port = find_available_port();
    let config = create_minimal_config(port);

    let address = config.address();
    assert!(address.contains("127.0.0.1"));
    assert!(address.contains(&port.to_string()));
    assert!(address.parse::<std::net::SocketAddr>().is_ok());
}

/// Multiple AppState instances can be created concurrently
#[tokio::test]
async fn test_concurrent_app_state_creation() {
    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let port = find_available_port();
            tokio::spawn(async move {
                let config = create_minimal_config(port);
                let _app_state = AppState::new(config).await;
            })
        })
        .collect();

    for task in tasks {
        task.await.expect("Task should complete successfully");
    }
}

#[tokio::test]
async fn test_static_credentials_from_config() {
    let mut config = create_minimal_config(find_available_port());
    config.openai_api_key = Some("sk-test".to_string());

    let app_state = AppState::new(config).await;
    assert_eq!(app_state.credentials.api_key().as_deref(), Some("sk-test"));
}

#[tokio::test]
async fn test_key_file_credentials_survive_restart() {
    let dir = TempDir::new().unwrap();
    let key_file = dir.path().join("keys.json");

    let mut config = create_minimal_config(find_available_port());
    config.api_key_file = Some(key_file.clone());
    let app_state = AppState::new(config).await;
    app_state.credentials.store("sk-stored").unwrap();

    let mut config = create_minimal_config(find_available_port());
    config.api_key_file = Some(key_file);
    let app_state = AppState::new(config).await;
    assert_eq!(app_state.credentials.api_key().as_deref(), Some("sk-stored"));
}

/// An unreadable key file degrades to the configured key instead of failing startup
#[tokio::test]
async fn test_corrupt_key_file_falls_back() {
    let dir = TempDir::new().unwrap();
    let key_file = dir.path().join("keys.json");
    fs::write(&key_file, "not json").unwrap();

    let mut config = create_minimal_config(find_available_port());
    config.api_key_file = Some(key_file);
    config.openai_api_key = Some("sk-env".to_string());

    let app_state = AppState::new(config).await;
    assert_eq!(app_state.credentials.api_key().as_deref(), Some("sk-env"));
}

#[tokio::test]
async fn test_tls_configuration() {
    let mut config = create_minimal_config(find_available_port());
    config.tls = Some(TlsConfig {
        cert_path: PathBuf::from("/path/to/cert.pem"),
        key_path: PathBuf::from("/path/to/key.pem"),
    });

    assert!(config.is_tls_enabled());
    let app_state = AppState::new(config).await;
    assert!(app_state.config.tls.is_some());
}

#[tokio::test]
async fn test_proxy_route_mounted_only_with_target() {
    let config = create_minimal_config(find_available_port());
    assert!(!config.is_proxy_enabled());

    let mut config = create_minimal_config(find_available_port());
    config.proxy.target = Some("http://127.0.0.1:9".to_string());
    assert!(config.is_proxy_enabled());
    let app_state = AppState::new(config).await;
    let proxy_routes = routes::proxy::create_proxy_router(&app_state).with_state(app_state);

    let request = Request::builder().uri("/other").body(Body::empty()).unwrap();
    let response = proxy_routes.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Concurrent request handling capability
#[tokio::test]
async fn test_concurrent_request_handling() {
    let config = create_minimal_config(find_available_port());
    let app_state = AppState::new(config).await;
    let app: Router = routes::create_app(app_state);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
                let response = app.oneshot(request).await.unwrap();
                response.status()
            })
        })
        .collect();

    for task in tasks {
        let status = task.await.expect("Task should complete");
        assert_eq!(status, StatusCode::OK);
    }
}
