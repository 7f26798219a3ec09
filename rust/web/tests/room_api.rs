/// HTTP API tests for the room endpoints
///
/// Starts a real server and exercises /health, /api/rooms/{code} and
/// /api/metrics with a plain HTTP client, verifying status codes and
/// response bodies.
use ludo_web::rooms::{GameMode, RoomConfig, RoomPolicy};
use ludo_web::server::{AppContext, ServerConfig, WebServer};
use std::time::Duration;
use warp::hyper::{self, Client as HyperClient};

fn test_context() -> AppContext {
    AppContext::with_policy(ServerConfig::for_tests(), RoomPolicy::for_tests())
}

fn room_config(mode: GameMode) -> RoomConfig {
    RoomConfig {
        mode,
        seed: Some(11),
        ..RoomConfig::default()
    }
}

async fn get_json(
    client: &HyperClient<hyper::client::HttpConnector>,
    uri: &str,
) -> (hyper::StatusCode, serde_json::Value) {
    let uri: hyper::Uri = uri.parse().expect("parse uri");
    let response = client.get(uri).await.expect("issue request");
    let status = response.status();
    let body = hyper::body::to_bytes(response.into_body())
        .await
        .expect("read body");
    let json = serde_json::from_slice(&body).expect("parse json body");
    (status, json)
}

#[tokio::test]
async fn health_endpoint_reports_room_count() {
    let context = test_context();
    let server = WebServer::from_context(context.clone());
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    let client = HyperClient::new();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, body) = get_json(&client, &format!("http://{address}/health")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rooms"], 0);

    context
        .rooms()
        .create_room(room_config(GameMode::OneVsThreeCpu))
        .expect("create room");

    let (status, body) = get_json(&client, &format!("http://{address}/health")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["rooms"], 1);

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}

#[tokio::test]
async fn room_status_endpoint_returns_live_room() {
    let context = test_context();
    let server = WebServer::from_context(context.clone());
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    let client = HyperClient::new();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let code = context
        .rooms()
        .create_room(room_config(GameMode::TwoVsTwoCpu))
        .expect("create room");

    let (status, body) = get_json(&client, &format!("http://{address}/api/rooms/{code}")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["code"], code.as_str());
    assert_eq!(body["mode"], "2v2");
    assert_eq!(body["phase"], "waiting");

    let seats = body["seats"].as_array().expect("seats array");
    assert_eq!(seats.len(), 4);
    assert_eq!(seats[0]["kind"], "human");
    assert_eq!(seats[0]["connected"], false);
    assert_eq!(seats[2]["kind"], "cpu");
    assert_eq!(seats[2]["connected"], true);

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}

#[tokio::test]
async fn room_status_unknown_code_returns_404() {
    let context = test_context();
    let server = WebServer::from_context(context.clone());
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    let client = HyperClient::new();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, body) = get_json(&client, &format!("http://{address}/api/rooms/ZZZZZ")).await;
    assert_eq!(status, hyper::StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "room_not_found");
    let message = body["message"].as_str().expect("error message");
    assert!(message.contains("ZZZZZ"));

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}

#[tokio::test]
async fn metrics_endpoint_serves_live_counters() {
    let context = test_context();
    let server = WebServer::from_context(context.clone());
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    let client = HyperClient::new();

    tokio::time::sleep(Duration::from_millis(20)).await;

    context
        .rooms()
        .create_room(room_config(GameMode::OneVsThreeCpu))
        .expect("create first room");
    context
        .rooms()
        .create_room(room_config(GameMode::FourHumans))
        .expect("create second room");

    let (status, body) = get_json(&client, &format!("http://{address}/api/metrics")).await;
    assert_eq!(status, hyper::StatusCode::OK);
    assert_eq!(body["rooms_created"], 2);
    assert_eq!(body["rooms_closed"], 0);
    assert_eq!(body["active_rooms"], 2);
    assert_eq!(body["ws_connections"], 0);

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}

#[tokio::test]
async fn unknown_paths_fall_through_to_404() {
    let context = test_context();
    let routes = WebServer::routes(&context);

    let response = warp::test::request()
        .method("GET")
        .path("/api/nonsense")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), 404);

    let response = warp::test::request()
        .method("POST")
        .path("/health")
        .reply(&routes)
        .await;
    assert_ne!(response.status(), 200);
}
