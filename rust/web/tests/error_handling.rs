/// Error handling tests for all major web components
///
/// This test suite verifies:
/// 1. Structured error types for the room registry and server
/// 2. Proper HTTP status codes for different error scenarios
/// 3. Stable machine-readable wire codes for socket error events
/// 4. Error conversion and propagation
use ludo_engine::errors::RulesError;
use ludo_web::rooms::{GameMode, RoomConfig, RoomError};
use ludo_web::server::{AppContext, ServerConfig, ServerError, WebServer};
use ludo_web::{ErrorSeverity, IntoErrorResponse};
use std::net::TcpListener;
use warp::http::StatusCode;

/// Test helper to find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind to port")
        .local_addr()
        .expect("local addr")
        .port()
}

#[tokio::test]
async fn room_not_found_is_a_structured_error() {
    let ctx = AppContext::new_for_tests();
    let rooms = ctx.rooms();

    let result = rooms.room_status(&"QQQQQ".to_string());
    assert!(result.is_err());

    match result {
        Err(RoomError::NotFound(code)) => assert_eq!(code, "QQQQQ"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn statuses_follow_the_error_taxonomy() {
    let cases: Vec<(RoomError, StatusCode, &str)> = vec![
        (
            RoomError::NotFound("AAAAA".to_string()),
            StatusCode::NOT_FOUND,
            "room_not_found",
        ),
        (
            RoomError::Full("AAAAA".to_string()),
            StatusCode::CONFLICT,
            "room_full",
        ),
        (
            RoomError::SeatUnavailable {
                room: "AAAAA".to_string(),
                seat: 2,
            },
            StatusCode::CONFLICT,
            "room_full",
        ),
        (
            RoomError::AlreadyStarted("AAAAA".to_string()),
            StatusCode::CONFLICT,
            "room_already_started",
        ),
        (
            RoomError::NotStarted("AAAAA".to_string()),
            StatusCode::BAD_REQUEST,
            "bad_request",
        ),
        (
            RoomError::Rules(RulesError::NotYourTurn {
                expected: 0,
                actual: 1,
            }),
            StatusCode::BAD_REQUEST,
            "not_your_turn",
        ),
        (
            RoomError::CodesExhausted(64),
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
        ),
        (
            RoomError::StoragePoisoned,
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
        ),
    ];

    for (error, status, code) in cases {
        assert_eq!(error.status_code(), status, "status for {code}");
        assert_eq!(error.wire_code(), code);
        assert_eq!(error.error_code(), error.wire_code());
    }
}

#[test]
fn rules_errors_convert_into_room_errors() {
    let error = RoomError::from(RulesError::NotYourTurn {
        expected: 1,
        actual: 2,
    });
    assert_eq!(error.wire_code(), "not_your_turn");

    let error = RoomError::from(RulesError::IllegalMove { token: 3 });
    assert_eq!(error.wire_code(), "illegal_move");

    let error = RoomError::from(RulesError::UnknownToken { token: 9 });
    assert_eq!(error.wire_code(), "bad_request");

    // A bad die can only come from inside the server.
    let error = RoomError::from(RulesError::InvalidDice { value: 7 });
    assert_eq!(error.wire_code(), "internal_error");
    assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn error_details_carry_the_room_code() {
    let error = RoomError::SeatUnavailable {
        room: "XK2P9".to_string(),
        seat: 1,
    };
    let details = error.error_details().expect("details");
    assert_eq!(details["room_code"], "XK2P9");
    assert_eq!(details["seat"], 1);

    let error = RoomError::StoragePoisoned;
    assert!(error.error_details().is_none());
}

#[test]
fn severities_separate_client_mistakes_from_server_faults() {
    assert_eq!(
        RoomError::NotFound("AAAAA".to_string()).severity(),
        ErrorSeverity::Client
    );
    assert_eq!(
        RoomError::Rules(RulesError::RollNotAllowed).severity(),
        ErrorSeverity::Client
    );
    assert_eq!(
        RoomError::Rules(RulesError::InvalidDice { value: 0 }).severity(),
        ErrorSeverity::Server
    );
    assert_eq!(
        RoomError::CodesExhausted(64).severity(),
        ErrorSeverity::Critical
    );
    assert_eq!(RoomError::StoragePoisoned.severity(), ErrorSeverity::Critical);
}

#[tokio::test]
async fn full_room_rejects_join_with_room_full() {
    let ctx = AppContext::new_for_tests();
    let rooms = ctx.rooms();

    let code = rooms
        .create_room(RoomConfig {
            mode: GameMode::OneVsThreeCpu,
            seed: Some(5),
            ..RoomConfig::default()
        })
        .expect("create room");

    // Solo mode has a single human seat and the creator holds it.
    let result = rooms.join_room(&code);
    match result {
        Err(RoomError::Full(full_code)) => assert_eq!(full_code, code),
        other => panic!("expected Full, got {other:?}"),
    }
}

#[tokio::test]
async fn intents_against_a_waiting_room_are_bad_requests() {
    let ctx = AppContext::new_for_tests();
    let rooms = ctx.rooms();

    let code = rooms
        .create_room(RoomConfig {
            mode: GameMode::FourHumans,
            seed: Some(5),
            ..RoomConfig::default()
        })
        .expect("create room");

    let result = rooms.handle_roll(&code, 0);
    match result {
        Err(err @ RoomError::NotStarted(_)) => {
            assert_eq!(err.wire_code(), "bad_request");
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        other => panic!("expected NotStarted, got {other:?}"),
    }
}

#[tokio::test]
async fn server_bind_error_returns_descriptive_message() {
    // Test that bind errors provide helpful messages
    let port = get_available_port();

    // Bind to the port to make it unavailable
    let _listener = TcpListener::bind(format!("127.0.0.1:{}", port)).expect("bind");

    let config = ServerConfig::new("127.0.0.1", port);
    let server = WebServer::new(config);

    let result = server.start().await;
    assert!(result.is_err());

    match result {
        Err(ServerError::BindError(_)) => {}
        Err(e) => panic!("expected BindError, got: {:?}", e),
        Ok(_) => panic!("expected error, got success"),
    }
}

#[tokio::test]
async fn unresolvable_host_is_a_config_error() {
    let config = ServerConfig::new("definitely-not-a-real-host.invalid", 0);
    let server = WebServer::new(config);

    let result = server.start().await;
    match result {
        Err(ServerError::ConfigError(message)) => {
            assert!(message.contains("definitely-not-a-real-host.invalid"));
        }
        Err(e) => panic!("expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("expected error, got success"),
    }
}

#[tokio::test]
async fn multiple_concurrent_errors_are_independent() {
    // Verify error handling is thread-safe and errors don't leak between requests
    use std::sync::Arc;
    use tokio::task::JoinSet;

    let ctx = Arc::new(AppContext::new_for_tests());
    let mut tasks = JoinSet::new();

    for i in 0..10 {
        let ctx = Arc::clone(&ctx);
        tasks.spawn(async move {
            let rooms = ctx.rooms();
            let result = rooms.room_status(&format!("NO{i}XX"));
            assert!(result.is_err());
            matches!(result.unwrap_err(), RoomError::NotFound(_))
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(result.expect("task completed"));
    }
}

#[test]
fn room_error_implements_std_error_trait() {
    use std::error::Error;

    let error = RoomError::NotFound("AAAAA".to_string());
    let _ = error.source(); // Should compile
    let display = format!("{}", error);
    assert!(display.contains("Room not found"));
}

#[test]
fn server_error_converts_from_io_error() {
    use std::io;

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let server_error: ServerError = io_error.into();

    match server_error {
        ServerError::BindError(_) => {}
        _ => panic!("expected BindError"),
    }
}

#[test]
fn error_types_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<RoomError>();
    assert_send_sync::<ServerError>();
    assert_send_sync::<RulesError>();
}
