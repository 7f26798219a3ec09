use crate::rooms::{RoomCode, RoomError, RoomManager};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Retrieves the public state of a room: phase, mode and seat occupancy.
///
/// # HTTP Method and Path
/// - **Method**: GET
/// - **Path**: `/api/rooms/{code}`
///
/// # Purpose
/// Lets a client check a room before joining it over the websocket, and lets
/// a lobby page poll whether the match has started. The body never includes
/// per-seat private data; the live game state travels over the socket only.
///
/// # Request Format
/// No request body. The room code is provided as a URL path parameter.
///
/// # Response Format
/// - **Success (200 OK)**: JSON response with room data
/// ```json
/// {
///   "code": "XK2P9",
///   "mode": "2v2",
///   "phase": "waiting",
///   "seats": [
///     { "seat": 0, "kind": "human", "connected": true },
///     { "seat": 1, "kind": "human", "connected": false },
///     { "seat": 2, "kind": "cpu", "connected": true },
///     { "seat": 3, "kind": "cpu", "connected": true }
///   ]
/// }
/// ```
/// - **Error (404 Not Found)**: Room does not exist
///
/// # Error Cases
/// - `room_not_found`: No room with the given code exists
/// - `internal_error`: Room storage lock is corrupted
///
/// # Arguments
/// * `rooms` - Shared room registry
/// * `code` - Room code from the URL path
///
/// # Returns
/// HTTP response with JSON body on success, or error response on failure
pub async fn room_status(rooms: RoomManager, code: RoomCode) -> Response {
    match rooms.room_status(&code) {
        Ok(status) => success_response(StatusCode::OK, status),
        Err(err) => room_error(err),
    }
}

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn room_error(err: RoomError) -> Response {
    use crate::errors::IntoErrorResponse;
    err.into_http_response()
}
