use crate::rooms::RoomManager;
use serde::Serialize;
use warp::reply::Json;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    rooms: usize,
}

pub fn health(rooms: &RoomManager) -> Json {
    warp::reply::json(&HealthBody {
        status: "ok",
        rooms: rooms.room_count(),
    })
}
