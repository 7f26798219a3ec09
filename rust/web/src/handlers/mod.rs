pub mod health;
pub mod rooms;
pub mod ws;

pub use health::health;
pub use rooms::room_status;
pub use ws::{game_socket, ClientIntent, CreateRoomRequest};
