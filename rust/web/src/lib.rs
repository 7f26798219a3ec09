pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod rooms;
pub mod server;

pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{EventBus, EventSubscription, SeatInfo, ServerEvent};
pub use logging::{LogEntry, TestLogSubscriber, init_logging, init_test_logging};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use middleware::with_request_logging;
pub use rooms::{
    GameMode, RoomCode, RoomConfig, RoomError, RoomManager, RoomPhase, RoomPolicy, RoomStatus,
    SeatClaim, SeatKind,
};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
