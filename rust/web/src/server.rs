use crate::events::EventBus;
use crate::metrics::MetricsCollector;
use crate::middleware::with_request_logging;
use crate::rooms::{RoomError, RoomManager, RoomPolicy};
use std::convert::Infallible;
use thiserror::Error;

use crate::handlers;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::Reply;
use warp::Filter;

/// How often the server sweeps idle rooms and logs its counters.
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Everything the route tree needs, bundled for cheap cloning. The bus, the
/// room registry and the metrics collector all share state internally, so a
/// context clone still observes the same server.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    event_bus: EventBus,
    rooms: RoomManager,
    metrics: MetricsCollector,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_policy(config, RoomPolicy::default())
    }

    pub fn with_policy(config: ServerConfig, policy: RoomPolicy) -> Self {
        let metrics = MetricsCollector::new();
        let event_bus = EventBus::with_metrics(metrics.clone());
        let rooms = RoomManager::with_policy_and_metrics(event_bus.clone(), policy, metrics.clone());
        Self::new_with_dependencies(config, event_bus, rooms, metrics)
    }

    pub fn new_with_dependencies(
        config: ServerConfig,
        event_bus: EventBus,
        rooms: RoomManager,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            config,
            event_bus,
            rooms,
            metrics,
        }
    }

    pub fn new_for_tests() -> Self {
        Self::with_policy(ServerConfig::for_tests(), RoomPolicy::for_tests())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> EventBus {
        self.event_bus.clone()
    }

    pub fn rooms(&self) -> RoomManager {
        self.rooms.clone()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Room error: {0}")]
    RoomError(#[from] RoomError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: AppContext::new(config),
        }
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// The full route tree: health, the room status and metrics API, and the
    /// websocket game endpoint, all wrapped in request logging.
    pub fn routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let health = Self::health_route(context);
        let api = Self::api_routes(context);
        let ws = Self::ws_route(context);

        let all = health.or(api).unify().or(ws).unify();
        with_request_logging(all)
            .map(|reply: warp::reply::Response| reply.into_response())
            .boxed()
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let config = context.config().clone();
        let bind_addr = Self::bind_addr(&config)?;

        let preflight = if bind_addr.port() != 0 {
            Some(std::net::TcpListener::bind(bind_addr).map_err(ServerError::BindError)?)
        } else {
            None
        };
        drop(preflight);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(address = %addr, "web server listening");

        let reaper = {
            let rooms = context.rooms();
            let metrics = context.metrics();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(REAPER_INTERVAL);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    rooms.cleanup_idle_rooms();
                    metrics.log_metrics();
                }
            })
        };

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, reaper, context))
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    fn health_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .and(Self::with_rooms(context.rooms()))
            .map(|rooms: RoomManager| handlers::health::health(&rooms).into_response())
            .boxed()
    }

    fn api_routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let rooms = context.rooms();
        let metrics = context.metrics();

        let status = warp::path!("api" / "rooms" / String)
            .and(warp::get())
            .and(Self::with_rooms(rooms))
            .and_then(|code: String, rooms: RoomManager| async move {
                let response = handlers::room_status(rooms, code).await;
                Ok::<_, Infallible>(response)
            });

        let metrics_snapshot = warp::path!("api" / "metrics")
            .and(warp::get())
            .and(Self::with_metrics(metrics))
            .map(|metrics: MetricsCollector| warp::reply::json(&metrics.snapshot()).into_response());

        status.or(metrics_snapshot).unify().boxed()
    }

    fn ws_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        warp::path("ws")
            .and(warp::path::end())
            .and(warp::ws())
            .and(Self::with_rooms(context.rooms()))
            .and(Self::with_metrics(context.metrics()))
            .map(
                |ws: warp::ws::Ws, rooms: RoomManager, metrics: MetricsCollector| {
                    ws.on_upgrade(move |socket| handlers::game_socket(socket, rooms, metrics))
                        .into_response()
                },
            )
            .boxed()
    }

    fn with_rooms(
        rooms: RoomManager,
    ) -> impl Filter<Extract = (RoomManager,), Error = Infallible> + Clone {
        warp::any().map(move || rooms.clone())
    }

    fn with_metrics(
        metrics: MetricsCollector,
    ) -> impl Filter<Extract = (MetricsCollector,), Error = Infallible> + Clone {
        warp::any().map(move || metrics.clone())
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    reaper: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        reaper: JoinHandle<()>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            reaper: Some(reaper),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
