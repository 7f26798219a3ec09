use std::time::Instant;
use warp::reject::Rejection;
use warp::reply::Reply;
use warp::Filter;

/// Middleware for logging HTTP requests and responses
pub fn with_request_logging<F, T>(
    filter: F,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    F: Filter<Extract = (T,), Error = Rejection> + Clone + Send + Sync + 'static,
    T: Reply,
{
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(|path: warp::path::FullPath, method: warp::http::Method| {
            let start = Instant::now();
            tracing::info!(
                path = %path.as_str(),
                method = %method,
                "incoming request"
            );
            start
        })
        .and(filter)
        .map(|start: Instant, reply: T| {
            let duration = start.elapsed();
            tracing::info!(duration_ms = duration.as_millis(), "request completed");
            reply
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TestLogSubscriber;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;
    use warp::http::StatusCode;

    #[tokio::test]
    async fn test_request_logging_middleware() {
        let subscriber = TestLogSubscriber::new();
        let layer = subscriber.clone().into_layer::<Registry>();
        let registry = Registry::default().with(layer);

        let _guard = tracing::subscriber::set_default(registry);

        let route = warp::path!("test")
            .and(warp::get())
            .map(|| warp::reply::json(&"success"));

        let logged_route = with_request_logging(route);

        let response = warp::test::request()
            .method("GET")
            .path("/test")
            .reply(&logged_route)
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let entries = subscriber.entries();
        assert!(entries
            .iter()
            .any(|e| e.level == Level::INFO && e.message.contains("incoming request")));
        assert!(entries
            .iter()
            .any(|e| e.level == Level::INFO && e.message.contains("request completed")));
    }
}
