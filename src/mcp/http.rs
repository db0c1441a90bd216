//! HTTP transport for MCP
//!
//! `POST /mcp` takes one JSON-RPC message and answers with one response
//! (or `202 Accepted` for notifications). `GET /health` is a liveness check.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::protocol::{dispatch, McpHandler};
use crate::error::Result;

/// Build the router
pub fn router<H>(handler: Arc<H>) -> Router
where
    H: McpHandler + 'static,
{
    Router::new()
        .route("/mcp", post(mcp_handler::<H>))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(handler)
}

async fn mcp_handler<H>(State(handler): State<Arc<H>>, body: String) -> Response
where
    H: McpHandler + 'static,
{
    match dispatch(handler.as_ref(), &body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

/// Serve until `shutdown` resolves
pub async fn serve<H, F>(handler: Arc<H>, addr: SocketAddr, shutdown: F) -> Result<()>
where
    H: McpHandler + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(handler);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MCP HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{McpRequest, McpResponse};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct Pong;

    #[async_trait]
    impl McpHandler for Pong {
        async fn handle_request(&self, request: McpRequest) -> McpResponse {
            McpResponse::success(request.id, json!({"method": request.method}))
        }
    }

    fn post_mcp(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_mcp_request() {
        let app = router(Arc::new(Pong));
        let response = app
            .oneshot(post_mcp(r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"]["method"], "tools/list");
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let app = router(Arc::new(Pong));
        let response = app
            .oneshot(post_mcp(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let app = router(Arc::new(Pong));
        let response = app.oneshot(post_mcp("{")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(Pong));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
