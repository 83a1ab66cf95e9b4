use crate::app::App;
use crate::errors::ToolError;
use crate::mcp::server::McpServer;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/mcp", post(handle_rpc))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn handle_rpc(State(server): State<McpServer>, headers: HeaderMap, body: String) -> Response {
    match server.handle_message(&body, &headers).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve(app: &App) -> Result<(), ToolError> {
    let bind = app.config.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|err| ToolError::internal(format!("failed to bind {}: {}", bind, err)))?;
    let local_addr = listener.local_addr()?;
    app.logger.info(
        "http transport listening",
        Some(&json!({ "addr": local_addr.to_string(), "tools": app.catalog.len() })),
    );
    axum::serve(listener, router(McpServer::from_app(app))).await?;
    Ok(())
}
