use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::handlers::http::{
    create_room, finish_room, get_room, join_room, leave_room, list_rooms, start_room, AppState,
};
use crate::state::room_store::MemoryRoomStore;
use crate::utils::config::Config;

/// Lobby routes with permissive CORS
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/:id", get(get_room))
        .route("/rooms/:id/join", post(join_room))
        .route("/rooms/:id/start", post(start_room))
        .route("/rooms/:id/finish", post(finish_room))
        .route("/rooms/:id/leave", post(leave_room))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Serve the lobby facade until the listener fails
pub async fn start_http_server(
    store: Arc<MemoryRoomStore>,
    config: Arc<Config>,
) -> Result<(), Box<dyn std::error::Error>> {
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let app = build_router(AppState { store, config });

    info!("Starting HTTP server on {}", http_addr);
    let listener = TcpListener::bind(&http_addr).await.map_err(|e| {
        log::error!("Failed to bind HTTP server to {}: {}", http_addr, e);
        e
    })?;
    info!("HTTP server successfully bound to {}", http_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
