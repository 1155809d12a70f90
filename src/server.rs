use axum::{Json, Router, http::StatusCode, routing::post};
use log::{error, info};
use tower::limit::ConcurrencyLimitLayer;

use crate::config::ServerConfig;
use crate::data::{TimetableOutput, TimetableRequest};
use crate::solver;

async fn generate_handler(
    Json(input): Json<TimetableRequest>,
) -> Result<Json<TimetableOutput>, (StatusCode, String)> {
    // the search is CPU bound, keep it off the async workers
    match tokio::task::spawn_blocking(move || solver::solve(&input)).await {
        Ok(Ok(output)) => Ok(Json(output)),
        Ok(Err(e)) => Err((StatusCode::BAD_REQUEST, e)),
        Err(e) => {
            error!("solver task failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "solver task failed".to_string()))
        }
    }
}

pub fn app(config: &ServerConfig) -> Router {
    Router::new()
        .route("/generate-timetable", post(generate_handler))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_solves))
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = app(&config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
