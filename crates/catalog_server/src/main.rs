use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shared::{domain::MovieSummary, protocol::PageResponse};
use tracing::{debug, info, warn};

mod catalog;
mod config;

use catalog::{Catalog, ListingQuery};
use config::load_settings;

struct AppState {
    catalog: Catalog,
    delay: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let catalog = Catalog::seeded(settings.catalog_size);
    info!(
        movies = catalog.len(),
        delay_ms = settings.delay_ms,
        "catalog seeded"
    );

    let state = AppState {
        catalog,
        delay: Duration::from_millis(settings.delay_ms),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/movies", get(list_movies))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<PageResponse<MovieSummary>>) {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let query = match ListingQuery::from_params(&params) {
        Ok(query) => query,
        Err(error) => {
            warn!(%error, ?params, "rejected movie listing query");
            return (
                StatusCode::BAD_REQUEST,
                Json(PageResponse::failure(error.message)),
            );
        }
    };

    let (rows, meta) = state.catalog.list(&query);
    debug!(
        page = meta.page,
        limit = meta.limit,
        total = meta.total,
        returned = rows.len(),
        "served movie listing"
    );
    (StatusCode::OK, Json(PageResponse::ok(rows, meta)))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
