use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use super::listener::PeerSynchronizer;
use crate::pool::handlers::serve_fetch;
use crate::pool::protocol::{ENDPOINT_GET, ENDPOINT_STATS, fetch_route};

#[derive(Clone)]
pub struct ServeState {
    pub sync: Arc<PeerSynchronizer>,
    pub group: String,
}

#[derive(Debug, Deserialize)]
pub struct GetParams {
    pub key: Option<String>,
}

/// Client reads on `/get/?key=`, optional stats on `/stats/`, and the peer
/// fetch endpoint under `base_path`.
pub fn node_router(
    sync: Arc<PeerSynchronizer>,
    group: &str,
    base_path: &str,
    enable_stats: bool,
) -> Router {
    let mut router = Router::new()
        .route(ENDPOINT_GET, any(handle_get))
        .route(&fetch_route(base_path), get(handle_peer_fetch));

    if enable_stats {
        router = router.route(ENDPOINT_STATS, get(handle_stats));
    }

    router.layer(Extension(ServeState {
        sync,
        group: group.to_string(),
    }))
}

fn uninitialized() -> Response {
    tracing::error!("Request received before the cache pool was initialized");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR.to_string(),
    )
        .into_response()
}

pub async fn handle_get(
    Extension(state): Extension<ServeState>,
    method: Method,
    Query(params): Query<GetParams>,
) -> Response {
    if method != Method::GET {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::METHOD_NOT_ALLOWED.to_string(),
        )
            .into_response();
    }

    let Some(key) = params.key.filter(|key| !key.is_empty()) else {
        return (StatusCode::BAD_REQUEST, StatusCode::BAD_REQUEST.to_string()).into_response();
    };

    let Some(pool) = state.sync.pool() else {
        return uninitialized();
    };

    let now = Instant::now();
    let result = pool.get(&state.group, &key).await;
    tracing::info!(
        "cacheHandler: group[{}]\tkey[{:?}]\ttime[{:?}]",
        state.group,
        key,
        now.elapsed()
    );

    match result {
        Ok(value) => (StatusCode::OK, value).into_response(),
        Err(e) => {
            tracing::error!("Get failed for {:?}: {}", key, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)).into_response()
        }
    }
}

pub async fn handle_peer_fetch(
    Extension(state): Extension<ServeState>,
    Path((group, key)): Path<(String, String)>,
) -> Response {
    match state.sync.pool() {
        Some(pool) => serve_fetch(pool, &group, &key).await,
        None => uninitialized(),
    }
}

pub async fn handle_stats(Extension(state): Extension<ServeState>) -> Response {
    let Some(pool) = state.sync.pool() else {
        return uninitialized();
    };

    match pool.group(&state.group) {
        Some(group) => (StatusCode::OK, Json(group.stats_snapshot())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("no such group: {}\n", state.group),
        )
            .into_response(),
    }
}
