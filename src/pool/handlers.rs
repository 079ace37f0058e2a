use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::group::GroupStats;
use super::pool::CachePool;
use crate::error::RoutingError;

/// Answers a peer asking this node for a key it owns. The value is loaded
/// locally; it is never forwarded again.
pub async fn serve_fetch(pool: &CachePool, group_name: &str, key: &str) -> Response {
    let Some(group) = pool.group(group_name) else {
        let err = RoutingError::NoSuchGroup(group_name.to_string());
        return (StatusCode::NOT_FOUND, format!("{}\n", err)).into_response();
    };

    GroupStats::bump(&group.stats.server_requests);

    match group.load_local(key).await {
        Ok(value) => (StatusCode::OK, value).into_response(),
        Err(e) => {
            tracing::error!("Failed to serve {:?} from group {}: {}", key, group_name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)).into_response()
        }
    }
}
