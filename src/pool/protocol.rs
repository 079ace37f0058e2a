//! Cache Pool Network Protocol
//!
//! Peers fetch values from each other with a plain `GET` on
//! `{peer}/{base_path}/{group}/{key}`. The response body is the raw value.
//! A 404 means the peer does not know the group; 500 means its load failed.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Path prefix under which a pool answers peer fetches.
pub const DEFAULT_BASE_PATH: &str = "_pool";
/// Public endpoint for client reads (`?key=`).
pub const ENDPOINT_GET: &str = "/get/";
/// Public endpoint exposing group counters.
pub const ENDPOINT_STATS: &str = "/stats/";

/// Route pattern for peer fetches under `base_path`.
pub fn fetch_route(base_path: &str) -> String {
    let base_path = base_path.trim_matches('/');
    if base_path.is_empty() {
        "/:group/:key".to_string()
    } else {
        format!("/{}/:group/:key", base_path)
    }
}

// --- Data Transfer Objects ---

/// Counters of a single cache group, as served by the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub group: String,
    /// Every `get` request, hit or miss.
    pub gets: u64,
    pub cache_hits: u64,
    /// Values obtained from the owning peer.
    pub peer_loads: u64,
    pub peer_errors: u64,
    /// Misses that needed a peer fetch or a local load.
    pub loads: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
    /// Fetches answered on behalf of other peers.
    pub server_requests: u64,
    pub cached_items: usize,
    pub cached_bytes: usize,
}
