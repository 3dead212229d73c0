//! Connection statistics

use serde::Serialize;

/// Transport-level connection statistics
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub max_connections: usize,
}
