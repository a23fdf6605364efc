use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Up,
    Down,
}

/// `GET /health` body. Always served, the database field reports degradation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Seconds since the server started.
    pub uptime: f64,
    pub status: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub database: DatabaseStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub users_total: i64,
    pub timestamp: i64,
}
