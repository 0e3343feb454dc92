use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct RepositoryResponse {
    pub full_name: String,
    pub tracked: bool,
}

#[derive(Serialize, Deserialize)]
pub struct SyncResponse {
    pub repository: String,
    pub fetched: usize,
    pub linked: usize,
    pub pruned: usize,
}
