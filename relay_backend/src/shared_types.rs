use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// A single point of a drawing path, in the caller's canvas space.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

// Body of `POST /api/path`. The client timestamp is accepted but not interpreted.
#[derive(Deserialize, Clone, Debug)]
pub struct PathSubmission {
    pub path: Vec<Point>,
    #[allow(dead_code)]
    pub timestamp: String,
}

// Body of `POST /api/esp32/config`. Fields other than `ip_address` are ignored.
#[derive(Deserialize, Clone, Default, Debug)]
pub struct DeviceConfig {
    pub ip_address: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub points_received: usize,
    pub board_response: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub status: String,
    pub current_path_points: usize,
    pub esp32_url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct CurrentPathResponse {
    pub path: Vec<Point>,
    pub points_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct ConfigResponse {
    pub success: bool,
    pub esp32_url: String,
    pub message: String,
}
