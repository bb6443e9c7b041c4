use crate::transform::DeviceCommand;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SIMULATION_DELAY: Duration = Duration::from_secs(1);

/// Outcome of one delivery attempt to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardResult {
    /// The board answered 200; this is its JSON body.
    Delivered(Value),
    /// The board answered with any status other than 200.
    Rejected { status: StatusCode },
    /// The board could not be reached, so the command was acknowledged locally.
    Simulated { processed_points: usize },
}

impl ForwardResult {
    /// The `board_response` object reported back to the client.
    pub fn to_json(&self) -> Value {
        match self {
            ForwardResult::Delivered(body) => body.clone(),
            ForwardResult::Rejected { status } => json!({
                "success": false,
                "error": format!("HTTP {}", status.as_u16()),
            }),
            ForwardResult::Simulated { processed_points } => json!({
                "success": true,
                "message": "Running in simulation mode",
                "processed_points": processed_points,
                "mode": "simulation",
            }),
        }
    }
}

/// Builds the board base URL from a bare host or `host:port`.
pub fn device_url_for(ip_address: &str) -> String {
    format!("http://{}", ip_address)
}

pub fn move_url(device_url: &str) -> String {
    format!("{}/api/move", device_url)
}

// Sends commands to the board over HTTP, one attempt each.
#[derive(Debug, Clone)]
pub struct DeviceForwarder {
    client: Client,
    timeout: Duration,
    simulation_delay: Duration,
}

impl Default for DeviceForwarder {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_SIMULATION_DELAY)
    }
}

impl DeviceForwarder {
    pub fn new(timeout: Duration, simulation_delay: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
            simulation_delay,
        }
    }

    /// Posts `command` to `{device_url}/api/move`.
    ///
    /// Never fails: any status other than 200 is reported as `Rejected`, and a
    /// connection error, timeout or unreadable 200 body falls back to
    /// `Simulated` after the simulation delay.
    pub async fn forward(&self, command: &DeviceCommand, device_url: &str) -> ForwardResult {
        info!("Sending path to board at {}", device_url);

        match self.try_send(command, device_url).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Could not reach board, running in simulation mode: {}", e);
                tokio::time::sleep(self.simulation_delay).await;
                ForwardResult::Simulated {
                    processed_points: command.points.len(),
                }
            }
        }
    }

    async fn try_send(
        &self,
        command: &DeviceCommand,
        device_url: &str,
    ) -> Result<ForwardResult, reqwest::Error> {
        let response = self
            .client
            .post(move_url(device_url))
            .json(command)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            let body = response.json::<Value>().await?;
            info!("Board accepted {} points", command.total_points);
            Ok(ForwardResult::Delivered(body))
        } else {
            warn!("Board returned an error response: {}", status);
            Ok(ForwardResult::Rejected { status })
        }
    }
}
