use crate::{
    forwarder::{DeviceForwarder, ForwardResult, device_url_for},
    shared_types::{DeviceConfig, Point},
    transform::{self, CanvasSize, DeviceSize},
};
use tokio::sync::RwLock;
use tracing::info;

/// What a single path submission produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub points_received: usize,
    pub board: ForwardResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub current_path_points: usize,
    pub device_url: String,
}

/// Owns the relay's mutable state: the board address and the last path.
///
/// Both values are replaced wholesale. Concurrent submissions race and the
/// last one to store its path wins.
#[derive(Debug)]
pub struct RelayService {
    device_url: RwLock<String>,
    current_path: RwLock<Vec<Point>>,
    canvas: CanvasSize,
    device: DeviceSize,
    forwarder: DeviceForwarder,
}

impl RelayService {
    pub fn new(device_url: String, forwarder: DeviceForwarder) -> Self {
        Self::with_geometry(
            device_url,
            forwarder,
            transform::CANVAS_SIZE,
            transform::DEVICE_SIZE,
        )
    }

    pub fn with_geometry(
        device_url: String,
        forwarder: DeviceForwarder,
        canvas: CanvasSize,
        device: DeviceSize,
    ) -> Self {
        Self {
            device_url: RwLock::new(device_url),
            current_path: RwLock::new(Vec::new()),
            canvas,
            device,
            forwarder,
        }
    }

    /// Stores `path` as the current path, converts it and sends it to the board.
    pub async fn submit_path(&self, path: Vec<Point>) -> SubmitOutcome {
        let points_received = path.len();
        info!("Received path with {} points", points_received);

        let command = transform::transform(&path, self.canvas, self.device);
        *self.current_path.write().await = path;

        // Read once so a concurrent reconfiguration only affects later submissions.
        let device_url = self.device_url().await;
        let board = self.forwarder.forward(&command, &device_url).await;

        SubmitOutcome {
            points_received,
            board,
        }
    }

    pub async fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            current_path_points: self.current_path.read().await.len(),
            device_url: self.device_url().await,
        }
    }

    pub async fn current_path(&self) -> Vec<Point> {
        self.current_path.read().await.clone()
    }

    pub async fn device_url(&self) -> String {
        self.device_url.read().await.clone()
    }

    /// Applies `config` and returns the board URL now in effect.
    pub async fn update_device(&self, config: DeviceConfig) -> String {
        let mut device_url = self.device_url.write().await;
        if let Some(ip_address) = config.ip_address {
            *device_url = device_url_for(&ip_address);
            info!("Board URL updated: {}", device_url);
        }
        device_url.clone()
    }
}
