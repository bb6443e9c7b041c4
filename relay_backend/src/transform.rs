use crate::shared_types::Point;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Paths longer than this are decimated before being sent to the board.
pub const DECIMATION_THRESHOLD: usize = 50;
/// Keep every Nth point of a decimated path.
pub const DECIMATION_STRIDE: usize = 10;
/// Movement speed sent with every command (board scale 0-100).
pub const DEFAULT_SPEED: u32 = 50;

pub const CANVAS_SIZE: CanvasSize = CanvasSize {
    width: 800.0,
    height: 600.0,
};
pub const DEVICE_SIZE: DeviceSize = DeviceSize {
    width: 100,
    height: 100,
};

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeviceSize {
    pub width: u32,
    pub height: u32,
}

// A point on the board's integer grid.
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct DevicePoint {
    pub x: i64,
    pub y: i64,
}

// The JSON command posted to the board's `/api/move` endpoint.
#[derive(Serialize, Clone, Debug)]
pub struct DeviceCommand {
    pub command: &'static str,
    pub points: Vec<DevicePoint>,
    pub total_points: usize,
    pub speed: u32,
    pub timestamp: DateTime<Utc>,
}

/// Maps a canvas path onto the board grid and thins it out.
///
/// Coordinates are scaled linearly and floored. Nothing is clamped: a point on
/// or past the canvas edge lands on or past the board edge, so `(800, 600)` on
/// an 800x600 canvas becomes `(100, 100)` on a 100x100 board.
pub fn transform(path: &[Point], canvas: CanvasSize, device: DeviceSize) -> DeviceCommand {
    let scaled = path.iter().map(|point| DevicePoint {
        x: scale(point.x, canvas.width, device.width),
        y: scale(point.y, canvas.height, device.height),
    });

    let points: Vec<DevicePoint> = if path.len() > DECIMATION_THRESHOLD {
        scaled.step_by(DECIMATION_STRIDE).collect()
    } else {
        scaled.collect()
    };

    DeviceCommand {
        command: "move_path",
        total_points: points.len(),
        points,
        speed: DEFAULT_SPEED,
        timestamp: Utc::now(),
    }
}

fn scale(value: f64, canvas_extent: f64, device_extent: u32) -> i64 {
    (value / canvas_extent * f64::from(device_extent)).floor() as i64
}
