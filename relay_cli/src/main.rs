use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spinners::{Spinner, Spinners};
use std::io::{self, Read}; // Import Read for stdin
use std::path::PathBuf;

// The default base URL of the relay API.
const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// A CLI for sending drawings to a board through the relay.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the relay server.
    #[arg(long, env = "RELAY_API_URL", default_value = DEFAULT_API_URL)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a path to the board.
    /// Example: cat star.json | relay send
    Send {
        /// JSON file with an array of {"x", "y"} points (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Show the relay status.
    Status,
    /// Show the path the relay received last.
    Current,
    /// Point the relay at a different board.
    Configure {
        /// Board IP address, optionally with a port (e.g. 10.0.0.5 or 10.0.0.5:8080)
        ip_address: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
struct Point {
    x: f64,
    y: f64,
}

// Input files may hold a bare array or a saved submission.
#[derive(Deserialize)]
#[serde(untagged)]
enum PathInput {
    Points(Vec<Point>),
    Submission { path: Vec<Point> },
}

#[derive(Serialize, Debug)]
struct PathSubmission {
    path: Vec<Point>,
    timestamp: String,
}

#[derive(Serialize, Debug)]
struct DeviceConfig {
    ip_address: String,
}

#[derive(Deserialize, Debug)]
struct SubmitResponse {
    points_received: usize,
    board_response: Value,
}

#[derive(Deserialize, Debug)]
struct StatusResponse {
    status: String,
    current_path_points: usize,
    esp32_url: String,
    timestamp: String,
}

#[derive(Deserialize, Debug)]
struct CurrentPathResponse {
    path: Vec<Point>,
    points_count: usize,
}

#[derive(Deserialize, Debug)]
struct ConfigResponse {
    esp32_url: String,
}

fn parse_points(input: &str) -> Result<Vec<Point>, serde_json::Error> {
    match serde_json::from_str(input)? {
        PathInput::Points(points) => Ok(points),
        PathInput::Submission { path } => Ok(path),
    }
}

fn api_url(server: &str, endpoint: &str) -> String {
    format!("{}{}", server.trim_end_matches('/'), endpoint)
}

// One-line summary of what the board (or the simulator) reported.
fn describe_board_response(response: &Value) -> String {
    let success = response["success"].as_bool().unwrap_or(false);
    match (success, response["mode"].as_str()) {
        (true, Some("simulation")) => format!(
            "simulated ({} points processed)",
            response["processed_points"]
        ),
        (true, _) => "accepted by board".to_string(),
        (false, _) => format!(
            "rejected by board ({})",
            response["error"].as_str().unwrap_or("unknown error")
        ),
    }
}

// Shown next to the spinner while the command's request is in flight.
fn progress_message(command: &Commands) -> &'static str {
    match command {
        Commands::Send { .. } => "Sending path to the relay...",
        Commands::Status => "Checking relay status...",
        Commands::Current => "Fetching the current path...",
        Commands::Configure { .. } => "Updating the board address...",
    }
}

fn status_table(status: &StatusResponse) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Status", "Path points", "Board URL", "Checked at"]);
    table.add_row(vec![
        status.status.clone(),
        status.current_path_points.to_string(),
        status.esp32_url.clone(),
        status.timestamp.clone(),
    ]);
    table
}

fn path_table(path: &[Point]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "x", "y"]);
    for (i, point) in path.iter().enumerate() {
        table.add_row(vec![i.to_string(), point.x.to_string(), point.y.to_string()]);
    }
    table
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Send { ref file } => {
            let input = match file {
                Some(file) => tokio::fs::read_to_string(file).await?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let path = parse_points(&input)?;

            let mut sp = Spinner::new(Spinners::Dots9, progress_message(&cli.command).into());

            let submission = PathSubmission {
                path,
                timestamp: Utc::now().to_rfc3339(),
            };
            let response = client
                .post(api_url(&cli.server, "/api/path"))
                .json(&submission)
                .send()
                .await;

            match response {
                Ok(res) => {
                    if res.status().is_success() {
                        let result = res.json::<SubmitResponse>().await?;
                        sp.stop_with_message("✓ Path sent!".into());
                        println!("Points received: {}", result.points_received);
                        println!(
                            "Board:           {}",
                            describe_board_response(&result.board_response)
                        );
                    } else {
                        sp.stop_with_message(
                            format!("✗ Error: Failed to send path (Status: {})", res.status())
                                .into(),
                        );
                    }
                }
                Err(e) => {
                    sp.stop_with_message(
                        format!("✗ Error: Could not connect to the relay: {}", e).into(),
                    );
                }
            }
        }
        Commands::Status => {
            let mut sp = Spinner::new(Spinners::Dots9, progress_message(&cli.command).into());

            let response = client.get(api_url(&cli.server, "/api/status")).send().await;

            match response {
                Ok(res) => {
                    if res.status().is_success() {
                        let status = res.json::<StatusResponse>().await?;
                        sp.stop_with_message("✓ Relay is up".into());
                        println!("{}", status_table(&status));
                    } else {
                        sp.stop_with_message(
                            format!("✗ Error: Failed to read status (Status: {})", res.status())
                                .into(),
                        );
                    }
                }
                Err(e) => {
                    sp.stop_with_message(
                        format!("✗ Error: Could not connect to the relay: {}", e).into(),
                    );
                }
            }
        }
        Commands::Current => {
            let mut sp = Spinner::new(Spinners::Dots9, progress_message(&cli.command).into());

            let response = client
                .get(api_url(&cli.server, "/api/path/current"))
                .send()
                .await;

            match response {
                Ok(res) => {
                    if res.status().is_success() {
                        let current = res.json::<CurrentPathResponse>().await?;
                        if current.points_count == 0 {
                            sp.stop_with_message("No path received yet.".into());
                        } else {
                            sp.stop_with_message(format!("✓ {} points", current.points_count));
                            println!("{}", path_table(&current.path));
                        }
                    } else {
                        sp.stop_with_message(
                            format!("✗ Error: Failed to read path (Status: {})", res.status())
                                .into(),
                        );
                    }
                }
                Err(e) => {
                    sp.stop_with_message(
                        format!("✗ Error: Could not connect to the relay: {}", e).into(),
                    );
                }
            }
        }
        Commands::Configure { ref ip_address } => {
            let mut sp = Spinner::new(Spinners::Dots9, progress_message(&cli.command).into());

            let response = client
                .post(api_url(&cli.server, "/api/esp32/config"))
                .json(&DeviceConfig {
                    ip_address: ip_address.clone(),
                })
                .send()
                .await;

            match response {
                Ok(res) => {
                    if res.status().is_success() {
                        let config = res.json::<ConfigResponse>().await?;
                        sp.stop_with_message(format!("✓ Relay now targets {}", config.esp32_url));
                    } else {
                        sp.stop_with_message(format!(
                            "✗ Error: Failed to update configuration (Status: {})",
                            res.status()
                        ));
                    }
                }
                Err(e) => {
                    sp.stop_with_message(
                        format!("✗ Error: Could not connect to the relay: {}", e).into(),
                    );
                }
            }
        }
    }

    Ok(())
}
