//! Headless projection session for a cityIO table
//!
//! Run with: cargo run --features cli --bin projection-cli -- <table>
//!
//! Stdin lines act as key presses: an empty line cycles the overlay, `edit` (or
//! a single space) toggles keystone editing, `z` the view-state editor,
//! `view <field> <value>` edits the camera, `tile <z> <x> <y>` shows where a
//! basemap tile lands, `reset` clears the saved calibration and `frame` prints
//! the current render list as JSON.

use std::rc::Rc;
use std::time::{Duration, Instant};

use cityscope_projection::core::layers::TileCoord;
use cityscope_projection::core::{
    BlobStore, InputEvent, LayerSpec, MemoryBlobStore, Settings, TableName, ViewState,
};
use cityscope_projection::storage::FileBlobStore;
use cityscope_projection::time::seconds_since;
use cityscope_projection::websocket_native::NativeWsClient;
use cityscope_projection::{InputOutcome, Painter, ProjectionSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const TICK: Duration = Duration::from_millis(50);
/// Yield after ~12ms so input stays responsive under message bursts
const BUDGET: Duration = Duration::from_millis(12);

/// Logs what would be painted
#[derive(Default)]
struct LogPainter {
    paints: u64,
}

impl Painter for LogPainter {
    fn paint(&mut self, camera: &ViewState, layers: &[LayerSpec]) {
        self.paints += 1;
        let ids: Vec<&str> = layers.iter().map(LayerSpec::id).collect();
        debug!(
            layers = ?ids,
            lat = camera.latitude,
            lon = camera.longitude,
            zoom = camera.zoom,
            bearing = camera.bearing,
            "paint"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cityscope_projection=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let table = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CITYSCOPE_TABLE").ok());
    let Some(table) = TableName::parse(table.as_deref()) else {
        eprintln!("usage: projection-cli <table>   (or set CITYSCOPE_TABLE)");
        return Err("no table name given".into());
    };

    let settings = Settings::from_env();
    let blobs: Rc<dyn BlobStore> = match FileBlobStore::in_config_dir() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            warn!(error = %e, "No config directory, calibration will not persist");
            Rc::new(MemoryBlobStore::new())
        }
    };

    let mut session = ProjectionSession::new(table.clone(), &settings, blobs);
    let mut client = NativeWsClient::connect(&settings.ws_url, table.clone());
    let mut painter = LogPainter::default();

    let mut message_count = 0u64;
    let mut messages_last_interval = 0u64;
    let mut error_count = 0u64;
    let mut tick = tokio::time::interval(TICK);
    let mut stats_interval = tokio::time::interval(Duration::from_secs(5));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!(table = %table, "Waiting for messages...");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let deadline = Instant::now() + BUDGET;
                let mut changed = false;
                while let Ok(msg) = client.rx.try_recv() {
                    message_count += 1;
                    messages_last_interval += 1;
                    match session.handle_text(&msg) {
                        Ok(change) => changed |= !change.is_empty(),
                        Err(e) => {
                            error_count += 1;
                            warn!(error = %e, "Dropping message");
                        }
                    }
                    if Instant::now() >= deadline {
                        break;
                    }
                }
                if changed {
                    session.render(&mut painter);
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if handle_command(&mut session, &mut painter, line.trim_end_matches('\r')) {
                            info!("Reconnecting after reset");
                            drop(client);
                            client = NativeWsClient::connect(&settings.ws_url, table.clone());
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed, input disabled");
                        stdin_open = false;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read stdin");
                        stdin_open = false;
                    }
                }
            }
            _ = stats_interval.tick() => {
                info!(
                    ws = %client.state(),
                    messages = message_count,
                    "/sec" = format!("{:.1}", messages_last_interval as f64 / 5.0),
                    errors = error_count,
                    paints = painter.paints,
                    status = ?session.status(),
                    idle_secs = ?session.last_update().map(|t| format!("{:.1}", seconds_since(t))),
                    "stats"
                );
                messages_last_interval = 0;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Apply one stdin line. Returns true when the transport must reconnect.
fn handle_command(session: &mut ProjectionSession, painter: &mut LogPainter, line: &str) -> bool {
    let event = match line {
        "" => InputEvent::AdvanceLayer,
        " " | "edit" => InputEvent::ToggleEditMode,
        "z" => InputEvent::ToggleViewStateEditor,
        "reset" => InputEvent::Reset,
        "frame" => {
            match session.frame().map(serde_json::to_string_pretty) {
                Some(Ok(json)) => println!("{json}"),
                Some(Err(e)) => error!(error = %e, "Failed to encode frame"),
                None => info!("No frame yet"),
            }
            return false;
        }
        other => {
            if let Some(rest) = other.strip_prefix("view ") {
                edit_view(session, painter, rest);
            } else if let Some(rest) = other.strip_prefix("tile ") {
                print_tile(session, rest);
            } else {
                warn!(command = other, "Unknown command");
            }
            return false;
        }
    };

    match session.handle_input(event) {
        InputOutcome::Unchanged => false,
        InputOutcome::Redraw => {
            if let Some(surface) = session.surface() {
                debug!(?surface, "Surface");
            }
            session.render(painter);
            false
        }
        InputOutcome::Restart => true,
    }
}

fn print_tile(session: &ProjectionSession, args: &str) {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let coord = match parts.as_slice() {
        [z, x, y] => match (z.parse(), x.parse(), y.parse()) {
            (Ok(z), Ok(x), Ok(y)) => TileCoord { z, x, y },
            _ => {
                warn!(args, "Tile coordinates must be integers");
                return;
            }
        },
        _ => {
            warn!("usage: tile <z> <x> <y>");
            return;
        }
    };
    match session.tile_bitmap(coord) {
        Some(bitmap) => info!(url = %bitmap.url, bounds = ?bitmap.bounds, "Tile"),
        None => info!("No frame yet"),
    }
}

fn edit_view(session: &mut ProjectionSession, painter: &mut LogPainter, args: &str) {
    let mut parts = args.split_whitespace();
    let (Some(field), Some(value)) = (parts.next(), parts.next()) else {
        warn!("usage: view <field> <value>");
        return;
    };
    let value: f64 = match value.parse() {
        Ok(v) => v,
        Err(e) => {
            warn!(value, error = %e, "Not a number");
            return;
        }
    };
    match session.edit_view_field(field, value) {
        Ok(Some(pose)) => {
            info!(?pose, "View state updated");
            session.render(painter);
        }
        Ok(None) => info!("View state editor is hidden, press z first"),
        Err(e) => warn!(error = %e, "Rejected view state edit"),
    }
}
