//! rides-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the ride API over HTTP while sweeping scheduled
//! rides in the background.
//!
//! # Setting up a zone
//!
//! ```
//! rides-server add-zone "Wake County" --latitude 35.78 --longitude -78.64 --radius 20
//! rides-server add-user "Dana Driver" --phone 919-555-0100
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rides_core::{RideService, geo::LatLng};
use rides_server::{ServerConfig, expand_tilde, tasks};
use rides_store_sqlite::{NewZone, SqliteStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Ride lifecycle server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API and run the periodic sweep (the default).
  Serve,
  /// Run one sweep of scheduled rides and exit.
  Sweep,
  /// Register a ride zone and print its id.
  AddZone {
    name:      String,
    #[arg(long, allow_hyphen_values = true)]
    latitude:  f64,
    #[arg(long, allow_hyphen_values = true)]
    longitude: f64,
    /// Pickup radius in miles.
    #[arg(long)]
    radius:    f64,
    #[arg(long, default_value = "America/New_York")]
    time_zone: String,
  },
  /// Register a driver or voter and print their id.
  AddUser {
    name:  String,
    #[arg(long)]
    phone: Option<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let server_cfg =
    ServerConfig::load(&cli.config).context("failed to load server configuration")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::Sweep => {
      let service = RideService::new(store.clone(), store.clone(), store);
      let report = service.run_sweep().await;
      println!("{}", serde_json::to_string(&report)?);
      Ok(())
    }
    Command::AddZone { name, latitude, longitude, radius, time_zone } => {
      let center = LatLng::new(latitude, longitude);
      anyhow::ensure!(center.is_finite(), "zone centre must be finite");
      anyhow::ensure!(radius.is_finite() && radius >= 0.0, "radius must be non-negative");
      let zone = store
        .add_zone(NewZone { name, center, pickup_radius: radius, time_zone })
        .await
        .context("failed to add zone")?;
      println!("{}", zone.zone_id);
      Ok(())
    }
    Command::AddUser { name, phone } => {
      let user = store.add_user(name, phone).await.context("failed to add user")?;
      println!("{}", user.user_id);
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let events = store.events().subscribe();
  let service = Arc::new(RideService::new(store.clone(), store.clone(), store));

  tokio::spawn(tasks::log_zone_events(events));
  let _sweeper = tasks::spawn_sweeper(service.clone(), server_cfg.sweep_interval_secs);

  let app = rides_server::app(service);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
