mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::{Catalog, HttpTransport, Registry};
use crate::cache::CacheStore;
use crate::query::QueryClient;

#[derive(Parser, Debug)]
#[command(name = "booknest")]
#[command(about = "A terminal client for the BookNest library catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/booknest/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the catalog API, e.g. http://localhost:5000/api
  #[arg(short, long, value_parser = parse_url)]
  api_url: Option<String>,
}

fn parse_url(raw: &str) -> Result<String, String> {
  config::parse_api_url(raw)
    .map(|_| raw.to_string())
    .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.url = url;
  }

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init(&config.log, &config.log_dir())?;

  let api_url = config.api_url()?;
  info!("Starting booknest against {}", api_url);

  let registry = Registry::catalog()?;
  let store = CacheStore::new(config.keep_unused());
  let transport = HttpTransport::new(api_url.clone(), config.timeout())
    .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;
  let client = QueryClient::new(Arc::new(registry), Arc::new(store), Arc::new(transport));

  let title = config.title.clone().unwrap_or_else(|| "BookNest".to_string());
  let mut app = app::App::new(
    Catalog::new(client),
    config.page_size.0,
    title,
    api_url.to_string(),
  );
  app.run().await?;

  Ok(())
}
