//! Shot Tracker - shooting practice backend
//!
//! Architecture:
//! - SeaORM for database access (SQLite or Postgres)
//! - Axum for the HTTP API with CORS and rate limiting
//! - Argon2 digests and JWT bearer tokens for accounts
//! - Tokio for async runtime

mod auth;
mod config;
mod entity;
mod error;
mod prelude;
mod server;
mod state;
mod sv;
#[cfg(test)]
mod testing;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "shot_tracker=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;

  info!("Starting Shot Tracker v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config).await?);

  let served = server::serve(app.clone()).await;
  app.close().await?;
  served
}
