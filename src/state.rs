use migration::{Migrator, MigratorTrait};

use crate::{
  auth::{Argon, Jwt, PasswordHasher, TokenService},
  config::Config,
  prelude::*,
  sv,
};

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub performance: sv::Performance<'a>,
  pub stats: sv::Stats<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub hasher: Arc<dyn PasswordHasher>,
  pub tokens: Arc<dyn TokenService>,
}

impl AppState {
  /// Connects and migrates the database. Any failure here is fatal
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    anyhow::ensure!(!config.jwt_secret.is_empty(), "JWT secret is empty");

    info!("Connecting to database...");
    let db = Database::connect(config.database_url.as_str())
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    let tokens = Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl);
    Ok(Self::with_parts(db, config, Arc::new(Argon), Arc::new(tokens)))
  }

  pub fn with_parts(
    db: DatabaseConnection,
    config: Config,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
  ) -> Self {
    Self { db, config, hasher, tokens }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db, self.hasher.clone(), &*self.tokens),
      performance: sv::Performance::new(&self.db, self.config.stats_offset),
      stats: sv::Stats::new(&self.db, self.config.query_timeout),
    }
  }

  /// Stats boundaries are placed in the configured offset
  pub fn now(&self) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&self.config.stats_offset)
  }

  pub async fn close(&self) -> anyhow::Result<()> {
    info!("Closing database connection...");
    self.db.clone().close().await.context("Failed to close database")
  }
}
