//! Fixtures shared by unit tests

use migration::{Migrator, MigratorTrait};
use sea_orm::ConnectOptions;

use crate::{
  auth::{Jwt, PasswordHasher},
  config::Config,
  prelude::*,
  state::AppState,
};

pub const SECRET: &str = "test-secret";

/// Stores passwords as-is, argon2 is too slow for every test
pub struct Plain;

impl PasswordHasher for Plain {
  fn hash(&self, password: &str) -> Result<String> {
    Ok(format!("plain:{password}"))
  }

  fn verify(&self, password: &str, digest: &str) -> bool {
    digest.strip_prefix("plain:") == Some(password)
  }
}

pub async fn db() -> DatabaseConnection {
  let mut options = ConnectOptions::new("sqlite::memory:");
  options.max_connections(1).min_connections(1).sqlx_logging(false);

  let db = Database::connect(options).await.unwrap();
  Migrator::up(&db, None).await.unwrap();
  db
}

/// Inserts a user and returns its id
pub async fn user(db: &DatabaseConnection, email: &str) -> Uuid {
  let jwt = Jwt::new(SECRET.as_bytes(), Duration::from_secs(60));
  crate::sv::User::new(db, Arc::new(Plain), &jwt)
    .register("Player", email, "pw")
    .await
    .unwrap()
    .id
}

pub fn config() -> Config {
  Config { jwt_secret: String::from(SECRET), ..Config::default() }
}

pub async fn state() -> Arc<AppState> {
  state_with(config()).await
}

pub async fn state_with(config: Config) -> Arc<AppState> {
  let tokens = Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl);
  Arc::new(AppState::with_parts(
    db().await,
    config,
    Arc::new(Plain),
    Arc::new(tokens),
  ))
}
