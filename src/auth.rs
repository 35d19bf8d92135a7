//! Password hashing and token signing capabilities.
//!
//! Services depend on the traits only, so tests can swap in cheap fakes.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier,
  password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{
  DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::prelude::*;

pub trait PasswordHasher: Send + Sync {
  fn hash(&self, password: &str) -> Result<String>;

  fn verify(&self, password: &str, digest: &str) -> bool;
}

async fn blocking<T, F>(work: F) -> Result<T>
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  task::spawn_blocking(work)
    .await
    .map_err(|err| Error::Internal(format!("Password task failed: {err}")))
}

/// [`PasswordHasher::hash`] on the blocking pool
pub async fn hash_password(
  hasher: Arc<dyn PasswordHasher>,
  password: &str,
) -> Result<String> {
  let password = password.to_owned();
  blocking(move || hasher.hash(&password)).await?
}

/// [`PasswordHasher::verify`] on the blocking pool
pub async fn verify_password(
  hasher: Arc<dyn PasswordHasher>,
  password: &str,
  digest: &str,
) -> Result<bool> {
  let (password, digest) = (password.to_owned(), digest.to_owned());
  blocking(move || hasher.verify(&password, &digest)).await
}

/// Argon2id with a random salt, stored as a PHC string
#[derive(Default)]
pub struct Argon;

impl PasswordHasher for Argon {
  fn hash(&self, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|hash| hash.to_string())
      .map_err(|err| Error::Internal(format!("Failed to hash password: {err}")))
  }

  fn verify(&self, password: &str, digest: &str) -> bool {
    let Ok(hash) = PasswordHash::new(digest) else {
      warn!("Stored password digest is malformed");
      return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  #[serde(rename = "userId")]
  pub user_id: Uuid,
  pub iat: i64,
  pub exp: i64,
}

pub trait TokenService: Send + Sync {
  fn sign(&self, user_id: Uuid) -> Result<String>;

  /// Fails with [`Error::InvalidToken`] on bad signature, expiry or garbage
  fn verify(&self, token: &str) -> Result<Claims>;
}

/// HS256 bearer tokens
pub struct Jwt {
  encoding: EncodingKey,
  decoding: DecodingKey,
  validation: Validation,
  ttl: Duration,
}

impl Jwt {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    let mut validation = Validation::default();
    validation.leeway = 0;

    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    }
  }
}

impl TokenService for Jwt {
  fn sign(&self, user_id: Uuid) -> Result<String> {
    let now = Utc::now();
    let ttl = TimeDelta::from_std(self.ttl)
      .map_err(|err| Error::Internal(format!("Invalid token ttl: {err}")))?;
    let claims = Claims {
      user_id,
      iat: now.timestamp(),
      exp: (now + ttl).timestamp(),
    };

    encode(&Header::default(), &claims, &self.encoding)
      .map_err(|err| Error::Internal(format!("Failed to sign token: {err}")))
  }

  fn verify(&self, token: &str) -> Result<Claims> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|err| {
        debug!("Token rejected: {err}");
        Error::InvalidToken
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &[u8] = b"test-secret";

  #[test]
  fn test_argon_verifies_only_original_password() {
    let digest = Argon.hash("hunter2").unwrap();

    assert!(digest.starts_with("$argon2"));
    assert!(Argon.verify("hunter2", &digest));
    assert!(!Argon.verify("hunter3", &digest));
    assert!(!Argon.verify("hunter2", "not-a-digest"));
  }

  struct Slow;

  impl PasswordHasher for Slow {
    fn hash(&self, password: &str) -> Result<String> {
      std::thread::sleep(Duration::from_millis(200));
      Ok(password.to_owned())
    }

    fn verify(&self, _: &str, _: &str) -> bool {
      panic!("hasher crashed")
    }
  }

  #[tokio::test]
  async fn test_hashing_leaves_runtime_free() {
    let hashing = hash_password(Arc::new(Slow), "pw");

    tokio::select! {
      biased;
      _ = time::sleep(Duration::from_millis(20)) => {}
      _ = hashing => panic!("hashing blocked the runtime thread"),
    }
  }

  #[tokio::test]
  async fn test_crashed_hasher_is_internal_error() {
    let result = verify_password(Arc::new(Slow), "pw", "digest").await;

    assert!(matches!(result, Err(Error::Internal(_))));
  }

  #[tokio::test]
  async fn test_blocking_adapters_use_hasher() {
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon);

    let digest = hash_password(hasher.clone(), "hunter2").await.unwrap();

    assert!(verify_password(hasher.clone(), "hunter2", &digest).await.unwrap());
    assert!(!verify_password(hasher, "hunter3", &digest).await.unwrap());
  }

  #[test]
  fn test_token_carries_subject_and_day_expiry() {
    let jwt = Jwt::new(SECRET, Duration::from_secs(24 * 3600));
    let user_id = Uuid::new_v4();

    let claims = jwt.verify(&jwt.sign(user_id).unwrap()).unwrap();

    assert_eq!(claims.user_id, user_id);
    assert_eq!(claims.exp - claims.iat, 24 * 3600);
  }

  #[test]
  fn test_token_from_other_secret_rejected() {
    let ours = Jwt::new(SECRET, Duration::from_secs(60));
    let theirs = Jwt::new(b"other-secret", Duration::from_secs(60));

    let token = theirs.sign(Uuid::new_v4()).unwrap();

    assert!(matches!(ours.verify(&token), Err(Error::InvalidToken)));
    assert!(matches!(ours.verify("garbage"), Err(Error::InvalidToken)));
  }

  #[test]
  fn test_expired_token_rejected() {
    let jwt = Jwt::new(SECRET, Duration::from_secs(60));
    let now = Utc::now().timestamp();
    let claims = Claims {
      user_id: Uuid::new_v4(),
      iat: now - 7200,
      exp: now - 3600,
    };
    let token =
      encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET))
        .unwrap();

    assert!(matches!(jwt.verify(&token), Err(Error::InvalidToken)));
  }
}
