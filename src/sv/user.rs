use serde::Serialize;

use crate::{
  auth::{self, PasswordHasher, TokenService},
  entity::user,
  prelude::*,
};

/// Public view of a user, never carries the digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
  pub id: Uuid,
  pub name: String,
  pub email: String,
}

impl From<user::Model> for Profile {
  fn from(user: user::Model) -> Self {
    Self { id: user.id, name: user.name, email: user.email }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
  pub token: String,
  pub user: Profile,
}

pub struct User<'a> {
  db: &'a DatabaseConnection,
  hasher: Arc<dyn PasswordHasher>,
  tokens: &'a dyn TokenService,
}

impl<'a> User<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    hasher: Arc<dyn PasswordHasher>,
    tokens: &'a dyn TokenService,
  ) -> Self {
    Self { db, hasher, tokens }
  }

  pub async fn by_email(&self, email: &str) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::Email.eq(email))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn register(
    &self,
    name: &str,
    email: &str,
    password: &str,
  ) -> Result<Profile> {
    if name.is_empty() || email.is_empty() || password.is_empty() {
      return Err(Error::invalid("Name, email, and password are required."));
    }

    if self.by_email(email).await?.is_some() {
      return Err(Error::EmailTaken);
    }

    let digest = auth::hash_password(self.hasher.clone(), password).await?;
    let user = user::ActiveModel {
      id: Set(Uuid::new_v4()),
      name: Set(name.to_owned()),
      email: Set(email.to_owned()),
      password: Set(digest),
      created_at: Set(Utc::now()),
    }
    .insert(self.db)
    .await
    .map_err(Error::unique)?;

    info!(user_id = %user.id, "User registered");
    Ok(user.into())
  }

  pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
    let user =
      self.by_email(email).await?.ok_or(Credentials::UnknownEmail)?;

    let verified =
      auth::verify_password(self.hasher.clone(), password, &user.password)
        .await?;
    if !verified {
      warn!(user_id = %user.id, "Login with wrong password");
      return Err(Credentials::Mismatch.into());
    }

    let token = self.tokens.sign(user.id)?;
    Ok(Session { token, user: user.into() })
  }

  pub async fn all(&self) -> Result<Vec<Profile>> {
    let users = user::Entity::find()
      .order_by_asc(user::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(users.into_iter().map(Profile::from).collect())
  }

  /// Checks that `bearer` is a valid token issued to the user `id`
  pub fn authorize(&self, id: &str, bearer: Option<&str>) -> Result<Uuid> {
    let token = bearer.ok_or(Error::Unauthorized)?;
    let claims = self.tokens.verify(token)?;

    if claims.user_id.to_string() != id {
      return Err(Error::Forbidden);
    }
    Ok(claims.user_id)
  }

  pub async fn profile(
    &self,
    id: &str,
    bearer: Option<&str>,
  ) -> Result<Profile> {
    let id = self.authorize(id, bearer)?;

    let user = user::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;
    Ok(user.into())
  }

  /// Updates an account whose ownership [`User::authorize`] has confirmed
  pub async fn update(
    &self,
    id: Uuid,
    name: &str,
    email: &str,
  ) -> Result<Profile> {
    if name.is_empty() || email.is_empty() {
      return Err(Error::invalid("Name and email are required"));
    }

    if let Some(other) = self.by_email(email).await?
      && other.id != id
    {
      return Err(Error::EmailTaken);
    }

    let user = user::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;

    let user = user::ActiveModel {
      name: Set(name.to_owned()),
      email: Set(email.to_owned()),
      ..user.into()
    }
    .update(self.db)
    .await
    .map_err(Error::unique)?;

    info!(user_id = %user.id, "Profile updated");
    Ok(user.into())
  }
}
