use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
  prelude::*,
  state::AppState,
  sv::user::{Profile, Session},
};

#[derive(Debug, Deserialize)]
pub struct RegisterReq {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReq {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
}

/// Token from `Authorization: Bearer <token>`
fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|token| !token.is_empty())
}

pub async fn register(
  State(app): State<Arc<AppState>>,
  payload: Result<Json<RegisterReq>, JsonRejection>,
) -> Result<(StatusCode, Json<Profile>), Response> {
  let Json(req) = payload.map_err(|err| Error::from(err).into_response())?;

  app
    .sv()
    .user
    .register(&req.name, &req.email, &req.password)
    .await
    .map(|profile| (StatusCode::CREATED, Json(profile)))
    .map_err(|err| err.echoed("Error registering user."))
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  payload: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<Session>> {
  let Json(req) = payload?;
  Ok(Json(app.sv().user.login(&req.email, &req.password).await?))
}

pub async fn users(
  State(app): State<Arc<AppState>>,
) -> Result<Json<Vec<Profile>>> {
  Ok(Json(app.sv().user.all().await?))
}

pub async fn profile(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  path: Result<Path<String>, PathRejection>,
) -> Result<Json<Profile>> {
  let Path(id) = path?;
  Ok(Json(app.sv().user.profile(&id, bearer(&headers)).await?))
}

pub async fn update(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  path: Result<Path<String>, PathRejection>,
  payload: Result<Json<UpdateReq>, JsonRejection>,
) -> Result<Json<Profile>> {
  let Path(id) = path?;
  let sv = app.sv().user;
  // auth failures win over a malformed body
  let id = sv.authorize(&id, bearer(&headers))?;
  let Json(req) = payload?;

  Ok(Json(sv.update(id, &req.name, &req.email).await?))
}
