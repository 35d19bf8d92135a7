use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
  http::StatusCode,
};

use crate::{
  entity::performance,
  prelude::*,
  state::AppState,
  sv::{performance::NewRecord, stats::Improvement},
};

pub async fn add(
  State(app): State<Arc<AppState>>,
  payload: Result<Json<NewRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<performance::Model>)> {
  let Json(record) = payload?;
  let model = app.sv().performance.add(record).await?;
  Ok((StatusCode::CREATED, Json(model)))
}

pub async fn sessions(
  State(app): State<Arc<AppState>>,
  path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<performance::Model>>> {
  let Path(user_id) = path?;
  Ok(Json(app.sv().performance.by_user(user_id).await?))
}

pub async fn improvement(
  State(app): State<Arc<AppState>>,
  path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Improvement>> {
  let Path(user_id) = path?;
  Ok(Json(app.sv().stats.improvement(user_id, app.now()).await?))
}
