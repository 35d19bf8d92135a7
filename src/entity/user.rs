use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::performance;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub name: String,
  #[sea_orm(unique)]
  pub email: String,
  /// argon2 digest
  #[serde(skip_serializing)]
  pub password: String,
  pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "performance::Entity")]
  Performances,
}

impl Related<performance::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Performances.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
