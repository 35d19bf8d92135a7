use sea_orm_migration::prelude::*;

use super::m20261018_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Performances::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Performances::Id).uuid().not_null().primary_key(),
          )
          .col(ColumnDef::new(Performances::UserId).uuid().not_null())
          .col(
            ColumnDef::new(Performances::ShotsMade)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Performances::ShotsAttempted)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Performances::Date)
              .timestamp_with_time_zone()
              .not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_performances_user")
              .from(Performances::Table, Performances::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_performances_user_date")
          .table(Performances::Table)
          .col(Performances::UserId)
          .col(Performances::Date)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Performances::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Performances {
  Table,
  Id,
  UserId,
  ShotsMade,
  ShotsAttempted,
  Date,
}
