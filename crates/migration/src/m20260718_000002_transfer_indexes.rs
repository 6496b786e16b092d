//! Indexes for the hot transfer queries: per-user history (newest first)
//! and pending-deposit lookup by reference.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transfers {
    Table,
    UserId,
    Reference,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-user_id-created_at")
                    .table(Transfers::Table)
                    .col(Transfers::UserId)
                    .col(Transfers::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-reference")
                    .table(Transfers::Table)
                    .col(Transfers::Reference)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx-transfers-reference")
                    .table(Transfers::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx-transfers-user_id-created_at")
                    .table(Transfers::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
