use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_charge_points::ChargePoints;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Evses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Evses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Evses::ChargePointId).string().not_null())
                    .col(ColumnDef::new(Evses::ConnectorId).integer().not_null())
                    .col(ColumnDef::new(Evses::ConnectorType).string().not_null().default("Type2"))
                    .col(ColumnDef::new(Evses::Status).string().not_null().default("Available"))
                    .col(ColumnDef::new(Evses::LastErrorCode).string())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Evses::Table, Evses::ChargePointId)
                            .to(ChargePoints::Table, ChargePoints::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_evses_charge_point_connector")
                    .table(Evses::Table)
                    .col(Evses::ChargePointId)
                    .col(Evses::ConnectorId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Evses::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Evses {
    Table,
    Id,
    ChargePointId,
    ConnectorId,
    ConnectorType,
    Status,
    LastErrorCode,
}
