use sea_orm_migration::prelude::*;

use super::m20240101_000004_create_charging_sessions::ChargingSessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::SessionId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::ChargePointId).string().not_null())
                    .col(ColumnDef::new(Orders::EnergyKwh).double().not_null())
                    .col(ColumnDef::new(Orders::PricePerKwh).double().not_null())
                    .col(ColumnDef::new(Orders::Cost).double().not_null())
                    .col(ColumnDef::new(Orders::Currency).string().not_null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Orders::Table, Orders::SessionId)
                            .to(ChargingSessions::Table, ChargingSessions::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Orders {
    Table,
    Id,
    SessionId,
    ChargePointId,
    EnergyKwh,
    PricePerKwh,
    Cost,
    Currency,
    CreatedAt,
}
