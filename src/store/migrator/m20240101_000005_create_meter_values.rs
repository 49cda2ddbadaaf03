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
                    .table(MeterValues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeterValues::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MeterValues::SessionId).big_integer().not_null())
                    .col(ColumnDef::new(MeterValues::ConnectorId).integer().not_null())
                    .col(ColumnDef::new(MeterValues::Timestamp).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(MeterValues::Value).big_integer().not_null())
                    .col(ColumnDef::new(MeterValues::SampledValue).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(MeterValues::Table, MeterValues::SessionId)
                            .to(ChargingSessions::Table, ChargingSessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meter_values_session_timestamp")
                    .table(MeterValues::Table)
                    .col(MeterValues::SessionId)
                    .col(MeterValues::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MeterValues::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum MeterValues {
    Table,
    Id,
    SessionId,
    ConnectorId,
    Timestamp,
    Value,
    SampledValue,
}
