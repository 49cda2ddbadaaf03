use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargePoints::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChargePoints::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ChargePoints::Vendor).string().not_null())
                    .col(ColumnDef::new(ChargePoints::Model).string().not_null())
                    .col(ColumnDef::new(ChargePoints::FirmwareVersion).string())
                    .col(
                        ColumnDef::new(ChargePoints::PhysicalStatus)
                            .string()
                            .not_null()
                            .default("Unavailable"),
                    )
                    .col(
                        ColumnDef::new(ChargePoints::OperationalStatus)
                            .string()
                            .not_null()
                            .default("Enabled"),
                    )
                    .col(ColumnDef::new(ChargePoints::LastSeen).timestamp_with_time_zone())
                    .col(ColumnDef::new(ChargePoints::Latitude).double())
                    .col(ColumnDef::new(ChargePoints::Longitude).double())
                    .col(ColumnDef::new(ChargePoints::Address).string())
                    .col(ColumnDef::new(ChargePoints::PricePerKwh).double())
                    .col(ColumnDef::new(ChargePoints::NominalRateKw).double())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ChargePoints::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum ChargePoints {
    Table,
    Id,
    Vendor,
    Model,
    FirmwareVersion,
    PhysicalStatus,
    OperationalStatus,
    LastSeen,
    Latitude,
    Longitude,
    Address,
    PricePerKwh,
    NominalRateKw,
}
