use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceEvents::ChargePointId).string().not_null())
                    .col(ColumnDef::new(DeviceEvents::EvseId).big_integer())
                    .col(ColumnDef::new(DeviceEvents::EventKind).string().not_null())
                    .col(ColumnDef::new(DeviceEvents::Payload).text().not_null())
                    .col(ColumnDef::new(DeviceEvents::Timestamp).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_device_events_cp_timestamp")
                    .table(DeviceEvents::Table)
                    .col(DeviceEvents::ChargePointId)
                    .col(DeviceEvents::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(DeviceEvents::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum DeviceEvents {
    Table,
    Id,
    ChargePointId,
    EvseId,
    EventKind,
    Payload,
    Timestamp,
}
