use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::SerialNumber).string().not_null().unique_key())
                    .col(ColumnDef::new(Devices::TypeCode).string().not_null())
                    .col(ColumnDef::new(Devices::EncryptedSecret).binary().not_null())
                    .col(ColumnDef::new(Devices::EncryptionAlgorithm).string().not_null())
                    .col(ColumnDef::new(Devices::MqttClientId).string())
                    .col(ColumnDef::new(Devices::Active).boolean().not_null().default(true))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Devices::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Devices {
    Table,
    Id,
    SerialNumber,
    TypeCode,
    EncryptedSecret,
    MqttClientId,
    EncryptionAlgorithm,
    Active,
}
