//! Database migrations.

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_charge_points;
mod m20240101_000002_create_evses;
mod m20240101_000003_create_id_tags;
mod m20240101_000004_create_charging_sessions;
mod m20240101_000005_create_meter_values;
mod m20240101_000006_create_device_events;
mod m20240101_000007_create_orders;
mod m20240101_000008_create_devices;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_charge_points::Migration),
            Box::new(m20240101_000002_create_evses::Migration),
            Box::new(m20240101_000003_create_id_tags::Migration),
            Box::new(m20240101_000004_create_charging_sessions::Migration),
            Box::new(m20240101_000005_create_meter_values::Migration),
            Box::new(m20240101_000006_create_device_events::Migration),
            Box::new(m20240101_000007_create_orders::Migration),
            Box::new(m20240101_000008_create_devices::Migration),
        ]
    }
}
