//! sea-orm backed [`Store`] implementation. SQLite by default; swapping `store_url` to a
//! `postgres://` DSN is the only change needed to run against Postgres (§4.5).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectOptions, Database, DatabaseConnection,
    EntityTrait, IsolationLevel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde_json::Value;

use crate::domain::{
    ChargePoint, ChargingSession, ConnectorType, DeviceEvent, EventKind, IdTag, MeterValue,
    Order, OperationalStatus, PhysicalStatus, SessionStatus,
};
use crate::support::errors::CsmsError;
use crate::support::errors::CsmsResult;

use super::entities::{charge_point, charging_session, device_event, evse, id_tag, meter_value, order};
use super::{ChargePointFilter, Store, Window};

pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub async fn connect(url: &str) -> CsmsResult<Self> {
        let opts = ConnectOptions::new(url.to_string());
        let db = Database::connect(opts).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn connector_type_str(ct: ConnectorType) -> &'static str {
    match ct {
        ConnectorType::Type1 => "Type1",
        ConnectorType::Type2 => "Type2",
        ConnectorType::Ccs1 => "Ccs1",
        ConnectorType::Ccs2 => "Ccs2",
        ConnectorType::Gbt => "Gbt",
    }
}

#[async_trait]
impl Store for SeaOrmStore {
    async fn list_charge_points(&self, filter: &ChargePointFilter) -> CsmsResult<Vec<ChargePoint>> {
        let mut query = charge_point::Entity::find();
        if let Some(status) = filter.operational_status {
            let s = match status {
                OperationalStatus::Enabled => "Enabled",
                OperationalStatus::Disabled => "Disabled",
                OperationalStatus::Maintenance => "Maintenance",
            };
            query = query.filter(charge_point::Column::OperationalStatus.eq(s));
        }
        if filter.only_available {
            query = query.filter(charge_point::Column::PhysicalStatus.eq("Available"));
        }
        let rows = query.all(&self.db).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_charge_point(&self, id: &str) -> CsmsResult<Option<ChargePoint>> {
        let row = charge_point::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn list_pending_charge_points(&self) -> CsmsResult<Vec<ChargePoint>> {
        let rows = charge_point::Entity::find().all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(ChargePoint::from)
            .filter(|cp| !cp.is_configured())
            .collect())
    }

    async fn upsert_charge_point_boot(
        &self,
        id: &str,
        vendor: &str,
        model: &str,
        firmware_version: Option<&str>,
    ) -> CsmsResult<ChargePoint> {
        let existing = charge_point::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        let model_row = match existing {
            Some(row) => {
                let mut am: charge_point::ActiveModel = row.into();
                am.vendor = Set(vendor.to_string());
                am.model = Set(model.to_string());
                am.firmware_version = Set(firmware_version.map(str::to_string));
                am.last_seen = Set(Some(Utc::now()));
                am.update(&self.db).await?
            }
            None => {
                let am = charge_point::ActiveModel {
                    id: Set(id.to_string()),
                    vendor: Set(vendor.to_string()),
                    model: Set(model.to_string()),
                    firmware_version: Set(firmware_version.map(str::to_string)),
                    physical_status: Set("Unavailable".to_string()),
                    operational_status: Set("Enabled".to_string()),
                    last_seen: Set(Some(Utc::now())),
                    latitude: Set(None),
                    longitude: Set(None),
                    address: Set(None),
                    price_per_kwh: Set(None),
                    nominal_rate_kw: Set(None),
                };
                am.insert(&self.db).await?
            }
        };
        Ok(model_row.into())
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> CsmsResult<()> {
        if let Some(row) = charge_point::Entity::find_by_id(id.to_string()).one(&self.db).await? {
            let mut am: charge_point::ActiveModel = row.into();
            am.last_seen = Set(Some(at));
            am.update(&self.db).await?;
        }
        Ok(())
    }

    async fn set_location(&self, id: &str, lat: f64, lng: f64, address: Option<&str>) -> CsmsResult<()> {
        if let Some(row) = charge_point::Entity::find_by_id(id.to_string()).one(&self.db).await? {
            let mut am: charge_point::ActiveModel = row.into();
            am.latitude = Set(Some(lat));
            am.longitude = Set(Some(lng));
            am.address = Set(address.map(str::to_string));
            am.update(&self.db).await?;
            Ok(())
        } else {
            Err(CsmsError::UnknownCharger(id.to_string()))
        }
    }

    async fn set_pricing(&self, id: &str, price_per_kwh: f64, nominal_rate_kw: Option<f64>) -> CsmsResult<()> {
        if let Some(row) = charge_point::Entity::find_by_id(id.to_string()).one(&self.db).await? {
            let mut am: charge_point::ActiveModel = row.into();
            am.price_per_kwh = Set(Some(price_per_kwh));
            am.nominal_rate_kw = Set(nominal_rate_kw);
            am.update(&self.db).await?;
            Ok(())
        } else {
            Err(CsmsError::UnknownCharger(id.to_string()))
        }
    }

    async fn get_or_create_evse(
        &self,
        charge_point_id: &str,
        connector_id: u32,
    ) -> CsmsResult<crate::domain::Evse> {
        let existing = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .filter(evse::Column::ConnectorId.eq(connector_id as i32))
            .one(&self.db)
            .await?;
        if let Some(row) = existing {
            return Ok(row.into());
        }
        let am = evse::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            charge_point_id: Set(charge_point_id.to_string()),
            connector_id: Set(connector_id as i32),
            connector_type: Set(connector_type_str(ConnectorType::Type2).to_string()),
            status: Set("Available".to_string()),
            last_error_code: Set(None),
        };
        let row = am.insert(&self.db).await?;
        Ok(row.into())
    }

    async fn list_evses(&self, charge_point_id: &str) -> CsmsResult<Vec<crate::domain::Evse>> {
        let rows = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_evse_status(
        &self,
        charge_point_id: &str,
        connector_id: u32,
        status: PhysicalStatus,
        error_code: Option<&str>,
    ) -> CsmsResult<()> {
        self.get_or_create_evse(charge_point_id, connector_id).await?;
        let row = evse::Entity::find()
            .filter(evse::Column::ChargePointId.eq(charge_point_id))
            .filter(evse::Column::ConnectorId.eq(connector_id as i32))
            .one(&self.db)
            .await?
            .ok_or_else(|| CsmsError::Store("evse vanished after create".to_string()))?;
        let mut am: evse::ActiveModel = row.into();
        am.status = Set(status.to_string());
        am.last_error_code = Set(error_code.map(str::to_string));
        am.update(&self.db).await?;
        Ok(())
    }

    async fn update_charge_point_physical_status(
        &self,
        charge_point_id: &str,
        status: PhysicalStatus,
    ) -> CsmsResult<()> {
        if let Some(row) = charge_point::Entity::find_by_id(charge_point_id.to_string())
            .one(&self.db)
            .await?
        {
            let mut am: charge_point::ActiveModel = row.into();
            am.physical_status = Set(status.to_string());
            am.update(&self.db).await?;
        }
        Ok(())
    }

    async fn get_id_tag(&self, tag: &str) -> CsmsResult<Option<IdTag>> {
        let row = id_tag::Entity::find_by_id(tag.to_string()).one(&self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn start_charging_session(&self, session: ChargingSession) -> CsmsResult<ChargingSession> {
        let txn = self.db.begin_with_config(Some(IsolationLevel::Serializable), None).await?;

        let conflict = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(session.charge_point_id.clone()))
            .filter(charging_session::Column::EvseId.eq(session.evse_id))
            .filter(charging_session::Column::Status.eq("Active"))
            .one(&txn)
            .await?;
        if conflict.is_some() {
            txn.rollback().await?;
            return Err(CsmsError::State("ConcurrentTx".to_string()));
        }

        let am = charging_session::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            charge_point_id: Set(session.charge_point_id),
            evse_id: Set(session.evse_id),
            connector_id: Set(session.connector_id as i32),
            // Placeholder; overwritten below with the row's own auto-increment id, which is
            // already unique and monotonically increasing across the whole table.
            transaction_id: Set(0),
            id_tag: Set(session.id_tag),
            user_id: Set(session.user_id),
            start_time: Set(session.start_time),
            end_time: Set(None),
            meter_start: Set(session.meter_start),
            meter_stop: Set(None),
            status: Set("Active".to_string()),
        };
        let row = am.insert(&txn).await?;
        let assigned_id = row.id;
        let mut am: charging_session::ActiveModel = row.into();
        am.transaction_id = Set(assigned_id);
        let row = am.update(&txn).await?;
        txn.commit().await?;
        Ok(row.into())
    }

    async fn active_session_for_evse(
        &self,
        charge_point_id: &str,
        evse_id: i64,
    ) -> CsmsResult<Option<ChargingSession>> {
        let row = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::EvseId.eq(evse_id))
            .filter(charging_session::Column::Status.eq("Active"))
            .one(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn active_session_for_transaction(
        &self,
        charge_point_id: &str,
        transaction_id: i64,
    ) -> CsmsResult<Option<ChargingSession>> {
        let row = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::TransactionId.eq(transaction_id))
            .filter(charging_session::Column::Status.eq("Active"))
            .one(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_active_sessions(&self, charge_point_id: &str) -> CsmsResult<Vec<ChargingSession>> {
        let rows = charging_session::Entity::find()
            .filter(charging_session::Column::ChargePointId.eq(charge_point_id))
            .filter(charging_session::Column::Status.eq("Active"))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn stop_charging_session(
        &self,
        session_id: i64,
        end_time: DateTime<Utc>,
        meter_stop: i64,
    ) -> CsmsResult<ChargingSession> {
        let txn = self.db.begin_with_config(Some(IsolationLevel::Serializable), None).await?;
        let row = charging_session::Entity::find_by_id(session_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CsmsError::Store(format!("session {} not found", session_id)))?;
        if row.status != "Active" {
            txn.rollback().await?;
            return Err(CsmsError::State("session is not active".to_string()));
        }
        let mut am: charging_session::ActiveModel = row.into();
        am.status = Set("Completed".to_string());
        am.end_time = Set(Some(end_time));
        am.meter_stop = Set(Some(meter_stop));
        let updated = am.update(&txn).await?;
        txn.commit().await?;
        Ok(updated.into())
    }

    async fn interrupt_stale_sessions(&self, older_than: DateTime<Utc>) -> CsmsResult<Vec<ChargingSession>> {
        let stale = charging_session::Entity::find()
            .filter(charging_session::Column::Status.eq("Active"))
            .filter(charging_session::Column::StartTime.lt(older_than))
            .all(&self.db)
            .await?;
        let mut interrupted = Vec::with_capacity(stale.len());
        for row in stale {
            let mut am: charging_session::ActiveModel = row.into();
            am.status = Set("Interrupted".to_string());
            let updated = am.update(&self.db).await?;
            interrupted.push(updated.into());
        }
        Ok(interrupted)
    }

    async fn last_meter_value_timestamp(&self, session_id: i64) -> CsmsResult<Option<DateTime<Utc>>> {
        let row = meter_value::Entity::find()
            .filter(meter_value::Column::SessionId.eq(session_id))
            .order_by_desc(meter_value::Column::Timestamp)
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.timestamp))
    }

    async fn insert_meter_value(&self, meter_value: MeterValue) -> CsmsResult<()> {
        let am = meter_value::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            session_id: Set(meter_value.session_id),
            connector_id: Set(meter_value.connector_id as i32),
            timestamp: Set(meter_value.timestamp),
            value: Set(meter_value.value),
            sampled_value: Set(meter_value.sampled_value.to_string()),
        };
        am.insert(&self.db).await?;
        Ok(())
    }

    async fn insert_order(&self, order: Order) -> CsmsResult<Order> {
        let am = order::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            session_id: Set(order.session_id),
            charge_point_id: Set(order.charge_point_id),
            energy_kwh: Set(order.energy_kwh),
            price_per_kwh: Set(order.price_per_kwh),
            cost: Set(order.cost),
            currency: Set(order.currency),
            created_at: Set(order.created_at),
        };
        let row = am.insert(&self.db).await?;
        Ok(row.into())
    }

    async fn record_event(
        &self,
        charge_point_id: &str,
        evse_id: Option<i64>,
        kind: EventKind,
        payload: Value,
    ) -> CsmsResult<()> {
        let kind_str = serde_json::to_value(kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string());
        let am = device_event::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            charge_point_id: Set(charge_point_id.to_string()),
            evse_id: Set(evse_id),
            event_kind: Set(kind_str),
            payload: Set(payload.to_string()),
            timestamp: Set(Utc::now()),
        };
        am.insert(&self.db).await?;
        Ok(())
    }

    async fn get_history(&self, charge_point_id: &str, window: Window) -> CsmsResult<Vec<DeviceEvent>> {
        let rows = device_event::Entity::find()
            .filter(device_event::Column::ChargePointId.eq(charge_point_id))
            .filter(device_event::Column::Timestamp.gte(window.from))
            .filter(device_event::Column::Timestamp.lt(window.to))
            .order_by_asc(device_event::Column::Timestamp)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_heartbeat_timeline(
        &self,
        charge_point_id: &str,
        window: Window,
    ) -> CsmsResult<Vec<DeviceEvent>> {
        let rows = device_event::Entity::find()
            .filter(device_event::Column::ChargePointId.eq(charge_point_id))
            .filter(device_event::Column::EventKind.eq("Heartbeat"))
            .filter(device_event::Column::Timestamp.gte(window.from))
            .filter(device_event::Column::Timestamp.lt(window.to))
            .order_by_asc(device_event::Column::Timestamp)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_status_timeline(
        &self,
        charge_point_id: &str,
        window: Window,
    ) -> CsmsResult<Vec<DeviceEvent>> {
        let rows = device_event::Entity::find()
            .filter(device_event::Column::ChargePointId.eq(charge_point_id))
            .filter(device_event::Column::EventKind.eq("StatusNotification"))
            .filter(device_event::Column::Timestamp.gte(window.from))
            .filter(device_event::Column::Timestamp.lt(window.to))
            .order_by_asc(device_event::Column::Timestamp)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
