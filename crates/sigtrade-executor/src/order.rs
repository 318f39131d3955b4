//! Digital-option order payload.
//!
//! Expiration is aligned to the brokerage clock: floor to the minute, add the
//! expiry, and skip one more minute when fewer than 30 seconds are left in the
//! current one (the brokerage stops selling that slot).

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use sigtrade_core::{CoreError, Direction, RequestId};
use std::time::Duration;

const PLACE_DIGITAL_OPTION: &str = "digital-options.place-digital-option";
const PLACE_DIGITAL_OPTION_VERSION: &str = "3.0";

/// Seconds left in a minute below which the next slot is used.
const LATE_PURCHASE_SECS: i64 = 30;

/// Absolute expiration (epoch seconds) for an order placed at
/// `server_time_ms`.
pub fn expiration_timestamp(server_time_ms: u64, expiry_minutes: u32) -> i64 {
    let now_s = (server_time_ms / 1000) as i64;
    let into_minute = now_s % 60;
    let mut expiration = now_s - into_minute + i64::from(expiry_minutes) * 60;
    if 60 - into_minute < LATE_PURCHASE_SECS {
        expiration += 60;
    }
    expiration
}

/// Time from `server_time_ms` until `expiration` (epoch seconds); zero once
/// passed.
pub fn time_to_expiration(server_time_ms: u64, expiration: i64) -> Duration {
    let remaining_ms = expiration.saturating_mul(1000) - server_time_ms as i64;
    Duration::from_millis(remaining_ms.max(0) as u64)
}

/// `do{asset}A{YYYYMMDD}D{HHMM}00T{expiry}M{C|P}SPT`, date and time in UTC.
pub fn instrument_id(
    asset_id: u32,
    expiration: i64,
    expiry_minutes: u32,
    direction: Direction,
) -> Result<String, CoreError> {
    let at = DateTime::from_timestamp(expiration, 0)
        .ok_or(CoreError::TimestampOutOfRange(expiration))?;
    Ok(format!(
        "do{asset_id}A{}D{}00T{expiry_minutes}M{}SPT",
        at.format("%Y%m%d"),
        at.format("%H%M"),
        direction.code()
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigitalOptionOrder {
    name: &'static str,
    version: &'static str,
    body: DigitalOptionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct DigitalOptionBody {
    user_balance_id: u64,
    instrument_id: String,
    /// Sent as a string to keep the stake exact.
    amount: String,
    asset_id: u32,
    instrument_index: u32,
}

impl DigitalOptionOrder {
    pub fn new(
        balance_id: u64,
        asset_id: u32,
        amount: Decimal,
        direction: Direction,
        expiry_minutes: u32,
        expiration: i64,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            name: PLACE_DIGITAL_OPTION,
            version: PLACE_DIGITAL_OPTION_VERSION,
            body: DigitalOptionBody {
                user_balance_id: balance_id,
                instrument_id: instrument_id(asset_id, expiration, expiry_minutes, direction)?,
                amount: amount.normalize().to_string(),
                asset_id,
                instrument_index: 0,
            },
        })
    }

    pub fn instrument_id(&self) -> &str {
        &self.body.instrument_id
    }

    pub fn amount(&self) -> &str {
        &self.body.amount
    }
}

/// One order ready for an `OrderSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub request_id: RequestId,
    pub asset: String,
    /// Expiration, epoch seconds.
    pub expiration: i64,
    pub payload: DigitalOptionOrder,
}
