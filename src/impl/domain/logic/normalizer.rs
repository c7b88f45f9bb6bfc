use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::{
    data::models::{
        amount_model::AmountModel,
        iso_date_model::{IsoDateModel, IsoTimestampModel},
    },
    domain::logic::field_sources::{self as fields, first_text, SourceRecord},
    entities::{
        Channel, Financials, NightsSource, Reservation, ReservationStatus, DEFAULT_GUEST_NAME,
    },
};

/// Builds canonical reservations out of raw records and (optionally) their
/// joined financial row.
pub(crate) struct Normalizer {
    now: DateTime<Utc>,
}

impl Normalizer {
    /// `now` is the booking date of records that carry none.
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub(crate) fn normalize(
        &self,
        raw: &Map<String, Value>,
        financial: Option<&Map<String, Value>>,
    ) -> Reservation {
        let record = SourceRecord {
            reservation: raw,
            financial,
        };
        let arrival_date = day_field(raw, fields::ARRIVAL_DATE);
        let departure_date = day_field(raw, fields::DEPARTURE_DATE);
        let (nights, nights_source) = nights(raw, arrival_date, departure_date);

        Reservation {
            id: reservation_id(raw).unwrap_or_default(),
            property_id: first_text(raw, fields::PROPERTY_ID),
            guest_name: guest_name(raw),
            arrival_date,
            departure_date,
            booking_date: first_text(raw, fields::BOOKING_DATE)
                .and_then(|s| IsoTimestampModel::from_str(&s).ok())
                .map(Into::into)
                .unwrap_or(self.now),
            nights,
            nights_source,
            status: first_text(raw, fields::STATUS)
                .map(|s| ReservationStatus::parse(&s))
                .unwrap_or_else(|| ReservationStatus::Unknown(String::new())),
            channel: first_text(raw, fields::CHANNEL)
                .map(|s| Channel::from_source_text(&s))
                .unwrap_or(Channel::Default),
            financials: Financials {
                base_rate: record.amount(fields::BASE_RATE),
                cleaning_fee: record.amount(fields::CLEANING_FEE),
                processing_fee: record.amount(fields::PROCESSING_FEE),
                channel_fee: record.amount(fields::CHANNEL_FEE),
                management_fee: record.amount(fields::MANAGEMENT_FEE),
                owner_payout: record.amount(fields::OWNER_PAYOUT),
                total_price: record.amount(fields::TOTAL_PRICE),
            },
            financial_data: financial.cloned(),
        }
    }
}

/// Reservation id as a string, whatever its upstream type.
pub(crate) fn reservation_id(raw: &Map<String, Value>) -> Option<String> {
    first_text(raw, &["id", "reservationId"])
}

fn day_field(raw: &Map<String, Value>, chain: &[&str]) -> Option<NaiveDate> {
    first_text(raw, chain)
        .and_then(|s| IsoDateModel::from_str(&s).ok())
        .map(Into::into)
}

/// Day difference when both dates are valid and ordered, else the record's
/// own `nights` field, else `1`.
fn nights(
    raw: &Map<String, Value>,
    arrival: Option<NaiveDate>,
    departure: Option<NaiveDate>,
) -> (u32, NightsSource) {
    if let (Some(a), Some(d)) = (arrival, departure) {
        if let Ok(n) = u32::try_from((d - a).num_days()) {
            return (n, NightsSource::Dates);
        }
    }
    let explicit = fields::NIGHTS
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(|v| AmountModel::from_value(v).map(f64::from))
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX));
    match explicit {
        Some(n) => (n as u32, NightsSource::Explicit),
        None => (1, NightsSource::Default),
    }
}

fn guest_name(raw: &Map<String, Value>) -> String {
    if let Some(name) = first_text(raw, fields::GUEST_NAME) {
        return name;
    }
    let parts: Vec<String> = [
        first_text(raw, fields::GUEST_FIRST_NAME),
        first_text(raw, fields::GUEST_LAST_NAME),
    ]
    .into_iter()
    .flatten()
    .collect();
    if parts.is_empty() {
        DEFAULT_GUEST_NAME.to_string()
    } else {
        parts.join(" ")
    }
}
