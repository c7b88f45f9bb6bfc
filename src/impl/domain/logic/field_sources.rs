//! Ordered source-field chains. The first source in a chain that yields a
//! usable value wins; the order of each chain is the policy.

use serde_json::{Map, Value};

use crate::data::models::amount_model::AmountModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldSource {
    /// Column of the joined financial report row.
    Financial(&'static str),
    /// Field of the raw reservation record.
    Reservation(&'static str),
}

/// Everything a chain may read from for a single reservation.
pub(crate) struct SourceRecord<'a> {
    pub(crate) reservation: &'a Map<String, Value>,
    pub(crate) financial: Option<&'a Map<String, Value>>,
}

// Identity & scheduling.
// ---

/// Property identifier aliases. `listingMapId` is what the reservations
/// endpoint returns; the others come from older report formats and cached
/// payloads.
pub(crate) const PROPERTY_ID: &[&str] = &[
    "listingMapId",
    "propertyId",
    "listingId",
    "property_id",
    "listing_id",
];

pub(crate) const ARRIVAL_DATE: &[&str] = &["arrivalDate", "arrival_date", "checkIn", "check_in"];
pub(crate) const DEPARTURE_DATE: &[&str] =
    &["departureDate", "departure_date", "checkOut", "check_out"];
/// `reservationDate` is the booking timestamp; `insertedOn` is the record
/// creation time, close enough when the former is missing.
pub(crate) const BOOKING_DATE: &[&str] =
    &["reservationDate", "bookingDate", "booking_date", "insertedOn"];
pub(crate) const NIGHTS: &[&str] = &["nights", "numberOfNights"];
pub(crate) const GUEST_NAME: &[&str] = &["guestName", "guest_name"];
pub(crate) const GUEST_FIRST_NAME: &[&str] = &["guestFirstName", "firstName"];
pub(crate) const GUEST_LAST_NAME: &[&str] = &["guestLastName", "lastName"];
pub(crate) const STATUS: &[&str] = &["status", "reservationStatus"];
/// `channelName` is the human label ("airbnbOfficial"); `source` and
/// `channel` are fallbacks for direct bookings.
pub(crate) const CHANNEL: &[&str] = &["channelName", "source", "channel"];

// Financial fields.
// ---

use FieldSource::{Financial, Reservation};

/// Report columns first; the reservation's own `baseRate` as last resort
/// since it excludes report-side adjustments.
pub(crate) const BASE_RATE: &[FieldSource] = &[
    Financial("baseRate"),
    Financial("base_rate"),
    Financial("accommodation"),
    Reservation("baseRate"),
];
pub(crate) const CLEANING_FEE: &[FieldSource] = &[
    Financial("cleaningFee"),
    Financial("cleaning_fee"),
    Financial("cleaningFeeValue"),
    Reservation("cleaningFee"),
];
/// The report calls it `paymentProcessing`; reservations carry no
/// processing fee of their own.
pub(crate) const PROCESSING_FEE: &[FieldSource] = &[
    Financial("paymentProcessing"),
    Financial("processingFee"),
    Financial("processing_fee"),
];
pub(crate) const CHANNEL_FEE: &[FieldSource] = &[
    Financial("channelFee"),
    Financial("hostChannelFee"),
    Financial("channel_fee"),
    Reservation("hostChannelFee"),
];
/// `pmCommission` is the management company's cut.
pub(crate) const MANAGEMENT_FEE: &[FieldSource] = &[
    Financial("pmCommission"),
    Financial("managementFee"),
    Financial("management_fee"),
];
/// Only ever taken from the report: a reservation with no report row has
/// no payout.
pub(crate) const OWNER_PAYOUT: &[FieldSource] = &[
    Financial("ownerPayout"),
    Financial("owner_payout"),
    Financial("netOwnerPayout"),
];
pub(crate) const TOTAL_PRICE: &[FieldSource] = &[
    Financial("totalPrice"),
    Financial("total_price"),
    Reservation("totalPrice"),
];

// Accessors.
// ---

impl<'a> SourceRecord<'a> {
    fn value(&self, source: FieldSource) -> Option<&'a Value> {
        match source {
            Financial(key) => self.financial.and_then(|f| f.get(key)),
            Reservation(key) => self.reservation.get(key),
        }
    }

    /// First parseable amount along the chain, else `0`. Never NaN.
    pub(crate) fn amount(&self, chain: &[FieldSource]) -> f64 {
        chain
            .iter()
            .filter_map(|s| self.value(*s))
            .find_map(|v| AmountModel::from_value(v).map(f64::from))
            .unwrap_or(0.0)
    }
}

/// First non-empty value along the chain, rendered as a string.
pub(crate) fn first_text(record: &Map<String, Value>, chain: &[&str]) -> Option<String> {
    chain
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(value_as_text)
}

/// Strings are trimmed; integral numbers render without a fractional part so
/// that `42`, `42.0` and `"42"` compare equal.
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}
