use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    data::models::iso_date_model::{format_day, IsoDateModel, IsoTimestampModel},
    entities::{
        Channel, Financials, JoinedReservations, NightsSource, Reservation, ReservationStatus,
    },
};

pub(crate) const CACHE_FORMAT_VERSION: u32 = 1;

/// Serialized cache snapshot. Dates travel as ISO strings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CachedReservationsModel {
    pub(crate) version: u32,
    pub(crate) saved_at: String,
    /// Snapshots written before the flag existed load as complete.
    #[serde(default)]
    pub(crate) truncated: bool,
    pub(crate) reservations: Vec<CachedReservationModel>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CachedReservationModel {
    id: String,
    property_id: Option<String>,
    guest_name: String,
    arrival_date: Option<String>,
    departure_date: Option<String>,
    booking_date: String,
    nights: u32,
    nights_source: String,
    status: String,
    channel: String,
    base_rate: f64,
    cleaning_fee: f64,
    processing_fee: f64,
    channel_fee: f64,
    management_fee: f64,
    owner_payout: f64,
    total_price: f64,
    financial_data: Option<Map<String, Value>>,
}

// --

impl CachedReservationsModel {
    pub(crate) fn snapshot(joined: &JoinedReservations, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            saved_at: saved_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            truncated: joined.truncated,
            reservations: joined
                .reservations
                .iter()
                .map(CachedReservationModel::from)
                .collect(),
        }
    }

    /// Rehydrates every reservation. A single unparseable date (or any other
    /// malformed field) invalidates the whole snapshot.
    pub(crate) fn rehydrate(self) -> Option<JoinedReservations> {
        if self.version != CACHE_FORMAT_VERSION {
            return None;
        }
        let reservations = self
            .reservations
            .into_iter()
            .map(CachedReservationModel::rehydrate)
            .collect::<Option<Vec<_>>>()?;
        Some(JoinedReservations {
            reservations,
            truncated: self.truncated,
        })
    }
}

impl From<&Reservation> for CachedReservationModel {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.clone(),
            property_id: r.property_id.clone(),
            guest_name: r.guest_name.clone(),
            arrival_date: r.arrival_date.map(format_day),
            departure_date: r.departure_date.map(format_day),
            booking_date: r.booking_date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            nights: r.nights,
            nights_source: nights_source_tag(r.nights_source).to_string(),
            status: r.status.as_str().to_string(),
            channel: r.channel.as_str().to_string(),
            base_rate: r.financials.base_rate,
            cleaning_fee: r.financials.cleaning_fee,
            processing_fee: r.financials.processing_fee,
            channel_fee: r.financials.channel_fee,
            management_fee: r.financials.management_fee,
            owner_payout: r.financials.owner_payout,
            total_price: r.financials.total_price,
            financial_data: r.financial_data.clone(),
        }
    }
}

impl CachedReservationModel {
    fn rehydrate(self) -> Option<Reservation> {
        let financials = Financials {
            base_rate: self.base_rate,
            cleaning_fee: self.cleaning_fee,
            processing_fee: self.processing_fee,
            channel_fee: self.channel_fee,
            management_fee: self.management_fee,
            owner_payout: self.owner_payout,
            total_price: self.total_price,
        };
        let amounts = [
            financials.base_rate,
            financials.cleaning_fee,
            financials.processing_fee,
            financials.channel_fee,
            financials.management_fee,
            financials.owner_payout,
            financials.total_price,
        ];
        if !amounts.iter().all(|a| a.is_finite()) {
            return None;
        }
        Some(Reservation {
            id: self.id,
            property_id: self.property_id,
            guest_name: self.guest_name,
            arrival_date: parse_optional_day(self.arrival_date)?,
            departure_date: parse_optional_day(self.departure_date)?,
            booking_date: IsoTimestampModel::from_str(&self.booking_date).ok()?.into(),
            nights: self.nights,
            nights_source: parse_nights_source(&self.nights_source)?,
            status: ReservationStatus::parse(&self.status),
            channel: Channel::from_source_text(&self.channel),
            financials,
            financial_data: self.financial_data,
        })
    }
}

/// `Some(None)` for an absent date, `None` for an invalid one.
fn parse_optional_day(raw: Option<String>) -> Option<Option<NaiveDate>> {
    match raw {
        None => Some(None),
        Some(s) => IsoDateModel::from_str(&s).ok().map(|d| Some(d.into())),
    }
}

fn nights_source_tag(source: NightsSource) -> &'static str {
    match source {
        NightsSource::Dates => "dates",
        NightsSource::Explicit => "explicit",
        NightsSource::Default => "default",
    }
}

fn parse_nights_source(tag: &str) -> Option<NightsSource> {
    match tag {
        "dates" => Some(NightsSource::Dates),
        "explicit" => Some(NightsSource::Explicit),
        "default" => Some(NightsSource::Default),
        _ => None,
    }
}
