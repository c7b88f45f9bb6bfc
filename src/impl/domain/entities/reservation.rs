use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub property_id: Option<String>,
    pub guest_name: String,
    pub arrival_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    pub booking_date: DateTime<Utc>,
    pub nights: u32,
    pub nights_source: NightsSource,
    pub status: ReservationStatus,
    pub channel: Channel,
    pub financials: Financials,
    /// Raw joined financial record, `None` when the report had no row for
    /// this reservation.
    pub financial_data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightsSource {
    /// Day difference between departure and arrival.
    Dates,
    /// Taken from the record's own `nights` field.
    Explicit,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationStatus {
    New,
    Modified,
    OwnerStay,
    Confirmed,
    Cancelled,
    Inquiry,
    Declined,
    Deleted,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Airbnb,
    Vrbo,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Financials {
    pub base_rate: f64,
    pub cleaning_fee: f64,
    pub processing_fee: f64,
    pub channel_fee: f64,
    pub management_fee: f64,
    pub owner_payout: f64,
    pub total_price: f64,
}

// --

pub const DEFAULT_GUEST_NAME: &str = "Guest";

impl ReservationStatus {
    /// Statuses surfaced to the UI. Everything else is filtered out.
    pub const ALLOWED: [ReservationStatus; 4] = [
        ReservationStatus::New,
        ReservationStatus::Modified,
        ReservationStatus::OwnerStay,
        ReservationStatus::Confirmed,
    ];

    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "new" => ReservationStatus::New,
            "modified" => ReservationStatus::Modified,
            "ownerstay" => ReservationStatus::OwnerStay,
            "confirmed" => ReservationStatus::Confirmed,
            "cancelled" | "canceled" => ReservationStatus::Cancelled,
            "declined" => ReservationStatus::Declined,
            "deleted" => ReservationStatus::Deleted,
            s if s.starts_with("inquiry") => ReservationStatus::Inquiry,
            _ => ReservationStatus::Unknown(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReservationStatus::New => "new",
            ReservationStatus::Modified => "modified",
            ReservationStatus::OwnerStay => "ownerStay",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Inquiry => "inquiry",
            ReservationStatus::Declined => "declined",
            ReservationStatus::Deleted => "deleted",
            ReservationStatus::Unknown(s) => s,
        }
    }

    pub fn is_allowed(&self) -> bool {
        Self::ALLOWED.contains(self)
    }
}

impl Channel {
    /// Case-insensitive substring match against the raw source text.
    pub fn from_source_text(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("airbnb") {
            Channel::Airbnb
        } else if lower.contains("vrbo") {
            Channel::Vrbo
        } else {
            Channel::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Airbnb => "airbnb",
            Channel::Vrbo => "vrbo",
            Channel::Default => "default",
        }
    }
}

impl Reservation {
    /// Whether this reservation may appear in any filtered view: its status
    /// must be allowed and its stay must be resolvable.
    pub fn is_displayable(&self) -> bool {
        self.status.is_allowed()
            && ((self.arrival_date.is_some() && self.departure_date.is_some())
                || self.nights_source == NightsSource::Explicit)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
