use chrono::NaiveDate;
use serde_derive::{Deserialize, Serialize};

use super::reservation::ReservationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateAnchor {
    #[default]
    Arrival,
    Departure,
}

/// Parameters of one fetch-and-join request. Two requests with equal
/// `canonical_key()` are coalesced into a single round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub property_ids: Vec<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub date_anchor: DateAnchor,
    pub statuses: Vec<String>,
}

#[derive(Serialize)]
struct CanonicalFetchParams<'a> {
    property_ids: Vec<&'a str>,
    from_date: String,
    to_date: String,
    date_anchor: DateAnchor,
    statuses: Vec<&'a str>,
}

// --

impl FetchParams {
    pub fn new(property_ids: Vec<String>, from_date: NaiveDate, to_date: NaiveDate) -> Self {
        Self {
            property_ids,
            from_date,
            to_date,
            date_anchor: DateAnchor::default(),
            statuses: Self::default_statuses(),
        }
    }

    pub fn default_statuses() -> Vec<String> {
        ReservationStatus::ALLOWED
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }

    /// Deterministic serialization. Id and status lists are sorted and
    /// de-duplicated so that their order does not split identical requests.
    pub fn canonical_key(&self) -> String {
        let mut property_ids: Vec<&str> = self.property_ids.iter().map(String::as_str).collect();
        property_ids.sort_unstable();
        property_ids.dedup();
        let mut statuses: Vec<&str> = self.statuses.iter().map(String::as_str).collect();
        statuses.sort_unstable();
        statuses.dedup();
        let canonical = CanonicalFetchParams {
            property_ids,
            from_date: self.from_date.format("%Y-%m-%d").to_string(),
            to_date: self.to_date.format("%Y-%m-%d").to_string(),
            date_anchor: self.date_anchor,
            statuses,
        };
        serde_json::to_string(&canonical)
            .expect("serializing strings and a unit enum to JSON should never fail")
    }
}
