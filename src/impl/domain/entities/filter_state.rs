use std::str::FromStr;

use chrono::NaiveDate;

/// View request coming from the UI. Never persisted; the cache stores joined
/// reservations, not filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub property_filter: PropertyFilter,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort_by: SortBy,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PropertyFilter {
    #[default]
    All,
    Property(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Date,
    Revenue,
}

// --

impl FilterState {
    pub fn for_property(property_id: impl Into<String>) -> Self {
        Self {
            property_filter: PropertyFilter::Property(property_id.into()),
            ..Default::default()
        }
    }
}

impl FromStr for PropertyFilter {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.is_empty() || s.eq_ignore_ascii_case("all") {
            PropertyFilter::All
        } else {
            PropertyFilter::Property(s.to_string())
        })
    }
}

impl FromStr for SortBy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "revenue" => Ok(SortBy::Revenue),
            other => Err(format!("unknown sort mode '{other}' (expected 'date' or 'revenue')")),
        }
    }
}
