use std::cmp::Ordering;

use crate::{
    data::models::iso_date_model::format_day,
    entities::{FilterState, PropertyFilter, Reservation, SortBy},
};

/// Filtered and sorted view of `reservations`. Pure: the input is not
/// touched and equal inputs always give equal outputs.
///
/// All date comparisons within one pass go through the zero-padded
/// `YYYY-MM-DD` day string, compared lexicographically; both the reservation
/// side and the filter side are formatted the same way before comparing.
pub fn apply(reservations: &[Reservation], filter: &FilterState) -> Vec<Reservation> {
    let start_day = filter.start_date.map(format_day);
    let end_day = filter.end_date.map(format_day);

    let mut keyed: Vec<(Option<String>, &Reservation)> = reservations
        .iter()
        .filter(|r| r.is_displayable())
        .filter(|r| matches_property(r, &filter.property_filter))
        .map(|r| (r.arrival_date.map(format_day), r))
        .filter(|(arrival_day, _)| within_days(arrival_day.as_deref(), &start_day, &end_day))
        .collect();

    // Both sorts are stable, so ties keep their input order.
    match filter.sort_by {
        SortBy::Date => keyed.sort_by(|(a, _), (b, _)| compare_days_missing_last(a, b)),
        SortBy::Revenue => keyed.sort_by(|(_, a), (_, b)| {
            b.financials
                .owner_payout
                .total_cmp(&a.financials.owner_payout)
        }),
    }

    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

fn matches_property(reservation: &Reservation, filter: &PropertyFilter) -> bool {
    match filter {
        PropertyFilter::All => true,
        PropertyFilter::Property(target) => reservation.property_id.as_deref() == Some(target.as_str()),
    }
}

/// Inclusive on both ends. A reservation without an arrival day cannot be
/// placed in a bounded range.
fn within_days(arrival_day: Option<&str>, start_day: &Option<String>, end_day: &Option<String>) -> bool {
    if start_day.is_none() && end_day.is_none() {
        return true;
    }
    let Some(day) = arrival_day else {
        return false;
    };
    start_day.as_deref().map_or(true, |start| day >= start)
        && end_day.as_deref().map_or(true, |end| day <= end)
}

fn compare_days_missing_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
