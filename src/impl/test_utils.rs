use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone as _, Utc};
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use crate::{
    data::{
        datasources::reservations_api_datasource::{
            ReservationsApiDatasource, ReservationsPageQuery,
        },
        models::{
            financial_report_model::{ColumnModel, FinancialReportModel},
            reservations_page_model::{PaginationModel, ReservationsPageModel},
        },
    },
    domain::logic::field_sources::{self as fields, first_text},
    entities::{
        Channel, Financials, NightsSource, Reservation, ReservationStatus, ReservationsError,
    },
    errors::{AuthTokenRejected, RequestFailed},
};

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Confirmed reservation with nights derived from the dates and an empty
/// joined financial record.
pub(crate) fn reservation(id: &str, property: &str, arrival: &str, departure: &str) -> Reservation {
    let arrival_date = day(arrival);
    let departure_date = day(departure);
    Reservation {
        id: id.to_string(),
        property_id: Some(property.to_string()),
        guest_name: format!("Guest {id}"),
        arrival_date: Some(arrival_date),
        departure_date: Some(departure_date),
        booking_date: Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap(),
        nights: (departure_date - arrival_date).num_days().max(0) as u32,
        nights_source: NightsSource::Dates,
        status: ReservationStatus::Confirmed,
        channel: Channel::Airbnb,
        financials: Financials::default(),
        financial_data: Some(Map::new()),
    }
}

/// Raw backend record, as the reservations endpoint returns it.
pub(crate) fn raw_reservation(id: u64, property: &str, arrival: &str, departure: &str) -> Map<String, Value> {
    match json!({
        "id": id,
        "listingMapId": property,
        "arrivalDate": arrival,
        "departureDate": departure,
        "reservationDate": "2025-01-15 09:30:00",
        "guestName": format!("Guest {id}"),
        "status": "confirmed",
        "channelName": "airbnb",
        "totalPrice": 500,
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeFailure {
    Network,
    Unauthenticated,
}

impl FakeFailure {
    fn to_error(self) -> ReservationsError {
        match self {
            FakeFailure::Network => ReservationsError::Network(RequestFailed::new("reservations")),
            FakeFailure::Unauthenticated => {
                ReservationsError::Unauthenticated(AuthTokenRejected::new("reservations"))
            }
        }
    }
}

#[derive(Default)]
struct FakeState {
    reservations: Mutex<Vec<Map<String, Value>>>,
    payouts: Mutex<HashMap<String, f64>>,
    send_meta: Mutex<bool>,
    deny_more: Mutex<bool>,
    failure: Mutex<Option<FakeFailure>>,
    delay: Mutex<Option<Duration>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    page_calls: AtomicUsize,
    report_calls: AtomicUsize,
    requested_report_ids: Mutex<Vec<Vec<String>>>,
}

/// In-memory backend. Clones share state, so a test keeps one handle for
/// assertions while the repository owns another.
#[derive(Clone)]
pub(crate) struct FakeReservationsApi {
    state: Arc<FakeState>,
}

impl FakeReservationsApi {
    pub(crate) fn new(reservations: Vec<Map<String, Value>>) -> Self {
        let api = Self {
            state: Arc::new(FakeState::default()),
        };
        *api.state.reservations.lock().unwrap() = reservations;
        *api.state.send_meta.lock().unwrap() = true;
        api
    }

    pub(crate) fn set_reservations(&self, reservations: Vec<Map<String, Value>>) {
        *self.state.reservations.lock().unwrap() = reservations;
    }

    pub(crate) fn set_payout(&self, reservation_id: &str, payout: f64) {
        self.state
            .payouts
            .lock()
            .unwrap()
            .insert(reservation_id.to_string(), payout);
    }

    /// Without pagination metadata the caller must infer truncation from
    /// full pages.
    pub(crate) fn omit_pagination_meta(&self) {
        *self.state.send_meta.lock().unwrap() = false;
    }

    /// Reports `hasMore: false` on every page, as backends that only flag
    /// the last page of a fixed total sometimes do.
    pub(crate) fn deny_more_pages(&self) {
        *self.state.deny_more.lock().unwrap() = true;
    }

    pub(crate) fn fail_with(&self, failure: Option<FakeFailure>) {
        *self.state.failure.lock().unwrap() = failure;
    }

    pub(crate) fn delay_pages(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }

    /// Holds page requests for `scope` (comma-joined property ids, or `all`)
    /// until the returned gate is notified.
    pub(crate) fn gate(&self, scope: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .gates
            .lock()
            .unwrap()
            .insert(scope.to_string(), gate.clone());
        gate
    }

    pub(crate) fn page_calls(&self) -> usize {
        self.state.page_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn report_calls(&self) -> usize {
        self.state.report_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requested_report_ids(&self) -> Vec<Vec<String>> {
        self.state.requested_report_ids.lock().unwrap().clone()
    }
}

fn query_scope(query: &ReservationsPageQuery) -> String {
    if query.property_ids.is_empty() {
        "all".to_string()
    } else {
        query.property_ids.join(",")
    }
}

#[async_trait]
impl ReservationsApiDatasource for FakeReservationsApi {
    async fn fetch_reservations_page(
        &self,
        query: &ReservationsPageQuery,
    ) -> Result<ReservationsPageModel, ReservationsError> {
        self.state.page_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.gates.lock().unwrap().get(&query_scope(query)).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = *self.state.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = *self.state.failure.lock().unwrap();
        if let Some(failure) = failure {
            return Err(failure.to_error());
        }

        let matching: Vec<Map<String, Value>> = self
            .state
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                query.property_ids.is_empty()
                    || first_text(r, fields::PROPERTY_ID)
                        .is_some_and(|p| query.property_ids.contains(&p))
            })
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let page: Vec<Map<String, Value>> = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        let has_more = query.offset + (page.len() as u64) < total
            && !*self.state.deny_more.lock().unwrap();
        let meta = (*self.state.send_meta.lock().unwrap()).then_some(PaginationModel {
            total: Some(total),
            limit: Some(query.limit),
            offset: Some(query.offset),
            has_more: Some(has_more),
        });
        Ok(ReservationsPageModel {
            reservations: page,
            meta,
        })
    }

    async fn fetch_financial_report(
        &self,
        reservation_ids: &[String],
    ) -> Result<FinancialReportModel, ReservationsError> {
        self.state.report_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .requested_report_ids
            .lock()
            .unwrap()
            .push(reservation_ids.to_vec());
        let payouts = self.state.payouts.lock().unwrap();
        Ok(FinancialReportModel {
            columns: vec![
                ColumnModel::Name("reservationId".to_string()),
                ColumnModel::Name("ownerPayout".to_string()),
            ],
            rows: reservation_ids
                .iter()
                .filter_map(|id| payouts.get(id).map(|p| vec![json!(id), json!(p)]))
                .collect(),
        })
    }
}
