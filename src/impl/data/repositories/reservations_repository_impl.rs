use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use crate::{
    data::datasources::reservations_api_datasource::{
        ReservationsApiDatasource, ReservationsApiDatasourceImpl, ReservationsPageQuery,
    },
    domain::{
        logic::{
            joiner::Joiner,
            normalizer::{reservation_id, Normalizer},
        },
        repositories::reservations_repository::ReservationsRepository,
    },
    entities::{FetchParams, JoinedReservations, ReservationsError},
};

pub(crate) struct ReservationsRepositoryImpl<
    DS = ReservationsApiDatasourceImpl, // Default.
> where
    DS: ReservationsApiDatasource,
{
    datasource: DS,
    page_limit: u64,
    max_pages: u32,
}

struct RawReservations {
    records: Vec<Map<String, Value>>,
    ids: Vec<String>,
    truncated: bool,
}

impl<DS: ReservationsApiDatasource> ReservationsRepositoryImpl<DS> {
    pub(crate) fn new(datasource: DS, page_limit: u64, max_pages: u32) -> Self {
        Self {
            datasource,
            page_limit: page_limit.max(1),
            max_pages: max_pages.max(1),
        }
    }

    async fn fetch_all_pages(
        &self,
        params: &FetchParams,
    ) -> Result<RawReservations, ReservationsError> {
        let mut query = ReservationsPageQuery {
            property_ids: params.property_ids.clone(),
            from_date: params.from_date,
            to_date: params.to_date,
            date_anchor: params.date_anchor,
            statuses: params.statuses.clone(),
            limit: self.page_limit,
            offset: 0,
        };

        let mut raw = RawReservations {
            records: Vec::new(),
            ids: Vec::new(),
            truncated: false,
        };
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        let mut pages = 0;
        loop {
            let page = self.datasource.fetch_reservations_page(&query).await?;
            pages += 1;
            let returned = page.reservations.len();
            let may_have_more = page.may_have_more(self.page_limit);

            for record in page.reservations {
                match reservation_id(&record) {
                    Some(id) if !seen.insert(id.clone()) => duplicates += 1,
                    Some(id) => {
                        raw.ids.push(id);
                        raw.records.push(record);
                    }
                    None => raw.records.push(record),
                }
            }

            if !may_have_more || returned == 0 {
                break;
            }
            if pages >= self.max_pages {
                tracing::warn!(
                    pages,
                    fetched = raw.records.len(),
                    "reservation window still has more records after the paging limit; result is truncated"
                );
                raw.truncated = true;
                break;
            }
            query.offset += self.page_limit;
        }

        if duplicates > 0 {
            tracing::debug!(duplicates, "dropped reservations repeated across pages");
        }
        Ok(raw)
    }
}

#[async_trait]
impl<DS> ReservationsRepository for ReservationsRepositoryImpl<DS>
where
    DS: ReservationsApiDatasource,
{
    async fn fetch_joined(
        &self,
        params: &FetchParams,
    ) -> Result<JoinedReservations, ReservationsError> {
        let raw = self.fetch_all_pages(params).await?;

        let financial_rows = if raw.ids.is_empty() {
            Vec::new()
        } else {
            self.datasource
                .fetch_financial_report(&raw.ids)
                .await?
                .into_records()
        };

        let outcome = Joiner::new(Normalizer::new(Utc::now())).join(&raw.records, &financial_rows);
        tracing::debug!(
            matched = outcome.matched,
            unmatched = outcome.reservations.len() - outcome.matched,
            unused_financial_rows = outcome.unused_financial_rows,
            "joined financial report"
        );
        tracing::info!(
            reservations = outcome.reservations.len(),
            truncated = raw.truncated,
            "fetched reservations"
        );

        Ok(JoinedReservations {
            reservations: outcome.reservations,
            truncated: raw.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::test_utils::{raw_reservation, FakeFailure, FakeReservationsApi};

    fn params(property_ids: &[&str]) -> FetchParams {
        FetchParams::new(
            property_ids.iter().map(|p| p.to_string()).collect(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        )
    }

    fn sample(count: u64) -> Vec<Map<String, Value>> {
        (1..=count)
            .map(|i| raw_reservation(i, "P1", "2025-05-01", "2025-05-03"))
            .collect()
    }

    #[tokio::test]
    async fn pages_until_backend_reports_no_more() {
        let api = FakeReservationsApi::new(sample(7));
        let repository = ReservationsRepositoryImpl::new(api.clone(), 3, 10);

        let joined = repository.fetch_joined(&params(&[])).await.unwrap();

        assert_eq!(joined.reservations.len(), 7);
        assert!(!joined.truncated);
        assert_eq!(api.page_calls(), 3);
        assert_eq!(api.report_calls(), 1);
    }

    #[tokio::test]
    async fn full_page_without_meta_triggers_another_request() {
        let api = FakeReservationsApi::new(sample(6));
        api.omit_pagination_meta();
        let repository = ReservationsRepositoryImpl::new(api.clone(), 3, 10);

        let joined = repository.fetch_joined(&params(&[])).await.unwrap();

        assert_eq!(joined.reservations.len(), 6);
        // Two full pages, then an empty one.
        assert_eq!(api.page_calls(), 3);
    }

    #[tokio::test]
    async fn full_page_keeps_paging_when_backend_denies_more() {
        let api = FakeReservationsApi::new(sample(5));
        api.deny_more_pages();
        let repository = ReservationsRepositoryImpl::new(api.clone(), 2, 10);

        let joined = repository.fetch_joined(&params(&[])).await.unwrap();

        assert_eq!(joined.reservations.len(), 5);
        assert!(!joined.truncated);
        assert_eq!(api.page_calls(), 3);
    }

    #[tokio::test]
    async fn paging_limit_marks_result_truncated() {
        let api = FakeReservationsApi::new(sample(10));
        let repository = ReservationsRepositoryImpl::new(api.clone(), 2, 2);

        let joined = repository.fetch_joined(&params(&[])).await.unwrap();

        assert_eq!(joined.reservations.len(), 4);
        assert!(joined.truncated);
        assert_eq!(api.page_calls(), 2);
    }

    #[tokio::test]
    async fn records_repeated_across_pages_are_kept_once() {
        let mut records = sample(3);
        records.push(raw_reservation(2, "P1", "2025-06-01", "2025-06-03"));
        let api = FakeReservationsApi::new(records);
        let repository = ReservationsRepositoryImpl::new(api.clone(), 2, 10);

        let joined = repository.fetch_joined(&params(&[])).await.unwrap();

        let ids: Vec<&str> = joined.reservations.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(
            joined.reservations[1].arrival_date,
            NaiveDate::from_ymd_opt(2025, 5, 1)
        );
        assert_eq!(api.requested_report_ids(), vec![vec!["1", "2", "3"]]);
    }

    #[tokio::test]
    async fn financial_report_is_joined_by_reservation_id() {
        let api = FakeReservationsApi::new(sample(3));
        api.set_payout("1", 120.0);
        api.set_payout("3", 80.5);
        let repository = ReservationsRepositoryImpl::new(api.clone(), 500, 20);

        let joined = repository.fetch_joined(&params(&["P1"])).await.unwrap();

        let payouts: Vec<f64> = joined
            .reservations
            .iter()
            .map(|r| r.financials.owner_payout)
            .collect();
        assert_eq!(payouts, vec![120.0, 0.0, 80.5]);
        assert!(joined.reservations[1].financial_data.is_none());
    }

    #[tokio::test]
    async fn empty_window_skips_financial_report() {
        let api = FakeReservationsApi::new(Vec::new());
        let repository = ReservationsRepositoryImpl::new(api.clone(), 500, 20);

        let joined = repository.fetch_joined(&params(&["P9"])).await.unwrap();

        assert!(joined.reservations.is_empty());
        assert_eq!(api.report_calls(), 0);
    }

    #[tokio::test]
    async fn failures_propagate_without_partial_results() {
        let api = FakeReservationsApi::new(sample(2));
        api.fail_with(Some(FakeFailure::Unauthenticated));
        let repository = ReservationsRepositoryImpl::new(api.clone(), 500, 20);

        let err = repository.fetch_joined(&params(&[])).await.unwrap_err();

        assert!(err.is_unauthenticated());
        assert_eq!(api.report_calls(), 0);
    }
}
