use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use fractic_server_error::{CriticalError, ServerError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    data::{
        datasources::auth_token_provider::AuthTokenProvider,
        models::{
            financial_report_model::{FinancialReportModel, FinancialReportResponseModel},
            iso_date_model::format_day,
            reservations_page_model::{ReservationsPageModel, ReservationsResponseModel},
        },
    },
    entities::{DateAnchor, ReservationsError},
    errors::{
        AuthTokenRejected, InvalidResponseBody, MissingAuthToken, RequestFailed, RequestTimedOut,
        UnexpectedStatus,
    },
};

const RESERVATIONS_ENDPOINT: &str = "reservations";
const FINANCIAL_REPORT_ENDPOINT: &str = "financials/report";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReservationsPageQuery {
    pub(crate) property_ids: Vec<String>,
    pub(crate) from_date: NaiveDate,
    pub(crate) to_date: NaiveDate,
    pub(crate) date_anchor: DateAnchor,
    pub(crate) statuses: Vec<String>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
}

#[async_trait]
pub(crate) trait ReservationsApiDatasource: Send + Sync {
    async fn fetch_reservations_page(
        &self,
        query: &ReservationsPageQuery,
    ) -> Result<ReservationsPageModel, ReservationsError>;

    async fn fetch_financial_report(
        &self,
        reservation_ids: &[String],
    ) -> Result<FinancialReportModel, ReservationsError>;
}

pub(crate) struct ReservationsApiDatasourceImpl {
    client: Client,
    base_url: String,
    timeout: Duration,
    token_provider: Arc<dyn AuthTokenProvider>,
}

impl ReservationsApiDatasourceImpl {
    pub(crate) fn new(
        base_url: &str,
        timeout: Duration,
        token_provider: Arc<dyn AuthTokenProvider>,
    ) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CriticalError::with_debug("failed to build HTTP client", &e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            token_provider,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ReservationsError> {
        let token = self
            .token_provider
            .bearer_token()
            .await
            .ok_or_else(|| ReservationsError::Unauthenticated(MissingAuthToken::new()))?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            if e.is_timeout() {
                ReservationsError::Network(RequestTimedOut::with_debug(self.timeout.as_secs(), &e))
            } else {
                ReservationsError::Network(RequestFailed::with_debug(endpoint, &e))
            }
        })?;
        check_status(endpoint, response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| ReservationsError::Network(RequestFailed::with_debug(endpoint, &e)))?;
        serde_json::from_str(&body)
            .map_err(|e| ReservationsError::Network(InvalidResponseBody::with_debug(endpoint, &e)))
    }
}

/// 401 means the session is over; any other non-2xx is a plain network
/// failure.
pub(crate) fn check_status(endpoint: &str, status: StatusCode) -> Result<(), ReservationsError> {
    if status == StatusCode::UNAUTHORIZED {
        Err(ReservationsError::Unauthenticated(AuthTokenRejected::new(endpoint)))
    } else if !status.is_success() {
        Err(ReservationsError::Network(UnexpectedStatus::new(
            endpoint,
            status.as_u16(),
        )))
    } else {
        Ok(())
    }
}

impl ReservationsPageQuery {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("startDate", format_day(self.from_date)),
            ("endDate", format_day(self.to_date)),
            (
                "dateType",
                match self.date_anchor {
                    DateAnchor::Arrival => "arrival",
                    DateAnchor::Departure => "departure",
                }
                .to_string(),
            ),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if !self.property_ids.is_empty() {
            pairs.push(("propertyIds", self.property_ids.join(",")));
        }
        if !self.statuses.is_empty() {
            pairs.push(("statuses", self.statuses.join(",")));
        }
        pairs
    }
}

#[async_trait]
impl ReservationsApiDatasource for ReservationsApiDatasourceImpl {
    async fn fetch_reservations_page(
        &self,
        query: &ReservationsPageQuery,
    ) -> Result<ReservationsPageModel, ReservationsError> {
        let request = self
            .client
            .get(self.url(RESERVATIONS_ENDPOINT))
            .query(&query.query_pairs());
        self.send_json::<ReservationsResponseModel>(RESERVATIONS_ENDPOINT, request)
            .await
            .map(Into::into)
    }

    async fn fetch_financial_report(
        &self,
        reservation_ids: &[String],
    ) -> Result<FinancialReportModel, ReservationsError> {
        let request = self
            .client
            .post(self.url(FINANCIAL_REPORT_ENDPOINT))
            .json(&json!({ "reservationIds": reservation_ids }));
        self.send_json::<FinancialReportResponseModel>(FINANCIAL_REPORT_ENDPOINT, request)
            .await
            .map(Into::into)
    }
}
