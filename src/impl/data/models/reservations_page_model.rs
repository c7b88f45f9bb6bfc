use serde_derive::Deserialize;
use serde_json::{Map, Value};

/// One page of the reservations endpoint. The payload may be wrapped in a
/// `result` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ReservationsResponseModel {
    Enveloped { result: ReservationsPageModel },
    Bare(ReservationsPageModel),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReservationsPageModel {
    #[serde(default, alias = "result", alias = "data")]
    pub(crate) reservations: Vec<Map<String, Value>>,
    #[serde(default)]
    pub(crate) meta: Option<PaginationModel>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaginationModel {
    pub(crate) total: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    #[serde(alias = "has_more")]
    pub(crate) has_more: Option<bool>,
}

impl From<ReservationsResponseModel> for ReservationsPageModel {
    fn from(model: ReservationsResponseModel) -> Self {
        match model {
            ReservationsResponseModel::Enveloped { result } => result,
            ReservationsResponseModel::Bare(page) => page,
        }
    }
}

impl ReservationsPageModel {
    /// Whether another page must be requested after this one: either the
    /// backend says `hasMore`, or the page came back full. A full page is
    /// never trusted to be the last one, whatever `hasMore` claims.
    pub(crate) fn may_have_more(&self, requested_limit: u64) -> bool {
        let has_more = self.meta.and_then(|m| m.has_more) == Some(true);
        let full_page = requested_limit > 0 && self.reservations.len() as u64 >= requested_limit;
        has_more || full_page
    }
}
