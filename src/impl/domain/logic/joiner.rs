use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::{
    domain::logic::{
        field_sources::value_as_text,
        normalizer::{reservation_id, Normalizer},
    },
    entities::Reservation,
};

pub(crate) struct JoinOutcome {
    pub(crate) reservations: Vec<Reservation>,
    pub(crate) matched: usize,
    pub(crate) unused_financial_rows: usize,
}

/// Left join of raw reservations against financial report rows. Every
/// reservation is kept; rows without a reservation are ignored.
pub(crate) struct Joiner {
    normalizer: Normalizer,
}

impl Joiner {
    pub(crate) fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub(crate) fn join(
        &self,
        raw_reservations: &[Map<String, Value>],
        financial_rows: &[Map<String, Value>],
    ) -> JoinOutcome {
        let lookup = financial_lookup(financial_rows);

        let mut used_rows = HashSet::new();
        let mut matched = 0;
        let reservations = raw_reservations
            .iter()
            .map(|raw| {
                let financial = reservation_id(raw).and_then(|id| lookup.get(id.as_str()).copied());
                if let Some(row_index) = financial {
                    matched += 1;
                    used_rows.insert(row_index);
                }
                self.normalizer
                    .normalize(raw, financial.map(|i| &financial_rows[i]))
            })
            .collect();

        JoinOutcome {
            reservations,
            matched,
            unused_financial_rows: financial_rows.len() - used_rows.len(),
        }
    }
}

/// Reservation id → row index. Rows are indexed under both `reservationId`
/// and `id`; an explicit `reservationId` always wins over another row's `id`.
fn financial_lookup(rows: &[Map<String, Value>]) -> HashMap<String, usize> {
    let mut lookup = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(id) = row.get("reservationId").and_then(value_as_text) {
            lookup.entry(id).or_insert(i);
        }
    }
    for (i, row) in rows.iter().enumerate() {
        if let Some(id) = row.get("id").and_then(value_as_text) {
            lookup.entry(id).or_insert(i);
        }
    }
    lookup
}
