use super::reservation::{Financials, Reservation};

/// Totals over a reservation list. Computed from the same list the UI
/// renders, so the totals always reconcile with the rows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FinancialSummary {
    pub reservation_count: usize,
    pub total_nights: u64,
    pub totals: Financials,
    /// Reservations that had no financial report row.
    pub missing_financial_data: usize,
}

impl FinancialSummary {
    pub fn of(reservations: &[Reservation]) -> Self {
        reservations
            .iter()
            .fold(FinancialSummary::default(), |mut acc, r| {
                acc.reservation_count += 1;
                acc.total_nights += u64::from(r.nights);
                acc.totals.base_rate += r.financials.base_rate;
                acc.totals.cleaning_fee += r.financials.cleaning_fee;
                acc.totals.processing_fee += r.financials.processing_fee;
                acc.totals.channel_fee += r.financials.channel_fee;
                acc.totals.management_fee += r.financials.management_fee;
                acc.totals.owner_payout += r.financials.owner_payout;
                acc.totals.total_price += r.financials.total_price;
                if r.financial_data.is_none() {
                    acc.missing_financial_data += 1;
                }
                acc
            })
    }

    pub fn average_nightly_payout(&self) -> f64 {
        if self.total_nights == 0 {
            0.0
        } else {
            self.totals.owner_payout / self.total_nights as f64
        }
    }
}
