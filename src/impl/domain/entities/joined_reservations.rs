use super::reservation::Reservation;

/// Result of one fetch-and-join round-trip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinedReservations {
    pub reservations: Vec<Reservation>,
    /// The backend still reported more reservations when paging stopped.
    pub truncated: bool,
}
