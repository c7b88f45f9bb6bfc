use fractic_server_error::ServerError;

/// Failure categories surfaced to the UI. The wrapped `ServerError` carries
/// the human-readable message.
#[derive(Debug, thiserror::Error)]
pub enum ReservationsError {
    /// Token missing, expired or rejected (HTTP 401). The caller must
    /// re-authenticate; nothing is retried internally.
    #[error("authentication required: {0}")]
    Unauthenticated(ServerError),
    /// Timeout, transport failure, non-2xx status or non-JSON body.
    #[error("network error: {0}")]
    Network(ServerError),
}

impl ReservationsError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ReservationsError::Unauthenticated(_))
    }

    pub fn server_error(&self) -> &ServerError {
        match self {
            ReservationsError::Unauthenticated(e) | ReservationsError::Network(e) => e,
        }
    }
}
