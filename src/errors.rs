use fractic_server_error::{define_client_error, define_internal_error};

// Config-related.
define_client_error!(ConfigReadError, "Error reading config file '{path}'.", { path: &str });
define_client_error!(InvalidConfig, "Invalid config (invalid RON format).");

// Parsing-related.
define_client_error!(InvalidIsoDate, "Invalid ISO date: {date}.", { date: &str });
define_client_error!(InvalidAmount, "Invalid amount: '{value}'.", { value: &str });

// Authentication-related.
define_client_error!(
    MissingAuthToken,
    "No authentication token available. Sign in again to continue."
);
define_client_error!(
    AuthTokenRejected,
    "The backend rejected the authentication token for '{endpoint}'. Sign in again to continue.",
    { endpoint: &str }
);

// Network-related.
define_client_error!(RequestFailed, "Request to '{endpoint}' failed.", { endpoint: &str });
define_client_error!(
    UnexpectedStatus,
    "Request to '{endpoint}' returned HTTP {status}.",
    { endpoint: &str, status: u16 }
);
define_client_error!(
    InvalidResponseBody,
    "Response from '{endpoint}' was not valid JSON.",
    { endpoint: &str }
);
define_client_error!(
    RequestTimedOut,
    "Loading reservations timed out after {seconds} seconds.",
    { seconds: u64 }
);

// Cache-related.
define_internal_error!(CacheReadError, "Error reading cache entry '{key}'.", { key: &str });
define_internal_error!(CacheWriteError, "Error writing cache entry '{key}'.", { key: &str });
define_internal_error!(
    CacheSerializationError,
    "Error serializing cache entry '{key}'.",
    { key: &str }
);
