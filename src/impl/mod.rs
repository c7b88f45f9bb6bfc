// Crate-internal.
// ---

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod auth_token_provider;
        pub(crate) mod cache_store;
        pub(crate) mod reservations_api_datasource;
    }
    pub(crate) mod models {
        pub(crate) mod amount_model;
        pub(crate) mod cached_reservations_model;
        pub(crate) mod financial_report_model;
        pub(crate) mod iso_date_model;
        pub(crate) mod reservations_page_model;
    }
    pub(crate) mod repositories {
        pub(crate) mod cache_repository_impl;
        pub(crate) mod reservations_repository_impl;
    }
}

pub(crate) mod domain {
    pub(crate) mod entities {
        pub(crate) mod cache_key;
        pub(crate) mod fetch_params;
        pub(crate) mod filter_state;
        pub(crate) mod financial_summary;
        pub(crate) mod joined_reservations;
        pub(crate) mod reservation;
        pub(crate) mod reservation_view;
        pub(crate) mod reservations_error;
    }
    pub(crate) mod logic {
        pub(crate) mod field_sources;
        pub(crate) mod filter_engine;
        pub(crate) mod in_flight;
        pub(crate) mod joiner;
        pub(crate) mod normalizer;
    }
    pub(crate) mod repositories {
        pub(crate) mod cache_repository;
        pub(crate) mod reservations_repository;
    }
    pub(crate) mod usecases {
        pub(crate) mod fetch_reservations_usecase;
    }
}

#[cfg(test)]
pub(crate) mod test_utils;

// Public exports.
// ---

#[doc(hidden)]
#[allow(unused_imports)]
pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod entities {
        pub use crate::domain::entities::cache_key::*;
        pub use crate::domain::entities::fetch_params::*;
        pub use crate::domain::entities::filter_state::*;
        pub use crate::domain::entities::financial_summary::*;
        pub use crate::domain::entities::joined_reservations::*;
        pub use crate::domain::entities::reservation::*;
        pub use crate::domain::entities::reservation_view::*;
        pub use crate::domain::entities::reservations_error::*;
        pub use crate::domain::usecases::fetch_reservations_usecase::SharedFetchResult;
    }

    pub mod adapters {
        pub use crate::data::datasources::auth_token_provider::*;
        pub use crate::data::datasources::cache_store::*;
    }

    pub mod filter {
        pub use crate::domain::logic::filter_engine::apply;
    }
}
