mod r#impl;
pub(crate) use r#impl::data;
pub(crate) use r#impl::domain;
pub use r#impl::exports::*;
#[cfg(test)]
pub(crate) use r#impl::test_utils;

pub mod aggregator;
pub mod config;
pub mod errors;
