//! HTTP inbound adapter exposing REST endpoints.

pub mod accounts;
pub mod error;
pub mod extractors;
pub mod health;
pub mod photos;
pub mod routes;
pub mod schemas;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod trees;

pub use error::ApiResult;
