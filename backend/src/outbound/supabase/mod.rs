//! Reqwest adapters for the managed Supabase project.
//!
//! One [`SupabaseClient`] owns the connection pool, base URL and service key.
//! The record, auth and storage adapters borrow it to talk to PostgREST,
//! GoTrue and the storage API respectively. Adapters own transport details
//! only: request building, status mapping and decoding into domain types.

mod auth;
mod client;
mod dto;
mod errors;
mod records;
mod storage;

pub use auth::SupabaseAuthGateway;
pub use client::SupabaseClient;
pub use records::SupabaseTreeRepository;
pub use storage::SupabasePhotoStore;
