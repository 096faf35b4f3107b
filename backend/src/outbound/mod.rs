//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Every driven port is backed by the managed Supabase project:
//!
//! - **supabase**: PostgREST tree records, GoTrue accounts and storage-bucket
//!   photos over one shared reqwest client
//!
//! Adapters are thin translators that convert between domain types and
//! wire representations. They contain no business logic.

pub mod supabase;
