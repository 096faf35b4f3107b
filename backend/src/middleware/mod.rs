//! Request middleware.
//!
//! Purpose: request lifecycle concerns that sit outside handlers, currently
//! trace identifiers and access logging.

pub mod trace;

pub use trace::Trace;
