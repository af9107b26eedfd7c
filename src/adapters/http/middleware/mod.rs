//! HTTP middleware for axum.
//!
//! - `raw_body` - Captures exact request bytes for signed webhook routes

pub mod raw_body;

pub use raw_body::{capture_raw_body, RawBody, RawBodyLimit, STRIPE_SIGNATURE_HEADER};
