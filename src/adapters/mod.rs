//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes, DTOs and middleware
//! - `memory` - In-memory persistence used by tests
//! - `postgres` - PostgreSQL persistence
//! - `stripe` - Stripe API client and a configurable mock

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
