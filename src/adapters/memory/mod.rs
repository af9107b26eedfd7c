//! In-memory adapters for the persistence ports.
//!
//! Used by unit and HTTP integration tests. Semantics match the PostgreSQL
//! adapters, including the set-once customer id and the creation-only
//! payment insert.

mod subscription_ledger;
mod user_repository;

pub use subscription_ledger::InMemorySubscriptionLedger;
pub use user_repository::InMemoryUserRepository;
