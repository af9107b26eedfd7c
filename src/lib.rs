//! Jobboard Billing - Stripe checkout and webhook reconciliation
//!
//! This crate opens hosted Stripe checkout sessions for jobboard users and
//! applies verified Stripe webhook events to the local subscription and
//! payment ledger, exactly once per logical event.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
