//! Shared domain types for the Pharmacy Operations Assistant
//!
//! This crate contains the domain models and pure policy logic shared by the
//! backend services: stock batches, notifications, patients, medications,
//! prescriptions, products, and the expiry policy. Everything time-relative
//! takes "now" or "today" as an argument so callers and tests control it.

pub mod expiry;
pub mod models;

pub use expiry::*;
pub use models::*;
