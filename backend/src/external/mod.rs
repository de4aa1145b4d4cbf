//! Clients for external services

pub mod email;
