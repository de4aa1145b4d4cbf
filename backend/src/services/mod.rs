//! Business logic services

pub mod medication;
pub mod notification;
pub mod patient;
pub mod prescription;
pub mod product;
pub mod stock;
pub mod trigger;
