//! HTTP handlers

pub mod medication;
pub mod notification;
pub mod patient;
pub mod prescription;
pub mod product;
pub mod stock;

pub use medication::*;
pub use notification::*;
pub use patient::*;
pub use prescription::*;
pub use product::*;
pub use stock::*;
