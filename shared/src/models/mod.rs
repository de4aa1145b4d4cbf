//! Domain models for the Pharmacy Operations Assistant

mod medication;
mod notification;
mod patient;
mod prescription;
mod product;
mod stock;

pub use medication::*;
pub use notification::*;
pub use patient::*;
pub use prescription::*;
pub use product::*;
pub use stock::*;
