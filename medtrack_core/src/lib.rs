#![forbid(unsafe_code)]

//! Core domain model and business logic for the Medtrack inventory.
//!
//! This crate provides:
//! - Domain types (medicine records, schedules, updates, projections)
//! - The stock projector (time decay and restock forecasting)
//! - Persistence (record store trait, JSON file store)
//! - The inventory service hosts talk to
//! - CSV export, configuration and logging

pub mod types;
pub mod error;
pub mod dates;
pub mod config;
pub mod logging;
pub mod projector;
pub mod store;
pub mod inventory;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use projector::{project, total_restock_cost, Clock, FixedClock, SystemClock, LOW_STOCK_DAYS};
pub use store::{JsonFileStore, MedicineStore, MemoryStore};
pub use inventory::Inventory;
