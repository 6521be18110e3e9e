//! Host report persistence.
//!
//! Provides JSON-based storage for completed host reports.

mod json_store;

pub use json_store::{HostRecord, JsonStore, PortRecord};
