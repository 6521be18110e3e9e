//! Core type definitions using newtype patterns for type safety.
//!
//! These types make invalid ports and malformed host lists unrepresentable
//! before they ever reach the probing engine.

mod port;
mod scan_id;
mod target;

pub use port::{Port, PortError, PortRange, PortSpec};
pub use scan_id::{ScanId, ScanIdError};
pub use target::{Target, TargetError, TargetSpec};
