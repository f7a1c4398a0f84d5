//! Shared types for the print bridge
//!
//! Wire and data models used by both the printer library and the
//! print bridge: printer profiles, sale records and print results.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::FailureKind;
pub use models::{
    ConnectionParams, PrintResult, PrinterProfile, ReceiptKind, SaleItem, SaleRecord,
    TransportType,
};
pub use serde::{Deserialize, Serialize};
