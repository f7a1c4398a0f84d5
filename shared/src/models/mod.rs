//! Data models
//!
//! Shared between the printer library, the print bridge and the web
//! layer (via JSON).

pub mod print_result;
pub mod printer_profile;
pub mod sale;

// Re-exports
pub use print_result::*;
pub use printer_profile::*;
pub use sale::*;
