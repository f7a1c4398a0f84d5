//! Print bridge
//!
//! Receipt printing orchestration for a POS web shell: resolves which
//! printer a call goes to, converts HTML and sale records to receipt
//! text, and drives the ESC/POS or vendor SDK path through
//! [`pos_printer`].
//!
//! # Module structure
//!
//! ```text
//! print-bridge/src/
//! ├── config.rs     # environment configuration
//! ├── logger.rs     # tracing subscriber setup
//! ├── store.rs      # redb printer profile store
//! ├── resolve.rs    # profile resolution policy
//! ├── convert/      # HTML and sale record to text
//! ├── handler.rs    # unified print state machine
//! └── service.rs    # async facade (blocking pool)
//! ```

pub mod config;
pub mod convert;
pub mod handler;
pub mod logger;
pub mod resolve;
pub mod service;
pub mod store;

pub use config::Config;
pub use handler::{HandlerOptions, HtmlRenderer, PrintHandler, Stage};
pub use resolve::resolve_profile;
pub use service::PrintService;
pub use store::{ProfileStore, StoreError, StoreResult};
