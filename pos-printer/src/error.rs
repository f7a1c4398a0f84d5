//! Error types for the printer library

use shared::FailureKind;
use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// No enabled profile to print on
    #[error("No printer configured")]
    NoPrinterConfigured,

    /// Device unreachable, radio off, pairing lost or timed out
    #[error("Connection failed: {0}")]
    Connection(String),

    /// OS-level access to the device not granted
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Optional SDK backend missing or unable to run the job
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Content could not be turned into printable text
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Write failed after the connection succeeded
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed command framing
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PrintError {
    /// Failure category reported to the caller
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoPrinterConfigured => FailureKind::NoPrinterConfigured,
            Self::Connection(_) => FailureKind::Connection,
            Self::Permission(_) => FailureKind::Permission,
            Self::BackendUnavailable(_) => FailureKind::BackendUnavailable,
            Self::Conversion(_) => FailureKind::Conversion,
            Self::Io(_) => FailureKind::Io,
            Self::Protocol(_) => FailureKind::Protocol,
            Self::InvalidConfig(_) => FailureKind::InvalidConfig,
        }
    }

    /// Write failure with context
    pub fn write_failed(context: &str, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", context, err),
        ))
    }
}

/// Result type for printer operations
pub type PrinterResult<T> = Result<T, PrintError>;
