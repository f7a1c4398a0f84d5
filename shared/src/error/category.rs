//! Print failure categories

use serde::{Deserialize, Serialize};

/// Failure category of a print attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No enabled printer profile could be resolved
    NoPrinterConfigured,
    /// Profile parameters unusable for the transport
    InvalidConfig,
    /// Device unreachable, radio off or timed out
    Connection,
    /// OS-level access to the device not granted
    Permission,
    /// Write failed after the connection succeeded
    Io,
    /// Optional vendor/cloud SDK missing or unsupported operation
    BackendUnavailable,
    /// Content could not be turned into printable text
    Conversion,
    /// Malformed command framing
    Protocol,
    /// Profile store failure
    Storage,
}

impl FailureKind {
    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoPrinterConfigured => "no_printer_configured",
            Self::InvalidConfig => "invalid_config",
            Self::Connection => "connection",
            Self::Permission => "permission",
            Self::Io => "io",
            Self::BackendUnavailable => "backend_unavailable",
            Self::Conversion => "conversion",
            Self::Protocol => "protocol",
            Self::Storage => "storage",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_name_matches_display() {
        let json = serde_json::to_string(&FailureKind::BackendUnavailable).unwrap();
        assert_eq!(json, "\"backend_unavailable\"");
        assert_eq!(FailureKind::BackendUnavailable.to_string(), "backend_unavailable");
    }
}
