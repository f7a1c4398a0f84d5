//! Print outcome returned across the UI boundary

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};

/// Outcome of a print attempt
///
/// Serializes to `{ "ok": bool, "msg": string }`. The failure kind stays
/// in-process for logging and retry hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintResult {
    #[serde(rename = "ok")]
    pub success: bool,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(skip)]
    pub kind: Option<FailureKind>,
}

impl PrintResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: None,
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: Some(kind),
        }
    }

    /// Serialize to the `{ok, msg}` wire form
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{{\"ok\":{},\"msg\":\"\"}}", self.success)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let result = PrintResult::failed(FailureKind::Connection, "Printer offline");
        let value: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(value, serde_json::json!({"ok": false, "msg": "Printer offline"}));
    }

    #[test]
    fn test_roundtrip_drops_kind() {
        let result = PrintResult::ok("Printed on Counter");
        let back: PrintResult = serde_json::from_str(&result.to_json()).unwrap();
        assert!(back.success);
        assert_eq!(back.message, "Printed on Counter");
        assert!(back.kind.is_none());
    }
}
