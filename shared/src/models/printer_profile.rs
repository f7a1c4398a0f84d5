//! Printer Profile Model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 58mm paper
pub const PAPER_58MM_DOTS: u32 = 384;
/// 80mm paper
pub const PAPER_80MM_DOTS: u32 = 576;
/// 112mm paper
pub const PAPER_112MM_DOTS: u32 = 832;

/// Paper widths a profile may use
pub const SUPPORTED_PAPER_WIDTHS: [u32; 3] = [PAPER_58MM_DOTS, PAPER_80MM_DOTS, PAPER_112MM_DOTS];

/// Largest width/height multiplier accepted by `GS !`
pub const MAX_SCALE_MULTIPLIER: u8 = 7;

/// Default raw TCP port for network printers
pub const DEFAULT_LAN_PORT: u16 = 9100;

/// Physical/link channel used to reach a printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransportType {
    #[serde(rename = "bluetooth")]
    Bluetooth,
    #[serde(rename = "usb")]
    Usb,
    #[serde(rename = "lan")]
    Lan,
    /// Epson SDK
    #[serde(rename = "vendor-sdk-a")]
    VendorSdkA,
    /// XPrinter SDK
    #[serde(rename = "vendor-sdk-b")]
    VendorSdkB,
    /// Generic vendor SDK
    #[serde(rename = "vendor-sdk-c")]
    VendorSdkC,
    #[serde(rename = "cloud-sdk")]
    CloudSdk,
}

impl TransportType {
    /// Core transports, seeded into an empty store in this order
    pub const CORE: [TransportType; 3] = [Self::Bluetooth, Self::Usb, Self::Lan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Usb => "usb",
            Self::Lan => "lan",
            Self::VendorSdkA => "vendor-sdk-a",
            Self::VendorSdkB => "vendor-sdk-b",
            Self::VendorSdkC => "vendor-sdk-c",
            Self::CloudSdk => "cloud-sdk",
        }
    }

    /// Bluetooth, USB or LAN
    pub fn is_core(&self) -> bool {
        Self::CORE.contains(self)
    }

    /// Transports that take raw ESC/POS bytes (as opposed to an SDK backend)
    pub fn is_escpos(&self) -> bool {
        self.is_core()
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "bluetooth" | "bt" => Ok(Self::Bluetooth),
            "usb" => Ok(Self::Usb),
            "lan" | "network" | "tcp" => Ok(Self::Lan),
            "vendor-sdk-a" | "epson" => Ok(Self::VendorSdkA),
            "vendor-sdk-b" | "xprinter" => Ok(Self::VendorSdkB),
            "vendor-sdk-c" | "vendor" => Ok(Self::VendorSdkC),
            "cloud-sdk" | "cloud" => Ok(Self::CloudSdk),
            other => Err(format!("Unknown transport type: {}", other)),
        }
    }
}

/// Transport-specific connection parameters
///
/// Values are kept as JSON so the web layer may send `"port": 9100`
/// or `"port": "9100"` interchangeably.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionParams(BTreeMap<String, Value>);

impl ConnectionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, returning `self` for chaining
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Get a parameter as a non-empty string
    pub fn get_str(&self, key: &str) -> Option<String> {
        let s = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if s.is_empty() { None } else { Some(s) }
    }

    /// Get a parameter as u16, accepting decimal or `0x` hex strings
    pub fn get_u16(&self, key: &str) -> Option<u16> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
            Value::String(s) => {
                let s = s.trim();
                if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    u16::from_str_radix(hex, 16).ok()
                } else {
                    s.parse().ok()
                }
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A saved printer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterProfile {
    pub id: String,
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    #[serde(rename = "name")]
    pub display_name: String,
    pub enabled: bool,
    pub is_default: bool,
    pub paper_width_dots: u32,
    #[serde(rename = "leftMargin", default)]
    pub left_margin_dots: u32,
    #[serde(rename = "rightMargin", default)]
    pub right_margin_dots: u32,
    #[serde(rename = "lineSpacing", default = "default_line_spacing")]
    pub line_spacing_units: u32,
    #[serde(default)]
    pub width_multiplier: u8,
    #[serde(default)]
    pub height_multiplier: u8,
    #[serde(rename = "charset", default = "default_charset")]
    pub charset_name: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub connection_params: ConnectionParams,
    /// Millis since epoch of the last successful selection
    #[serde(default)]
    pub last_used_at: Option<i64>,
}

fn default_line_spacing() -> u32 {
    30
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl PrinterProfile {
    /// Create a new enabled, non-default profile with 80mm defaults
    pub fn new(transport_type: TransportType, display_name: impl Into<String>) -> Self {
        Self {
            id: crate::util::new_profile_id(),
            transport_type,
            display_name: display_name.into(),
            enabled: true,
            is_default: false,
            paper_width_dots: PAPER_80MM_DOTS,
            left_margin_dots: 0,
            right_margin_dots: 0,
            line_spacing_units: default_line_spacing(),
            width_multiplier: 0,
            height_multiplier: 0,
            charset_name: default_charset(),
            timeout_ms: default_timeout_ms(),
            connection_params: ConnectionParams::new(),
            last_used_at: None,
        }
    }

    /// Seed profile for a core transport: enabled, default, 80mm, no margins
    pub fn seed(transport_type: TransportType) -> Self {
        let name = match transport_type {
            TransportType::Bluetooth => "Bluetooth printer",
            TransportType::Usb => "USB printer",
            TransportType::Lan => "Network printer",
            other => other.as_str(),
        };
        let mut profile = Self::new(transport_type, name);
        profile.is_default = true;
        if transport_type == TransportType::Lan {
            profile
                .connection_params
                .insert("port", u64::from(DEFAULT_LAN_PORT));
        }
        profile
    }

    pub fn with_params(mut self, params: ConnectionParams) -> Self {
        self.connection_params = params;
        self
    }

    pub fn with_paper_width(mut self, dots: u32) -> Self {
        self.paper_width_dots = dots;
        self
    }

    pub fn with_margins(mut self, left: u32, right: u32) -> Self {
        self.left_margin_dots = left;
        self.right_margin_dots = right;
        self
    }

    pub fn with_scale(mut self, width: u8, height: u8) -> Self {
        self.width_multiplier = width;
        self.height_multiplier = height;
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset_name = charset.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Check the physical invariants of the profile
    ///
    /// Returns a human-readable reason for the first violated rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("profile id must not be empty".to_string());
        }
        if !SUPPORTED_PAPER_WIDTHS.contains(&self.paper_width_dots) {
            return Err(format!(
                "unsupported paper width {} dots (expected one of {:?})",
                self.paper_width_dots, SUPPORTED_PAPER_WIDTHS
            ));
        }
        let margins = u64::from(self.left_margin_dots) + u64::from(self.right_margin_dots);
        if margins >= u64::from(self.paper_width_dots) {
            return Err(format!(
                "margins {}+{} leave no printable width on {} dots",
                self.left_margin_dots, self.right_margin_dots, self.paper_width_dots
            ));
        }
        if self.width_multiplier > MAX_SCALE_MULTIPLIER
            || self.height_multiplier > MAX_SCALE_MULTIPLIER
        {
            return Err(format!(
                "font multipliers must be 0..={} (got {}x{})",
                MAX_SCALE_MULTIPLIER, self.width_multiplier, self.height_multiplier
            ));
        }
        Ok(())
    }

    /// Printable width in dots (paper minus margins)
    pub fn printable_width_dots(&self) -> u32 {
        self.paper_width_dots
            .saturating_sub(self.left_margin_dots)
            .saturating_sub(self.right_margin_dots)
    }

    /// Eligible for automatic selection
    pub fn is_selectable(&self) -> bool {
        self.enabled
    }
}
