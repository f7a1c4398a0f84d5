//! Bluetooth printers (SPP / RFCOMM)
//!
//! The radio itself belongs to the host platform and is reached through
//! [`BluetoothRadio`]; this adapter owns the profile-level rules.

use super::{Connection, Transport, profile_timeout};
use crate::error::{PrintError, PrinterResult};
use shared::{PrinterProfile, TransportType};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Host Bluetooth stack
pub trait BluetoothRadio: Send + Sync {
    /// Radio present and switched on
    fn is_enabled(&self) -> bool;

    /// MAC addresses of bonded devices
    fn paired_devices(&self) -> Vec<String>;

    /// Open a serial channel to a bonded device
    fn open(&self, mac: &str, timeout: Duration) -> io::Result<Box<dyn Connection>>;
}

/// Radio for hosts without Bluetooth
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRadio;

impl BluetoothRadio for UnavailableRadio {
    fn is_enabled(&self) -> bool {
        false
    }

    fn paired_devices(&self) -> Vec<String> {
        Vec::new()
    }

    fn open(&self, mac: &str, _timeout: Duration) -> io::Result<Box<dyn Connection>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no Bluetooth radio to reach {}", mac),
        ))
    }
}

/// Transport for `{mac}` profiles
#[derive(Clone)]
pub struct BluetoothTransport {
    radio: Arc<dyn BluetoothRadio>,
}

impl BluetoothTransport {
    pub fn new(radio: Arc<dyn BluetoothRadio>) -> Self {
        Self { radio }
    }

    /// Normalize `aa:bb:cc:dd:ee:ff` / `AA-BB-...` to upper-case colon form
    pub fn normalize_mac(raw: &str) -> Option<String> {
        let parts: Vec<&str> = raw.trim().split([':', '-']).collect();
        let valid = parts.len() == 6
            && parts
                .iter()
                .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()));
        valid.then(|| parts.join(":").to_ascii_uppercase())
    }
}

impl Transport for BluetoothTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Bluetooth
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    fn connect(&self, profile: &PrinterProfile) -> PrinterResult<Box<dyn Connection>> {
        let raw = profile.connection_params.get_str("mac").ok_or_else(|| {
            PrintError::InvalidConfig(format!(
                "Profile '{}' has no Bluetooth address",
                profile.display_name
            ))
        })?;
        let mac = Self::normalize_mac(&raw)
            .ok_or_else(|| PrintError::InvalidConfig(format!("Invalid Bluetooth address: {}", raw)))?;

        if !self.radio.is_enabled() {
            return Err(PrintError::Connection("Bluetooth is turned off".to_string()));
        }

        let paired = self
            .radio
            .paired_devices()
            .iter()
            .any(|d| Self::normalize_mac(d).as_deref() == Some(mac.as_str()));
        if !paired {
            return Err(PrintError::Connection(format!(
                "Bluetooth printer {} is not paired",
                mac
            )));
        }

        info!(%mac, "Opening Bluetooth channel");
        self.radio
            .open(&mac, profile_timeout(profile))
            .map_err(|e| PrintError::Connection(format!("Bluetooth {}: {}", mac, e)))
    }
}
