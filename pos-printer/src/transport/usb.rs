//! USB printers (bulk OUT endpoint)

use super::{Connection, Transport, profile_timeout};
use crate::error::{PrintError, PrinterResult};
use shared::{PrinterProfile, TransportType};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// USB device as enumerated by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    /// OS device name/path
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Exposes a printer-class (0x07) interface
    pub printer_class: bool,
}

/// Host USB stack
pub trait UsbHost: Send + Sync {
    fn devices(&self) -> Vec<UsbDevice>;

    /// OS-level permission to claim the device was granted
    fn has_permission(&self, device: &UsbDevice) -> bool;

    /// Claim the device and open its bulk OUT endpoint
    fn open(&self, device: &UsbDevice, timeout: Duration) -> io::Result<Box<dyn Connection>>;
}

/// Host without USB access
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableUsbHost;

impl UsbHost for UnavailableUsbHost {
    fn devices(&self) -> Vec<UsbDevice> {
        Vec::new()
    }

    fn has_permission(&self, _device: &UsbDevice) -> bool {
        false
    }

    fn open(&self, device: &UsbDevice, _timeout: Duration) -> io::Result<Box<dyn Connection>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no USB host to open {}", device.name),
        ))
    }
}

/// Pick the device a profile refers to
///
/// Matches `deviceName` first, then the `(vendorId, productId)` pair,
/// then falls back to the first printer-class device.
pub fn select_device<'a>(devices: &'a [UsbDevice], profile: &PrinterProfile) -> Option<&'a UsbDevice> {
    let params = &profile.connection_params;

    if let Some(name) = params.get_str("deviceName")
        && let Some(d) = devices.iter().find(|d| d.name == name)
    {
        return Some(d);
    }

    if let (Some(vid), Some(pid)) = (params.get_u16("vendorId"), params.get_u16("productId"))
        && let Some(d) = devices
            .iter()
            .find(|d| d.vendor_id == vid && d.product_id == pid)
    {
        return Some(d);
    }

    devices.iter().find(|d| d.printer_class)
}

/// Transport for `{deviceName, vendorId, productId}` profiles
#[derive(Clone)]
pub struct UsbTransport {
    host: Arc<dyn UsbHost>,
}

impl UsbTransport {
    pub fn new(host: Arc<dyn UsbHost>) -> Self {
        Self { host }
    }
}

impl Transport for UsbTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Usb
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    fn connect(&self, profile: &PrinterProfile) -> PrinterResult<Box<dyn Connection>> {
        let devices = self.host.devices();
        debug!(count = devices.len(), "USB devices enumerated");

        let device = select_device(&devices, profile)
            .ok_or_else(|| PrintError::Connection("No USB printer attached".to_string()))?;

        if !self.host.has_permission(device) {
            return Err(PrintError::Permission(format!(
                "USB access to {} ({:04x}:{:04x}) not granted",
                device.name, device.vendor_id, device.product_id
            )));
        }

        info!(device = %device.name, "Opening USB printer");
        self.host
            .open(device, profile_timeout(profile))
            .map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    PrintError::Permission(format!("{}: {}", device.name, e))
                }
                _ => PrintError::Connection(format!("{}: {}", device.name, e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ConnectionParams;

    fn devices() -> Vec<UsbDevice> {
        vec![
            UsbDevice {
                name: "/dev/bus/usb/001/002".into(),
                vendor_id: 0x046d,
                product_id: 0xc52b,
                printer_class: false,
            },
            UsbDevice {
                name: "/dev/bus/usb/001/003".into(),
                vendor_id: 0x0416,
                product_id: 0x5011,
                printer_class: true,
            },
            UsbDevice {
                name: "/dev/bus/usb/001/004".into(),
                vendor_id: 0x04b8,
                product_id: 0x0202,
                printer_class: true,
            },
        ]
    }

    fn profile(params: ConnectionParams) -> PrinterProfile {
        PrinterProfile::new(TransportType::Usb, "usb").with_params(params)
    }

    #[test]
    fn test_select_by_name() {
        let devs = devices();
        let p = profile(ConnectionParams::new().with("deviceName", "/dev/bus/usb/001/004"));
        assert_eq!(select_device(&devs, &p).unwrap().vendor_id, 0x04b8);
    }

    #[test]
    fn test_select_by_ids() {
        let devs = devices();
        let p = profile(
            ConnectionParams::new()
                .with("deviceName", "gone")
                .with("vendorId", "0x04b8")
                .with("productId", 0x0202),
        );
        assert_eq!(select_device(&devs, &p).unwrap().name, "/dev/bus/usb/001/004");
    }

    #[test]
    fn test_fallback_first_printer_class() {
        let devs = devices();
        let p = profile(ConnectionParams::new());
        assert_eq!(select_device(&devs, &p).unwrap().vendor_id, 0x0416);
        assert!(select_device(&devs[..1], &p).is_none());
    }

    struct NoPermission;

    impl UsbHost for NoPermission {
        fn devices(&self) -> Vec<UsbDevice> {
            devices()
        }
        fn has_permission(&self, _device: &UsbDevice) -> bool {
            false
        }
        fn open(&self, _device: &UsbDevice, _timeout: Duration) -> io::Result<Box<dyn Connection>> {
            Err(io::Error::other("unreachable"))
        }
    }

    #[test]
    fn test_missing_permission_is_distinct() {
        let transport = UsbTransport::new(Arc::new(NoPermission));
        let err = transport.connect(&profile(ConnectionParams::new())).err().unwrap();
        assert!(matches!(err, PrintError::Permission(_)));

        let empty = UsbTransport::new(Arc::new(UnavailableUsbHost));
        let err = empty.connect(&profile(ConnectionParams::new())).err().unwrap();
        assert!(matches!(err, PrintError::Connection(_)));
    }
}
