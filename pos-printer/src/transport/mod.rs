//! Transport adapters
//!
//! Every physical channel implements the same byte-sink shape: connect
//! with a profile, write bytes, close. A connection belongs to the one
//! print operation that opened it and is closed by [`ConnectionGuard`]
//! on every exit path.

mod backend;
mod bluetooth;
mod job;
mod lan;
mod usb;

pub use backend::{
    BackendContent, BackendRegistry, NullBackend, PrinterBackend, print_with_backend,
};
pub use bluetooth::{BluetoothRadio, BluetoothTransport, UnavailableRadio};
pub use job::{EscPosJob, JobSettings};
pub use lan::LanTransport;
pub use usb::{UnavailableUsbHost, UsbDevice, UsbHost, UsbTransport, select_device};

use crate::error::PrinterResult;
use shared::{PrinterProfile, TransportType};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// An open byte sink to one printer
pub trait Connection: Send {
    /// Write all bytes, honoring the profile's timeout
    fn write_all(&mut self, bytes: &[u8]) -> PrinterResult<()>;

    /// Release the handle; calling it twice is a no-op and never fails
    fn close(&mut self);
}

/// A channel able to open connections for profiles of one transport type
pub trait Transport: Send + Sync {
    fn transport_type(&self) -> TransportType;

    fn connect(&self, profile: &PrinterProfile) -> PrinterResult<Box<dyn Connection>>;
}

/// Connect/write timeout of a profile (at least 1 ms)
pub fn profile_timeout(profile: &PrinterProfile) -> Duration {
    Duration::from_millis(profile.timeout_ms.max(1))
}

/// Exclusive owner of an open connection
///
/// Closes the connection on drop. A failed write closes it right away,
/// before the error reaches the caller.
pub struct ConnectionGuard {
    conn: Option<Box<dyn Connection>>,
    label: String,
}

impl ConnectionGuard {
    pub fn new(conn: Box<dyn Connection>, label: impl Into<String>) -> Self {
        Self {
            conn: Some(conn),
            label: label.into(),
        }
    }

    /// Write raw bytes
    pub fn write_all(&mut self, bytes: &[u8]) -> PrinterResult<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(crate::PrintError::Connection(format!(
                "{}: connection already closed",
                self.label
            )));
        };
        if let Err(e) = conn.write_all(bytes) {
            warn!(printer = %self.label, error = %e, "Write failed, closing connection");
            self.close();
            return Err(e);
        }
        Ok(())
    }

    /// Write a job segment by segment
    #[instrument(skip(self, job), fields(printer = %self.label, segments = job.segments().len(), bytes = job.byte_len()))]
    pub fn send_job(&mut self, job: &EscPosJob) -> PrinterResult<()> {
        for segment in job.segments() {
            self.write_all(segment)?;
        }
        debug!("Job written");
        Ok(())
    }

    /// Close now instead of on drop
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
            debug!(printer = %self.label, "Connection closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("label", &self.label)
            .field("open", &self.is_open())
            .finish()
    }
}
