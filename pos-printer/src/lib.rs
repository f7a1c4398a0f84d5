//! # pos-printer
//!
//! ESC/POS receipt printer library: HOW to print.
//!
//! ## Scope
//!
//! - ESC/POS command encoding (text, cut, barcode, QR, raster)
//! - Charset handling, including Kanji mode for GBK/Big5 printers
//! - Fixed-width line layout (wrapping, column alignment)
//! - Bluetooth, USB and LAN transports behind one byte-sink trait
//! - Vendor/cloud SDK backends behind a registry
//!
//! WHAT to print (HTML conversion, sale records, profile resolution)
//! lives in `print-bridge`.
//!
//! ## Example
//!
//! ```ignore
//! use pos_printer::{ConnectionGuard, EscPosJob, JobSettings, LanTransport, Transport, layout};
//!
//! let width = layout::chars_per_line(576, 0, 0, 0);
//! let lines = layout::wrap("Latte 3.50", width);
//! let job = EscPosJob::text(&lines, &JobSettings::from_profile(&profile, Default::default(), None));
//!
//! let conn = LanTransport::new().connect(&profile)?;
//! ConnectionGuard::new(conn, &profile.id).send_job(&job)?;
//! ```

mod encoding;
mod error;
pub mod escpos;
pub mod layout;
mod raster;
pub mod transport;

// Re-exports
pub use encoding::Charset;
pub use error::{PrintError, PrinterResult};
pub use escpos::{CutMode, DrawerPin, HriPosition, Justify, QrErrorCorrection, Symbology};
pub use raster::{decode_image, raster_image};
pub use transport::{
    BackendContent, BackendRegistry, BluetoothRadio, BluetoothTransport, Connection,
    ConnectionGuard, EscPosJob, JobSettings, LanTransport, NullBackend, PrinterBackend,
    Transport, UnavailableRadio, UnavailableUsbHost, UsbDevice, UsbHost, UsbTransport,
    print_with_backend,
};

pub use image::DynamicImage;
