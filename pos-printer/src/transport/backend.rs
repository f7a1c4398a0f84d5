//! Vendor and cloud SDK backends
//!
//! SDK printers do not take raw ESC/POS; they accept text or a bitmap
//! through the vendor's own library. Backends are looked up in a
//! registry, and types without a registered backend get [`NullBackend`].

use crate::error::{PrintError, PrinterResult};
use image::DynamicImage;
use shared::{PrinterProfile, TransportType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Capability exposed by a vendor/cloud SDK
pub trait PrinterBackend: Send + Sync {
    fn name(&self) -> &str;

    /// SDK library present and usable on this host
    fn is_available(&self) -> bool;

    fn print_text(&self, profile: &PrinterProfile, text: &str) -> bool;

    fn print_bitmap(&self, profile: &PrinterProfile, image: &DynamicImage) -> bool;
}

/// Stand-in for an SDK that is not installed
#[derive(Debug, Clone)]
pub struct NullBackend {
    transport_type: TransportType,
}

impl NullBackend {
    pub fn new(transport_type: TransportType) -> Self {
        Self { transport_type }
    }
}

impl PrinterBackend for NullBackend {
    fn name(&self) -> &str {
        self.transport_type.as_str()
    }

    fn is_available(&self) -> bool {
        false
    }

    fn print_text(&self, _profile: &PrinterProfile, _text: &str) -> bool {
        false
    }

    fn print_bitmap(&self, _profile: &PrinterProfile, _image: &DynamicImage) -> bool {
        false
    }
}

/// Backend per SDK transport type
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<TransportType, Arc<dyn PrinterBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transport_type: TransportType, backend: Arc<dyn PrinterBackend>) {
        self.backends.insert(transport_type, backend);
    }

    /// Registered backend, or a [`NullBackend`] when none was registered
    pub fn get(&self, transport_type: TransportType) -> Arc<dyn PrinterBackend> {
        self.backends
            .get(&transport_type)
            .cloned()
            .unwrap_or_else(|| Arc::new(NullBackend::new(transport_type)))
    }
}

/// Content handed to an SDK backend
#[derive(Debug, Clone, Copy)]
pub enum BackendContent<'a> {
    Text(&'a str),
    Bitmap(&'a DynamicImage),
}

/// Run one job on a backend
///
/// An unavailable SDK is `BackendUnavailable`; an SDK that rejects the
/// job is an I/O failure.
#[instrument(skip_all, fields(backend = backend.name(), profile_id = %profile.id))]
pub fn print_with_backend(
    backend: &dyn PrinterBackend,
    profile: &PrinterProfile,
    content: BackendContent<'_>,
) -> PrinterResult<()> {
    if !backend.is_available() {
        return Err(PrintError::BackendUnavailable(format!(
            "{} SDK is not available",
            backend.name()
        )));
    }

    let accepted = match content {
        BackendContent::Text(text) => backend.print_text(profile, text),
        BackendContent::Bitmap(image) => backend.print_bitmap(profile, image),
    };
    if !accepted {
        return Err(PrintError::Io(std::io::Error::other(format!(
            "{} SDK rejected the job",
            backend.name()
        ))));
    }

    info!("Job handed to SDK");
    Ok(())
}
