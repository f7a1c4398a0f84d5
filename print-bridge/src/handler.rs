//! Unified print handler
//!
//! Every public print call runs the same state machine:
//!
//! ```text
//! Resolving -> Connecting -> Converting -> Sending -> Done
//!      \            \             \            \
//!       +------------+-------------+------------+--> Failed(reason)
//! ```
//!
//! The handler never lets an error escape: print and store failures are
//! turned into a failed [`PrintResult`] at this boundary. Calls that
//! resolve to the same profile are serialized; different profiles print
//! in parallel.

use crate::convert::{html_to_text, looks_like_html, render_receipt};
use crate::resolve::resolve_profile;
use crate::store::{ProfileStore, StoreError};
use dashmap::DashMap;
use parking_lot::Mutex;
use pos_printer::layout::{chars_per_line, wrap};
use pos_printer::{
    BackendContent, BackendRegistry, ConnectionGuard, CutMode, DrawerPin, DynamicImage, EscPosJob,
    HriPosition, JobSettings, PrintError, PrinterBackend, PrinterResult, QrErrorCorrection,
    Symbology, Transport, escpos, raster_image,
};
use shared::{FailureKind, PrintResult, PrinterProfile, ReceiptKind, SaleRecord, TransportType};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Handler-wide print behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Cut and re-initialize every N lines
    pub lines_per_page: Option<usize>,
    /// Convert HTML to text; `false` rasterizes it through the renderer
    pub text_conversion: bool,
    pub cut_mode: CutMode,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            lines_per_page: None,
            text_conversion: true,
            cut_mode: CutMode::Partial,
        }
    }
}

/// Host capability that renders HTML into an image
pub trait HtmlRenderer: Send + Sync {
    fn render_html_to_image(&self, html: &str) -> PrinterResult<DynamicImage>;
}

/// Print state machine stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Connecting,
    Converting,
    Sending,
    Done,
    Failed,
}

#[derive(Debug, Error)]
enum HandlerError {
    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("Profile store: {0}")]
    Store(#[from] StoreError),
}

impl HandlerError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Print(e) => e.kind(),
            Self::Store(_) => FailureKind::Storage,
        }
    }
}

type HandlerResult<T> = Result<T, HandlerError>;

/// What a call asked to print
#[derive(Debug, Clone, Copy)]
enum Content<'a> {
    Text(&'a str),
    Html(&'a str),
    Receipt(&'a SaleRecord, ReceiptKind),
    Barcode {
        data: &'a str,
        symbology: Symbology,
        height: i32,
        width: i32,
        text_position: HriPosition,
    },
    QrCode {
        data: &'a str,
        size: i32,
        level: QrErrorCorrection,
    },
    CashDrawer(DrawerPin),
}

impl Content<'_> {
    /// Pre-framed ESC/POS commands no vendor SDK can take
    fn is_raw_command(&self) -> bool {
        matches!(
            self,
            Self::Barcode { .. } | Self::QrCode { .. } | Self::CashDrawer(_)
        )
    }

    fn done_message(&self, profile: &PrinterProfile) -> String {
        match self {
            Self::CashDrawer(_) => format!("Cash drawer opened on {}", profile.display_name),
            _ => format!("Printed on {}", profile.display_name),
        }
    }
}

/// Converted content ready for a sink
enum Payload {
    Lines(Vec<String>),
    Image(DynamicImage),
    Block(Vec<u8>),
    Drawer(DrawerPin),
}

/// Where the payload goes for the resolved profile
enum Sink {
    EscPos(ConnectionGuard),
    Backend(Arc<dyn PrinterBackend>),
}

struct Progress {
    stage: Stage,
}

impl Progress {
    fn new() -> Self {
        debug!(stage = ?Stage::Resolving, "Print started");
        Self {
            stage: Stage::Resolving,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = ?self.stage, to = ?next, "Print stage");
        self.stage = next;
    }
}

/// Routes print calls to the right printer
pub struct PrintHandler {
    store: ProfileStore,
    transports: HashMap<TransportType, Arc<dyn Transport>>,
    backends: BackendRegistry,
    renderer: Option<Arc<dyn HtmlRenderer>>,
    options: HandlerOptions,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PrintHandler {
    /// Handler with no transports registered
    pub fn new(store: ProfileStore, options: HandlerOptions) -> Self {
        Self {
            store,
            transports: HashMap::new(),
            backends: BackendRegistry::new(),
            renderer: None,
            options,
            locks: DashMap::new(),
        }
    }

    /// Register the byte-sink adapter for its transport type
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(transport.transport_type(), transport);
        self
    }

    /// Register a vendor/cloud SDK backend
    pub fn with_backend(
        mut self,
        transport_type: TransportType,
        backend: Arc<dyn PrinterBackend>,
    ) -> Self {
        self.backends.register(transport_type, backend);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn HtmlRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Delete a profile and drop its print lock
    ///
    /// A job already holding the lock keeps its own handle and finishes
    /// normally.
    pub fn delete_profile(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id)?;
        self.locks.remove(id);
        Ok(())
    }

    pub fn options(&self) -> HandlerOptions {
        self.options
    }

    /// Print plain text
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn print(&self, text: &str, preferred: Option<TransportType>) -> PrintResult {
        self.run(Content::Text(text), preferred)
    }

    /// Print HTML, or plain text when the payload does not look like HTML
    #[instrument(skip(self, html), fields(len = html.len()))]
    pub fn print_html(&self, html: &str, preferred: Option<TransportType>) -> PrintResult {
        if looks_like_html(html) {
            self.run(Content::Html(html), preferred)
        } else {
            debug!("No HTML markers, printing as plain text");
            self.run(Content::Text(html), preferred)
        }
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn print_barcode(
        &self,
        data: &str,
        symbology: Symbology,
        height: i32,
        width: i32,
        text_position: HriPosition,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.run(
            Content::Barcode {
                data,
                symbology,
                height,
                width,
                text_position,
            },
            preferred,
        )
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn print_qr_code(
        &self,
        data: &str,
        size: i32,
        level: QrErrorCorrection,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.run(Content::QrCode { data, size, level }, preferred)
    }

    /// Print a sale record laid out for the profile's line width
    #[instrument(skip(self, record), fields(items = record.items.len()))]
    pub fn print_receipt(
        &self,
        record: &SaleRecord,
        kind: ReceiptKind,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.run(Content::Receipt(record, kind), preferred)
    }

    /// Pulse the drawer kick connector (ESC/POS transports only)
    #[instrument(skip(self))]
    pub fn open_cash_drawer(&self, pin: DrawerPin, preferred: Option<TransportType>) -> PrintResult {
        self.run(Content::CashDrawer(pin), preferred)
    }

    fn run(&self, content: Content<'_>, preferred: Option<TransportType>) -> PrintResult {
        let mut progress = Progress::new();
        match self.execute(content, preferred, &mut progress) {
            Ok(profile) => {
                progress.advance(Stage::Done);
                PrintResult::ok(content.done_message(&profile))
            }
            Err(e) => {
                let failed_at = progress.stage;
                progress.advance(Stage::Failed);
                let kind = e.kind();
                warn!(stage = ?failed_at, kind = kind.name(), error = %e, "Print failed");
                PrintResult::failed(kind, e.to_string())
            }
        }
    }

    fn execute(
        &self,
        content: Content<'_>,
        preferred: Option<TransportType>,
        progress: &mut Progress,
    ) -> HandlerResult<PrinterProfile> {
        let profile = self.resolve(preferred)?;

        let lock = self.profile_lock(&profile.id);
        let _serialized = lock.lock();

        progress.advance(Stage::Connecting);
        let mut sink = self.connect(&profile, &content)?;

        progress.advance(Stage::Converting);
        let payload = self.convert(content, &profile)?;

        progress.advance(Stage::Sending);
        let bytes = self.send(&mut sink, payload, &profile)?;
        info!(
            profile_id = %profile.id,
            transport = profile.transport_type.as_str(),
            bytes,
            "Print job sent"
        );

        if let Err(e) = self.store.set_last_used(&profile.id) {
            // The job is already on paper; the pointer is advisory
            warn!(profile_id = %profile.id, error = %e, "Failed to record last-used printer");
        }
        Ok(profile)
    }

    fn resolve(&self, preferred: Option<TransportType>) -> HandlerResult<PrinterProfile> {
        let profiles = self.store.get_all()?;
        let last_used = self.store.last_used_id()?;
        let profile = resolve_profile(&profiles, last_used.as_deref(), preferred)
            .cloned()
            .ok_or(PrintError::NoPrinterConfigured)?;
        debug!(
            profile_id = %profile.id,
            transport = profile.transport_type.as_str(),
            "Printer resolved"
        );
        Ok(profile)
    }

    fn profile_lock(&self, profile_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(profile_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn connect(&self, profile: &PrinterProfile, content: &Content<'_>) -> PrinterResult<Sink> {
        let transport_type = profile.transport_type;
        if !transport_type.is_escpos() {
            if content.is_raw_command() {
                return Err(PrintError::BackendUnavailable(format!(
                    "{} printers do not accept raw ESC/POS commands",
                    transport_type.as_str()
                )));
            }
            let backend = self.backends.get(transport_type);
            if !backend.is_available() {
                return Err(PrintError::BackendUnavailable(format!(
                    "{} SDK is not available",
                    backend.name()
                )));
            }
            return Ok(Sink::Backend(backend));
        }

        let transport = self.transports.get(&transport_type).ok_or_else(|| {
            PrintError::Connection(format!(
                "No {} transport on this host",
                transport_type.as_str()
            ))
        })?;
        let conn = transport.connect(profile)?;
        Ok(Sink::EscPos(ConnectionGuard::new(
            conn,
            profile.display_name.clone(),
        )))
    }

    fn convert(&self, content: Content<'_>, profile: &PrinterProfile) -> PrinterResult<Payload> {
        let width = chars_per_line(
            profile.paper_width_dots,
            profile.left_margin_dots,
            profile.right_margin_dots,
            profile.width_multiplier,
        );

        let payload = match content {
            Content::Text(text) => Payload::Lines(wrap(text, width)),
            Content::Html(html) if self.options.text_conversion => {
                Payload::Lines(wrap(&html_to_text(html)?, width))
            }
            Content::Html(html) => {
                let renderer = self.renderer.as_ref().ok_or_else(|| {
                    PrintError::Conversion("No HTML renderer for bitmap printing".to_string())
                })?;
                Payload::Image(renderer.render_html_to_image(html)?)
            }
            Content::Receipt(record, kind) => {
                Payload::Lines(wrap(&render_receipt(record, kind, width), width))
            }
            Content::Barcode {
                data,
                symbology,
                height,
                width: module_width,
                text_position,
            } => Payload::Block(escpos::barcode(
                data,
                symbology,
                height,
                module_width,
                text_position,
            )?),
            Content::QrCode { data, size, level } => {
                Payload::Block(escpos::qr_code(data, size, level)?)
            }
            Content::CashDrawer(pin) => Payload::Drawer(pin),
        };
        Ok(payload)
    }

    /// Write the payload; returns the byte count for ESC/POS sinks
    fn send(
        &self,
        sink: &mut Sink,
        payload: Payload,
        profile: &PrinterProfile,
    ) -> PrinterResult<usize> {
        match sink {
            Sink::EscPos(guard) => {
                let settings = JobSettings::from_profile(
                    profile,
                    self.options.cut_mode,
                    self.options.lines_per_page,
                );
                let job = match payload {
                    Payload::Lines(lines) => EscPosJob::text(&lines, &settings),
                    Payload::Image(image) => EscPosJob::block(
                        raster_image(&image, profile.printable_width_dots()),
                        &settings,
                    ),
                    Payload::Block(block) => EscPosJob::block(block, &settings),
                    Payload::Drawer(pin) => EscPosJob::cash_drawer(pin),
                };
                guard.send_job(&job)?;
                guard.close();
                Ok(job.byte_len())
            }
            Sink::Backend(backend) => {
                match payload {
                    Payload::Lines(lines) => pos_printer::print_with_backend(
                        backend.as_ref(),
                        profile,
                        BackendContent::Text(&lines.join("\n")),
                    )?,
                    Payload::Image(image) => pos_printer::print_with_backend(
                        backend.as_ref(),
                        profile,
                        BackendContent::Bitmap(&image),
                    )?,
                    Payload::Block(_) | Payload::Drawer(_) => {
                        return Err(PrintError::BackendUnavailable(format!(
                            "{} cannot print raw commands",
                            backend.name()
                        )));
                    }
                }
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pos_printer::Connection;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Captures every write of every connection and counts closes
    #[derive(Default)]
    struct CaptureTransport {
        transport_type: Option<TransportType>,
        written: Arc<StdMutex<Vec<u8>>>,
        closes: Arc<AtomicUsize>,
        refuse: bool,
        fail_writes: bool,
    }

    impl CaptureTransport {
        fn bytes(&self) -> Vec<u8> {
            self.written.lock().unwrap().clone()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    struct CaptureConnection {
        written: Arc<StdMutex<Vec<u8>>>,
        closes: Arc<AtomicUsize>,
        fail_writes: bool,
    }

    impl Connection for CaptureConnection {
        fn write_all(&mut self, bytes: &[u8]) -> PrinterResult<()> {
            if self.fail_writes {
                return Err(PrintError::Io(std::io::Error::other("paper jam")));
            }
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Transport for CaptureTransport {
        fn transport_type(&self) -> TransportType {
            self.transport_type.unwrap_or(TransportType::Bluetooth)
        }

        fn connect(&self, _profile: &PrinterProfile) -> PrinterResult<Box<dyn Connection>> {
            if self.refuse {
                return Err(PrintError::Connection("refused".into()));
            }
            Ok(Box::new(CaptureConnection {
                written: self.written.clone(),
                closes: self.closes.clone(),
                fail_writes: self.fail_writes,
            }))
        }
    }

    fn capture() -> Arc<CaptureTransport> {
        Arc::new(CaptureTransport::default())
    }

    struct SolidRenderer;

    impl HtmlRenderer for SolidRenderer {
        fn render_html_to_image(&self, _html: &str) -> PrinterResult<DynamicImage> {
            Ok(DynamicImage::new_luma8(16, 4))
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_print_marks_profile_last_used() {
        let store = ProfileStore::open_in_memory().unwrap();
        let bt = capture();
        let handler =
            PrintHandler::new(store.clone(), HandlerOptions::default()).with_transport(bt.clone());

        let result = handler.print("Hello", None);
        assert!(result.success, "{}", result.message);
        assert!(contains(&bt.bytes(), b"Hello\n"));
        assert_eq!(bt.closes(), 1);

        let last = store.get_last_used().unwrap().unwrap();
        assert_eq!(last.transport_type, TransportType::Bluetooth);
        assert!(last.last_used_at.is_some());
    }

    #[test]
    fn test_failed_connect_keeps_last_used() {
        let store = ProfileStore::open_in_memory().unwrap();
        let refusing = Arc::new(CaptureTransport {
            refuse: true,
            ..Default::default()
        });
        let handler = PrintHandler::new(store.clone(), HandlerOptions::default())
            .with_transport(refusing);

        let result = handler.print("Hello", None);
        assert!(!result.success);
        assert_eq!(result.kind, Some(FailureKind::Connection));
        assert!(store.last_used_id().unwrap().is_none());
    }

    #[test]
    fn test_missing_transport_is_connection_failure() {
        let store = ProfileStore::open_in_memory().unwrap();
        let handler = PrintHandler::new(store, HandlerOptions::default());
        let result = handler.print("Hello", Some(TransportType::Lan));
        assert_eq!(result.kind, Some(FailureKind::Connection));
    }

    #[test]
    fn test_no_enabled_profile() {
        let store = ProfileStore::open_in_memory().unwrap();
        for profile in store.get_all().unwrap() {
            store.save(&profile.with_enabled(false), false).unwrap();
        }
        let handler = PrintHandler::new(store, HandlerOptions::default());
        let result = handler.print("Hello", None);
        assert!(!result.success);
        assert_eq!(result.kind, Some(FailureKind::NoPrinterConfigured));
        assert_eq!(result.message, "No printer configured");
    }

    #[test]
    fn test_raw_commands_rejected_on_vendor_profile() {
        let store = ProfileStore::open_in_memory().unwrap();
        let epson = PrinterProfile::new(TransportType::VendorSdkA, "epson").with_default(true);
        store.save(&epson, false).unwrap();
        let handler = PrintHandler::new(store, HandlerOptions::default());

        let result = handler.print_qr_code("x", 4, QrErrorCorrection::L, Some(TransportType::VendorSdkA));
        assert_eq!(result.kind, Some(FailureKind::BackendUnavailable));

        // Null backend: text is rejected as unavailable, not as I/O
        let result = handler.print("x", Some(TransportType::VendorSdkA));
        assert_eq!(result.kind, Some(FailureKind::BackendUnavailable));
    }

    #[test]
    fn test_bitmap_path_needs_renderer() {
        let store = ProfileStore::open_in_memory().unwrap();
        let bt = capture();
        let options = HandlerOptions {
            text_conversion: false,
            ..Default::default()
        };
        let html = "<div>Total 9.00</div>";

        let handler = PrintHandler::new(store.clone(), options).with_transport(bt.clone());
        let result = handler.print_html(html, None);
        assert_eq!(result.kind, Some(FailureKind::Conversion));
        assert!(bt.bytes().is_empty());

        let handler = PrintHandler::new(store, options)
            .with_transport(bt.clone())
            .with_renderer(Arc::new(SolidRenderer));
        let result = handler.print_html(html, None);
        assert!(result.success, "{}", result.message);
        let bytes = bt.bytes();
        assert!(contains(&bytes, &[0x1D, b'v', b'0', 0x00]));
        assert!(!contains(&bytes, b"Total"));
    }

    #[test]
    fn test_cash_drawer_does_not_cut() {
        let store = ProfileStore::open_in_memory().unwrap();
        let bt = capture();
        let handler =
            PrintHandler::new(store, HandlerOptions::default()).with_transport(bt.clone());

        let result = handler.open_cash_drawer(DrawerPin::Pin2, None);
        assert!(result.success);
        assert!(result.message.starts_with("Cash drawer opened"));
        let bytes = bt.bytes();
        assert!(contains(&bytes, &[0x1B, b'p', 0x00]));
        assert!(!contains(&bytes, &[0x1D, b'V']));
    }

    #[test]
    fn test_connection_closed_once_on_every_path() {
        let store = ProfileStore::open_in_memory().unwrap();

        let bt = capture();
        let handler =
            PrintHandler::new(store.clone(), HandlerOptions::default()).with_transport(bt.clone());
        assert!(handler.print("ok", None).success);
        assert_eq!(bt.closes(), 1);

        // Conversion fails after the connection was opened
        let result = handler.print_html("<div> &nbsp; </div>", None);
        assert_eq!(result.kind, Some(FailureKind::Conversion));
        assert_eq!(bt.closes(), 2);

        let jammed = Arc::new(CaptureTransport {
            fail_writes: true,
            ..Default::default()
        });
        let handler =
            PrintHandler::new(store, HandlerOptions::default()).with_transport(jammed.clone());
        let result = handler.print("never printed", None);
        assert_eq!(result.kind, Some(FailureKind::Io));
        assert_eq!(jammed.closes(), 1);
    }

    #[test]
    fn test_unframeable_codes_fail_without_printing() {
        let store = ProfileStore::open_in_memory().unwrap();
        let bt = capture();
        let handler =
            PrintHandler::new(store.clone(), HandlerOptions::default()).with_transport(bt.clone());

        let result = handler.print_barcode(
            &"7".repeat(256),
            Symbology::Code39,
            80,
            3,
            HriPosition::Below,
            None,
        );
        assert!(!result.success);
        assert_eq!(result.kind, Some(FailureKind::Protocol));

        // `{B` pushes 254 data bytes past the length field
        let result = handler.print_barcode(
            &"A".repeat(254),
            Symbology::Code128,
            80,
            3,
            HriPosition::Below,
            None,
        );
        assert_eq!(result.kind, Some(FailureKind::Protocol));

        let result = handler.print_qr_code(
            &"9".repeat(escpos::MAX_QR_PAYLOAD + 1),
            6,
            QrErrorCorrection::L,
            None,
        );
        assert_eq!(result.kind, Some(FailureKind::Protocol));

        assert!(bt.bytes().is_empty());
        assert_eq!(bt.closes(), 3);
        assert!(store.last_used_id().unwrap().is_none());

        let result = handler.print_barcode(
            &"7".repeat(255),
            Symbology::Code39,
            80,
            3,
            HriPosition::Below,
            None,
        );
        assert!(result.success, "{}", result.message);
    }

    #[test]
    fn test_delete_profile_drops_its_lock() {
        let store = ProfileStore::open_in_memory().unwrap();
        let spare = PrinterProfile::new(TransportType::Usb, "Spare");
        let spare = store.save(&spare, false).unwrap();
        let handler = PrintHandler::new(store, HandlerOptions::default());

        let held = handler.profile_lock(&spare.id);
        assert!(handler.locks.contains_key(&spare.id));

        handler.delete_profile(&spare.id).unwrap();
        assert!(!handler.locks.contains_key(&spare.id));
        assert!(handler.store().get(&spare.id).unwrap().is_none());
        drop(held);

        // A refused delete keeps the lock
        let seeded = handler.store().get_all().unwrap()[0].id.clone();
        let _lock = handler.profile_lock(&seeded);
        assert!(handler.delete_profile(&seeded).is_err());
        assert!(handler.locks.contains_key(&seeded));
    }
}
