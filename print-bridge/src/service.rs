//! Async print facade
//!
//! Print calls block on device I/O, so each one runs on tokio's blocking
//! pool. Dropping the returned future abandons the result; the job
//! itself is never cancelled mid-send.

use crate::handler::PrintHandler;
use pos_printer::{DrawerPin, HriPosition, QrErrorCorrection, Symbology};
use shared::{FailureKind, PrintResult, ReceiptKind, SaleRecord, TransportType};
use std::sync::Arc;
use tracing::error;

/// Cloneable async handle over a [`PrintHandler`]
#[derive(Clone)]
pub struct PrintService {
    handler: Arc<PrintHandler>,
}

impl PrintService {
    pub fn new(handler: PrintHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> &Arc<PrintHandler> {
        &self.handler
    }

    pub async fn print(&self, text: String, preferred: Option<TransportType>) -> PrintResult {
        self.dispatch(move |h| h.print(&text, preferred)).await
    }

    pub async fn print_html(&self, html: String, preferred: Option<TransportType>) -> PrintResult {
        self.dispatch(move |h| h.print_html(&html, preferred)).await
    }

    pub async fn print_barcode(
        &self,
        data: String,
        symbology: Symbology,
        height: i32,
        width: i32,
        text_position: HriPosition,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.dispatch(move |h| {
            h.print_barcode(&data, symbology, height, width, text_position, preferred)
        })
        .await
    }

    pub async fn print_qr_code(
        &self,
        data: String,
        size: i32,
        level: QrErrorCorrection,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.dispatch(move |h| h.print_qr_code(&data, size, level, preferred))
            .await
    }

    pub async fn print_receipt(
        &self,
        record: SaleRecord,
        kind: ReceiptKind,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.dispatch(move |h| h.print_receipt(&record, kind, preferred))
            .await
    }

    pub async fn open_cash_drawer(
        &self,
        pin: DrawerPin,
        preferred: Option<TransportType>,
    ) -> PrintResult {
        self.dispatch(move |h| h.open_cash_drawer(pin, preferred))
            .await
    }

    async fn dispatch<F>(&self, job: F) -> PrintResult
    where
        F: FnOnce(&PrintHandler) -> PrintResult + Send + 'static,
    {
        let handler = self.handler.clone();
        match tokio::task::spawn_blocking(move || job(&handler)).await {
            Ok(result) => result,
            Err(e) => {
                error!("Print task join error: {e}");
                PrintResult::failed(FailureKind::Io, format!("Print task failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOptions;
    use crate::store::ProfileStore;

    #[tokio::test]
    async fn test_failure_comes_back_as_result() {
        let store = ProfileStore::open_in_memory().unwrap();
        let service = PrintService::new(PrintHandler::new(store, HandlerOptions::default()));

        // No transports registered: the seeded bluetooth default cannot connect
        let result = service.print("Hello".into(), None).await;
        assert!(!result.success);
        assert_eq!(result.kind, Some(FailureKind::Connection));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({ "ok": false, "msg": result.message })
        );
    }
}
