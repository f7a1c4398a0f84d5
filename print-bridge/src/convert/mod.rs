//! Content conversion
//!
//! Turns caller content (HTML fragments, sale records) into plain text
//! for the line layout engine.

mod html;
mod receipt;

pub use html::{html_to_text, looks_like_html};
pub use receipt::{ReceiptRenderer, render_receipt};
