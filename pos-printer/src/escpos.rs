//! ESC/POS command encoder
//!
//! Stateless functions turning printer intents into command bytes.
//! Numeric inputs are clamped into the legal range and unknown enum
//! codes fall back to a safe default. Barcode and QR payloads too long
//! for their length field are a protocol error.

use crate::error::{PrintError, PrinterResult};
use std::str::FromStr;

pub const ESC: u8 = 0x1B;
pub const GS: u8 = 0x1D;
pub const FS: u8 = 0x1C;
pub const LF: u8 = 0x0A;

/// Largest payload `GS k` function B can frame (single length byte)
pub const MAX_BARCODE_PAYLOAD: usize = 255;

/// Largest payload a QR symbol can hold (numeric mode, version 40)
pub const MAX_QR_PAYLOAD: usize = 7089;

fn clamp_u8(value: i32, min: u8, max: u8) -> u8 {
    value.clamp(i32::from(min), i32::from(max)) as u8
}

// === Printer State ===

/// Reset printer to default state (ESC @)
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// Set line spacing in motion units (ESC 3 n), clamped to 0..=255
pub fn set_line_spacing(units: i32) -> Vec<u8> {
    vec![ESC, b'3', clamp_u8(units, 0, 255)]
}

/// Select character size (GS ! n), each multiplier clamped to 0..=7
///
/// 0 is normal size, 1 double, up to 7 for eight times.
pub fn set_font_scale(width_mul: i32, height_mul: i32) -> Vec<u8> {
    let w = clamp_u8(width_mul, 0, 7);
    let h = clamp_u8(height_mul, 0, 7);
    vec![GS, b'!', (w << 4) | h]
}

/// Set left margin in dots (GS L nL nH), clamped to 0..=255
pub fn set_left_margin(dots: i32) -> Vec<u8> {
    vec![GS, b'L', clamp_u8(dots, 0, 255), 0x00]
}

/// Enable Kanji (double-byte) mode for Chinese code pages (FS &)
pub fn kanji_mode_on() -> Vec<u8> {
    vec![FS, b'&']
}

/// Select the GBK code page for Kanji mode (FS C 1)
pub fn select_gbk_code_page() -> Vec<u8> {
    vec![FS, b'C', 0x01]
}

// === Text Output ===

/// Encoded text followed by line feed
pub fn text_line(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.extend_from_slice(bytes);
    out.push(LF);
    out
}

/// Print and feed n lines (ESC d n)
pub fn feed_lines(lines: u8) -> Vec<u8> {
    vec![ESC, b'd', lines]
}

/// Text justification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

/// Select justification (ESC a n)
pub fn align(justify: Justify) -> Vec<u8> {
    let n = match justify {
        Justify::Left => 0x00,
        Justify::Center => 0x01,
        Justify::Right => 0x02,
    };
    vec![ESC, b'a', n]
}

/// Emphasized mode on/off (ESC E n)
pub fn bold(on: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(on)]
}

// === Paper Control ===

/// Cutter behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutMode {
    /// Leave a small connection
    #[default]
    Partial,
    Full,
}

impl CutMode {
    fn function_code(self) -> u8 {
        match self {
            Self::Full => 0x41,
            Self::Partial => 0x42,
        }
    }
}

impl FromStr for CutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "partial" => Ok(Self::Partial),
            "full" => Ok(Self::Full),
            other => Err(format!("Unknown cut mode: {}", other)),
        }
    }
}

/// Feed 3 lines then partial cut
pub fn feed_and_cut() -> Vec<u8> {
    feed_and_cut_with(CutMode::Partial, 3)
}

/// Feed n lines then cut (GS V m n)
///
/// Function B lets the printer manage the cutter-to-head distance,
/// which wastes less paper than a separate feed and cut.
pub fn feed_and_cut_with(mode: CutMode, lines: u8) -> Vec<u8> {
    vec![GS, b'V', mode.function_code(), lines]
}

// === Cash Drawer ===

/// Drawer kick-out connector pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawerPin {
    #[default]
    Pin2,
    Pin5,
}

/// Generate a drawer pulse (ESC p m t1 t2)
pub fn open_cash_drawer(pin: DrawerPin) -> Vec<u8> {
    let m = match pin {
        DrawerPin::Pin2 => 0x00,
        DrawerPin::Pin5 => 0x01,
    };
    vec![ESC, b'p', m, 25, 250]
}

// === Barcode ===

/// Barcode symbology (GS k function B codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Symbology {
    UpcA,
    UpcE,
    Ean13,
    Ean8,
    Code39,
    Itf,
    Codabar,
    Code93,
    #[default]
    Code128,
}

impl Symbology {
    fn function_b_code(self) -> u8 {
        match self {
            Self::UpcA => 65,
            Self::UpcE => 66,
            Self::Ean13 => 67,
            Self::Ean8 => 68,
            Self::Code39 => 69,
            Self::Itf => 70,
            Self::Codabar => 71,
            Self::Code93 => 72,
            Self::Code128 => 73,
        }
    }

    /// Map an ESC/POS symbology code (0..=8 or 65..=73), defaulting to CODE128
    pub fn from_code(code: i32) -> Self {
        match code {
            0 | 65 => Self::UpcA,
            1 | 66 => Self::UpcE,
            2 | 67 => Self::Ean13,
            3 | 68 => Self::Ean8,
            4 | 69 => Self::Code39,
            5 | 70 => Self::Itf,
            6 | 71 => Self::Codabar,
            7 | 72 => Self::Code93,
            _ => Self::Code128,
        }
    }

    /// Map a symbology name, defaulting to CODE128
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "UPCA" => Self::UpcA,
            "UPCE" => Self::UpcE,
            "EAN13" | "JAN13" => Self::Ean13,
            "EAN8" | "JAN8" => Self::Ean8,
            "CODE39" => Self::Code39,
            "ITF" => Self::Itf,
            "CODABAR" | "NW7" => Self::Codabar,
            "CODE93" => Self::Code93,
            _ => Self::Code128,
        }
    }
}

/// Human-readable text position under/over the bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HriPosition {
    None,
    Above,
    #[default]
    Below,
    Both,
}

impl HriPosition {
    /// Map GS H codes (0..=3 or '0'..='3'), defaulting to below
    pub fn from_code(code: i32) -> Self {
        match code {
            0 | 48 => Self::None,
            1 | 49 => Self::Above,
            3 | 51 => Self::Both,
            _ => Self::Below,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Above => 1,
            Self::Below => 2,
            Self::Both => 3,
        }
    }
}

/// Framed barcode block
///
/// Height is clamped to 1..=255 dots, module width to 2..=6.
/// CODE128 data without a code-set prefix gets `{B`. The length byte
/// always equals the framed payload length; a framed payload over
/// [`MAX_BARCODE_PAYLOAD`] bytes is rejected.
pub fn barcode(
    data: &str,
    symbology: Symbology,
    height_dots: i32,
    width_units: i32,
    text_position: HriPosition,
) -> PrinterResult<Vec<u8>> {
    let mut payload = Vec::with_capacity(data.len() + 2);
    if symbology == Symbology::Code128 && !data.starts_with('{') {
        payload.extend_from_slice(b"{B");
    }
    payload.extend_from_slice(data.as_bytes());
    let n = u8::try_from(payload.len()).map_err(|_| {
        PrintError::Protocol(format!(
            "barcode payload is {} bytes, at most {} fit the length field",
            payload.len(),
            MAX_BARCODE_PAYLOAD
        ))
    })?;

    let mut out = Vec::with_capacity(payload.len() + 13);
    out.extend_from_slice(&[GS, b'h', clamp_u8(height_dots, 1, 255)]);
    out.extend_from_slice(&[GS, b'w', clamp_u8(width_units, 2, 6)]);
    out.extend_from_slice(&[GS, b'H', text_position.code()]);
    out.extend_from_slice(&[GS, b'k', symbology.function_b_code(), n]);
    out.extend_from_slice(&payload);
    out.push(LF);
    Ok(out)
}

// === QR Code ===

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorCorrection {
    #[default]
    L,
    M,
    Q,
    H,
}

impl QrErrorCorrection {
    /// Map 0..=3 or 'L'/'M'/'Q'/'H' codes, defaulting to L
    pub fn from_code(code: i32) -> Self {
        match code {
            1 | 49 | 77 | 109 => Self::M,
            2 | 50 | 81 | 113 => Self::Q,
            3 | 51 | 72 | 104 => Self::H,
            _ => Self::L,
        }
    }

    /// Map a level name, defaulting to L
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "M" => Self::M,
            "Q" => Self::Q,
            "H" => Self::H,
            _ => Self::L,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::L => 0x30,
            Self::M => 0x31,
            Self::Q => 0x32,
            Self::H => 0x33,
        }
    }
}

/// Framed QR code block (GS ( k, model 2)
///
/// Module size is clamped to 1..=16 dots. The store-data length
/// `pL pH` is the payload length plus the three function bytes; a
/// payload over [`MAX_QR_PAYLOAD`] bytes is rejected.
pub fn qr_code(data: &str, size_unit: i32, level: QrErrorCorrection) -> PrinterResult<Vec<u8>> {
    let payload = data.as_bytes();
    if payload.len() > MAX_QR_PAYLOAD {
        return Err(PrintError::Protocol(format!(
            "QR payload is {} bytes, a symbol holds at most {}",
            payload.len(),
            MAX_QR_PAYLOAD
        )));
    }
    let size = clamp_u8(size_unit, 1, 16);

    let mut out = Vec::with_capacity(payload.len() + 40);

    // Function 165: Select model 2
    out.extend_from_slice(&[GS, b'(', b'k', 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);

    // Function 167: Set module size
    out.extend_from_slice(&[GS, b'(', b'k', 0x03, 0x00, 0x31, 0x43, size]);

    // Function 169: Set error correction level
    out.extend_from_slice(&[GS, b'(', b'k', 0x03, 0x00, 0x31, 0x45, level.code()]);

    // Function 180: Store data
    let len = payload.len() + 3;
    let p_l = (len & 0xFF) as u8;
    let p_h = ((len >> 8) & 0xFF) as u8;
    out.extend_from_slice(&[GS, b'(', b'k', p_l, p_h, 0x31, 0x50, 0x30]);
    out.extend_from_slice(payload);

    // Function 181: Print
    out.extend_from_slice(&[GS, b'(', b'k', 0x03, 0x00, 0x31, 0x51, 0x30]);
    out.push(LF);

    Ok(out)
}
