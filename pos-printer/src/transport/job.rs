//! ESC/POS write sequence
//!
//! A job is the ordered list of segments a transport writes:
//! header, one segment per printed line (with page breaks when a
//! lines-per-page limit is set), then the feed-and-cut trailer.

use crate::encoding::Charset;
use crate::escpos::{self, CutMode, DrawerPin};
use shared::PrinterProfile;

/// Lines fed before the cut
const CUT_FEED_LINES: u8 = 3;

/// Formatting state re-emitted after every init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    pub line_spacing_units: u32,
    pub width_multiplier: u8,
    pub height_multiplier: u8,
    pub left_margin_dots: u32,
    pub charset: Charset,
    pub cut_mode: CutMode,
    /// Cut and re-initialize every N lines
    pub lines_per_page: Option<usize>,
}

impl JobSettings {
    pub fn from_profile(
        profile: &PrinterProfile,
        cut_mode: CutMode,
        lines_per_page: Option<usize>,
    ) -> Self {
        Self {
            line_spacing_units: profile.line_spacing_units,
            width_multiplier: profile.width_multiplier,
            height_multiplier: profile.height_multiplier,
            left_margin_dots: profile.left_margin_dots,
            charset: Charset::for_label(&profile.charset_name),
            cut_mode,
            lines_per_page: lines_per_page.filter(|n| *n > 0),
        }
    }

    fn header(&self, select_code_page: bool) -> Vec<u8> {
        let mut out = escpos::init();
        if self.charset.needs_kanji_mode() {
            out.extend(escpos::kanji_mode_on());
            if select_code_page {
                out.extend(escpos::select_gbk_code_page());
            }
        }
        out.extend(escpos::set_line_spacing(clamp_i32(self.line_spacing_units)));
        out.extend(escpos::set_font_scale(
            i32::from(self.width_multiplier),
            i32::from(self.height_multiplier),
        ));
        out.extend(escpos::set_left_margin(clamp_i32(self.left_margin_dots)));
        out
    }

    fn trailer(&self) -> Vec<u8> {
        escpos::feed_and_cut_with(self.cut_mode, CUT_FEED_LINES)
    }
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Ordered byte segments of one print job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscPosJob {
    segments: Vec<Vec<u8>>,
}

impl EscPosJob {
    /// Text job from already-wrapped lines
    pub fn text<S: AsRef<str>>(lines: &[S], settings: &JobSettings) -> Self {
        let mut segments = Vec::with_capacity(lines.len() + 2);
        segments.push(settings.header(true));
        for (i, line) in lines.iter().enumerate() {
            if let Some(per_page) = settings.lines_per_page
                && i > 0
                && i % per_page == 0
            {
                let mut page_break = settings.trailer();
                page_break.extend(settings.header(false));
                segments.push(page_break);
            }
            segments.push(escpos::text_line(&settings.charset.encode(line.as_ref())));
        }
        segments.push(settings.trailer());
        Self { segments }
    }

    /// Job wrapping a pre-framed command block (barcode, QR, raster)
    pub fn block(block: Vec<u8>, settings: &JobSettings) -> Self {
        Self {
            segments: vec![settings.header(true), block, settings.trailer()],
        }
    }

    /// Drawer pulse with no paper movement
    pub fn cash_drawer(pin: DrawerPin) -> Self {
        Self {
            segments: vec![escpos::init(), escpos::open_cash_drawer(pin)],
        }
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    /// All segments concatenated
    pub fn to_bytes(&self) -> Vec<u8> {
        self.segments.concat()
    }
}
