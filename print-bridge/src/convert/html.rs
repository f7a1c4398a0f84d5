//! HTML to receipt text
//!
//! A best-effort regex converter for the known shape of POS receipt
//! HTML, not a general HTML parser. Supported subset:
//! - `<head>`, `<script>`, `<style>` and comments are dropped with their
//!   content
//! - `div p h1-h6 tr table ul ol ...` start a new line
//! - `<br>` is a hard line break
//! - `<li>` becomes a `- ` bullet
//! - `<td>`/`<th>` bound table cells; each row's cells are joined with
//!   [`COLUMN_SEPARATOR`] and aligned afterwards
//! - named, decimal and hex character references are decoded
//!
//! Blank lines only come from hard breaks. Block tags separate lines but
//! never add a paragraph gap, so `<p>A</p><p>B</p>` prints as two
//! adjacent lines, `<br><br>` leaves one blank line, and longer runs of
//! breaks collapse to a single blank line. Pipes in the text itself are
//! printed as-is; only cell boundaries take part in column alignment.

use lazy_static::lazy_static;
use pos_printer::layout::{COLUMN_SEPARATOR, align_columns};
use pos_printer::{PrintError, PrinterResult};
use regex::{Captures, Regex};
use tracing::{debug, warn};

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("comment regex");
    static ref HEAD: Regex = Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").expect("head regex");
    static ref SCRIPT: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script regex");
    static ref STYLE: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace regex");
    static ref BR: Regex = Regex::new(r"(?i)<br\b[^>]*>").expect("br regex");
    static ref LI_OPEN: Regex = Regex::new(r"(?i)<li\b[^>]*>").expect("li regex");
    static ref CELL: Regex = Regex::new(r"(?i)</?t[dh]\b[^>]*>").expect("cell regex");
    static ref BLOCK: Regex = Regex::new(
        r"(?i)</?(?:div|p|h[1-6]|tr|li|table|thead|tbody|tfoot|ul|ol|section|article|header|footer|body|html|hr)\b[^>]*>"
    )
    .expect("block regex");
    static ref TAG: Regex = Regex::new(r"<[^>]*>").expect("tag regex");
    static ref ENTITY: Regex =
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
            .expect("entity regex");
}

/// Hard line break placeholder, survives structural newline collapsing
const LINE_BREAK: char = '\u{1F}';

/// Table cell boundary placeholder, kept apart from literal text
const CELL_BREAK: char = '\u{1E}';

/// Markers that make a payload HTML rather than plain text
const HTML_SIGNALS: [&str; 6] = ["<!doctype", "<html", "<body", "<div", "<table", "<style"];

/// Whether the payload should go through [`html_to_text`]
pub fn looks_like_html(content: &str) -> bool {
    let lower = content.to_ascii_lowercase();
    HTML_SIGNALS.iter().any(|signal| lower.contains(signal))
}

/// Convert receipt HTML to plain text with aligned table columns
///
/// Falls back to plain tag stripping when the full pass yields nothing;
/// a blank result after both passes is a conversion error.
pub fn html_to_text(html: &str) -> PrinterResult<String> {
    let primary = convert(html);
    if !primary.trim().is_empty() {
        return Ok(primary);
    }

    warn!(len = html.len(), "HTML conversion produced no text, using plain stripping");
    let fallback = strip_simple(html);
    if fallback.trim().is_empty() {
        return Err(PrintError::Conversion(
            "HTML content has no printable text".to_string(),
        ));
    }
    Ok(fallback)
}

fn convert(html: &str) -> String {
    let text = COMMENT.replace_all(html, "");
    let text = HEAD.replace_all(&text, "");
    let text = SCRIPT.replace_all(&text, "");
    let text = STYLE.replace_all(&text, "");

    // Source whitespace is insignificant; line breaks come from tags only
    let text = WHITESPACE.replace_all(&text, " ");

    let text = BR.replace_all(&text, LINE_BREAK.to_string().as_str());
    let text = LI_OPEN.replace_all(&text, "\n- ");
    let text = CELL.replace_all(&text, CELL_BREAK.to_string().as_str());
    let text = BLOCK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines = normalize_lines(&text);
    debug!(lines = lines.len(), "HTML converted");
    align_columns(&lines, COLUMN_SEPARATOR).join("\n")
}

/// Split into trimmed lines
///
/// Structural newlines only separate blocks; blank lines come from hard
/// breaks, at most one in a row and none at either end. Rows of cells
/// come out joined by [`COLUMN_SEPARATOR`]; rows with no filled cell
/// are dropped.
fn normalize_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for block in text.split('\n') {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        for line in block.split(LINE_BREAK) {
            let line = match join_cells(line) {
                Some(row) if row.is_empty() => continue,
                Some(row) => row,
                None => line.trim().to_string(),
            };
            if line.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
                continue;
            }
            lines.push(line);
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Trimmed non-empty cells of a table row, or `None` for a line of text
fn join_cells(line: &str) -> Option<String> {
    if !line.contains(CELL_BREAK) {
        return None;
    }
    let cells: Vec<&str> = line
        .split(CELL_BREAK)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect();
    Some(cells.join(COLUMN_SEPARATOR))
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "cent" => '¢',
        "deg" => '°',
        "times" => '×',
        "divide" => '÷',
        "middot" => '·',
        "bull" => '•',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "laquo" => '«',
        "raquo" => '»',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        _ => return None,
    };
    Some(c)
}

/// Tags to spaces, only `&nbsp; &amp; &lt; &gt;` decoded
fn strip_simple(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    text.lines()
        .map(|line| WHITESPACE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
