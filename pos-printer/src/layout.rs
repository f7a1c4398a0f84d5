//! Line layout engine
//!
//! Fixed-width text arithmetic for receipt paper: characters per line,
//! word-aware wrapping and pseudo-table column alignment. Widths are
//! counted in Unicode scalar values.

/// Glyph cell width of the default font (Font A, 12×24)
pub const BASE_CHAR_WIDTH_DOTS: u32 = 12;

/// Content width never drops below this many dots
pub const MIN_CONTENT_WIDTH_DOTS: u32 = 48;

/// Column separator produced by the HTML converter for table cells
pub const COLUMN_SEPARATOR: &str = " | ";

/// Characters that fit on one printed line
///
/// The width multiplier is clamped to 0..=7; the result is at least 1.
pub fn chars_per_line(
    paper_width_dots: u32,
    left_margin_dots: u32,
    right_margin_dots: u32,
    width_multiplier: u8,
) -> usize {
    let content = paper_width_dots
        .saturating_sub(left_margin_dots)
        .saturating_sub(right_margin_dots)
        .max(MIN_CONTENT_WIDTH_DOTS);
    let cell = BASE_CHAR_WIDTH_DOTS * (u32::from(width_multiplier.min(7)) + 1);
    ((content / cell) as usize).max(1)
}

/// Character count of a string
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Wrap text to at most `chars_per_line` characters per line
///
/// Explicit newlines are honored first (carriage returns dropped). Each
/// logical line then breaks at the last space within reach, consuming
/// that space, or hard-breaks when there is none. Lines already within
/// the limit are left untouched, so wrapping twice is a no-op.
pub fn wrap(text: &str, chars_per_line: usize) -> Vec<String> {
    let limit = chars_per_line.max(1);
    let mut lines = Vec::new();
    for logical in text.split('\n') {
        let chars: Vec<char> = logical.chars().filter(|c| *c != '\r').collect();
        wrap_chars(&chars, limit, &mut lines);
    }
    lines
}

fn wrap_chars(chars: &[char], limit: usize, out: &mut Vec<String>) {
    let mut rest = chars;
    loop {
        if rest.len() <= limit {
            out.push(rest.iter().collect());
            return;
        }
        match rest[..=limit].iter().rposition(|c| *c == ' ') {
            Some(space) if space > 0 => {
                out.push(rest[..space].iter().collect());
                rest = &rest[space + 1..];
            }
            _ => {
                out.push(rest[..limit].iter().collect());
                rest = &rest[limit..];
            }
        }
        if rest.is_empty() {
            return;
        }
    }
}

/// Align separator-delimited rows into columns
///
/// Rows containing the separator are split into trimmed cells; every
/// column but the last is padded on the right, the last is padded on the
/// left, cells are joined by a single space and the separator disappears.
/// Column widths are measured over separator rows only. Other lines pass
/// through byte-identical.
pub fn align_columns<S: AsRef<str>>(lines: &[S], separator: &str) -> Vec<String> {
    let sep = separator;
    if sep.is_empty() {
        return lines.iter().map(|l| l.as_ref().to_string()).collect();
    }

    let rows: Vec<Option<Vec<&str>>> = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            line.contains(sep).then(|| {
                line.split(sep)
                    .map(str::trim)
                    .filter(|cell| !cell.is_empty())
                    .collect()
            })
        })
        .collect();

    let mut widths: Vec<usize> = Vec::new();
    for cells in rows.iter().flatten() {
        for (i, cell) in cells.iter().enumerate() {
            let w = text_width(cell);
            match widths.get_mut(i) {
                Some(max) => *max = (*max).max(w),
                None => widths.push(w),
            }
        }
    }

    lines
        .iter()
        .zip(rows)
        .map(|(line, row)| match row {
            None => line.as_ref().to_string(),
            Some(cells) => {
                let last = cells.len().saturating_sub(1);
                cells
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| {
                        let w = widths.get(i).copied().unwrap_or(0);
                        if i == last {
                            pad_left(cell, w)
                        } else {
                            pad_right(cell, w)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        })
        .collect()
}

/// Right-align `s` in a field of `width` characters
pub fn pad_left(s: &str, width: usize) -> String {
    let w = text_width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - w), s)
    }
}

/// Left-align `s` in a field of `width` characters
pub fn pad_right(s: &str, width: usize) -> String {
    let w = text_width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

/// Center `s` on a line of `width` characters (no trailing padding)
pub fn center(s: &str, width: usize) -> String {
    let w = text_width(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat((width - w) / 2), s)
}

/// Left text and right text on one line, padded apart
///
/// When both do not fit, they are joined by a single space and left for
/// wrapping.
pub fn line_lr(left: &str, right: &str, width: usize) -> String {
    let lw = text_width(left);
    let rw = text_width(right);
    if lw + rw >= width {
        format!("{} {}", left, right)
    } else {
        format!("{}{}{}", left, " ".repeat(width - lw - rw), right)
    }
}

/// A full-width rule made of `ch`
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat_n(ch, width).collect()
}
