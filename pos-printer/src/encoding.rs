//! Charset handling for printer text
//!
//! Profiles name their charset with a WHATWG label ("UTF-8", "GBK",
//! "windows-1252", ...). Chinese thermal printers need Kanji mode
//! switched on for double-byte code pages, so the charset also reports
//! whether the job has to emit `FS &` after every init.

use encoding_rs::{BIG5, Encoding, GB18030, GBK, UTF_8};
use tracing::warn;

/// Resolved text encoding of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
}

impl Charset {
    /// Resolve a charset label, falling back to UTF-8 for unknown labels
    pub fn for_label(label: &str) -> Self {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => Self {
                encoding: encoding.output_encoding(),
            },
            None => {
                warn!(charset = label, "Unknown charset, falling back to UTF-8");
                Self::utf8()
            }
        }
    }

    pub fn utf8() -> Self {
        Self { encoding: UTF_8 }
    }

    /// Canonical encoding name
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Double-byte Chinese code page that needs Kanji mode on the printer
    pub fn needs_kanji_mode(&self) -> bool {
        self.encoding == GBK || self.encoding == GB18030 || self.encoding == BIG5
    }

    /// Encode a line of text
    ///
    /// Characters the code page cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if !had_errors {
            return bytes.into_owned();
        }

        let mut out = Vec::with_capacity(text.len());
        let mut buf = [0u8; 4];
        for c in text.chars() {
            let (bytes, _, unmappable) = self.encoding.encode(c.encode_utf8(&mut buf));
            if unmappable {
                out.push(b'?');
            } else {
                out.extend_from_slice(&bytes);
            }
        }
        out
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Charset::for_label("utf8").name(), "UTF-8");
        assert_eq!(Charset::for_label(" gbk ").name(), "GBK");
        assert_eq!(Charset::for_label("latin1").name(), "windows-1252");
        assert_eq!(Charset::for_label("klingon").name(), "UTF-8");
    }

    #[test]
    fn test_kanji_mode() {
        assert!(Charset::for_label("GBK").needs_kanji_mode());
        assert!(Charset::for_label("big5").needs_kanji_mode());
        assert!(!Charset::for_label("UTF-8").needs_kanji_mode());
        assert!(!Charset::for_label("windows-1252").needs_kanji_mode());
    }

    #[test]
    fn test_encode_gbk() {
        let gbk = Charset::for_label("GBK");
        assert_eq!(gbk.encode("AB"), b"AB".to_vec());
        assert_eq!(gbk.encode("你好").len(), 4);
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        let latin = Charset::for_label("windows-1252");
        assert_eq!(latin.encode("a中b"), b"a?b".to_vec());
        assert_eq!(latin.encode("café"), vec![b'c', b'a', b'f', 0xE9]);
    }
}
