use crate::handler::HandlerOptions;
use pos_printer::CutMode;
use std::path::PathBuf;

/// Print bridge configuration
///
/// # Environment
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | PRINT_BRIDGE_WORK_DIR | ./print-bridge-data | profile database and logs |
/// | PRINT_BRIDGE_DB_FILE | profiles.redb | database file inside the work dir |
/// | LOG_LEVEL | info | tracing filter level |
/// | LOG_JSON | false | JSON console logs |
/// | LOG_DIR | (unset) | enables daily rolling file logs |
/// | PRINT_LINES_PER_PAGE | (unset) | cut and re-initialize every N lines |
/// | PRINT_TEXT_CONVERSION | true | false = rasterize HTML instead |
/// | PRINT_CUT_MODE | partial | partial or full |
///
/// # Example
///
/// ```ignore
/// PRINT_BRIDGE_WORK_DIR=/data/pos LOG_LEVEL=debug print-bridge text receipt.txt
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub db_file: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// Page-break interval for long jobs
    pub lines_per_page: Option<usize>,
    /// Convert HTML to text (false: bitmap path)
    pub text_conversion: bool,
    pub cut_mode: CutMode,
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("PRINT_BRIDGE_WORK_DIR")
                .unwrap_or_else(|_| "./print-bridge-data".into())
                .into(),
            db_file: std::env::var("PRINT_BRIDGE_DB_FILE")
                .unwrap_or_else(|_| "profiles.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            lines_per_page: std::env::var("PRINT_LINES_PER_PAGE")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0),
            text_conversion: std::env::var("PRINT_TEXT_CONVERSION")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
            cut_mode: std::env::var("PRINT_CUT_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// Full path of the profile database
    pub fn db_path(&self) -> PathBuf {
        self.work_dir.join(&self.db_file)
    }

    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            lines_per_page: self.lines_per_page,
            text_conversion: self.text_conversion,
            cut_mode: self.cut_mode,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
