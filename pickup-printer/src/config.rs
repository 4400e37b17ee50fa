//! Runtime configuration
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | PRINTER_HOST | (unset) | Network printer IP; unset means dry run |
//! | PRINTER_PORT | 9100 | Raw print port |
//! | PRINTER_TIMEOUT_MS | 5000 | Connect timeout |
//! | PAPER_WIDTH_MM | 80 | 58 or 80 |
//! | PRINTER_ENCODING | utf-8 | WHATWG encoding label |
//! | PRINTER_CODE_PAGE | (unset) | ESC t code page for the encoding |
//! | LOG_LEVEL | info | tracing filter |
//! | LOG_JSON | false | JSON console logs |
//! | LOG_DIR | (unset) | Daily rolling log files |
//! | RECEIPT_LOGO | (unset) | Image printed at the top of receipts |
//! | RECEIPT_CONTACT_LINE | shop contact | Line under the logo |
//! | PICKUP_FILE | (unset) | Pickup JSON to print; built-in sample if unset |
//! | WITH_SIGNATURE | false | Print the signature box |
//! | DRY_RUN | false | Record commands instead of printing |

use std::time::Duration;

use crate::device::PaperWidth;
use crate::encoding::TextCodec;
use crate::receipt::DEFAULT_CONTACT_LINE;

#[derive(Debug, Clone)]
pub struct Config {
    pub printer_host: Option<String>,
    pub printer_port: u16,
    pub printer_timeout_ms: u64,
    pub paper_width_mm: u32,
    pub printer_encoding: String,
    pub printer_code_page: Option<u8>,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub receipt_logo: Option<String>,
    pub contact_line: String,
    pub pickup_file: Option<String>,
    pub with_signature: bool,
    pub dry_run: bool,
}

impl Config {
    /// Load from environment variables, defaults for anything unset
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            printer_host: var("PRINTER_HOST").filter(|h| !h.trim().is_empty()),
            printer_port: var("PRINTER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(9100),
            printer_timeout_ms: var("PRINTER_TIMEOUT_MS")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            paper_width_mm: var("PAPER_WIDTH_MM")
                .and_then(|p| p.parse().ok())
                .unwrap_or(80),
            printer_encoding: var("PRINTER_ENCODING").unwrap_or_else(|| "utf-8".into()),
            printer_code_page: var("PRINTER_CODE_PAGE").and_then(|p| p.parse().ok()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: var("LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: var("LOG_DIR"),
            receipt_logo: var("RECEIPT_LOGO"),
            contact_line: var("RECEIPT_CONTACT_LINE")
                .unwrap_or_else(|| DEFAULT_CONTACT_LINE.into()),
            pickup_file: var("PICKUP_FILE"),
            with_signature: var("WITH_SIGNATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            dry_run: var("DRY_RUN")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Whether to print to the recording backend instead of a real printer
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.printer_host.is_none()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.printer_timeout_ms)
    }

    pub fn paper(&self) -> PaperWidth {
        PaperWidth::from_mm(self.paper_width_mm)
    }

    /// Text codec for the configured encoding, `None` for an unknown label
    pub fn codec(&self) -> Option<TextCodec> {
        TextCodec::for_label(&self.printer_encoding, self.printer_code_page)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]);
        assert_eq!(config.printer_port, 9100);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.paper(), PaperWidth::Mm80);
        assert_eq!(config.codec().unwrap().name(), "UTF-8");
        assert_eq!(config.contact_line, DEFAULT_CONTACT_LINE);
        assert!(!config.with_signature);
        assert!(config.is_dry_run());
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("PRINTER_HOST", "192.168.1.50"),
            ("PRINTER_PORT", "9101"),
            ("PAPER_WIDTH_MM", "58"),
            ("PRINTER_ENCODING", "windows-1256"),
            ("PRINTER_CODE_PAGE", "50"),
            ("WITH_SIGNATURE", "true"),
            ("LOG_JSON", "true"),
        ]);
        assert_eq!(config.printer_host.as_deref(), Some("192.168.1.50"));
        assert_eq!(config.printer_port, 9101);
        assert_eq!(config.paper(), PaperWidth::Mm58);
        let codec = config.codec().unwrap();
        assert_eq!(codec.name(), "windows-1256");
        assert_eq!(codec.code_page(), Some(50));
        assert!(config.with_signature);
        assert!(config.log_json);
        assert!(!config.is_dry_run());
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_with(&[
            ("PRINTER_PORT", "ninety"),
            ("DRY_RUN", "yes"),
            ("PRINTER_HOST", "  "),
            ("PRINTER_ENCODING", "klingon"),
        ]);
        assert_eq!(config.printer_port, 9100);
        assert!(!config.dry_run);
        assert!(config.printer_host.is_none());
        assert!(config.codec().is_none());
    }
}
