//! Text encoding for ESC/POS printers
//!
//! Thermal printers take text in a single code page selected with ESC t n.
//! This module provides:
//! - Encoding UTF-8 text into the configured printer encoding
//! - Measuring printed column widths
//! - Truncating/padding strings to column widths

use encoding_rs::{Encoding, UTF_8};

use crate::device::Alignment;

/// Printer text encoding plus the code page number that selects it
#[derive(Debug, Clone, Copy)]
pub struct TextCodec {
    encoding: &'static Encoding,
    code_page: Option<u8>,
}

impl TextCodec {
    /// Pass UTF-8 through untouched (printers configured for UTF-8 mode)
    pub fn utf8() -> Self {
        Self {
            encoding: UTF_8,
            code_page: None,
        }
    }

    /// Look up an encoding by WHATWG label (e.g. "windows-1256", "gbk")
    pub fn for_label(label: &str, code_page: Option<u8>) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(|encoding| Self {
            encoding,
            code_page,
        })
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Code page for ESC t n, if one must be selected
    pub fn code_page(&self) -> Option<u8> {
        self.code_page
    }

    /// Encode text; unmappable characters become numeric references
    pub fn encode(&self, s: &str) -> Vec<u8> {
        let (cow, _, _) = self.encoding.encode(s);
        cow.into_owned()
    }

    /// Printed width of a string in character cells
    ///
    /// Legacy multi-byte encodings print one cell per byte, so the encoded
    /// length is the width. In UTF-8 mode each character takes one cell.
    pub fn width(&self, s: &str) -> usize {
        if self.encoding == UTF_8 {
            s.chars().count()
        } else {
            let (cow, _, _) = self.encoding.encode(s);
            cow.len()
        }
    }

    /// Truncate a string to fit within `max_width` cells
    pub fn truncate(&self, s: &str, max_width: usize) -> String {
        let mut width = 0;
        let mut result = String::new();
        let mut buf = [0u8; 4];
        for c in s.chars() {
            let char_width = self.width(c.encode_utf8(&mut buf));
            if width + char_width > max_width {
                break;
            }
            result.push(c);
            width += char_width;
        }
        result
    }

    /// Pad a string to exactly `width` cells
    ///
    /// If the string is wider, it will be truncated.
    pub fn pad(&self, s: &str, width: usize, align: Alignment) -> String {
        let current = self.width(s);
        if current >= width {
            return self.truncate(s, width);
        }
        let spaces = width - current;
        match align {
            Alignment::Left => format!("{}{}", s, " ".repeat(spaces)),
            Alignment::Right => format!("{}{}", " ".repeat(spaces), s),
            Alignment::Center => {
                let left = spaces / 2;
                format!("{}{}{}", " ".repeat(left), s, " ".repeat(spaces - left))
            }
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::utf8()
    }
}
