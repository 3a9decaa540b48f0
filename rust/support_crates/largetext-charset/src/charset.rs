use std::{fmt, str::FromStr};

use largetext_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// A supported character encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    UsAscii,
    Iso8859_1,
    Windows1252,
}

impl Charset {
    pub const ALL: [Charset; 6] = [
        Charset::Utf8,
        Charset::Utf16Le,
        Charset::Utf16Be,
        Charset::UsAscii,
        Charset::Iso8859_1,
        Charset::Windows1252,
    ];

    /// Looks up a charset by its canonical name or one of its aliases
    /// (case-insensitive).
    pub fn for_name(name: &str) -> Result<Charset> {
        let normalized = name.trim().to_ascii_lowercase();
        let charset = match normalized.as_str() {
            "utf-8" | "utf8" => Charset::Utf8,
            "utf-16le" | "utf16le" | "utf-16-le" => Charset::Utf16Le,
            "utf-16be" | "utf16be" | "utf-16-be" => Charset::Utf16Be,
            "us-ascii" | "ascii" | "us_ascii" => Charset::UsAscii,
            "iso-8859-1" | "iso_8859_1" | "iso8859-1" | "latin1" | "l1" => Charset::Iso8859_1,
            "windows-1252" | "cp1252" | "windows1252" => Charset::Windows1252,
            _ => return Err(Error::invalid_arg("charset", format!("unsupported charset '{name}'"))),
        };
        Ok(charset)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Windows1252 => "windows-1252",
        }
    }

    /// The largest number of bytes a single character can occupy.
    pub fn max_bytes_per_char(&self) -> usize {
        match self {
            Charset::Utf8 | Charset::Utf16Le | Charset::Utf16Be => 4,
            Charset::UsAscii | Charset::Iso8859_1 | Charset::Windows1252 => 1,
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Charset> {
        Charset::for_name(s)
    }
}

impl TryFrom<String> for Charset {
    type Error = Error;

    fn try_from(s: String) -> Result<Charset> {
        Charset::for_name(&s)
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> String {
        charset.name().to_string()
    }
}

/// What to do when the decoder meets a malformed or unmappable byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodingErrorAction {
    /// Stop decoding and report the failure.
    #[default]
    Report,
    /// Emit the replacement character in place of the offending bytes.
    Replace,
    /// Drop the offending bytes.
    Ignore,
}

/// Charset and error handling policy of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    pub charset: Charset,
    pub on_malformed: CodingErrorAction,
    pub on_unmappable: CodingErrorAction,
    pub replacement: char,
}

impl DecoderOptions {
    pub fn new(charset: Charset) -> DecoderOptions {
        DecoderOptions {
            charset,
            ..Default::default()
        }
    }

    /// Applies the same action to both malformed and unmappable input.
    pub fn with_action(mut self, action: CodingErrorAction) -> DecoderOptions {
        self.on_malformed = action;
        self.on_unmappable = action;
        self
    }
}

impl Default for DecoderOptions {
    fn default() -> DecoderOptions {
        DecoderOptions {
            charset: Charset::Utf8,
            on_malformed: CodingErrorAction::Report,
            on_unmappable: CodingErrorAction::Report,
            replacement: char::REPLACEMENT_CHARACTER,
        }
    }
}
