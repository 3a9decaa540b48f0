//! Character encodings and the streaming decoder used to turn file bytes into characters.
//!
//! # Overview
//!
//! A [`CharDecoder`] consumes a byte span and appends the decoded characters to an
//! output buffer. It stops early in two situations only:
//!
//! 1. **Incomplete input**: the span ends in the middle of a multi-byte sequence and
//!    more input may follow (`last == false`). The caller retries those bytes with
//!    the next span.
//! 2. **Reported errors**: a malformed or unmappable sequence was found and the
//!    matching [`CodingErrorAction`] is `Report`.
//!
//! With `Replace` or `Ignore` actions, errors are resolved in place and decoding
//! continues.
//!
//! # Available Charsets
//!
//! - `UTF-8`, `UTF-16LE`, `UTF-16BE`
//! - `US-ASCII`, `ISO-8859-1`, `windows-1252`
//!
//! ```rust
//! use largetext_charset::{Charset, CharDecoder, DecodeOutcome, DecoderOptions};
//!
//! let charset = Charset::for_name("utf8").unwrap();
//! let mut decoder = CharDecoder::new(DecoderOptions::new(charset));
//! let mut out = Vec::new();
//! // "é" is two bytes in UTF-8; only the first one is available.
//! let step = decoder.decode(b"caf\xC3", &mut out, false);
//! assert_eq!(step.consumed, 3);
//! assert_eq!(step.outcome, DecodeOutcome::Incomplete);
//! ```

mod charset;
mod decoder;
mod single_byte;
mod utf16;
mod utf8;

pub use charset::{Charset, CodingErrorAction, DecoderOptions};
pub use decoder::{CharDecoder, DecodeOutcome, DecodeStep};
