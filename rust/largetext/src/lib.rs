//! Random access by character over very large text files.
//!
//! A [`LargeText`] exposes a file as a character sequence without materializing
//! it. A background thread decodes the file window by window and publishes its
//! progress; readers block only until the characters they ask for are decoded.
//!
//! # Pipeline
//!
//! - [`engine::DecodeEngine`]: the single decoding thread, producing
//!   [`Window`]s (matched byte and character spans).
//! - [`status::DecodingStatus`]: decoded character count, terminal state and
//!   the waiters blocked on progress.
//! - [`index::RangeIndex`]: append-only map from character offset to window.
//! - [`cache::BufferCache`]: expiring cache of decoded window buffers.
//! - [`sequence::SequenceFactory`]: assembles [`TextSequence`] views from cached
//!   buffers.
//!
//! Texts are opened through a [`LargeTextFactory`].

pub mod cache;
pub mod engine;
pub mod factory;
pub mod index;
pub mod ranges;
pub mod sequence;
pub mod status;
pub mod text;
pub mod window;

pub use cache::{CacheStats, CharBuffer};
pub use factory::{IoMode, LargeTextConfig, LargeTextFactory, LargeTextFactoryBuilder, SizeUnit};
pub use ranges::{ByteRange, CharRange};
pub use sequence::TextSequence;
pub use text::{LargeText, SyncLargeText, UnsyncLargeText};
pub use window::Window;

pub use largetext_common::{DecodeError, Error, ErrorKind, Result};
