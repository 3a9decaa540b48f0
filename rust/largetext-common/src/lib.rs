//! Core definitions (error types and result helpers), relied upon by all largetext-* crates.

pub mod error;
pub mod result;

pub use error::{DecodeError, Error, ErrorKind};
pub use result::Result;
