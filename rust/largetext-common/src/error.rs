use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn out_of_bounds(requested: usize, available: usize) -> Error {
        Error(
            ErrorKind::IndexOutOfBounds {
                requested,
                available,
            }
            .into(),
        )
    }

    pub fn closed() -> Error {
        Error(ErrorKind::Closed.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns the terminal decoding error carried by this error, if any.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self.kind() {
            ErrorKind::Decode(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self.kind(), ErrorKind::Decode(_))
    }

    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind(), ErrorKind::IndexOutOfBounds { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind(), ErrorKind::Closed)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("out of bounds: {requested} characters requested but only {available} available")]
    IndexOutOfBounds { requested: usize, available: usize },

    #[error("decoding error: {0}")]
    Decode(DecodeError),

    #[error("decoding was cancelled")]
    Cancelled,

    #[error("text is closed")]
    Closed,

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

/// A terminal failure of the decoding process.
///
/// Recorded once by the decoder and handed out to every observer, hence `Clone`.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("malformed input of length {length} at byte offset {offset}")]
    Malformed { offset: u64, length: usize },

    #[error("unmappable input of length {length} at byte offset {offset}")]
    Unmappable { offset: u64, length: usize },

    #[error("unable to read file as text starting from byte offset {offset}")]
    Stalled { offset: u64 },

    #[error("IO error at byte offset {offset}: {source}")]
    Io {
        offset: u64,
        source: Arc<std::io::Error>,
    },

    #[error("decoding cancelled at byte offset {offset}")]
    Cancelled { offset: u64 },
}

impl DecodeError {
    /// Byte offset within the file where the failure occurred.
    pub fn offset(&self) -> u64 {
        match self {
            DecodeError::Malformed { offset, .. }
            | DecodeError::Unmappable { offset, .. }
            | DecodeError::Stalled { offset }
            | DecodeError::Io { offset, .. }
            | DecodeError::Cancelled { offset } => *offset,
        }
    }

    pub fn io(offset: u64, source: std::io::Error) -> DecodeError {
        DecodeError::Io {
            offset,
            source: Arc::new(source),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Cancelled { .. } => ErrorKind::Cancelled.into(),
            e => ErrorKind::Decode(e).into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
