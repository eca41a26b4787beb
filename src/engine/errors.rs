use thiserror::Error;
use tracing::{debug, error, warn};

pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while packing or unpacking wire payloads.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("{message_type}: malformed message: {detail}")]
    MalformedMessage {
        message_type: &'static str,
        detail: String,
    },

    #[error("value out of range for {target}: {detail}")]
    Range { target: &'static str, detail: String },

    #[error("unsupported column type oid {0}")]
    UnsupportedType(u32),

    #[error("{value} value cannot be stored in a column of oid {oid}")]
    TypeMismatch { oid: u32, value: &'static str },

    #[error("{codec} decompression failed: {detail}")]
    DecompressionFailure { codec: &'static str, detail: String },

    #[error("bounds violation: {0}")]
    BoundsViolation(String),

    #[error("row {row} column {column}: {source}")]
    Cell {
        row: usize,
        column: usize,
        #[source]
        source: Box<WireError>,
    },
}

impl WireError {
    pub fn malformed(message_type: &'static str, detail: impl Into<String>) -> Self {
        WireError::MalformedMessage {
            message_type,
            detail: detail.into(),
        }
    }

    pub fn range(target: &'static str, detail: impl Into<String>) -> Self {
        WireError::Range {
            target,
            detail: detail.into(),
        }
    }

    pub fn at_cell(self, row: usize, column: usize) -> Self {
        WireError::Cell {
            row,
            column,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any `Cell` context.
    pub fn root(&self) -> &WireError {
        match self {
            WireError::Cell { source, .. } => source.root(),
            other => other,
        }
    }

    /// A bounds violation means a protocol mismatch or a bug; the whole
    /// message is rejected and nothing from it may be used.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.root(), WireError::BoundsViolation(_))
    }

    pub fn log_error(&self) {
        match self.root() {
            WireError::MalformedMessage { message_type, .. } => {
                warn!("Rejected malformed {} message: {}", message_type, self);
                debug!("Malformed message details: {:?}", self);
            }
            WireError::Range { .. } => {
                warn!("Rejected row: {}", self);
                debug!("Range error details: {:?}", self);
            }
            WireError::UnsupportedType(oid) => {
                warn!("Rejected row with unsupported oid {}: {}", oid, self);
                debug!("Unsupported type details: {:?}", self);
            }
            WireError::TypeMismatch { oid, .. } => {
                warn!("Rejected row, value does not match oid {}: {}", oid, self);
            }
            WireError::DecompressionFailure { codec, .. } => {
                warn!("Rejected batch, {} block did not decompress: {}", codec, self);
                debug!("Decompression error details: {:?}", self);
            }
            WireError::BoundsViolation(_) => {
                error!("Bounds violation while decoding: {}", self);
                debug!("Bounds violation details: {:?}", self);
            }
            WireError::Cell { .. } => {
                error!("Cell error: {}", self);
            }
        }
    }
}
