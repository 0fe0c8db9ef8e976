//! Error types
//!
//! Two kinds reach callers: `Internal` for native-layer failures and broken
//! invariants, `Format` for container buffers that fail validation.

use std::fmt;

use thiserror::Error;

/// Raw status handle returned by a failing native call.
///
/// The native layer packs the error code into the low 16 bits; the upper
/// bits carry component information that is only useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NativeStatus(pub u64);

impl NativeStatus {
    /// Error code portion of the status handle.
    #[inline]
    pub const fn code(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Structural problems found while decoding a context binary container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid container magic: 0x{0:08X}")]
    InvalidMagic(u32),
    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),
    #[error("unexpected end of container")]
    UnexpectedEof,
    #[error("container signature is not valid UTF-8")]
    InvalidUtf8,
    #[error("length field overflows")]
    LengthOverflow,
    #[error("length field is not minimally encoded")]
    NonCanonicalLength,
    #[error("container digest mismatch")]
    DigestMismatch,
    #[error("{0} trailing bytes after container")]
    TrailingBytes(usize),
}

/// Coarse classification of a [`ContextError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Internal,
    Format,
}

#[derive(Debug, Error)]
pub enum ContextError {
    /// A native call failed or an invariant of the context was violated.
    #[error("{op}: {message}{}", status_suffix(.status))]
    Internal {
        op: &'static str,
        status: Option<NativeStatus>,
        message: String,
    },

    #[error("malformed context binary: {0}")]
    Format(#[from] FormatError),
}

impl ContextError {
    pub fn internal(op: &'static str, message: impl Into<String>) -> Self {
        ContextError::Internal {
            op,
            status: None,
            message: message.into(),
        }
    }

    pub fn native(op: &'static str, status: NativeStatus, message: impl Into<String>) -> Self {
        ContextError::Internal {
            op,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextError::Internal { .. } => ErrorKind::Internal,
            ContextError::Format(_) => ErrorKind::Format,
        }
    }

    /// Native status attached to the failure, if any.
    pub fn status(&self) -> Option<NativeStatus> {
        match self {
            ContextError::Internal { status, .. } => *status,
            ContextError::Format(_) => None,
        }
    }
}

fn status_suffix(status: &Option<NativeStatus>) -> String {
    match status {
        Some(status) => format!(" (error {status})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ContextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_masks_low_bits() {
        let status = NativeStatus(0x0003_0000_0000_1389);
        assert_eq!(status.code(), 0x1389);
        assert_eq!(status.to_string(), "5001");
    }

    #[test]
    fn test_error_kinds() {
        let err = ContextError::native("context_create", NativeStatus(1002), "boom");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status(), Some(NativeStatus(1002)));
        assert_eq!(err.to_string(), "context_create: boom (error 1002)");

        let err: ContextError = FormatError::DigestMismatch.into();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_internal_without_status_display() {
        let err = ContextError::internal("configure", "cache state is invalid");
        assert_eq!(err.to_string(), "configure: cache state is invalid");
    }
}
