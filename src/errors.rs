use std::fmt;
use thiserror::Error;

/// Error type for CGRP extraction
///
/// Every variant aborts the extraction that raised it. Recognized but unsupported
/// content (CWSD payloads, the INFX chunk) is reported through the warning channel
/// of [`crate::DiagnosticContext`] and never surfaces here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CgrpError {
    // ========== I/O ERRORS (1000-1099) ==========
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        io_kind: Option<std::io::ErrorKind>,
    },

    /// Error reading file contents
    #[error("Failed to read file {path}: {reason}")]
    FileReadError { path: String, reason: String },

    /// Permission denied when accessing file
    #[error("Permission denied accessing file: {path}")]
    PermissionDenied { path: String },

    /// Error creating a directory or writing an extracted file
    #[error("Failed to write {path}: {reason}")]
    FileWriteError { path: String, reason: String },

    // ========== STRUCTURAL VALIDATION ERRORS (2000-2099) ==========
    /// Magic bytes did not match
    #[error("Invalid magic bytes: expected '{expected}', found '{found}' at offset 0x{offset:X}")]
    InvalidMagicBytes {
        expected: String,
        found: String,
        offset: usize,
    },

    /// A fixed field decoded to something other than its required value
    #[error("Unexpected value for {field} at offset 0x{offset:X}: expected {expected}, found {actual}")]
    UnexpectedValue {
        field: String,
        expected: String,
        actual: String,
        offset: usize,
    },

    /// A declared length disagrees with the length it is checked against
    #[error("Length mismatch for {field} at offset 0x{offset:X}: declared {declared}, actual {actual}")]
    LengthMismatch {
        field: String,
        declared: u64,
        actual: u64,
        offset: usize,
    },

    /// Read past the end of the buffer
    #[error("Buffer underflow at offset 0x{offset:X}: needed {needed} bytes, only {available} available")]
    BufferUnderflow {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Offset or range outside the region it must lie in
    #[error("Invalid offset for {field}: 0x{offset:X} outside 0x{start:X}..0x{end:X}")]
    InvalidOffset {
        field: String,
        offset: u64,
        start: usize,
        end: usize,
    },

    /// Chunk directory names a tag this format does not define
    #[error("Unknown chunk type 0x{tag:04X} at offset 0x{offset:X}")]
    UnknownChunk { tag: u32, offset: usize },

    /// Chunk directory names the same chunk twice
    #[error("Duplicate {chunk} chunk at offset 0x{offset:X}")]
    DuplicateChunk { chunk: String, offset: usize },

    /// A required chunk is missing from the directory
    #[error("Missing {chunk} chunk in chunk directory")]
    MissingChunk { chunk: String },

    /// Integer width outside what the cursor can decode
    #[error("Unsupported integer width {width} at offset 0x{offset:X}")]
    InvalidReadWidth { width: usize, offset: usize },

    // ========== DISPATCH ERRORS (3000-3099) ==========
    /// Payload starts with a type tag that is neither supported nor known
    #[error("Unknown sub-resource type '{name}' (0x{tag:08X}) at offset 0x{offset:X}")]
    UnknownFileType {
        tag: u32,
        name: String,
        offset: usize,
    },

    // ========== RESOURCE LIMIT ERRORS (4000-4099) ==========
    /// Integer overflow in offset arithmetic
    #[error("Integer overflow in {operation}: {details}")]
    IntegerOverflow { operation: String, details: String },

    /// Data size exceeds configured limits
    #[error("Data size exceeds limit for {field}: {size} (limit: {limit})")]
    DataSizeExceedsLimit {
        field: String,
        size: usize,
        limit: usize,
    },

    // ========== CONVERTER ERRORS (5000-5099) ==========
    /// A sub-resource converter reported failure
    #[error("Conversion of {kind} #{index} failed: {reason}")]
    ConversionFailed {
        kind: String,
        index: usize,
        reason: String,
    },
}

impl CgrpError {
    /// Get the error code for machine-readable processing
    pub fn code(&self) -> u16 {
        match self {
            // I/O Errors (1000-1099)
            Self::FileNotFound { .. } => 1001,
            Self::FileReadError { .. } => 1002,
            Self::PermissionDenied { .. } => 1003,
            Self::FileWriteError { .. } => 1004,

            // Structural Validation Errors (2000-2099)
            Self::InvalidMagicBytes { .. } => 2001,
            Self::UnexpectedValue { .. } => 2002,
            Self::LengthMismatch { .. } => 2003,
            Self::BufferUnderflow { .. } => 2004,
            Self::InvalidOffset { .. } => 2005,
            Self::UnknownChunk { .. } => 2006,
            Self::DuplicateChunk { .. } => 2007,
            Self::MissingChunk { .. } => 2008,
            Self::InvalidReadWidth { .. } => 2009,

            // Dispatch Errors (3000-3099)
            Self::UnknownFileType { .. } => 3001,

            // Resource Limit Errors (4000-4099)
            Self::IntegerOverflow { .. } => 4001,
            Self::DataSizeExceedsLimit { .. } => 4002,

            // Converter Errors (5000-5099)
            Self::ConversionFailed { .. } => 5001,
        }
    }

    /// Get the error category for grouping related errors
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            1000..=1099 => ErrorCategory::IO,
            2000..=2099 => ErrorCategory::StructuralValidation,
            3000..=3099 => ErrorCategory::Dispatch,
            4000..=4099 => ErrorCategory::ResourceLimit,
            5000..=5099 => ErrorCategory::Conversion,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Byte offset the failure was detected at, when the error has one
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::InvalidMagicBytes { offset, .. }
            | Self::UnexpectedValue { offset, .. }
            | Self::LengthMismatch { offset, .. }
            | Self::BufferUnderflow { offset, .. }
            | Self::UnknownChunk { offset, .. }
            | Self::DuplicateChunk { offset, .. }
            | Self::InvalidReadWidth { offset, .. }
            | Self::UnknownFileType { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Expected and actually decoded value, for structural and dispatch failures
    pub fn expected_actual(&self) -> Option<(String, String)> {
        match self {
            Self::InvalidMagicBytes { expected, found, .. } => Some((expected.clone(), found.clone())),
            Self::UnexpectedValue { expected, actual, .. } => Some((expected.clone(), actual.clone())),
            // The declared length is what was decoded; the other side is what it must equal
            Self::LengthMismatch { declared, actual, .. } => {
                Some((actual.to_string(), declared.to_string()))
            },
            Self::BufferUnderflow { needed, available, .. } => Some((
                format!("{} readable bytes", needed),
                format!("{} readable bytes", available),
            )),
            Self::InvalidOffset { offset, start, end, .. } => {
                Some((format!("0x{:X}..0x{:X}", start, end), format!("0x{:X}", offset)))
            },
            Self::UnknownChunk { tag, .. } => Some((
                "chunk tag 0x7800, 0x7801 or 0x7802".to_string(),
                format!("0x{:04X}", tag),
            )),
            Self::DuplicateChunk { chunk, .. } => {
                Some((format!("one {} chunk", chunk), format!("a second {} chunk", chunk)))
            },
            Self::UnknownFileType { tag, name, .. } => Some((
                "CWAR, CBNK, CSEQ or CWSD".to_string(),
                format!("'{}' (0x{:08X})", name, tag),
            )),
            _ => None,
        }
    }

    /// Get suggested action for handling this error
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "Check file path and ensure file exists",
            Self::PermissionDenied { .. } => "Check file permissions and user access rights",
            Self::FileWriteError { .. } => "Check that the output directory is writable",
            Self::InvalidMagicBytes { .. } => "Verify this is a valid CGRP file",
            Self::UnknownFileType { .. } => "Group may embed a sub-resource kind this tool does not know",
            Self::BufferUnderflow { .. } => "File appears to be corrupted or truncated",
            Self::DataSizeExceedsLimit { .. } => "Raise the limit with a permissive configuration",
            _ => "Check file integrity; the partial output tree is left for inspection",
        }
    }
}

/// Error categories for grouping related error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    IO,
    StructuralValidation,
    Dispatch,
    ResourceLimit,
    Conversion,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IO => write!(f, "I/O"),
            Self::StructuralValidation => write!(f, "Structural Validation"),
            Self::Dispatch => write!(f, "Dispatch"),
            Self::ResourceLimit => write!(f, "Resource Limit"),
            Self::Conversion => write!(f, "Conversion"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result type alias for CGRP operations
pub type CgrpResult<T> = Result<T, CgrpError>;

impl CgrpError {
    /// Map an I/O error raised while reading `path`
    pub fn read_error(path: &std::path::Path, err: std::io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => CgrpError::FileNotFound {
                path,
                io_kind: Some(err.kind()),
            },
            std::io::ErrorKind::PermissionDenied => CgrpError::PermissionDenied { path },
            _ => CgrpError::FileReadError {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Map an I/O error raised while creating or writing `path`
    pub fn write_error(path: &std::path::Path, err: std::io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CgrpError::PermissionDenied { path },
            _ => CgrpError::FileWriteError {
                path,
                reason: err.to_string(),
            },
        }
    }
}

// Implement From traits for common error conversions
impl From<std::io::Error> for CgrpError {
    fn from(err: std::io::Error) -> Self {
        Self::read_error(std::path::Path::new("unknown"), err)
    }
}

impl From<serde_json::Error> for CgrpError {
    fn from(err: serde_json::Error) -> Self {
        CgrpError::FileWriteError {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}
