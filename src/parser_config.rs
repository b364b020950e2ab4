use crate::errors::{CgrpError, CgrpResult};

/// Configuration for resource limits and conversion options during CGRP extraction
///
/// Limits are checked before anything is allocated or written, so an absurd
/// count in a corrupted header fails fast instead of exhausting memory.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum size of a container file (bytes)
    pub max_file_size: usize,

    /// Maximum number of entries in the chunk directory
    pub max_chunk_count: u32,

    /// Maximum number of entries in the INFO file table
    pub max_file_entries: u32,

    /// Maximum total number of payload bytes written during one extraction
    pub max_total_payload_bytes: usize,

    /// Conversion-mode flag forwarded unchanged to every bank
    pub bank_conversion_flag: bool,

    /// Fail when a file-table length disagrees with the payload's own length
    pub strict_entry_lengths: bool,

    /// Write `manifest.json` into the output root after a successful extraction
    pub write_manifest: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024 * 1024,             // 256MB per group
            max_chunk_count: 16,                          // Format defines three chunk kinds
            max_file_entries: 4096,                       // Generous for a single group
            max_total_payload_bytes: 512 * 1024 * 1024, // 512MB written per extraction
            bank_conversion_flag: false,
            strict_entry_lengths: false,
            write_manifest: false,
        }
    }
}

impl ParserConfig {
    /// Tighter limits and fatal length disagreements
    pub fn strict() -> Self {
        Self {
            max_file_size: 64 * 1024 * 1024,
            max_chunk_count: 3,
            max_file_entries: 1024,
            max_total_payload_bytes: 128 * 1024 * 1024,
            strict_entry_lengths: true,
            ..Self::default()
        }
    }

    /// Relaxed limits for unusually large groups
    pub fn permissive() -> Self {
        Self {
            max_file_size: 2 * 1024 * 1024 * 1024,
            max_chunk_count: 64,
            max_file_entries: 65_536,
            // 4GB, saturating where usize is 32 bits wide
            max_total_payload_bytes: usize::try_from(4u64 << 30).unwrap_or(usize::MAX),
            ..Self::default()
        }
    }

    /// Check if the container size is acceptable before reading it
    pub fn check_file_size(&self, size: usize) -> CgrpResult<()> {
        if size > self.max_file_size {
            return Err(CgrpError::DataSizeExceedsLimit {
                field: "file_size".to_string(),
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Check if the chunk directory count is acceptable
    pub fn check_chunk_count(&self, count: u32) -> CgrpResult<()> {
        if count > self.max_chunk_count {
            return Err(CgrpError::DataSizeExceedsLimit {
                field: "chunk_count".to_string(),
                size: count as usize,
                limit: self.max_chunk_count as usize,
            });
        }
        Ok(())
    }

    /// Check if the file table entry count is acceptable
    pub fn check_file_entries(&self, count: u32) -> CgrpResult<()> {
        if count > self.max_file_entries {
            return Err(CgrpError::DataSizeExceedsLimit {
                field: "file_entry_count".to_string(),
                size: count as usize,
                limit: self.max_file_entries as usize,
            });
        }
        Ok(())
    }
}

/// Resource tracker for monitoring what one extraction has written
#[derive(Debug, Default)]
pub struct ResourceTracker {
    /// Number of payloads written to disk
    pub payload_count: usize,

    /// Total payload bytes written to disk
    pub payload_bytes: usize,
}

impl ResourceTracker {
    /// Create a new resource tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a payload about to be written
    pub fn track_payload(&mut self, config: &ParserConfig, size: usize) -> CgrpResult<()> {
        let new_total = self
            .payload_bytes
            .checked_add(size)
            .ok_or(CgrpError::IntegerOverflow {
                operation: "payload byte accounting".to_string(),
                details: format!("{} + {}", self.payload_bytes, size),
            })?;

        if new_total > config.max_total_payload_bytes {
            return Err(CgrpError::DataSizeExceedsLimit {
                field: "total_payload_bytes".to_string(),
                size: new_total,
                limit: config.max_total_payload_bytes,
            });
        }

        self.payload_bytes = new_total;
        self.payload_count += 1;

        Ok(())
    }
}

impl std::fmt::Display for ResourceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Payloads: {} ({:.1}KB)",
            self.payload_count,
            self.payload_bytes as f64 / 1024.0
        )
    }
}
