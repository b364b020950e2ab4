use std::fs;
use std::path::Path;

use crate::errors::{CgrpError, CgrpResult};

/// CGRP magic bytes
pub const CGRP_MAGIC: [u8; 4] = *b"CGRP";

/// Byte order mark of a little-endian CTR container, as decoded little-endian
pub const BYTE_ORDER_MARK: u16 = 0xFEFF;

/// Render a 4-byte tag the way it appears in the file, e.g. `0x43534551` -> `CSEQ`
///
/// Bytes outside printable ASCII are shown as `.`.
pub fn fourcc_to_string(tag: u32) -> String {
    tag.to_be_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}

/// Read a whole file, mapping I/O failures to path-carrying errors
pub fn read_file(path: &Path) -> CgrpResult<Vec<u8>> {
    fs::read(path).map_err(|e| CgrpError::read_error(path, e))
}

/// Write a whole file, mapping I/O failures to path-carrying errors
pub fn write_file(path: &Path, data: &[u8]) -> CgrpResult<()> {
    fs::write(path, data).map_err(|e| CgrpError::write_error(path, e))
}

/// Create a directory (and its parents) if it does not exist yet
pub fn ensure_dir(path: &Path) -> CgrpResult<()> {
    fs::create_dir_all(path).map_err(|e| CgrpError::write_error(path, e))
}
