use serde::Serialize;
use tracing::debug;

use crate::{
    cursor::{ByteCursor, Endian},
    errors::{CgrpError, CgrpResult},
    parser_config::ParserConfig,
    traits::CgrpParser,
    utils::{BYTE_ORDER_MARK, CGRP_MAGIC},
};

/// Fixed header size of a CGRP container
pub const CGRP_HEADER_SIZE: u16 = 0x40;

/// Chunk kinds named in the chunk directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChunkKind {
    Info,
    File,
    Infx,
}

impl ChunkKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0x7800 => Some(Self::Info),
            0x7801 => Some(Self::File),
            0x7802 => Some(Self::Infx),
            _ => None,
        }
    }

    /// Directory tag, read as a little-endian u32
    pub fn tag(self) -> u32 {
        match self {
            Self::Info => 0x7800,
            Self::File => 0x7801,
            Self::Infx => 0x7802,
        }
    }

    /// Magic at the start of the chunk itself
    pub fn magic(self) -> [u8; 4] {
        match self {
            Self::Info => *b"INFO",
            Self::File => *b"FILE",
            Self::Infx => *b"INFX",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::File => "FILE",
            Self::Infx => "INFX",
        }
    }
}

/// Where a chunk lives, as recorded in the chunk directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkLocation {
    pub offset: u32,
    pub length: u32,
}

impl ChunkLocation {
    pub fn start(&self) -> usize {
        self.offset as usize
    }

    /// Start of the chunk body, past its magic and length
    pub fn body_start(&self) -> usize {
        self.offset as usize + 8
    }

    pub fn end(&self) -> usize {
        self.offset as usize + self.length as usize
    }

    /// Seek to the chunk and check its magic and self-declared length against the directory
    pub fn open(&self, cursor: &mut ByteCursor, kind: ChunkKind) -> CgrpResult<()> {
        cursor.seek(self.start())?;
        cursor.expect_magic(kind.magic())?;
        let offset = cursor.position();
        let declared = cursor.read_u32_le()?;
        if declared != self.length {
            return Err(CgrpError::LengthMismatch {
                field: format!("{} chunk length", kind.name()),
                declared: declared as u64,
                actual: self.length as u64,
                offset,
            });
        }
        Ok(())
    }
}

/// Chunk directory; each kind appears at most once, in any order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChunkDirectory {
    pub info: Option<ChunkLocation>,
    pub file: Option<ChunkLocation>,
    pub infx: Option<ChunkLocation>,
}

impl ChunkDirectory {
    fn slot(&mut self, kind: ChunkKind) -> &mut Option<ChunkLocation> {
        match kind {
            ChunkKind::Info => &mut self.info,
            ChunkKind::File => &mut self.file,
            ChunkKind::Infx => &mut self.infx,
        }
    }

    pub fn get(&self, kind: ChunkKind) -> Option<ChunkLocation> {
        match kind {
            ChunkKind::Info => self.info,
            ChunkKind::File => self.file,
            ChunkKind::Infx => self.infx,
        }
    }

    /// Record a directory entry; `offset` is where the entry's tag was read
    pub fn insert(
        &mut self,
        kind: ChunkKind,
        location: ChunkLocation,
        offset: usize,
    ) -> CgrpResult<()> {
        let slot = self.slot(kind);
        if slot.is_some() {
            return Err(CgrpError::DuplicateChunk {
                chunk: kind.name().to_string(),
                offset,
            });
        }
        *slot = Some(location);
        Ok(())
    }

    pub fn require(&self, kind: ChunkKind) -> CgrpResult<ChunkLocation> {
        self.get(kind).ok_or(CgrpError::MissingChunk {
            chunk: kind.name().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CgrpHeader {
    /// Recorded only; no version range is enforced
    pub version: u32,
    pub total_length: u32,
    pub chunk_count: u32,
    pub directory: ChunkDirectory,
}

impl CgrpHeader {
    /// Parse the header and chunk directory with resource limits
    pub fn from_cursor_with_config(
        cursor: &mut ByteCursor,
        config: &ParserConfig,
    ) -> CgrpResult<Self> {
        cursor.seek(0)?;
        cursor.expect_magic(CGRP_MAGIC)?;
        cursor.expect_uint("byte order mark", 2, Endian::Little, BYTE_ORDER_MARK as u64)?;
        cursor.expect_uint("header size", 2, Endian::Little, CGRP_HEADER_SIZE as u64)?;

        let version = cursor.read_u32_le()?;
        debug!(version, "CGRP version");

        let length_offset = cursor.position();
        let total_length = cursor.read_u32_le()?;
        if total_length as usize != cursor.len() {
            return Err(CgrpError::LengthMismatch {
                field: "total length".to_string(),
                declared: total_length as u64,
                actual: cursor.len() as u64,
                offset: length_offset,
            });
        }

        let chunk_count = cursor.read_u32_le()?;
        config.check_chunk_count(chunk_count)?;

        let mut directory = ChunkDirectory::default();
        for _ in 0..chunk_count {
            let tag_offset = cursor.position();
            let tag = cursor.read_u32_le()?;
            let kind = ChunkKind::from_tag(tag).ok_or(CgrpError::UnknownChunk {
                tag,
                offset: tag_offset,
            })?;

            let location = ChunkLocation {
                offset: cursor.read_u32_le()?,
                length: cursor.read_u32_le()?,
            };
            check_chunk_bounds(kind, &location, cursor.len())?;
            directory.insert(kind, location, tag_offset)?;
        }

        Ok(CgrpHeader {
            version,
            total_length,
            chunk_count,
            directory,
        })
    }
}

impl CgrpParser for CgrpHeader {
    fn from_cursor(cursor: &mut ByteCursor) -> CgrpResult<Self> {
        Self::from_cursor_with_config(cursor, &ParserConfig::default())
    }
}

fn check_chunk_bounds(kind: ChunkKind, location: &ChunkLocation, file_size: usize) -> CgrpResult<()> {
    let end = (location.offset as u64) + (location.length as u64);
    if location.length < 8 || end > file_size as u64 {
        return Err(CgrpError::InvalidOffset {
            field: format!("{} chunk range", kind.name()),
            offset: end,
            start: 0,
            end: file_size,
        });
    }
    Ok(())
}
