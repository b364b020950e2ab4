use serde::Serialize;

use crate::{
    cursor::{ByteCursor, Endian},
    errors::{CgrpError, CgrpResult},
    header::{ChunkDirectory, ChunkKind, ChunkLocation},
    parser_config::ParserConfig,
};

/// Reference tag of a file table slot
pub const FILE_SLOT_TAG: u32 = 0x7900;

/// Entry flag marking a payload stored in the FILE chunk
pub const PAYLOAD_PRESENT_FLAG: u32 = 0x1F00;

const ENTRY_SIZE: usize = 16;

/// `id | flag | offset | length`, the offset relative to the FILE body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTableEntry {
    pub id: u32,
    pub flag: u32,
    pub raw_offset: u32,
    pub length: u32,
    /// Absolute offset of the payload in the container, `None` for placeholder slots
    pub payload_offset: Option<usize>,
}

impl FileTableEntry {
    pub fn has_payload(&self) -> bool {
        self.payload_offset.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTable {
    pub entries: Vec<FileTableEntry>,
    /// FILE chunk the payload offsets were resolved against; optional while no entry has a payload
    pub file_chunk: Option<ChunkLocation>,
}

impl FileTable {
    pub fn from_cursor(
        cursor: &mut ByteCursor,
        directory: &ChunkDirectory,
        config: &ParserConfig,
    ) -> CgrpResult<Self> {
        let info = directory.require(ChunkKind::Info)?;
        let file = directory.get(ChunkKind::File);

        if let Some(file) = &file {
            file.open(cursor, ChunkKind::File)?;
        }
        info.open(cursor, ChunkKind::Info)?;

        let count = cursor.read_u32_le()?;
        config.check_file_entries(count)?;

        let mut slots = Vec::with_capacity(count as usize);
        for _ in 0..count {
            cursor.expect_uint("file table slot tag", 4, Endian::Little, FILE_SLOT_TAG as u64)?;
            let slot_field = cursor.position();
            let relative = cursor.read_u32_le()? as usize;
            let slot = info.body_start() + relative;
            if slot + ENTRY_SIZE > info.end() {
                return Err(CgrpError::InvalidOffset {
                    field: format!("file table slot at 0x{:X}", slot_field),
                    offset: slot as u64,
                    start: info.body_start(),
                    end: info.end(),
                });
            }
            slots.push(slot);
        }

        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            cursor.seek(slot)?;
            let id = cursor.read_u32_le()?;
            let flag = cursor.read_u32_le()?;
            let raw_offset = cursor.read_u32_le()?;
            let length = cursor.read_u32_le()?;

            let payload_offset = if flag == PAYLOAD_PRESENT_FLAG {
                let file = directory.require(ChunkKind::File)?;
                Some(resolve_payload(&file, raw_offset, slot)?)
            } else {
                None
            };

            entries.push(FileTableEntry {
                id,
                flag,
                raw_offset,
                length,
                payload_offset,
            });
        }

        Ok(FileTable {
            entries,
            file_chunk: file,
        })
    }

    pub fn present(&self) -> impl Iterator<Item = &FileTableEntry> {
        self.entries.iter().filter(|e| e.has_payload())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// FILE body base + raw offset, which must land inside the FILE chunk
fn resolve_payload(file: &ChunkLocation, raw_offset: u32, slot: usize) -> CgrpResult<usize> {
    let absolute = file
        .body_start()
        .checked_add(raw_offset as usize)
        .ok_or(CgrpError::IntegerOverflow {
            operation: "payload offset resolution".to_string(),
            details: format!("FILE body 0x{:X} + 0x{:X}", file.body_start(), raw_offset),
        })?;
    if absolute >= file.end() {
        return Err(CgrpError::InvalidOffset {
            field: format!("payload offset of entry at 0x{:X}", slot),
            offset: absolute as u64,
            start: file.body_start(),
            end: file.end(),
        });
    }
    Ok(absolute)
}
