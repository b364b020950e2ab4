//! CGRP test data builders
//!
//! Produces containers byte-for-byte the way the parser expects them, with
//! hooks for reordering the chunk directory, dropping chunks, adding unknown
//! directory tags and corrupting lengths.

#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use cgrp_parser::{ChunkKind, PAYLOAD_PRESENT_FLAG};

const HEADER_FIXED_SIZE: usize = 20;
const DIRECTORY_ENTRY_SIZE: usize = 12;
const MIN_HEADER_SIZE: usize = 0x40;

#[derive(Debug, Clone)]
enum PlannedEntry {
    Present {
        id: u32,
        payload: Vec<u8>,
        length: Option<u32>,
    },
    Absent {
        id: u32,
    },
}

/// Offsets of the pieces of a built container
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub info_offset: usize,
    pub file_offset: usize,
    pub infx_offset: Option<usize>,
    /// Absolute offset of each entry's payload; `None` for absent entries
    pub payload_offsets: Vec<Option<usize>>,
    /// Offset of each directory entry's tag, in directory order
    pub directory_offsets: Vec<usize>,
}

/// Fluent builder for CGRP containers
#[derive(Debug, Clone)]
pub struct CgrpBuilder {
    version: u32,
    entries: Vec<PlannedEntry>,
    directory_order: Vec<ChunkKind>,
    with_infx: bool,
    unknown_tags: Vec<u32>,
    trailing_bytes: usize,
}

impl Default for CgrpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CgrpBuilder {
    pub fn new() -> Self {
        Self {
            version: 0x0101_0000,
            entries: Vec::new(),
            directory_order: vec![ChunkKind::Info, ChunkKind::File, ChunkKind::Infx],
            with_infx: false,
            unknown_tags: Vec::new(),
            trailing_bytes: 0,
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add an entry whose table length matches the payload
    pub fn entry(self, payload: impl Into<Vec<u8>>) -> Self {
        let id = self.next_id();
        self.entry_with(id, payload, None)
    }

    /// Add an entry whose table length disagrees with the payload
    pub fn entry_with_length(self, payload: impl Into<Vec<u8>>, length: u32) -> Self {
        let id = self.next_id();
        self.entry_with(id, payload, Some(length))
    }

    pub fn entry_with(mut self, id: u32, payload: impl Into<Vec<u8>>, length: Option<u32>) -> Self {
        self.entries.push(PlannedEntry::Present {
            id,
            payload: payload.into(),
            length,
        });
        self
    }

    /// Add an entry without a payload
    pub fn absent_entry(mut self) -> Self {
        let id = self.next_id();
        self.entries.push(PlannedEntry::Absent { id });
        self
    }

    /// Kinds listed in the chunk directory, in order; INFX is only listed with [`Self::with_infx`]
    pub fn directory_order(mut self, order: Vec<ChunkKind>) -> Self {
        self.directory_order = order;
        self
    }

    pub fn with_infx(mut self) -> Self {
        self.with_infx = true;
        self
    }

    /// Append a directory entry with an unrecognized tag
    pub fn unknown_chunk(mut self, tag: u32) -> Self {
        self.unknown_tags.push(tag);
        self
    }

    /// Bytes appended after the total length is recorded
    pub fn trailing_bytes(mut self, count: usize) -> Self {
        self.trailing_bytes = count;
        self
    }

    fn next_id(&self) -> u32 {
        0x0200_0000 + self.entries.len() as u32
    }

    fn listed_chunks(&self) -> Vec<ChunkKind> {
        self.directory_order
            .iter()
            .copied()
            .filter(|kind| *kind != ChunkKind::Infx || self.with_infx)
            .collect()
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let listed = self.listed_chunks();
        let chunk_count = listed.len() + self.unknown_tags.len();
        let directory_end = HEADER_FIXED_SIZE + DIRECTORY_ENTRY_SIZE * chunk_count;
        let header_size = align(directory_end.max(MIN_HEADER_SIZE), 0x20);

        let info = self.info_chunk();
        let (file, payload_offsets) = self.file_chunk();
        let infx = self.infx_chunk();

        let mut layout = Layout {
            info_offset: header_size,
            file_offset: header_size + info.len(),
            ..Default::default()
        };
        layout.infx_offset = Some(layout.file_offset + file.len()).filter(|_| self.with_infx);
        layout.payload_offsets = payload_offsets
            .into_iter()
            .map(|p| p.map(|p| layout.file_offset + 8 + p))
            .collect();

        let total_length =
            header_size + info.len() + file.len() + if self.with_infx { infx.len() } else { 0 };

        let mut buffer = BytesMut::with_capacity(total_length + self.trailing_bytes);
        buffer.put(&b"CGRP"[..]);
        buffer.put_u16_le(0xFEFF);
        buffer.put_u16_le(0x40);
        buffer.put_u32_le(self.version);
        buffer.put_u32_le(total_length as u32);
        buffer.put_u32_le(chunk_count as u32);

        for kind in &listed {
            layout.directory_offsets.push(buffer.len());
            let (offset, length) = match kind {
                ChunkKind::Info => (layout.info_offset, info.len()),
                ChunkKind::File => (layout.file_offset, file.len()),
                ChunkKind::Infx => (layout.infx_offset.unwrap_or(0), infx.len()),
            };
            buffer.put_u32_le(kind.tag());
            buffer.put_u32_le(offset as u32);
            buffer.put_u32_le(length as u32);
        }
        for tag in &self.unknown_tags {
            layout.directory_offsets.push(buffer.len());
            buffer.put_u32_le(*tag);
            buffer.put_u32_le(0);
            buffer.put_u32_le(0);
        }
        buffer.resize(header_size, 0);

        buffer.put(&info[..]);
        buffer.put(&file[..]);
        if self.with_infx {
            buffer.put(&infx[..]);
        }
        buffer.put_bytes(0xEE, self.trailing_bytes);

        (buffer.to_vec(), layout)
    }

    fn info_chunk(&self) -> Vec<u8> {
        let count = self.entries.len();
        let length = 8 + 4 + 8 * count + 16 * count;

        let mut buffer = BytesMut::with_capacity(length);
        buffer.put(&b"INFO"[..]);
        buffer.put_u32_le(length as u32);
        buffer.put_u32_le(count as u32);
        for index in 0..count {
            buffer.put_u32_le(0x7900);
            buffer.put_u32_le((4 + 8 * count + 16 * index) as u32);
        }

        let mut raw_offset = 0;
        for entry in &self.entries {
            match entry {
                PlannedEntry::Present { id, payload, length } => {
                    buffer.put_u32_le(*id);
                    buffer.put_u32_le(PAYLOAD_PRESENT_FLAG);
                    buffer.put_u32_le(raw_offset as u32);
                    buffer.put_u32_le(length.unwrap_or(payload.len() as u32));
                    raw_offset += align(payload.len(), 4);
                },
                PlannedEntry::Absent { id } => {
                    buffer.put_u32_le(*id);
                    buffer.put_u32_le(0);
                    buffer.put_u32_le(0xFFFF_FFFF);
                    buffer.put_u32_le(0);
                },
            }
        }
        buffer.to_vec()
    }

    /// FILE chunk and each payload's offset relative to its body
    fn file_chunk(&self) -> (Vec<u8>, Vec<Option<usize>>) {
        let mut body = BytesMut::new();
        let mut offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry {
                PlannedEntry::Present { payload, .. } => {
                    offsets.push(Some(body.len()));
                    body.put(&payload[..]);
                    body.resize(align(body.len(), 4), 0);
                },
                PlannedEntry::Absent { .. } => offsets.push(None),
            }
        }

        let mut buffer = BytesMut::with_capacity(body.len() + 8);
        buffer.put(&b"FILE"[..]);
        buffer.put_u32_le((body.len() + 8) as u32);
        buffer.put(&body[..]);
        (buffer.to_vec(), offsets)
    }

    fn infx_chunk(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(12);
        buffer.put(&b"INFX"[..]);
        buffer.put_u32_le(12);
        buffer.put_u32_le(0);
        buffer.to_vec()
    }
}

fn align(value: usize, to: usize) -> usize {
    (value + to - 1) / to * to
}

/// A CTR sub-file: 16-byte common header followed by `body`
pub fn sub_file(magic: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buffer = BytesMut::with_capacity(16 + body.len());
    buffer.put(&magic[..]);
    buffer.put_u16_le(0xFEFF);
    buffer.put_u16_le(0x40);
    buffer.put_u32_le(0x0100_0000);
    buffer.put_u32_le((16 + body.len()) as u32);
    buffer.put(body);
    buffer.to_vec()
}

/// A CWAR holding `waves`, one INFO reference per wave
pub fn wave_archive(waves: &[&[u8]]) -> Vec<u8> {
    let info_offset = 0x40;
    let info_size = 8 + 4 + 12 * waves.len();
    let data_offset = info_offset + info_size;
    let data_size = 8 + waves.iter().map(|w| w.len()).sum::<usize>();
    let total = data_offset + data_size;

    let mut buffer = BytesMut::with_capacity(total);
    buffer.put(&b"CWAR"[..]);
    buffer.put_u16_le(0xFEFF);
    buffer.put_u16_le(0x40);
    buffer.put_u32_le(0x0100_0000);
    buffer.put_u32_le(total as u32);
    buffer.put_u16_le(2);
    buffer.put_u16_le(0);

    buffer.put_u16_le(0x6800);
    buffer.put_u16_le(0);
    buffer.put_u32_le(info_offset as u32);
    buffer.put_u32_le(info_size as u32);
    buffer.put_u16_le(0x6801);
    buffer.put_u16_le(0);
    buffer.put_u32_le(data_offset as u32);
    buffer.put_u32_le(data_size as u32);
    buffer.resize(info_offset, 0);

    buffer.put(&b"INFO"[..]);
    buffer.put_u32_le(info_size as u32);
    buffer.put_u32_le(waves.len() as u32);
    let mut offset = 0;
    for wave in waves {
        buffer.put_u32_le(PAYLOAD_PRESENT_FLAG);
        buffer.put_u32_le(offset as u32);
        buffer.put_u32_le(wave.len() as u32);
        offset += wave.len();
    }

    buffer.put(&b"DATA"[..]);
    buffer.put_u32_le(data_size as u32);
    for wave in waves {
        buffer.put(*wave);
    }
    buffer.to_vec()
}
