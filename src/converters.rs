use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    cursor::{ByteCursor, Endian},
    diagnostics::DiagnosticContext,
    errors::{CgrpError, CgrpResult},
    file_table::PAYLOAD_PRESENT_FLAG,
    resources::{Bank, Sequence, SubResourceKind, WaveArchive, WaveArchiveArena},
    traits::SubResourceConverter,
    utils::{write_file, BYTE_ORDER_MARK},
};

const WAVE_ARCHIVE_INFO_BLOCK: u16 = 0x6800;
const WAVE_ARCHIVE_DATA_BLOCK: u16 = 0x6801;

/// `magic | BOM | header size | version | file size`, common to every CTR sub-file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubFileHeader {
    pub header_size: u16,
    pub version: u32,
    pub file_size: u32,
}

impl SubFileHeader {
    /// Validate the common header of a sub-file of `kind`
    pub fn parse(cursor: &mut ByteCursor, kind: SubResourceKind) -> CgrpResult<Self> {
        cursor.seek(0)?;
        cursor.expect_magic(kind.magic())?;
        cursor.expect_uint("byte order mark", 2, Endian::Little, BYTE_ORDER_MARK as u64)?;
        let header_size = cursor.read_u16_le()?;
        let version = cursor.read_u32_le()?;

        let size_offset = cursor.position();
        let file_size = cursor.read_u32_le()?;
        if file_size as usize != cursor.len() {
            return Err(CgrpError::LengthMismatch {
                field: format!("{} file size", kind),
                declared: file_size as u64,
                actual: cursor.len() as u64,
                offset: size_offset,
            });
        }

        Ok(Self {
            header_size,
            version,
            file_size,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockRef {
    offset: usize,
    size: usize,
}

impl BlockRef {
    fn open(&self, cursor: &mut ByteCursor, magic: [u8; 4]) -> CgrpResult<()> {
        cursor.seek(self.offset)?;
        cursor.expect_magic(magic)?;
        let offset = cursor.position();
        let declared = cursor.read_u32_le()? as usize;
        if declared != self.size {
            return Err(CgrpError::LengthMismatch {
                field: format!("{} block size", String::from_utf8_lossy(&magic)),
                declared: declared as u64,
                actual: self.size as u64,
                offset,
            });
        }
        Ok(())
    }

    fn body_start(&self) -> usize {
        self.offset + 8
    }

    fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Wave bytes referenced by a wave archive's INFO block, in table order
pub fn split_wave_archive(data: Bytes, ctx: &DiagnosticContext) -> CgrpResult<Vec<Option<Bytes>>> {
    let mut cursor = ByteCursor::new(data);
    SubFileHeader::parse(&mut cursor, SubResourceKind::WaveArchive)?;

    let block_count = cursor.read_u16_le()?;
    cursor.skip(2)?;

    let mut info_block = None;
    let mut data_block = None;
    for _ in 0..block_count {
        let ref_offset = cursor.position();
        let kind = cursor.read_u16_le()?;
        cursor.skip(2)?;
        let block = BlockRef {
            offset: cursor.read_u32_le()? as usize,
            size: cursor.read_u32_le()? as usize,
        };
        match kind {
            WAVE_ARCHIVE_INFO_BLOCK => info_block = Some(block),
            WAVE_ARCHIVE_DATA_BLOCK => data_block = Some(block),
            other => ctx.warning(ref_offset, &format!("Skipping wave archive block 0x{:04X}", other)),
        }
    }

    let info_block = info_block.ok_or(CgrpError::MissingChunk {
        chunk: "wave archive INFO".to_string(),
    })?;
    let data_block = data_block.ok_or(CgrpError::MissingChunk {
        chunk: "wave archive DATA".to_string(),
    })?;

    data_block.open(&mut cursor, *b"DATA")?;
    info_block.open(&mut cursor, *b"INFO")?;

    let count = cursor.read_u32_le()?;
    let mut waves = Vec::with_capacity(count as usize);
    for index in 0..count {
        let flag = cursor.read_u32_le()?;
        let offset = cursor.read_u32_le()? as usize;
        let size = cursor.read_u32_le()? as usize;
        if cursor.position() > info_block.end() {
            return Err(CgrpError::InvalidOffset {
                field: format!("wave reference {}", index),
                offset: cursor.position() as u64,
                start: info_block.body_start(),
                end: info_block.end(),
            });
        }

        if flag != PAYLOAD_PRESENT_FLAG {
            debug!(index, flag, "wave reference without payload");
            waves.push(None);
            continue;
        }

        let start = data_block.body_start() + offset;
        if start + size > data_block.end() {
            return Err(CgrpError::InvalidOffset {
                field: format!("wave {} range", index),
                offset: (start + size) as u64,
                start: data_block.body_start(),
                end: data_block.end(),
            });
        }
        waves.push(Some(cursor.slice(start, size)?));
    }

    Ok(waves)
}

#[derive(Debug, Serialize)]
struct BankDescription {
    index: usize,
    table_id: u32,
    version: u32,
    length: usize,
    conversion_flag: bool,
    wave_archives: Vec<WaveArchiveDescription>,
}

#[derive(Debug, Serialize)]
struct WaveArchiveDescription {
    index: usize,
    /// Relative to the bank's parent directory when possible
    path: PathBuf,
    waves: usize,
}

/// Converters used by [`crate::CgrpFile::extract`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl SubResourceConverter for DefaultConverter {
    fn extract_wave_archive(
        &self,
        archive: &mut WaveArchive,
        ctx: &DiagnosticContext,
    ) -> CgrpResult<()> {
        let _scope = ctx.enter(&archive.file.path);
        let waves = split_wave_archive(archive.file.data.clone(), ctx)?;

        let directory = archive.file.directory().to_path_buf();
        archive.waves.clear();
        for (index, wave) in waves.into_iter().enumerate() {
            if let Some(wave) = wave {
                let path = directory.join(format!("{}.cwav", index));
                write_file(&path, &wave)?;
                archive.waves.push(path);
            }
        }

        info!(
            archive = archive.file.index,
            waves = archive.waves.len(),
            "extracted wave archive"
        );
        Ok(())
    }

    fn convert_bank(
        &self,
        bank: &Bank,
        parent_dir: &Path,
        wave_archives: &WaveArchiveArena,
        ctx: &DiagnosticContext,
    ) -> CgrpResult<()> {
        let _scope = ctx.enter(&bank.file.path);
        let mut cursor = ByteCursor::new(bank.file.data.clone());
        let header = SubFileHeader::parse(&mut cursor, SubResourceKind::Bank)?;

        let description = BankDescription {
            index: bank.file.index,
            table_id: bank.file.table_id,
            version: header.version,
            length: bank.file.data.len(),
            conversion_flag: bank.conversion_flag,
            wave_archives: wave_archives
                .iter()
                .map(|archive| WaveArchiveDescription {
                    index: archive.file.index,
                    path: archive
                        .file
                        .path
                        .strip_prefix(parent_dir)
                        .unwrap_or(&archive.file.path)
                        .to_path_buf(),
                    waves: archive.waves.len(),
                })
                .collect(),
        };

        let path = bank
            .file
            .directory()
            .join(format!("{}.json", bank.file.index));
        write_file(&path, &serde_json::to_vec_pretty(&description)?)?;

        info!(bank = bank.file.index, "converted bank");
        Ok(())
    }

    fn convert_sequence(&self, sequence: &Sequence, ctx: &DiagnosticContext) -> CgrpResult<()> {
        let _scope = ctx.enter(&sequence.file.path);
        let mut cursor = ByteCursor::new(sequence.file.data.clone());
        let header = SubFileHeader::parse(&mut cursor, SubResourceKind::Sequence)?;
        debug!(
            sequence = sequence.file.index,
            version = header.version,
            "validated sequence"
        );
        Ok(())
    }
}
