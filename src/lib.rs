pub mod converters;
pub mod cursor;
pub mod diagnostics;
pub mod errors;
pub mod file_table;
pub mod header;
pub mod parser_config;
pub mod resources;
pub mod traits;
pub mod utils;

pub use converters::*;
pub use cursor::*;
pub use diagnostics::*;
pub use errors::*;
pub use file_table::*;
pub use header::*;
pub use parser_config::*;
pub use resources::*;
pub use traits::*;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, info};

use crate::utils::{ensure_dir, fourcc_to_string, read_file, write_file};

/// A CGRP sound group and everything extracted from it
///
/// The group's path stays registered in the diagnostic context for as long as
/// this value lives. All output goes under `output_root`.
#[derive(Debug)]
pub struct CgrpFile<'ctx> {
    source: PathBuf,
    output_root: PathBuf,
    config: ParserConfig,
    data: Bytes,
    header: Option<CgrpHeader>,
    file_table: Option<FileTable>,
    catalog: Catalog,
    scope: SourceScope<'ctx>,
}

impl<'ctx> CgrpFile<'ctx> {
    /// Read a group from disk with default configuration
    pub fn open(
        path: impl AsRef<Path>,
        output_root: impl Into<PathBuf>,
        ctx: &'ctx DiagnosticContext,
    ) -> CgrpResult<Self> {
        Self::open_with_config(path, output_root, ParserConfig::default(), ctx)
    }

    /// Read a group from disk
    pub fn open_with_config(
        path: impl AsRef<Path>,
        output_root: impl Into<PathBuf>,
        config: ParserConfig,
        ctx: &'ctx DiagnosticContext,
    ) -> CgrpResult<Self> {
        let path = path.as_ref();
        let file_data = read_file(path)?;
        Self::from_bytes_with_config(Bytes::from(file_data), path, output_root, config, ctx)
    }

    /// Wrap an in-memory group; `source` only names it in diagnostics
    pub fn from_bytes_with_config(
        data: Bytes,
        source: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        config: ParserConfig,
        ctx: &'ctx DiagnosticContext,
    ) -> CgrpResult<Self> {
        config.check_file_size(data.len())?;
        let source = source.into();
        let scope = ctx.enter(source.clone());
        Ok(Self {
            source,
            output_root: output_root.into(),
            config,
            data,
            header: None,
            file_table: None,
            catalog: Catalog::new(),
            scope,
        })
    }

    /// Extract with the built-in converters
    pub fn extract(&mut self) -> CgrpResult<()> {
        self.extract_with(&DefaultConverter)
    }

    /// Extract every sub-resource and run `converter` over them
    ///
    /// Stops at the first failure. Files written before the failure stay on disk.
    pub fn extract_with(&mut self, converter: &dyn SubResourceConverter) -> CgrpResult<()> {
        let result = self.extract_inner(converter);
        if let Err(e) = &result {
            self.scope.context().error(e);
        }
        result
    }

    fn extract_inner(&mut self, converter: &dyn SubResourceConverter) -> CgrpResult<()> {
        self.header = None;
        self.file_table = None;
        self.catalog = Catalog::new();

        let ctx = self.scope.context();
        let mut cursor = ByteCursor::new(self.data.clone());

        let header = CgrpHeader::from_cursor_with_config(&mut cursor, &self.config)?;
        let table = FileTable::from_cursor(&mut cursor, &header.directory, &self.config)?;
        debug!(entries = table.len(), "parsed file table");

        ensure_dir(&self.output_root)?;

        let mut tracker = ResourceTracker::new();
        for entry in &table.entries {
            match (entry.payload_offset, table.file_chunk) {
                (Some(payload), Some(file_chunk)) => {
                    self.materialize(&mut cursor, entry, payload, file_chunk, &mut tracker)?
                },
                (Some(_), None) => {
                    return Err(CgrpError::MissingChunk {
                        chunk: ChunkKind::File.name().to_string(),
                    })
                },
                (None, _) => {
                    debug!(id = entry.id, flag = entry.flag, "entry without payload");
                    self.catalog.skipped_entries += 1;
                },
            }
        }
        info!(
            wave_archives = self.catalog.wave_archives.len(),
            banks = self.catalog.banks.len(),
            sequences = self.catalog.sequences.len(),
            "{}",
            tracker
        );

        self.header = Some(header);
        self.file_table = Some(table);

        // Banks resolve wave archives by index, so every archive is extracted first
        for archive in self.catalog.wave_archives.iter_mut() {
            converter
                .extract_wave_archive(archive, ctx)
                .map_err(|e| conversion_failed(SubResourceKind::WaveArchive, &archive.file, e))?;
        }

        for bank in &self.catalog.banks {
            converter
                .convert_bank(bank, &self.output_root, &self.catalog.wave_archives, ctx)
                .map_err(|e| conversion_failed(SubResourceKind::Bank, &bank.file, e))?;
        }

        for sequence in &self.catalog.sequences {
            converter
                .convert_sequence(sequence, ctx)
                .map_err(|e| conversion_failed(SubResourceKind::Sequence, &sequence.file, e))?;
        }

        if let Some(infx) = self.header.as_ref().and_then(|h| h.directory.infx) {
            ctx.warning(infx.start(), "Skipping INFX chunk");
        }

        if self.config.write_manifest {
            let path = self.output_root.join("manifest.json");
            write_file(&path, &serde_json::to_vec_pretty(&self.catalog.summary())?)?;
        }

        Ok(())
    }

    /// Dispatch one payload on its type tag and register the matching handle
    fn materialize(
        &mut self,
        cursor: &mut ByteCursor,
        entry: &FileTableEntry,
        payload: usize,
        file_chunk: ChunkLocation,
        tracker: &mut ResourceTracker,
    ) -> CgrpResult<()> {
        cursor.seek(payload)?;
        let tag = cursor.read_u32_be()?;
        let kind = SubResourceKind::from_tag(tag).ok_or_else(|| CgrpError::UnknownFileType {
            tag,
            name: fourcc_to_string(tag),
            offset: payload,
        })?;

        match kind {
            SubResourceKind::WaveArchive => {
                let index = self.catalog.wave_archives.next_index();
                let path = self.dump_payload(cursor, entry, kind, index, file_chunk, tracker)?;
                self.catalog
                    .wave_archives
                    .push(WaveArchive::open(index, entry.id, path)?);
            },
            SubResourceKind::Bank => {
                let index = self.catalog.banks.len();
                let path = self.dump_payload(cursor, entry, kind, index, file_chunk, tracker)?;
                self.catalog.banks.push(Bank::open(
                    index,
                    entry.id,
                    path,
                    self.config.bank_conversion_flag,
                )?);
            },
            SubResourceKind::Sequence => {
                let index = self.catalog.sequences.len();
                let path = self.dump_payload(cursor, entry, kind, index, file_chunk, tracker)?;
                self.catalog
                    .sequences
                    .push(Sequence::open(index, entry.id, path)?);
            },
            SubResourceKind::WaveSound => {
                self.scope
                    .context()
                    .warning(payload, &format!("Skipping {}", fourcc_to_string(tag)));
                self.catalog.unsupported_entries += 1;
            },
        }

        Ok(())
    }

    /// Write the payload under the cursor (positioned past its tag) to its output path
    fn dump_payload(
        &self,
        cursor: &mut ByteCursor,
        entry: &FileTableEntry,
        kind: SubResourceKind,
        index: usize,
        file_chunk: ChunkLocation,
        tracker: &mut ResourceTracker,
    ) -> CgrpResult<PathBuf> {
        // Payload length sits in the sub-file header, 8 bytes past the tag
        cursor.skip(8)?;
        let length_offset = cursor.position();
        let length = cursor.read_u32_le()? as usize;
        cursor.rewind(16)?;
        let payload = cursor.position();

        if payload + length > file_chunk.end() {
            return Err(CgrpError::InvalidOffset {
                field: format!("{} payload of entry 0x{:X}", kind, entry.id),
                offset: (payload + length) as u64,
                start: file_chunk.body_start(),
                end: file_chunk.end(),
            });
        }
        if length != entry.length as usize {
            if self.config.strict_entry_lengths {
                return Err(CgrpError::LengthMismatch {
                    field: format!("{} payload length", kind),
                    declared: length as u64,
                    actual: entry.length as u64,
                    offset: length_offset,
                });
            }
            self.scope.context().warning(
                length_offset,
                &format!(
                    "{} declares {} bytes, file table says {}",
                    kind, length, entry.length
                ),
            );
        }

        let bytes = cursor.slice(payload, length)?;
        tracker.track_payload(&self.config, length)?;

        let path = kind.output_path(&self.output_root, index);
        if let Some(dir) = path.parent() {
            ensure_dir(dir)?;
        }
        write_file(&path, &bytes)?;
        debug!(%kind, index, id = entry.id, path = %path.display(), "extracted");

        Ok(path)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Header, once `extract` got past the file table
    pub fn header(&self) -> Option<&CgrpHeader> {
        self.header.as_ref()
    }

    pub fn file_table(&self) -> Option<&FileTable> {
        self.file_table.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

fn conversion_failed(kind: SubResourceKind, file: &ResourceFile, err: CgrpError) -> CgrpError {
    CgrpError::ConversionFailed {
        kind: kind.to_string(),
        index: file.index,
        reason: format!("{}: {}", file.path.display(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_registers_source_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.bcgrp");
        std::fs::write(&path, b"CGRP").unwrap();

        let ctx = DiagnosticContext::new();
        {
            let group = CgrpFile::open(&path, dir.path().join("out"), &ctx).unwrap();
            assert_eq!(ctx.current(), Some(path.clone()));
            assert_eq!(group.len(), 4);
        }
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DiagnosticContext::new();
        let result = CgrpFile::open(dir.path().join("missing.bcgrp"), dir.path(), &ctx);
        assert!(matches!(result, Err(CgrpError::FileNotFound { .. })));
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_open_respects_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.bcgrp");
        std::fs::write(&path, [0u8; 128]).unwrap();

        let ctx = DiagnosticContext::new();
        let config = ParserConfig {
            max_file_size: 64,
            ..Default::default()
        };
        let result = CgrpFile::open_with_config(&path, dir.path(), config, &ctx);
        assert!(matches!(result, Err(CgrpError::DataSizeExceedsLimit { .. })));
    }

    #[test]
    fn test_extract_rejects_truncated_header() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DiagnosticContext::new();
        let mut group = CgrpFile::from_bytes_with_config(
            Bytes::from_static(b"CGRP\xFF\xFE"),
            "short.bcgrp",
            dir.path().join("out"),
            ParserConfig::default(),
            &ctx,
        )
        .unwrap();

        assert!(matches!(group.extract(), Err(CgrpError::BufferUnderflow { offset: 6, .. })));
        assert!(group.header().is_none());
        assert!(group.catalog().is_empty());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_in_memory_group_respects_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DiagnosticContext::new();
        let config = ParserConfig {
            max_file_size: 4,
            ..Default::default()
        };
        let result = CgrpFile::from_bytes_with_config(
            Bytes::from_static(b"CGRP\xFF\xFE"),
            "short.bcgrp",
            dir.path().join("out"),
            config,
            &ctx,
        );

        match result {
            Err(CgrpError::DataSizeExceedsLimit { size, limit, .. }) => {
                assert_eq!(size, 6);
                assert_eq!(limit, 4);
            },
            Err(other) => panic!("Expected DataSizeExceedsLimit, got {other:?}"),
            Ok(_) => panic!("Expected DataSizeExceedsLimit"),
        }
        assert_eq!(ctx.depth(), 0);
    }
}
