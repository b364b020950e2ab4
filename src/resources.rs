use std::path::{Path, PathBuf};

use bytes::Bytes;
use phf::phf_map;
use serde::Serialize;

use crate::errors::CgrpResult;
use crate::utils::read_file;

/// Sub-resource kinds that may appear in the FILE chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubResourceKind {
    WaveArchive,
    Bank,
    Sequence,
    /// Recognized but never extracted
    WaveSound,
}

/// Payload type tags, compared big-endian
static FILE_TYPES: phf::Map<u32, SubResourceKind> = phf_map! {
    0x43574152u32 => SubResourceKind::WaveArchive,
    0x43424E4Bu32 => SubResourceKind::Bank,
    0x43534551u32 => SubResourceKind::Sequence,
    0x43575344u32 => SubResourceKind::WaveSound,
};

impl SubResourceKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        FILE_TYPES.get(&tag).copied()
    }

    pub fn magic(self) -> [u8; 4] {
        match self {
            Self::WaveArchive => *b"CWAR",
            Self::Bank => *b"CBNK",
            Self::Sequence => *b"CSEQ",
            Self::WaveSound => *b"CWSD",
        }
    }

    pub fn tag(self) -> u32 {
        u32::from_be_bytes(self.magic())
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::WaveArchive => "cwar",
            Self::Bank => "cbnk",
            Self::Sequence => "cseq",
            Self::WaveSound => "cwsd",
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::WaveSound)
    }

    /// Wave archives and banks are extracted into a directory named by their index
    pub fn has_own_directory(self) -> bool {
        matches!(self, Self::WaveArchive | Self::Bank)
    }

    /// Where the raw dump of the `index`-th resource of this kind goes under `root`
    pub fn output_path(self, root: &Path, index: usize) -> PathBuf {
        let file_name = format!("{}.{}", index, self.extension());
        if self.has_own_directory() {
            root.join(index.to_string()).join(file_name)
        } else {
            root.join(file_name)
        }
    }
}

impl std::fmt::Display for SubResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WaveArchive => "wave archive",
            Self::Bank => "bank",
            Self::Sequence => "sequence",
            Self::WaveSound => "wave sound",
        };
        write!(f, "{}", name)
    }
}

/// A raw sub-resource dump, re-read from the file it was written to
#[derive(Debug, Clone)]
pub struct ResourceFile {
    /// Kind-local sequential index
    pub index: usize,
    /// Id from the file table entry
    pub table_id: u32,
    pub path: PathBuf,
    pub data: Bytes,
}

impl ResourceFile {
    pub fn open(index: usize, table_id: u32, path: impl Into<PathBuf>) -> CgrpResult<Self> {
        let path = path.into();
        let data = Bytes::from(read_file(&path)?);
        Ok(Self {
            index,
            table_id,
            path,
            data,
        })
    }

    /// Directory holding the dump
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WaveArchiveId(pub usize);

#[derive(Debug, Clone)]
pub struct WaveArchive {
    pub file: ResourceFile,
    /// Wave files written by the archive's extraction
    pub waves: Vec<PathBuf>,
}

impl WaveArchive {
    pub fn open(index: usize, table_id: u32, path: impl Into<PathBuf>) -> CgrpResult<Self> {
        Ok(Self {
            file: ResourceFile::open(index, table_id, path)?,
            waves: Vec::new(),
        })
    }

    pub fn id(&self) -> WaveArchiveId {
        WaveArchiveId(self.file.index)
    }
}

#[derive(Debug, Clone)]
pub struct Bank {
    pub file: ResourceFile,
    pub conversion_flag: bool,
}

impl Bank {
    pub fn open(
        index: usize,
        table_id: u32,
        path: impl Into<PathBuf>,
        conversion_flag: bool,
    ) -> CgrpResult<Self> {
        Ok(Self {
            file: ResourceFile::open(index, table_id, path)?,
            conversion_flag,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Sequence {
    pub file: ResourceFile,
}

impl Sequence {
    pub fn open(index: usize, table_id: u32, path: impl Into<PathBuf>) -> CgrpResult<Self> {
        Ok(Self {
            file: ResourceFile::open(index, table_id, path)?,
        })
    }
}

/// Wave archives addressed by dense index
#[derive(Debug, Clone, Default)]
pub struct WaveArchiveArena {
    archives: Vec<WaveArchive>,
}

impl WaveArchiveArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next archive pushed will receive
    pub fn next_index(&self) -> usize {
        self.archives.len()
    }

    pub fn push(&mut self, archive: WaveArchive) -> WaveArchiveId {
        let id = WaveArchiveId(self.archives.len());
        self.archives.push(archive);
        id
    }

    pub fn get(&self, id: WaveArchiveId) -> Option<&WaveArchive> {
        self.archives.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WaveArchive> {
        self.archives.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, WaveArchive> {
        self.archives.iter_mut()
    }
}

/// Every sub-resource decoded from one container
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub wave_archives: WaveArchiveArena,
    pub banks: Vec<Bank>,
    pub sequences: Vec<Sequence>,
    /// File table entries without a payload
    pub skipped_entries: usize,
    /// Payloads of a recognized but unsupported kind
    pub unsupported_entries: usize,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.wave_archives.len() + self.banks.len() + self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> CatalogSummary {
        fn describe(kind: SubResourceKind, file: &ResourceFile) -> ResourceSummary {
            ResourceSummary {
                kind,
                index: file.index,
                table_id: file.table_id,
                path: file.path.display().to_string(),
                length: file.data.len(),
            }
        }

        CatalogSummary {
            wave_archives: self
                .wave_archives
                .iter()
                .map(|a| describe(SubResourceKind::WaveArchive, &a.file))
                .collect(),
            banks: self
                .banks
                .iter()
                .map(|b| describe(SubResourceKind::Bank, &b.file))
                .collect(),
            sequences: self
                .sequences
                .iter()
                .map(|s| describe(SubResourceKind::Sequence, &s.file))
                .collect(),
            skipped_entries: self.skipped_entries,
            unsupported_entries: self.unsupported_entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub kind: SubResourceKind,
    pub index: usize,
    pub table_id: u32,
    pub path: String,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub wave_archives: Vec<ResourceSummary>,
    pub banks: Vec<ResourceSummary>,
    pub sequences: Vec<ResourceSummary>,
    pub skipped_entries: usize,
    pub unsupported_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::write_file;

    #[test]
    fn test_tag_dispatch() {
        assert_eq!(SubResourceKind::from_tag(0x43574152), Some(SubResourceKind::WaveArchive));
        assert_eq!(SubResourceKind::from_tag(0x43424E4B), Some(SubResourceKind::Bank));
        assert_eq!(SubResourceKind::from_tag(0x43534551), Some(SubResourceKind::Sequence));
        assert_eq!(SubResourceKind::from_tag(0x43575344), Some(SubResourceKind::WaveSound));
        // Little-endian reading of "CSEQ" is not a known tag
        assert_eq!(SubResourceKind::from_tag(0x51455343), None);

        for kind in [
            SubResourceKind::WaveArchive,
            SubResourceKind::Bank,
            SubResourceKind::Sequence,
            SubResourceKind::WaveSound,
        ] {
            assert_eq!(SubResourceKind::from_tag(kind.tag()), Some(kind));
        }
        assert!(!SubResourceKind::WaveSound.is_supported());
    }

    #[test]
    fn test_output_paths() {
        let root = Path::new("out");
        assert_eq!(
            SubResourceKind::WaveArchive.output_path(root, 1),
            PathBuf::from("out/1/1.cwar")
        );
        assert_eq!(SubResourceKind::Bank.output_path(root, 0), PathBuf::from("out/0/0.cbnk"));
        assert_eq!(SubResourceKind::Sequence.output_path(root, 2), PathBuf::from("out/2.cseq"));
    }

    #[test]
    fn test_arena_indices_are_dense() {
        let dir = tempfile::tempdir().unwrap();
        let mut arena = WaveArchiveArena::new();
        for index in 0..3 {
            let path = dir.path().join(format!("{index}.cwar"));
            write_file(&path, &[index as u8; 4]).unwrap();
            assert_eq!(arena.next_index(), index);
            let id = arena.push(WaveArchive::open(index, 0x100 + index as u32, &path).unwrap());
            assert_eq!(id, WaveArchiveId(index));
        }

        let second = arena.get(WaveArchiveId(1)).unwrap();
        assert_eq!(second.id(), WaveArchiveId(1));
        assert_eq!(&second.file.data[..], &[1, 1, 1, 1]);
        assert_eq!(second.file.directory(), dir.path());
        assert!(arena.get(WaveArchiveId(3)).is_none());
    }

    #[test]
    fn test_open_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Sequence::open(0, 0, dir.path().join("0.cseq")).is_err());
    }
}
