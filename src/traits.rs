use std::path::Path;

use crate::cursor::ByteCursor;
use crate::diagnostics::DiagnosticContext;
use crate::errors::CgrpResult;
use crate::resources::{Bank, Sequence, WaveArchive, WaveArchiveArena};

pub trait CgrpParser {
    fn from_cursor(cursor: &mut ByteCursor) -> CgrpResult<Self>
    where
        Self: Sized;
}

/// Converts extracted sub-resources into their final on-disk form
///
/// The engine calls these strictly in order: every wave archive, then every
/// bank, then every sequence. Each handle already knows its own path, so
/// converters write next to it and never depend on the process working directory.
pub trait SubResourceConverter {
    fn extract_wave_archive(
        &self,
        archive: &mut WaveArchive,
        ctx: &DiagnosticContext,
    ) -> CgrpResult<()>;

    /// `parent_dir` is the output root the bank's own directory lives in
    fn convert_bank(
        &self,
        bank: &Bank,
        parent_dir: &Path,
        wave_archives: &WaveArchiveArena,
        ctx: &DiagnosticContext,
    ) -> CgrpResult<()>;

    fn convert_sequence(&self, sequence: &Sequence, ctx: &DiagnosticContext) -> CgrpResult<()>;
}
