use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::errors::CgrpError;

/// Stack of the files being decoded; errors and warnings name the innermost one
#[derive(Debug, Default)]
pub struct DiagnosticContext {
    sources: RefCell<Vec<PathBuf>>,
    warnings: Cell<usize>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` as the file currently being decoded
    pub fn enter(&self, path: impl Into<PathBuf>) -> SourceScope<'_> {
        let mut sources = self.sources.borrow_mut();
        sources.push(path.into());
        SourceScope {
            context: self,
            depth: sources.len(),
        }
    }

    /// Innermost file being decoded
    pub fn current(&self) -> Option<PathBuf> {
        self.sources.borrow().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.sources.borrow().len()
    }

    fn current_display(&self) -> String {
        self.current()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }

    /// Non-fatal diagnostic about content that is recognized but not handled
    pub fn warning(&self, offset: usize, message: &str) {
        self.warnings.set(self.warnings.get() + 1);
        warn!(
            file = %self.current_display(),
            offset = %format!("0x{:X}", offset),
            "{}",
            message
        );
    }

    /// Report a fatal error against the current file
    pub fn error(&self, err: &CgrpError) {
        let offset = err
            .offset()
            .map(|o| format!("0x{:X}", o))
            .unwrap_or_else(|| "-".to_string());
        match err.expected_actual() {
            Some((expected, actual)) => error!(
                file = %self.current_display(),
                offset = %offset,
                expected = %expected,
                actual = %actual,
                code = err.code(),
                category = %err.category(),
                suggestion = err.suggested_action(),
                "{}",
                err
            ),
            None => error!(
                file = %self.current_display(),
                offset = %offset,
                code = err.code(),
                category = %err.category(),
                suggestion = err.suggested_action(),
                "{}",
                err
            ),
        }
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.get()
    }
}

/// Frame on the source stack; popped on drop
#[derive(Debug)]
pub struct SourceScope<'a> {
    context: &'a DiagnosticContext,
    depth: usize,
}

impl<'a> SourceScope<'a> {
    pub fn context(&self) -> &'a DiagnosticContext {
        self.context
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.context.sources.borrow().get(self.depth - 1).cloned()
    }

    pub fn is_current(&self, path: &Path) -> bool {
        self.context.current().as_deref() == Some(path)
    }
}

impl Drop for SourceScope<'_> {
    fn drop(&mut self) {
        // Truncating also discards frames an inner scope failed to pop
        self.context.sources.borrow_mut().truncate(self.depth - 1);
    }
}
