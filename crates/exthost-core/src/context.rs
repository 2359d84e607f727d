//! Isolated loading contexts.
//!
//! A [`LoadingContext`] is scoped to exactly one bundle archive plus the
//! shared [`EntryPointCatalog`]. It holds the open archive for as long as it
//! lives and is released when dropped, on every exit path. Scans open one
//! briefly to read the manifest; a loaded extension keeps its own until it is
//! unloaded.
//!
//! Every context is counted by a [`ContextLedger`] so that leaks are
//! observable.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::catalog::{EntryPointCatalog, ExportedType};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct LedgerCounts {
    open: AtomicUsize,
    opened: AtomicUsize,
}

/// Shared counters of loading contexts opened and still open.
#[derive(Debug, Clone, Default)]
pub struct ContextLedger {
    counts: Arc<LedgerCounts>,
}

impl ContextLedger {
    /// Create a ledger with zero contexts recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contexts currently open.
    pub fn open_count(&self) -> usize {
        self.counts.open.load(Ordering::SeqCst)
    }

    /// Contexts opened since the ledger was created.
    pub fn opened_total(&self) -> usize {
        self.counts.opened.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.counts.open.fetch_add(1, Ordering::SeqCst);
        self.counts.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.counts.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A loading context scoped to one bundle archive.
pub struct LoadingContext {
    archive_path: PathBuf,
    archive: ZipArchive<File>,
    catalog: Arc<EntryPointCatalog>,
    ledger: ContextLedger,
}

impl LoadingContext {
    /// Open `archive_path` with `catalog` as the parent context.
    pub fn open(
        archive_path: &Path,
        catalog: Arc<EntryPointCatalog>,
        ledger: &ContextLedger,
    ) -> Result<Self> {
        let file = File::open(archive_path)?;
        let archive = ZipArchive::new(file)?;
        ledger.acquire();
        tracing::trace!(archive = %archive_path.display(), "Opened loading context");
        Ok(Self {
            archive_path: archive_path.to_path_buf(),
            archive,
            catalog,
            ledger: ledger.clone(),
        })
    }

    /// The archive this context is scoped to.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Read a named resource from the archive, `None` if absent.
    pub fn read_resource(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Text of the bundle's manifest.
    pub fn read_manifest(&mut self) -> Result<String> {
        let bytes = self
            .read_resource(crate::MANIFEST_FILENAME)?
            .ok_or(Error::ManifestMissing(crate::MANIFEST_FILENAME))?;
        String::from_utf8(bytes).map_err(|e| {
            Error::validation(format!("{} is not valid UTF-8: {e}", crate::MANIFEST_FILENAME))
        })
    }

    /// Resolve an entry-point identifier to an exported type.
    pub fn resolve(&self, entry_point: &str) -> Result<&ExportedType> {
        self.catalog
            .get(entry_point)
            .ok_or_else(|| Error::UnknownEntryPoint {
                entry_point: entry_point.to_string(),
            })
    }
}

impl Drop for LoadingContext {
    fn drop(&mut self) {
        self.ledger.release();
        tracing::trace!(archive = %self.archive_path.display(), "Released loading context");
    }
}

impl std::fmt::Debug for LoadingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingContext")
            .field("archive_path", &self.archive_path)
            .field("entries", &self.archive.len())
            .finish_non_exhaustive()
    }
}
