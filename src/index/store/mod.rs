// On-disk persistence for the vector index.
// A single rkyv archive at `<root>/index.bin`; anything unreadable is reported as corrupt.


use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use tracing::{debug, info};

use super::{EmbeddedDocument, VectorIndex};
use crate::{QaError, Result};

pub const INDEX_FILE_NAME: &str = "index.bin";
const TEMP_FILE_NAME: &str = "index.bin.tmp";
const FORMAT_VERSION: u32 = 1;

#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
struct PersistedIndex {
    format_version: u32,
    dimension: u32,
    built_at: String,
    entries: Vec<PersistedEntry>,
}

#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
struct PersistedEntry {
    id: String,
    text: String,
    source: String,
    vector: Vec<f32>,
}

impl From<&EmbeddedDocument> for PersistedEntry {
    fn from(document: &EmbeddedDocument) -> Self {
        Self {
            id: document.id.clone(),
            text: document.text.clone(),
            source: document.source.clone(),
            vector: document.vector.clone(),
        }
    }
}

impl From<PersistedEntry> for EmbeddedDocument {
    fn from(entry: PersistedEntry) -> Self {
        Self {
            id: entry.id,
            text: entry.text,
            vector: entry.vector,
            source: entry.source,
        }
    }
}

/// What `status` reports about the index on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub path: PathBuf,
    pub documents: usize,
    pub dimension: usize,
    pub built_at: String,
}

/// Saves and loads a [`VectorIndex`] under a fixed root directory
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the index file
    #[inline]
    pub fn path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Serialize `index` to disk, replacing any previous file.
    ///
    /// The archive is written to a temporary sibling first and renamed into place,
    /// so an interrupted save leaves the previous file (or nothing) behind.
    #[inline]
    pub fn save(&self, index: &VectorIndex) -> Result<()> {
        let dimension = match index.dimension() {
            Some(dimension) if !index.is_empty() => dimension,
            _ => return Err(QaError::EmptyIndex),
        };

        fs::create_dir_all(&self.root)?;

        let persisted = PersistedIndex {
            format_version: FORMAT_VERSION,
            dimension: u32::try_from(dimension)
                .map_err(|_| anyhow::anyhow!("Dimension {} does not fit the index format", dimension))?,
            built_at: Utc::now().to_rfc3339(),
            entries: index.documents().iter().map(PersistedEntry::from).collect(),
        };

        let bytes = rkyv::to_bytes::<RkyvError>(&persisted)
            .map_err(|e| anyhow::anyhow!("Failed to serialize index: {}", e))?;

        let temp_path = self.root.join(TEMP_FILE_NAME);
        let path = self.path();
        fs::write(&temp_path, bytes.as_slice())?;
        fs::rename(&temp_path, &path)?;

        info!(
            "Saved index with {} documents ({} bytes) to {}",
            index.len(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    /// Reconstruct the index from disk.
    ///
    /// # Errors
    /// `IndexNotFound` when no file exists, `CorruptIndex` for any other failure.
    #[inline]
    pub fn load(&self) -> Result<VectorIndex> {
        let persisted = self.read_persisted()?;
        let dimension = persisted.dimension as usize;
        let count = persisted.entries.len();

        let mut index = VectorIndex::with_dimension(dimension);
        index
            .add(persisted.entries.into_iter().map(EmbeddedDocument::from).collect())
            .map_err(|e| self.corrupt(e.to_string()))?;

        info!(
            "Loaded index with {} documents of dimension {} from {}",
            count,
            dimension,
            self.path().display()
        );
        Ok(index)
    }

    /// Describe the index on disk without keeping it in memory
    #[inline]
    pub fn summary(&self) -> Result<IndexSummary> {
        let persisted = self.read_persisted()?;
        Ok(IndexSummary {
            path: self.path(),
            documents: persisted.entries.len(),
            dimension: persisted.dimension as usize,
            built_at: persisted.built_at,
        })
    }

    fn read_persisted(&self) -> Result<PersistedIndex> {
        let path = self.path();
        if !path.exists() {
            debug!("No index file at {}", path.display());
            return Err(QaError::IndexNotFound(path));
        }

        let bytes = fs::read(&path).map_err(|e| self.corrupt(format!("read failed: {}", e)))?;

        let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(&bytes);

        let persisted = rkyv::from_bytes::<PersistedIndex, RkyvError>(&aligned)
            .map_err(|e| self.corrupt(format!("invalid archive: {}", e)))?;

        if persisted.format_version != FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {} (expected {})",
                persisted.format_version, FORMAT_VERSION
            )));
        }

        if persisted.dimension == 0 || persisted.entries.is_empty() {
            return Err(self.corrupt("index contains no vectors".to_string()));
        }

        Ok(persisted)
    }

    fn corrupt(&self, reason: String) -> QaError {
        QaError::CorruptIndex {
            path: self.path(),
            reason,
        }
    }
}
