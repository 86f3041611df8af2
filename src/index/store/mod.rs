//! Durable storage for the index/text-store pair.
//!
//! The two artifacts are one logical entity: `commit` writes both sides,
//! index first, each through a write-to-temp-and-rename so a crash never
//! leaves a half-written file. A crash between the two renames leaves the
//! index ahead of the text store; `load` reports that as a consistency
//! failure and the caller rebuilds.


use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::index::flat::FlatIndex;
use crate::{QaError, Result};

const INDEX_FILE: &str = "vectors.bin";
const TEXTS_FILE: &str = "texts.json";
const TMP_EXTENSION: &str = "tmp";

#[derive(Debug)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    #[inline]
    pub fn texts_path(&self) -> PathBuf {
        self.dir.join(TEXTS_FILE)
    }

    /// Whether both persisted artifacts are present.
    #[inline]
    pub fn has_artifacts(&self) -> bool {
        self.index_path().is_file() && self.texts_path().is_file()
    }

    /// Persist the pair. The index is written before the text store.
    #[inline]
    pub fn commit(&self, index: &FlatIndex, texts: &[String]) -> Result<()> {
        let index_bytes = bincode::serialize(index)
            .map_err(|e| QaError::Storage(format!("Failed to encode index: {}", e)))?;
        write_atomic(&self.index_path(), &index_bytes)?;

        let texts_bytes = serde_json::to_vec(texts)
            .map_err(|e| QaError::Storage(format!("Failed to encode text store: {}", e)))?;
        write_atomic(&self.texts_path(), &texts_bytes)?;

        debug!(
            "Committed {} vectors and {} texts to {}",
            index.len(),
            texts.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Load the persisted pair.
    ///
    /// Returns `Ok(None)` when either artifact is missing. Returns a
    /// `Consistency` error when both decode but their sizes disagree, and a
    /// `Storage` error when either blob is unreadable; callers treat both as
    /// corrupt state and rebuild.
    #[inline]
    pub fn load(&self) -> Result<Option<(FlatIndex, Vec<String>)>> {
        if !self.has_artifacts() {
            return Ok(None);
        }

        let index_bytes = fs::read(self.index_path())?;
        let index: FlatIndex = bincode::deserialize(&index_bytes)
            .map_err(|e| QaError::Storage(format!("Failed to decode index: {}", e)))?;

        let texts_bytes = fs::read(self.texts_path())?;
        let texts: Vec<String> = serde_json::from_slice(&texts_bytes)
            .map_err(|e| QaError::Storage(format!("Failed to decode text store: {}", e)))?;

        if texts.len() != index.len() {
            return Err(QaError::Consistency {
                texts: texts.len(),
                vectors: index.len(),
            });
        }

        Ok(Some((index, texts)))
    }

    /// Load only the text store, for rebuilds that re-embed a previously
    /// cleaned text list.
    #[inline]
    pub fn cached_texts(&self) -> Result<Option<Vec<String>>> {
        if !self.texts_path().is_file() {
            return Ok(None);
        }

        let bytes = fs::read(self.texts_path())?;
        let texts: Vec<String> = serde_json::from_slice(&bytes)
            .map_err(|e| QaError::Storage(format!("Failed to decode text store: {}", e)))?;

        Ok(Some(texts))
    }

    /// Delete both artifacts and any leftover temp files.
    #[inline]
    pub fn clear(&self) -> Result<()> {
        for path in [self.index_path(), self.texts_path()] {
            if path.is_file() {
                fs::remove_file(&path)?;
            }
            let tmp = path.with_extension(TMP_EXTENSION);
            if tmp.is_file() {
                fs::remove_file(&tmp)?;
            }
        }

        debug!("Cleared persisted artifacts in {}", self.dir.display());
        Ok(())
    }
}

/// Write to a temp file, sync, then rename over the target.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(TMP_EXTENSION);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        QaError::Io(e)
    })?;

    Ok(())
}
