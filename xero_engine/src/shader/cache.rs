/// On-disk cache of compiled stage binaries
///
/// One file per (source file, stage): `<cache dir>/<source file name><ext>`
/// where `ext` is `.cached_<backend>.<vert|frag|comp>`. File contents are the
/// raw binary words in native byte order, no header.

use std::fs;
use std::path::{Path, PathBuf};
use crate::config::Backend;
use crate::error::{Error, Result};
use crate::shader::ShaderStage;

/// Compiled-binary cache rooted at one directory
#[derive(Debug, Clone)]
pub struct BinaryCache {
    directory: PathBuf,
    backend: Backend,
}

impl BinaryCache {
    /// Create a cache over `directory` (not created until `ensure_directory`)
    pub fn new(directory: impl Into<PathBuf>, backend: Backend) -> Self {
        Self {
            directory: directory.into(),
            backend,
        }
    }

    /// Cache directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the cache directory if it does not exist yet
    pub fn ensure_directory(&self) -> Result<()> {
        if !self.directory.exists() {
            fs::create_dir_all(&self.directory).map_err(|e| Error::Io(format!(
                "Failed to create shader cache directory '{}': {}", self.directory.display(), e
            )))?;
        }
        Ok(())
    }

    /// File extension of cached binaries for `stage` (e.g. `.cached_vulkan.vert`)
    pub fn extension(&self, stage: ShaderStage) -> String {
        format!(".cached_{}.{}", self.backend.tag(), stage.file_suffix())
    }

    /// Cache file for a source file and stage
    pub fn path_for(&self, source_path: &Path, stage: ShaderStage) -> PathBuf {
        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.directory.join(format!("{}{}", file_name, self.extension(stage)))
    }

    /// Read cached words
    ///
    /// Returns `None` on a miss: missing or unreadable file, empty file, or a
    /// length that is not a whole number of words.
    pub fn read(&self, source_path: &Path, stage: ShaderStage) -> Option<Vec<u32>> {
        let path = self.path_for(source_path, stage);
        let bytes = fs::read(&path).ok()?;
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Persist compiled words, replacing any previous entry
    pub fn write(&self, source_path: &Path, stage: ShaderStage, words: &[u32]) -> Result<()> {
        let path = self.path_for(source_path, stage);
        fs::write(&path, bytemuck::cast_slice::<u32, u8>(words)).map_err(|e| Error::Io(format!(
            "Failed to write shader cache '{}': {}", path.display(), e
        )))
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
