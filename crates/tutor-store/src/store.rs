use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tutor_core::{KnowledgeBase, KnowledgeStore, TutorError, TutorResult};

/// Knowledge base persisted as a pretty-printed JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create an empty knowledge base file. Returns `false` when one is
    /// already present; an existing file is never overwritten.
    pub fn init(&self) -> TutorResult<bool> {
        if self.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TutorError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        self.save(&KnowledgeBase::new())?;
        info!("created empty knowledge base at {}", self.path.display());
        Ok(true)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KnowledgeStore for JsonFileStore {
    fn load(&self) -> TutorResult<KnowledgeBase> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            TutorError::Storage(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let kb: KnowledgeBase = serde_json::from_str(&content).map_err(|e| {
            TutorError::Storage(format!("malformed {}: {e}", self.path.display()))
        })?;
        debug!("loaded {} entries from {}", kb.len(), self.path.display());
        Ok(kb)
    }

    fn save(&self, kb: &KnowledgeBase) -> TutorResult<()> {
        let json = serde_json::to_string_pretty(kb)?;

        // Write beside the target and rename over it so a reader never sees
        // a half-written document.
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .map_err(|e| TutorError::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            TutorError::Storage(format!(
                "cannot replace {} with {}: {e}",
                self.path.display(),
                tmp.display()
            ))
        })?;

        debug!("saved {} entries to {}", kb.len(), self.path.display());
        Ok(())
    }
}
