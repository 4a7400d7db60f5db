use crate::error::RefileError;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// The three logical roles a corpus directory tree must provide. The exact
/// directory names are configurable; the roles are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusLayout {
    /// Absolute (or process-relative) root of the corpus on disk.
    pub root: PathBuf,
    /// Incoming drafts, relative to `root`.
    pub drafts_dir: String,
    /// Structured reference notes, relative to `root`.
    pub references_dir: String,
    /// Attachment files, relative to `root`. Embed links resolve here.
    pub attachments_dir: String,
}

impl CorpusLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        CorpusLayout {
            root: root.into(),
            drafts_dir: "drafts".to_string(),
            references_dir: "references".to_string(),
            attachments_dir: "attachments".to_string(),
        }
    }

    pub fn drafts_root(&self) -> PathBuf {
        self.root.join(&self.drafts_dir)
    }

    pub fn references_root(&self) -> PathBuf {
        self.root.join(&self.references_dir)
    }

    pub fn attachments_root(&self) -> PathBuf {
        self.root.join(&self.attachments_dir)
    }

    /// Corpus-relative prefix against which embed links resolve.
    pub fn attachments_prefix(&self) -> &str {
        &self.attachments_dir
    }

    /// Read a layout from a `[corpus]` table in a toml file. A missing file
    /// yields the default layout rooted at the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RefileError> {
        let path = path.as_ref();
        tracing::debug!("Attempting to read corpus layout from: {:?}", path);
        if !path.exists() {
            tracing::debug!("Config file not found, using default layout.");
            let root = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            return Ok(CorpusLayout::new(root));
        }
        let content = read_to_string(path)?;
        let config: BTreeMap<String, CorpusLayout> = toml::from_str(&content)?;
        config
            .get("corpus")
            .cloned()
            .ok_or_else(|| RefileError::NotFound("corpus table not found in config".to_string()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RefileError> {
        tracing::debug!("Attempting to write corpus layout to: {:?}", path.as_ref());
        let mut config = BTreeMap::new();
        config.insert("corpus".to_string(), self.clone());
        let toml_string = toml::to_string(&config)?;
        write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_roots() {
        let layout = CorpusLayout::new("/corpus");
        assert_eq!(layout.attachments_root(), PathBuf::from("/corpus/attachments"));
        assert_eq!(layout.attachments_prefix(), "attachments");
    }

    #[test]
    fn test_layout_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("corpus.toml");
        let mut layout = CorpusLayout::new(dir.path());
        layout.drafts_dir = "inbox".to_string();
        layout.save(&config_path).unwrap();
        let loaded = CorpusLayout::load(&config_path).unwrap();
        assert_eq!(loaded, layout);
    }

    #[test]
    fn test_layout_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CorpusLayout::load(dir.path().join("corpus.toml")).unwrap();
        assert_eq!(loaded.drafts_dir, "drafts");
        assert_eq!(loaded.root, dir.path());
    }
}
