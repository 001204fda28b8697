use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BASE_SUBFOLDER: &str = "base";
pub const DEFAULT_DEFINITION_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum DefinitionStoreError {
    #[error("failed to read definition file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("definition key '{key}' is not a valid relative path")]
    InvalidKey { key: String },
}

pub trait DefinitionStore: Send {
    fn load(&self, key: &str) -> Result<Option<String>, DefinitionStoreError>;
}

/// Ordered keys tried when looking up a base template: the key itself, the
/// conventional base subfolder, then both again with a trailing `.<extension>`
/// removed.
pub fn lookup_candidates(key: &str, base_subfolder: &str, extension: &str) -> Vec<String> {
    let mut candidates = vec![key.to_string(), format!("{base_subfolder}/{key}")];
    if let Some(trimmed) = strip_extension(key, extension) {
        candidates.push(trimmed.to_string());
        candidates.push(format!("{base_subfolder}/{trimmed}"));
    }
    candidates
}

fn strip_extension<'a>(key: &'a str, extension: &str) -> Option<&'a str> {
    let suffix_len = extension.len() + 1;
    if key.len() <= suffix_len || !key.is_char_boundary(key.len() - suffix_len) {
        return None;
    }
    let (stem, suffix) = key.split_at(key.len() - suffix_len);
    let matches = suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension);
    matches.then_some(stem)
}

#[derive(Debug, Clone)]
pub struct DirectoryDefinitionStore {
    root: PathBuf,
    extension: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionListing {
    pub folders: Vec<String>,
    pub definitions: Vec<String>,
}

impl DirectoryDefinitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extension(root, DEFAULT_DEFINITION_EXTENSION)
    }

    pub fn with_extension(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn path_for_key(&self, key: &str) -> Result<PathBuf, DefinitionStoreError> {
        if key.is_empty()
            || key.starts_with('/')
            || key.contains('\\')
            || key.split('/').any(|segment| segment == "..")
        {
            return Err(DefinitionStoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|segment| !segment.is_empty()) {
            path.push(segment);
        }
        let file_name = path
            .file_name()
            .map(|name| format!("{}.{}", name.to_string_lossy(), self.extension))
            .ok_or_else(|| DefinitionStoreError::InvalidKey {
                key: key.to_string(),
            })?;
        path.set_file_name(file_name);
        Ok(path)
    }

    pub fn list(&self, folder: &str) -> Result<DefinitionListing, DefinitionStoreError> {
        let trimmed = folder.trim_matches('/');
        let dir = if trimmed.is_empty() {
            self.root.clone()
        } else {
            if trimmed.split('/').any(|segment| segment == "..") || trimmed.contains('\\') {
                return Err(DefinitionStoreError::InvalidKey {
                    key: folder.to_string(),
                });
            }
            trimmed
                .split('/')
                .fold(self.root.clone(), |path, segment| path.join(segment))
        };

        let entries = fs::read_dir(&dir).map_err(|source| DefinitionStoreError::ReadDir {
            path: dir.clone(),
            source,
        })?;
        let mut listing = DefinitionListing::default();
        for entry in entries {
            let entry = entry.map_err(|source| DefinitionStoreError::ReadDir {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if path.is_dir() {
                listing.folders.push(name.to_string());
                continue;
            }
            let Some(stem) = strip_extension(name, &self.extension) else {
                continue;
            };
            let key = if trimmed.is_empty() {
                stem.to_string()
            } else {
                format!("{trimmed}/{stem}")
            };
            listing.definitions.push(key);
        }
        listing.folders.sort_by_key(|name| name.to_lowercase());
        listing.definitions.sort_by_key(|key| key.to_lowercase());
        Ok(listing)
    }
}

impl DefinitionStore for DirectoryDefinitionStore {
    fn load(&self, key: &str) -> Result<Option<String>, DefinitionStoreError> {
        let path = self.path_for_key(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DefinitionStoreError::ReadFile { path, source }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDefinitionStore {
    entries: HashMap<String, String>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    pub fn with_entry(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(key, text);
        self
    }
}

impl DefinitionStore for InMemoryDefinitionStore {
    fn load(&self, key: &str) -> Result<Option<String>, DefinitionStoreError> {
        Ok(self.entries.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    #[test]
    fn candidates_follow_documented_order() {
        assert_eq!(
            lookup_candidates("humanoid", "base", "json"),
            vec!["humanoid".to_string(), "base/humanoid".to_string()]
        );
        assert_eq!(
            lookup_candidates("humanoid.JSON", "base", "json"),
            vec![
                "humanoid.JSON".to_string(),
                "base/humanoid.JSON".to_string(),
                "humanoid".to_string(),
                "base/humanoid".to_string(),
            ]
        );
    }

    #[test]
    fn bare_extension_is_not_stripped() {
        assert_eq!(lookup_candidates(".json", "base", "json").len(), 2);
    }

    #[test]
    fn directory_store_reads_key_with_extension_appended() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("base").join("humanoid.json"), "{}");
        let store = DirectoryDefinitionStore::new(temp.path());
        assert_eq!(
            store.load("base/humanoid").expect("load").as_deref(),
            Some("{}")
        );
        assert_eq!(store.load("humanoid").expect("load"), None);
    }

    #[test]
    fn directory_store_rejects_traversal() {
        let temp = TempDir::new().expect("temp");
        let store = DirectoryDefinitionStore::new(temp.path());
        let err = store.load("../secrets").expect_err("err");
        assert!(matches!(err, DefinitionStoreError::InvalidKey { .. }));
    }

    #[test]
    fn listing_sorts_folders_and_keys_case_insensitively() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("zombie.json"), "{}");
        write_file(&temp.path().join("Human.json"), "{}");
        write_file(&temp.path().join("notes.txt"), "ignored");
        write_file(&temp.path().join("base").join("humanoid.json"), "{}");
        fs::create_dir_all(temp.path().join("Animals")).expect("mkdir");
        let store = DirectoryDefinitionStore::new(temp.path());

        let root = store.list("").expect("list");
        assert_eq!(root.folders, vec!["Animals".to_string(), "base".to_string()]);
        assert_eq!(
            root.definitions,
            vec!["Human".to_string(), "zombie".to_string()]
        );

        let base = store.list("base").expect("list");
        assert_eq!(base.definitions, vec!["base/humanoid".to_string()]);
    }

    #[test]
    fn in_memory_store_matches_exact_keys() {
        let store = InMemoryDefinitionStore::new().with_entry("base/humanoid", "{}");
        assert!(store.load("base/humanoid").expect("load").is_some());
        assert!(store.load("Base/Humanoid").expect("load").is_none());
    }
}
