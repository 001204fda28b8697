use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::warn;

/// Pixels stay on disk; assembly only needs to know the asset exists and how
/// large it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteAsset {
    pub key: String,
    pub width: u32,
    pub height: u32,
}

/// Keys carry no extension and are passed through exactly as assembled.
pub trait AssetLookup: Send {
    fn load_asset(&mut self, key: &str) -> Option<SpriteAsset>;
}

#[derive(Debug)]
pub struct DirectoryAssetLookup {
    root: PathBuf,
    cache: HashMap<String, Option<SpriteAsset>>,
    warned_keys: HashSet<String>,
}

impl DirectoryAssetLookup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
            warned_keys: HashSet::new(),
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.warned_keys.clear();
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.png"))
    }

    fn unsafe_key_reason(key: &str) -> Option<&'static str> {
        if key.is_empty() {
            Some("empty_key")
        } else if key.starts_with('/') {
            Some("leading_slash")
        } else if key.contains('\\') {
            Some("backslash")
        } else if key.split('/').any(|segment| segment == "..") {
            Some("parent_traversal")
        } else {
            None
        }
    }

    fn read_dimensions(path: &Path) -> Result<(u32, u32), String> {
        let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
        reader
            .into_dimensions()
            .map_err(|error| format!("decode_failed:{error}"))
    }

    fn warn_once(&mut self, key: &str, path: &Path, reason: &str) {
        if !self.warned_keys.insert(key.to_string()) {
            return;
        }
        warn!(
            asset_key = key,
            path = %path.display(),
            reason = reason,
            "sprite_asset_load_failed"
        );
    }
}

impl AssetLookup for DirectoryAssetLookup {
    fn load_asset(&mut self, key: &str) -> Option<SpriteAsset> {
        if let Some(cached) = self.cache.get(key) {
            return cached.clone();
        }
        let path = self.path_for_key(key);
        if let Some(reason) = Self::unsafe_key_reason(key) {
            self.warn_once(key, &path, reason);
            self.cache.insert(key.to_string(), None);
            return None;
        }
        let asset = match Self::read_dimensions(&path) {
            Ok((width, height)) => Some(SpriteAsset {
                key: key.to_string(),
                width,
                height,
            }),
            Err(reason) => {
                self.warn_once(key, &path, &reason);
                None
            }
        };
        self.cache.insert(key.to_string(), asset.clone());
        asset
    }
}

/// Fixed set of assets, for tools and tests that have no sprite directory.
#[derive(Debug, Default, Clone)]
pub struct StaticAssetLookup {
    assets: HashMap<String, SpriteAsset>,
}

impl StaticAssetLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, key: &str, width: u32, height: u32) -> Self {
        self.insert(key, width, height);
        self
    }

    pub fn insert(&mut self, key: &str, width: u32, height: u32) {
        self.assets.insert(
            key.to_string(),
            SpriteAsset {
                key: key.to_string(),
                width,
                height,
            },
        );
    }
}

impl AssetLookup for StaticAssetLookup {
    fn load_asset(&mut self, key: &str) -> Option<SpriteAsset> {
        self.assets.get(key).cloned()
    }
}
