use std::{
    borrow::Cow,
    fmt::{self, Formatter},
    io,
    path::{Path, PathBuf},
    result,
    time::UNIX_EPOCH,
};

use contentpipe_shared::thiserror;

/// Default name of the cache file, resolved against the working directory.
pub const CONTENT_CACHE_FILE_NAME: &str = "ContentCache.txt";

/// Extension that replaces the original extension of encrypted output files.
pub const ENCRYPTED_EXTENSION: &str = "enc";

/// Manifest entry type that is delegated to the external atlas packer.
pub const ATLAS_ENTRY_TYPE: &str = "texture-atlas";

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("The encryption key must not be empty")]
    EmptyEncryptionKey,
    #[error("Invalid manifest file: {0}")]
    InvalidManifest(PathBuf),
    #[error("Atlas packer failed for source folder: {0}")]
    AtlasPackerFailed(PathBuf),
}

/// Identifies the asset. It's a relative path in the asset directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetKey(PathBuf);

impl AssetKey {
    /// Create a new [`AssetKey`] from a path. No validation is done on the path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use contentpipe_pipeline::AssetKey;
    /// let asset_key = AssetKey::new("textures/character.png");
    /// assert_eq!(asset_key.as_str(), "textures/character.png");
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the path of the asset.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns the path of the asset.
    pub fn as_str(&self) -> Cow<str> {
        self.0.to_string_lossy()
    }

    /// Form of the path used as the key in the modification cache. Backslashes
    /// are folded to forward slashes so that a cache written on one platform
    /// stays valid on another.
    ///
    /// # Example
    ///
    /// ```rust
    /// use contentpipe_pipeline::AssetKey;
    /// let asset_key = AssetKey::new("textures\\character.png");
    /// assert_eq!(asset_key.cache_key(), "textures/character.png");
    /// ```
    pub fn cache_key(&self) -> String {
        self.as_str().replace('\\', "/")
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for AssetKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&Path> for AssetKey {
    fn from(value: &Path) -> Self {
        Self::new(value)
    }
}

/// Last-write time of the file in ticks (nanoseconds since `UNIX_EPOCH`).
pub(crate) fn modified_ticks(path: &Path) -> Option<i64> {
    let modified = path.metadata().ok().and_then(|metadata| metadata.modified().ok())?;
    let duration = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(duration.as_nanos()).ok()
}
