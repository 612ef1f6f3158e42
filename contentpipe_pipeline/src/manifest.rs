use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One asset descriptor from the manifest. `path` is relative to the asset
/// root and `ty` selects the processing strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    // Missing fields deserialize to the empty string so that they are
    // reported and skipped per entry instead of failing the whole manifest.
    #[serde(rename = "type", default)]
    pub ty: String,
    #[serde(default)]
    pub path: String,
}

/// Reads the manifest at `path`: a JSON array of `{type, path}` objects.
///
/// An unreadable file or invalid JSON is fatal to the whole run; this is the
/// only error of the pipeline that must not be recovered from.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|_| Error::InvalidManifest(path.to_owned()))
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn manifest_entries_keep_their_order() {
        let root = TempDir::new("manifest_order").unwrap();
        let manifest_path = root.path().join("manifest.json");
        fs::write(
            &manifest_path,
            r#"[
                {"type": "texture", "path": "textures/character.png"},
                {"type": "texture-atlas", "path": "sprites"},
                {"type": "data", "path": "levels/level1.json"}
            ]"#,
        )
        .unwrap();

        let manifest = load_manifest(&manifest_path).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[0].ty, "texture");
        assert_eq!(manifest[1].path, "sprites");
        assert_eq!(manifest[2].ty, "data");
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        let root = TempDir::new("manifest_missing_fields").unwrap();
        let manifest_path = root.path().join("manifest.json");
        fs::write(&manifest_path, r#"[{"path": "a.png"}, {"type": "data"}]"#).unwrap();

        let manifest = load_manifest(&manifest_path).unwrap();
        assert_eq!(manifest[0].ty, "");
        assert_eq!(manifest[0].path, "a.png");
        assert_eq!(manifest[1].path, "");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let root = TempDir::new("manifest_invalid").unwrap();
        let manifest_path = root.path().join("manifest.json");
        fs::write(&manifest_path, "not json").unwrap();
        assert!(matches!(load_manifest(&manifest_path), Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn unreadable_manifest_is_an_error() {
        assert!(matches!(load_manifest(Path::new("does/not/exist.json")), Err(Error::IoError(_))));
    }
}
