//! The orchestration loop: a single sequential pass over the asset manifest.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use contentpipe_shared::{
    log::{error, info, trace, warn},
    pathdiff,
};

use crate::{
    atlas::AtlasInvoker,
    cipher::{encrypt_byte, EncryptionKey},
    common::{modified_ticks, AssetKey, ATLAS_ENTRY_TYPE, ENCRYPTED_EXTENSION},
    manifest::ManifestEntry,
    mod_cache::ModCache,
};

/// Outcome counters for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Assets that were encrypted and written to the output tree.
    pub processed: usize,
    /// Assets that were skipped because the cache says they are unchanged.
    pub up_to_date: usize,
    /// Atlas entries that were delegated to the external packer.
    pub atlases: usize,
    /// Entries that were skipped because of a per-entry failure.
    pub skipped: usize,
}

enum EntryOutcome {
    Processed,
    UpToDate,
    Atlas,
    Skipped,
}

/// Orchestrates one pipeline run over the manifest.
///
/// The driver owns the [`ModCache`] for the duration of the run: the cache
/// is read once at the start, mutated per processed asset and written back
/// exactly once at the end. All work is synchronous and sequential; one
/// entry is fully processed before the next begins.
pub struct PipelineDriver {
    asset_root: PathBuf,
    output_root: PathBuf,
    encryption_key: EncryptionKey,
    atlas_invoker: AtlasInvoker,
    mod_cache: ModCache,
}

impl PipelineDriver {
    /// Creates a new [`PipelineDriver`] with an empty cache.
    pub fn new(
        asset_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        encryption_key: EncryptionKey,
        atlas_invoker: AtlasInvoker,
    ) -> Self {
        Self {
            asset_root: asset_root.into(),
            output_root: output_root.into(),
            encryption_key,
            atlas_invoker,
            mod_cache: ModCache::new(),
        }
    }

    /// Read access to the cache, mainly for the final log line and for tests.
    pub fn mod_cache(&self) -> &ModCache {
        &self.mod_cache
    }

    /// Runs the full pass: load the cache, process every manifest entry in
    /// order, persist the cache.
    ///
    /// Per-entry failures are reported and skipped; they never abort the
    /// run. The cache is written exactly once at the end regardless of how
    /// many entries were skipped, so that already-produced assets are
    /// remembered even when later entries fail.
    pub fn run(&mut self, manifest: &[ManifestEntry], cache_path: &Path) -> RunSummary {
        match self.mod_cache.load(cache_path) {
            Ok(true) => info!("Loaded {} cache entries from '{}'", self.mod_cache.len(), cache_path.display()),
            Ok(false) => {}
            Err(err) => warn!(
                "Failed to read the cache file '{}': {err}. Starting with an empty cache",
                cache_path.display()
            ),
        }

        let mut summary = RunSummary::default();
        for entry in manifest {
            match self.process_entry(entry) {
                EntryOutcome::Processed => summary.processed += 1,
                EntryOutcome::UpToDate => summary.up_to_date += 1,
                EntryOutcome::Atlas => summary.atlases += 1,
                EntryOutcome::Skipped => summary.skipped += 1,
            }
        }

        if let Err(err) = self.mod_cache.write(cache_path) {
            error!(
                "Failed to write the cache file '{}': {err}. The next run will reprocess more assets than necessary",
                cache_path.display()
            );
        }
        summary
    }

    fn process_entry(&mut self, entry: &ManifestEntry) -> EntryOutcome {
        let mut missing_fields = Vec::new();
        if entry.ty.is_empty() {
            missing_fields.push("type");
        }
        if entry.path.is_empty() {
            missing_fields.push("path");
        }
        if !missing_fields.is_empty() {
            warn!(
                "Skipping manifest entry (type: '{}', path: '{}'): missing field(s): {}",
                entry.ty,
                entry.path,
                missing_fields.join(", ")
            );
            return EntryOutcome::Skipped;
        }

        let source_path = self.asset_root.join(&entry.path);
        if !source_path.exists() {
            warn!(
                "Skipping manifest entry '{}': source path '{}' does not exist",
                entry.path,
                source_path.display()
            );
            return EntryOutcome::Skipped;
        }

        if entry.ty == ATLAS_ENTRY_TYPE {
            let destination = self.output_root.join("atlases").join(&entry.path);
            if let Err(err) = self.atlas_invoker.build_atlas(&source_path, &destination) {
                error!("Failed to build atlas for '{}': {err}", entry.path);
                return EntryOutcome::Skipped;
            }
            return EntryOutcome::Atlas;
        }

        self.encrypt_copy(entry, &source_path)
    }

    fn encrypt_copy(&mut self, entry: &ManifestEntry, source_path: &Path) -> EntryOutcome {
        let Some(relative_path) = pathdiff::diff_paths(source_path, &self.asset_root) else {
            warn!(
                "Skipping manifest entry '{}': failed to resolve it relative to '{}'",
                entry.path,
                self.asset_root.display()
            );
            return EntryOutcome::Skipped;
        };
        let asset_key = AssetKey::new(relative_path);

        let mut destination = self.output_root.join(asset_key.as_path());
        destination.set_extension(ENCRYPTED_EXTENSION);
        if let Some(parent) = destination.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("Skipping asset '{asset_key}': failed to create the output directory: {err}");
                return EntryOutcome::Skipped;
            }
        }

        let Some(source_ticks) = modified_ticks(source_path) else {
            warn!(
                "Skipping asset '{asset_key}': failed to read the modification time of '{}'",
                source_path.display()
            );
            return EntryOutcome::Skipped;
        };

        let cache_key = asset_key.cache_key();
        if !self.mod_cache.entry_is_newer(&cache_key, source_ticks) {
            trace!("Asset '{asset_key}' is up to date");
            return EntryOutcome::UpToDate;
        }

        let source = match File::open(source_path) {
            Ok(file) => file,
            Err(err) => {
                warn!("Skipping asset '{asset_key}': failed to open the source file: {err}");
                return EntryOutcome::Skipped;
            }
        };
        let destination_file = match File::create(&destination) {
            Ok(file) => file,
            Err(err) => {
                warn!(
                    "Skipping asset '{asset_key}': failed to open the destination file '{}': {err}",
                    destination.display()
                );
                return EntryOutcome::Skipped;
            }
        };

        if let Err(err) = encrypt_stream(source, destination_file, &self.encryption_key) {
            warn!("Skipping asset '{asset_key}': failed to encrypt: {err}");
            return EntryOutcome::Skipped;
        }

        info!("Processed asset '{asset_key}' to '{}'", destination.display());
        self.mod_cache.insert(cache_key, source_ticks);
        EntryOutcome::Processed
    }
}

/// Streams every byte from `source` through the cipher into `destination`.
/// The cipher position is the byte's offset from the start of the file.
fn encrypt_stream(source: File, destination: File, encryption_key: &EncryptionKey) -> io::Result<()> {
    let reader = BufReader::new(source);
    let mut writer = BufWriter::new(destination);
    for (i, byte) in reader.bytes().enumerate() {
        writer.write_all(&[encrypt_byte(byte?, i, encryption_key.as_bytes())])?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, thread, time::Duration};

    use tempdir::TempDir;

    use crate::{atlas::RecordingPacker, cipher::decrypt_bytes};

    use super::*;

    fn setup_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn setup(root: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let asset_root = root.path().join("assets");
        fs::create_dir_all(&asset_root).unwrap();
        let output_root = root.path().join("output");
        let cache_path = root.path().join("ContentCache.txt");
        (asset_root, output_root, cache_path)
    }

    fn test_key() -> EncryptionKey {
        EncryptionKey::new("test-key").unwrap()
    }

    fn setup_driver(asset_root: &Path, output_root: &Path) -> PipelineDriver {
        PipelineDriver::new(asset_root, output_root, test_key(), AtlasInvoker::default())
    }

    fn entry(ty: &str, path: &str) -> ManifestEntry {
        ManifestEntry {
            ty: ty.to_owned(),
            path: path.to_owned(),
        }
    }

    #[test]
    fn cold_start() {
        setup_logger();
        let root = TempDir::new("cold_start").unwrap();
        let (asset_root, output_root, cache_path) = setup(&root);
        fs::write(asset_root.join("a.png"), b"png bytes").unwrap();
        fs::write(asset_root.join("b.bin"), b"payload").unwrap();

        // The entry for a.png has an empty type and must be skipped.
        let manifest = vec![entry("", "a.png"), entry("data", "b.bin")];
        let mut driver = setup_driver(&asset_root, &output_root);
        let summary = driver.run(&manifest, &cache_path);

        assert_eq!(
            summary,
            RunSummary {
                processed: 1,
                skipped: 1,
                ..RunSummary::default()
            }
        );
        assert!(!output_root.join("a.enc").exists());

        let mut encrypted = fs::read(output_root.join("b.enc")).unwrap();
        assert_ne!(encrypted, b"payload");
        decrypt_bytes(&mut encrypted, &test_key());
        assert_eq!(encrypted, b"payload");

        let cache_content = fs::read_to_string(&cache_path).unwrap();
        let lines = cache_content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("b.bin,"));
    }

    #[test]
    fn warm_run_skips_unchanged_assets() {
        setup_logger();
        let root = TempDir::new("warm_unchanged").unwrap();
        let (asset_root, output_root, cache_path) = setup(&root);
        fs::write(asset_root.join("b.bin"), b"payload").unwrap();
        let manifest = vec![entry("data", "b.bin")];

        let mut driver = setup_driver(&asset_root, &output_root);
        assert_eq!(driver.run(&manifest, &cache_path).processed, 1);
        let stored_ticks = driver.mod_cache().get("b.bin").unwrap();

        // A sentinel in the destination proves that the second run doesn't
        // rewrite it.
        fs::write(output_root.join("b.enc"), b"sentinel").unwrap();

        let mut driver = setup_driver(&asset_root, &output_root);
        let summary = driver.run(&manifest, &cache_path);
        assert_eq!(summary.up_to_date, 1);
        assert_eq!(summary.processed, 0);
        assert_eq!(fs::read(output_root.join("b.enc")).unwrap(), b"sentinel");
        assert_eq!(driver.mod_cache().get("b.bin"), Some(stored_ticks));
    }

    #[test]
    fn warm_run_reprocesses_changed_assets() {
        setup_logger();
        let root = TempDir::new("warm_changed").unwrap();
        let (asset_root, output_root, cache_path) = setup(&root);
        fs::write(asset_root.join("b.bin"), b"payload").unwrap();
        let manifest = vec![entry("data", "b.bin")];

        let mut driver = setup_driver(&asset_root, &output_root);
        assert_eq!(driver.run(&manifest, &cache_path).processed, 1);
        let stored_ticks = driver.mod_cache().get("b.bin").unwrap();

        // The sleep makes sure that the rewrite bumps the modification time.
        thread::sleep(Duration::from_millis(20));
        fs::write(asset_root.join("b.bin"), b"new payload").unwrap();

        let mut driver = setup_driver(&asset_root, &output_root);
        let summary = driver.run(&manifest, &cache_path);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.up_to_date, 0);

        let mut encrypted = fs::read(output_root.join("b.enc")).unwrap();
        decrypt_bytes(&mut encrypted, &test_key());
        assert_eq!(encrypted, b"new payload");
        assert!(driver.mod_cache().get("b.bin").unwrap() > stored_ticks);
    }

    #[test]
    fn atlases_are_rebuilt_on_every_run() {
        setup_logger();
        let root = TempDir::new("atlas_always_rebuilt").unwrap();
        let (asset_root, output_root, cache_path) = setup(&root);
        fs::create_dir_all(asset_root.join("sprites")).unwrap();
        let manifest = vec![entry(ATLAS_ENTRY_TYPE, "sprites")];

        let invocations = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let atlas_invoker = AtlasInvoker::new(Box::new(RecordingPacker {
                invocations: invocations.clone(),
            }));
            let mut driver = PipelineDriver::new(&asset_root, &output_root, test_key(), atlas_invoker);
            let summary = driver.run(&manifest, &cache_path);
            assert_eq!(summary.atlases, 1);
        }

        assert_eq!(invocations.borrow().len(), 2);
        assert_eq!(invocations.borrow()[0].1, output_root.join("atlases").join("sprites"));
    }

    #[test]
    fn output_tree_mirrors_the_asset_tree() {
        setup_logger();
        let root = TempDir::new("mirrored_tree").unwrap();
        let (asset_root, output_root, cache_path) = setup(&root);
        fs::create_dir_all(asset_root.join("textures/ui")).unwrap();
        fs::write(asset_root.join("textures/ui/button.png"), b"button").unwrap();
        fs::write(asset_root.join("raw"), b"no extension").unwrap();

        let manifest = vec![entry("texture", "textures/ui/button.png"), entry("data", "raw")];
        let mut driver = setup_driver(&asset_root, &output_root);
        let summary = driver.run(&manifest, &cache_path);

        assert_eq!(summary.processed, 2);
        assert!(output_root.join("textures/ui/button.enc").exists());
        assert!(output_root.join("raw.enc").exists());
        assert!(driver.mod_cache().get("textures/ui/button.png").is_some());
        assert!(driver.mod_cache().get("raw").is_some());
    }

    #[test]
    fn nonexistent_source_is_skipped() {
        setup_logger();
        let root = TempDir::new("missing_source").unwrap();
        let (asset_root, output_root, cache_path) = setup(&root);

        let manifest = vec![entry("data", "missing.bin")];
        let mut driver = setup_driver(&asset_root, &output_root);
        let summary = driver.run(&manifest, &cache_path);

        assert_eq!(summary.skipped, 1);
        assert!(driver.mod_cache().is_empty());
        // The cache file is still written at the end of the run.
        assert!(cache_path.exists());
    }
}
