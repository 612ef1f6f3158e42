//! # Overview
//!
//! Crate for turning a project's raw asset tree into a packaged, encrypted
//! output tree while skipping assets that have not changed since the
//! previous run.
//!
//! The pipeline is a single sequential pass over a flat asset manifest: a
//! JSON array of `{type, path}` descriptors with paths relative to the asset
//! root. Non-atlas assets are streamed through a keyed byte cipher into a
//! mirrored output tree where the original file extension is replaced by a
//! marker extension. A persisted modification cache decides per asset
//! whether any work is needed at all. Atlas entries are delegated to the
//! external `crunch` packer and are deliberately rebuilt on every run.
//!
//! ## Example:
//!
//! **Asset Directory:**
//!
//! ```text
//! assets/
//! ├─ textures/
//! │  ├─ character.png
//! ├─ levels/
//! │  ├─ level1.json
//! ├─ sprites/        (type "texture-atlas")
//! ```
//!
//! **Output Directory:**
//!
//! ```text
//! output/
//! ├─ textures/
//! │  ├─ character.enc
//! ├─ levels/
//! │  ├─ level1.enc
//! ├─ atlases/
//! │  ├─ sprites
//! ```
//!
//! # Components
//!
//! The [`PipelineDriver`] is the orchestrator: it loads the [`ModCache`],
//! walks the manifest once, pushes outdated assets through the cipher or the
//! [`AtlasInvoker`] and persists the cache at the end of the run. Per-entry
//! failures are reported and skipped; only an unreadable manifest is fatal
//! to the whole run.

mod atlas;
mod cipher;
mod common;
mod manifest;
mod mod_cache;
mod pipeline;

pub use atlas::*;
pub use cipher::*;
pub use common::*;
pub use manifest::*;
pub use mod_cache::*;
pub use pipeline::*;
