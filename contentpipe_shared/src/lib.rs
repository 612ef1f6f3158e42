//! Shared dependency hub for the contentpipe workspace. The other members
//! import their third-party crates through the re-exports in this crate.

pub use chrono;
pub use log;
pub use pathdiff;
pub use thiserror;
