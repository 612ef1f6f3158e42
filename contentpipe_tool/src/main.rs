use std::{
    io,
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use color_eyre as ey;
use contentpipe_pipeline::{load_manifest, AtlasInvoker, EncryptionKey, PipelineDriver, CONTENT_CACHE_FILE_NAME};
use contentpipe_shared::log::{self, info};
use ey::eyre::Context;

/// Packages the assets listed in the manifest into an encrypted output tree,
/// skipping assets that haven't changed since the previous run.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CommandLineArguments {
    /// Root directory of the raw assets
    asset_directory: PathBuf,

    /// Directory the packaged assets are written to
    output_directory: PathBuf,

    /// Passphrase for the output cipher
    encryption_key: String,

    /// Path to the JSON asset manifest
    config_path: PathBuf,
}

fn main() -> ey::Result<()> {
    // Setup logging
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                contentpipe_shared::chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    // The original contract is exit status 1 when arguments are missing.
    let command_line_arguments = match CommandLineArguments::try_parse() {
        Ok(command_line_arguments) => command_line_arguments,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    let encryption_key = EncryptionKey::new(command_line_arguments.encryption_key).wrap_err("Invalid encryption key")?;

    info!("Reading manifest: {:?}", command_line_arguments.config_path);
    let manifest = load_manifest(&command_line_arguments.config_path).wrap_err("Failed to read the asset manifest")?;

    let mut pipeline_driver = PipelineDriver::new(
        command_line_arguments.asset_directory,
        command_line_arguments.output_directory,
        encryption_key,
        AtlasInvoker::default(),
    );
    let summary = pipeline_driver.run(&manifest, Path::new(CONTENT_CACHE_FILE_NAME));

    info!(
        "Done: {} processed, {} up to date, {} atlases, {} skipped",
        summary.processed, summary.up_to_date, summary.atlases, summary.skipped
    );
    Ok(())
}
