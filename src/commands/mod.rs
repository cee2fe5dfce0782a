// ABOUTME: Command implementations behind the CLI subcommands
// ABOUTME: Exports the transfer and verify commands and their shared progress bar

pub mod transfer;
pub mod verify;

pub use transfer::transfer;
pub use verify::verify;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Per-table progress bar shared by both commands.
fn table_progress(len: usize) -> Result<ProgressBar> {
    let progress = ProgressBar::new(len as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );
    Ok(progress)
}
