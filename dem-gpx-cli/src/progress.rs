use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar whose length is set by the first `(processed, total)` update.
///
/// Hidden automatically when stderr is not a terminal.
pub fn bar(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

/// Callback adapter for the library's `(processed, total)` progress hooks.
pub fn updater(pb: &ProgressBar) -> impl FnMut(usize, usize) + '_ {
    move |processed, total| {
        pb.set_length(total as u64);
        pb.set_position(processed as u64);
    }
}
