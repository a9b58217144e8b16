//! Terminal feedback while recipes wait on the network.
//!
//! Log output is routed through `indicatif-log-bridge` so log lines and
//! spinners never fight for the terminal.

use std::future::Future;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that spinners must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

/// Awaits `future` behind a spinner labelled `message`, clearing the
/// spinner once it resolves.
#[allow(clippy::future_not_send)]
pub async fn with_spinner<T>(
    multi: &MultiProgress,
    message: &str,
    future: impl Future<Output = T>,
) -> T {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());

    let output = future.await;
    bar.finish_and_clear();
    output
}
