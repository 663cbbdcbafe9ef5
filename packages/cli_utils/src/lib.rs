#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `lusaka_waste` binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines and the zone progress bar never interleave. [`ZoneProgress`]
//! renders batch progress reported through [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use lusaka_waste_analysis::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Log level used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Batch progress bar, one tick per analysed zone.
pub struct ZoneProgress {
    bar: ProgressBar,
    counting_style: ProgressStyle,
}

impl ZoneProgress {
    /// Adds a bar to `multi`. It spins until the batch size is known.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counting_style = ProgressStyle::with_template(
            "{msg} {wide_bar:.green/dim} {pos}/{len} zones [{elapsed_precise}, eta {eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");

        Arc::new(Self {
            bar,
            counting_style,
        })
    }
}

impl ProgressCallback for ZoneProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counting_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger and returns the [`MultiProgress`] every bar
/// must be added to.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_LEVEL`]. A second call keeps the
/// first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(DEFAULT_LOG_LEVEL).parse_env("RUST_LOG");
    let logger = builder.build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
