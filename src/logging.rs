use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::shared::config::{CONFIG, LoggingConfig};

/// `RUST_LOG` directives, with the codec targets raised to `codec_level`.
pub fn codec_filter(cfg: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let directive = format!("{}={}", env!("CARGO_PKG_NAME"), cfg.codec_level).parse()?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Stdout plus a daily rolling file under `log_dir`, each capped at its own
/// level.
pub fn init() -> anyhow::Result<()> {
    let cfg = &CONFIG.logging;
    let stdout_filter = cfg.stdout_level.parse::<LevelFilter>()?;
    let file_filter = cfg.file_level.parse::<LevelFilter>()?;

    let file_appender = tracing_appender::rolling::daily(&cfg.log_dir, "kwproto.log");

    tracing_subscriber::registry()
        .with(codec_filter(cfg)?)
        .with(fmt::layer().with_ansi(true).with_filter(stdout_filter))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender)
                .with_filter(file_filter),
        )
        .try_init()?;

    info!(
        target: "kwproto::logging",
        log_dir = %cfg.log_dir,
        codec_level = %cfg.codec_level,
        "logging initialized"
    );
    Ok(())
}

/// Test-writer subscriber, installed once per test binary. A bad
/// `codec_level` leaves tests without logs rather than failing them.
#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        if let Ok(filter) = codec_filter(&CONFIG.logging) {
            let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
        }
    });
}
