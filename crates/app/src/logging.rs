use flexi_logger::{Logger, LoggerHandle};

/// Start logging to stderr. `RUST_LOG` wins over `level` when set.
///
/// The returned handle must stay alive for as long as logging is wanted.
pub fn init_logging(level: &str) -> anyhow::Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str(level)?
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()?;

    log::debug!(
        "kbmaker {} on {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );
    Ok(handle)
}
