//! Logger setup for the dockergen binary.

/// Initializes `env_logger`: Info by default, Debug when `verbose` is set.
/// `RUST_LOG` still overrides individual modules.
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
