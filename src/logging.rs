use log::LevelFilter;

/// Initialize logging using env_logger. \
/// Reads the RUST_LOG environment variable for filtering and falls back to `info`,
/// e.g. `RUST_LOG=social_client=debug social-cli search ana`
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
