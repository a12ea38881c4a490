use log::LevelFilter;

/// Maps a `-v` occurrence count to a log level and installs `env_logger` honoring `RUST_LOG`.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(default_level);
    let _ = builder.try_init();
}
