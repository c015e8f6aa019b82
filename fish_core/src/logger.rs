use env_logger::Env;

/// Installs the process logger. Honors `RUST_LOG`, defaulting to `info`.
pub fn init_logger() {
    let env = Env::default().default_filter_or("info");

    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialised, keeping the existing one");
    }
}
