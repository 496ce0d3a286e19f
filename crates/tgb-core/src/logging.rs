use crate::Result;

/// Initialize tracing for a client process.
///
/// Default: info for our crates (debug when `verbose`), warn for everything else.
/// Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,tgb={level},tgb_core={level},tgb_transport={level},tgb_client={level},tgb_webhook={level},{service_name}={level}"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| crate::Error::Config(format!("logging init failed: {e}")))
}
