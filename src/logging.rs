// Logging: tracing events rendered to stderr by tracing-subscriber.
//
// RUST_LOG wins when set; otherwise the level comes from --debug.

use tracing_subscriber::EnvFilter;

/// Build the filter from a base level plus overrides for chatty dependencies
fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![format!("gold_admin={}", level), "warn".to_string()];
    for (target, lvl) in [("ureq", "warn"), ("rustls", "warn"), ("cookie_store", "warn")] {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

pub fn init_logging(debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level)?)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .without_time()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
