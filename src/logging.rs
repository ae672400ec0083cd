// src/logging.rs
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. A non-empty `RUST_LOG` replaces the default
/// directives entirely; otherwise `default_directives` are used.
pub fn init_tracing(default_directives: &[&str]) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), default_directives)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

fn build_filter(rust_log: Option<&str>, default_directives: &[&str]) -> Result<EnvFilter> {
    let directives = match rust_log.map(str::trim) {
        Some(spec) if !spec.is_empty() => spec.to_string(),
        _ => default_directives.join(","),
    };
    Ok(EnvFilter::try_new(directives)?)
}
