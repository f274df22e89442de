use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset: our own events at info, dependencies at warn.
pub const DEFAULT_FILTER: &str = "warn,bookpack=info";

pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
