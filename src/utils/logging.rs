use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "ytdlp_desk=info";

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins; otherwise `level` (from the config file) applies to this
/// crate, falling back to `info`. Repeated calls are ignored.
pub fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        Some(level) => EnvFilter::new(format!("ytdlp_desk={}", level)),
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(Some("debug"));
        init_tracing(None);
        tracing::debug!("logging initialized");
    }
}
