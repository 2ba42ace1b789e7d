use tracing_subscriber::EnvFilter;

/// Map a `-v` count to a default filter directive
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global tracing subscriber. Call once at program startup;
/// `RUST_LOG` takes precedence over the verbosity flag. Events carry their
/// module path as target, which keys log lines by component.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
