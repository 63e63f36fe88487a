use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `verbose` forces debug output.
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("feedpipe=debug")
    } else {
        EnvFilter::try_new(format!("feedpipe={}", level))
            .unwrap_or_else(|_| EnvFilter::new("feedpipe=info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
