use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins; otherwise `--verbose` forces debug output for our crates,
/// and the configured level applies.
pub fn init(verbose: bool, configured_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(verbose, configured_level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn default_directives(verbose: bool, configured_level: &str) -> String {
    if verbose {
        "exmagic_ffi=debug,exmagic_core=debug,exmagic=debug,info".to_string()
    } else {
        configured_level.to_string()
    }
}
