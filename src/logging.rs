// src/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects debug level for this
/// crate and info for everything else.
pub fn init(debug: bool) {
    let default = if debug {
        "info,ensemble_export=debug,export_table=debug"
    } else {
        "info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::FmtSubscriber;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ensemble_export=debug")),
        )
        .with_test_writer()
        .finish();
    // already set by another test is fine
    let _ = tracing::subscriber::set_global_default(subscriber);
}
