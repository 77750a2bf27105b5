// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the stderr log subscriber. `RUST_LOG` wins over the default level,
/// which is `debug` with `--debug` and `info` otherwise. Calling it again is a no-op.
pub fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("mongo_examples=debug,mongodb=info")
        } else {
            EnvFilter::new("mongo_examples=info,warn")
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(debug))
        .try_init();
}
