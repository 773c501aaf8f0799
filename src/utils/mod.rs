pub mod paths;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
///
/// `RUST_LOG` wins when set; otherwise only `nucleo_core` info logs are shown.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("nucleo_core=info"));

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
