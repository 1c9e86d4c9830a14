//! Log output
//!
//! `RUST_LOG` overrides the default filter, e.g. `RUST_LOG=homestead=debug`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "homestead=info";

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // wasm32 has no system clock for timestamps
    #[cfg(target_arch = "wasm32")]
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .compact()
        .try_init();

    #[cfg(not(target_arch = "wasm32"))]
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();

    // A subscriber may already be installed (tests, embedding hosts)
    let _ = result;
}
