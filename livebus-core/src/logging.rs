//! Tracing setup for binaries.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// Level comes from `RUST_LOG` (default `info`); `LOG_FORMAT=json` switches
/// to JSON lines. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
