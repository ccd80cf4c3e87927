//! Diagnostic logging for the CLI.
//!
//! Library code only emits `tracing` events. The binary calls [`init`] once
//! to install a stderr subscriber, leaving stdout to the command's own
//! output. `RUST_LOG` takes precedence over `-v` flags when set.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Convert a `-v` count into a filter directive.
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",  // Default: problems only
        1 => "info",  // -v: per-image results
        2 => "debug", // -vv: every probe of the search
        _ => "trace",
    }
}

/// Install the global subscriber. Does nothing if one is already set.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(filter_directive(0), "warn");
        assert_eq!(filter_directive(1), "info");
        assert_eq!(filter_directive(2), "debug");
        assert_eq!(filter_directive(3), "trace");
        assert_eq!(filter_directive(10), "trace");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0);
        init(2);
    }
}
