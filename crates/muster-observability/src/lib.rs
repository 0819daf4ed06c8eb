//! # muster-observability
//!
//! Logging setup for muster, built on the tracing ecosystem. The CLI picks
//! a preset at startup; `RUST_LOG` overrides it when set.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
