// errchain facade
// Re-exports the core and adds the application-level pieces.

pub use errchain_core as core;
pub use errchain_core::*;
pub use errchain_core::args;

mod error;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
pub use store::{
    read_all, read_all_with, read_chain, read_chain_with, write_chain, write_chain_with,
};
pub use telemetry::{TelemetryConfig, TelemetryConfigBuilder, log_chain};
