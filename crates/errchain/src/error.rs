use thiserror::Error;

/// Unified error type for applications built on errchain.
///
/// Aggregates the failures of the core with I/O so storage code can use a
/// single `?` path.
#[derive(Error, Debug)]
pub enum Error {
    /// A dynamically typed value could not be turned into a chain.
    #[error("Construction error: {0}")]
    Construction(#[from] errchain_core::ConstructionError),

    /// Encoding or decoding failed.
    #[error("Codec error: {0}")]
    Codec(#[from] errchain_core::CodecError),

    /// Process-wide settings were installed twice.
    #[error("Configuration error: {0}")]
    Config(#[from] errchain_core::ConfigError),

    /// Standard IO error.
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
