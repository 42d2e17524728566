use thiserror::Error;

/// Raised when a dynamically typed value is offered where an error source is
/// expected.
///
/// This is a caller programming error. The statically typed entry points
/// (`IntoSource`) cannot produce it; only [`Source::try_from_any`] can.
///
/// [`Source::try_from_any`]: crate::Source::try_from_any
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// The value is not a string, a chain or a boxed error.
    #[error("type is invalid: {type_name}")]
    InvalidType { type_name: &'static str },
}

/// Failures while encoding or decoding a chain.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A tag field carried a value outside its enumeration. Usually a sign of
    /// version skew between writer and reader.
    #[error("protocol error: unknown {field} tag {tag}")]
    Protocol { field: &'static str, tag: u8 },

    /// A custom argument kind was found that the registry does not know.
    #[error("argument kind `{0}` is not registered")]
    UnregisteredKind(String),

    /// The stream held more bytes than one encoded chain.
    #[error("{0} trailing bytes after encoded chain")]
    TrailingBytes(usize),

    /// Nodes or argument lists were nested deeper than the decoder accepts.
    #[error("encoded chain nested deeper than {0} levels")]
    DepthExceeded(usize),

    /// A primitive field could not be read or written.
    #[error("codec error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Errors from installing process-wide settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is already installed")]
    AlreadyInstalled(&'static str),
}
