//! Errors that remember where they came from.
//!
//! A [`Chain`] is a singly linked list of error occurrences, newest first.
//! Every node records the function, file and line that produced it, so a
//! chain read top to bottom retraces the path an error took.
//!
//! ```
//! use errchain_core::{Chain, args};
//!
//! let chain = Chain::with_args("connection to {} refused", args!["db:5432"])
//!     .push("loading settings")
//!     .expect("push of a message always yields a chain");
//!
//! assert_eq!(chain.len(), 2);
//! assert_eq!(chain.find_str("refused"), Some(1));
//! ```

mod arg;
mod chain;
pub mod codec;
mod config;
mod error;
pub mod ops;
pub mod render;
mod site;
mod source;

pub use arg::{Arg, ArgKind, CustomArg, Registry};
pub use chain::{Cause, Chain, Iter};
pub use codec::{decode, decode_with, encode, encode_with};
pub use config::{CaptureConfig, CaptureConfigBuilder};
pub use error::{CodecError, ConfigError, ConstructionError};
pub use ops::{
    contains, copy, copy_error, equal, find, find_str, forward, merge, new, push, trace,
};
pub use render::{format_template, message_of, phrase};
pub use site::{Site, UNKNOWN_FUNCTION};
pub use source::{AsMessage, Foreign, IntoSource, Source};
