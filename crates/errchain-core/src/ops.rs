//! Free-function forms of the chain operations.
//!
//! These accept anything convertible into an optional [`Source`], so plain
//! messages and foreign errors are promoted to chains on the fly and `None`
//! flows through as "no error".

use std::error::Error;

use tracing::trace;

use crate::arg::Arg;
use crate::chain::Chain;
use crate::source::{AsMessage, Foreign, IntoSource, Source};

/// Builds a chain from `source`, recording the caller's site.
///
/// A chain is returned unchanged and `None` stays `None`.
#[track_caller]
pub fn new(source: impl IntoSource, args: Vec<Arg>) -> Option<Chain> {
    // Not `Option::map`: closures do not forward the caller location.
    match source.into_source() {
        Some(source) => Some(Chain::with_args(source, args)),
        None => None,
    }
}

/// Puts `source` in front of `existing`.
///
/// `existing` is promoted to a chain when it is a message or foreign error.
/// Without an existing error a chain `source` is forwarded and anything else
/// starts a new chain.
#[track_caller]
pub fn push(existing: impl IntoSource, source: impl IntoSource) -> Option<Chain> {
    match existing.into_source() {
        Some(existing) => Chain::new(existing).push(source),
        None => forward(source),
    }
}

/// Adds a node with the same message recording the caller's site.
///
/// Messages and foreign errors are simply wrapped.
#[track_caller]
pub fn forward(source: impl IntoSource) -> Option<Chain> {
    match source.into_source()? {
        Source::Chain(chain) => Some(chain.forward()),
        other => Some(Chain::new(other)),
    }
}

/// Concatenates two errors: `trailer`'s chain first, then `upstream`'s.
///
/// The upstream error reads as the older, deeper context. A missing side
/// yields the other one promoted to a chain; an empty trailer message counts
/// as missing.
#[track_caller]
pub fn merge(upstream: impl IntoSource, trailer: impl IntoSource) -> Option<Chain> {
    let merged = match (upstream.into_source(), trailer.into_source()) {
        (None, None) => None,
        (Some(upstream), None) => Some(Chain::new(upstream)),
        (None, Some(trailer)) => Some(Chain::new(trailer)),
        (Some(upstream), Some(trailer)) if trailer.is_empty_message() => {
            Some(Chain::new(upstream))
        }
        (Some(upstream), Some(trailer)) => {
            let trailer = Chain::new(trailer);
            Some(trailer.append(Chain::new(upstream)))
        }
    };
    if let Some(chain) = &merged {
        trace!(depth = chain.len(), "merged chains");
    }
    merged
}

/// True when both sides have a message and the messages are identical.
///
/// For chains only the head's unformatted message takes part.
pub fn equal<L, R>(left: &L, right: &R) -> bool
where
    L: AsMessage + ?Sized,
    R: AsMessage + ?Sized,
{
    match (left.message(), right.message()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Depth of the first node of `chain` equal to `target`.
pub fn find<T: AsMessage + ?Sized>(chain: Option<&Chain>, target: &T) -> Option<usize> {
    chain?.find(target)
}

/// True when the rendered message of `source` contains `needle`. Absent
/// sources and empty needles never match.
pub fn contains<T: AsMessage + ?Sized>(source: &T, needle: &str) -> bool {
    !needle.is_empty()
        && source
            .rendered()
            .is_some_and(|message| message.contains(needle))
}

/// Depth of the first node of `chain` whose formatted message contains
/// `needle`.
pub fn find_str(chain: Option<&Chain>, needle: &str) -> Option<usize> {
    chain?.find_str(needle)
}

/// The trace of `chain`, or `"nil"` without one.
pub fn trace(chain: Option<&Chain>) -> String {
    match chain {
        Some(chain) => chain.trace(),
        None => "nil".to_owned(),
    }
}

/// Deep copy of `chain`.
pub fn copy(chain: Option<&Chain>) -> Option<Chain> {
    chain.map(Chain::copy)
}

/// Copies any error: chains deeply, everything else as a message-only error.
pub fn copy_error(err: &(dyn Error + 'static)) -> Source {
    match err.downcast_ref::<Chain>() {
        Some(chain) => Source::Chain(chain.copy()),
        None => Source::Foreign(Foreign::from_error(err)),
    }
}
