//! Binary encoding of chains.
//!
//! A node is written as a sequence of bincode fields:
//!
//! 1. cause kind tag (`LocalError` or `NativeError`)
//! 2. the nested chain, or the native message
//! 3. argument count followed by each tagged argument
//! 4. function, file, line, has-debug-info
//! 5. link kind tag (`NoNext` or `HasNext`), then the next node if any
//!
//! Links are read and written in a loop, so chain length is unbounded. Only
//! nested causes and argument lists count towards [`MAX_DEPTH`].
//!
//! Tags outside their enumeration are rejected with
//! [`CodecError::Protocol`], which catches streams written by an
//! incompatible version.

use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::arg::{Arg, Registry};
use crate::chain::{Cause, Chain};
use crate::error::CodecError;
use crate::site::Site;

/// Nesting limit for nested causes and argument lists, guarding the stack
/// against hostile input. Both directions enforce it.
pub const MAX_DEPTH: usize = 128;

fn enter(depth: usize) -> Result<usize, CodecError> {
    if depth >= MAX_DEPTH {
        return Err(CodecError::DepthExceeded(MAX_DEPTH));
    }
    Ok(depth + 1)
}

macro_rules! wire_tag {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident = $value:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        enum $name {
            $($variant = $value),*
        }

        impl TryFrom<u8> for $name {
            type Error = CodecError;

            fn try_from(tag: u8) -> Result<Self, Self::Error> {
                match tag {
                    $($value => Ok($name::$variant),)*
                    tag => Err(CodecError::Protocol { field: $field, tag }),
                }
            }
        }
    };
}

wire_tag!(CauseKind, "cause kind" {
    LocalError = 0,
    NativeError = 1,
});

wire_tag!(LinkKind, "link kind" {
    NoNext = 0,
    HasNext = 1,
});

wire_tag!(ArgTag, "argument" {
    Bool = 0,
    Int = 1,
    Uint = 2,
    Float = 3,
    Char = 4,
    Str = 5,
    Bytes = 6,
    List = 7,
    Custom = 8,
});

/// Encodes `chain` using the installed [`Registry`].
pub fn encode(chain: &Chain) -> Result<Vec<u8>, CodecError> {
    encode_with(chain, Registry::global())
}

/// Encodes `chain`; custom arguments must be registered in `registry`.
///
/// On failure nothing is returned, partial output is discarded.
pub fn encode_with(chain: &Chain, registry: &Registry) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    Encoder {
        out: &mut out,
        registry,
    }
    .chain(chain, 0)?;
    Ok(out)
}

/// Decodes one chain using the installed [`Registry`].
pub fn decode(bytes: &[u8]) -> Result<Chain, CodecError> {
    decode_with(bytes, Registry::global())
}

/// Decodes one chain; `bytes` must hold exactly one encoded chain.
pub fn decode_with(bytes: &[u8], registry: &Registry) -> Result<Chain, CodecError> {
    let mut input = bytes;
    let mut decoder = Decoder {
        input: &mut input,
        limit: bytes.len() as u64,
        registry,
    };
    let chain = decoder.chain(0).inspect_err(|err| {
        if let CodecError::Protocol { field, tag } = err {
            warn!(field, tag, "rejected encoded chain");
        }
    })?;

    if !input.is_empty() {
        return Err(CodecError::TrailingBytes(input.len()));
    }
    Ok(chain)
}

fn wire() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

struct Encoder<'a> {
    out: &'a mut Vec<u8>,
    registry: &'a Registry,
}

impl Encoder<'_> {
    fn put<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        wire().serialize_into(&mut *self.out, value)?;
        Ok(())
    }

    fn chain(&mut self, chain: &Chain, depth: usize) -> Result<(), CodecError> {
        let depth = enter(depth)?;
        for node in chain {
            self.node(node, depth)?;
            let link = match node.next() {
                Some(_) => LinkKind::HasNext,
                None => LinkKind::NoNext,
            };
            self.put(&(link as u8))?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Chain, depth: usize) -> Result<(), CodecError> {
        match node.cause() {
            Cause::Nested(inner) => {
                self.put(&(CauseKind::LocalError as u8))?;
                self.chain(inner, depth)?;
            }
            Cause::Native(message) => {
                self.put(&(CauseKind::NativeError as u8))?;
                self.put(message.as_str())?;
            }
        }

        self.put(&(node.args().len() as u64))?;
        for arg in node.args() {
            self.arg(arg, depth)?;
        }

        match node.site() {
            Some(site) => {
                self.put(site.function())?;
                self.put(site.file())?;
                self.put(&site.line())?;
                self.put(&true)
            }
            None => {
                self.put("")?;
                self.put("")?;
                self.put(&0_u32)?;
                self.put(&false)
            }
        }
    }

    fn arg(&mut self, arg: &Arg, depth: usize) -> Result<(), CodecError> {
        match arg {
            Arg::Bool(value) => {
                self.put(&(ArgTag::Bool as u8))?;
                self.put(value)
            }
            Arg::Int(value) => {
                self.put(&(ArgTag::Int as u8))?;
                self.put(value)
            }
            Arg::Uint(value) => {
                self.put(&(ArgTag::Uint as u8))?;
                self.put(value)
            }
            Arg::Float(value) => {
                self.put(&(ArgTag::Float as u8))?;
                self.put(value)
            }
            Arg::Char(value) => {
                self.put(&(ArgTag::Char as u8))?;
                self.put(value)
            }
            Arg::Str(value) => {
                self.put(&(ArgTag::Str as u8))?;
                self.put(value.as_str())
            }
            Arg::Bytes(value) => {
                self.put(&(ArgTag::Bytes as u8))?;
                self.put(value.as_slice())
            }
            Arg::List(items) => {
                let depth = enter(depth)?;
                self.put(&(ArgTag::List as u8))?;
                self.put(&(items.len() as u64))?;
                items.iter().try_for_each(|item| self.arg(item, depth))
            }
            Arg::Custom(custom) => {
                if !self.registry.contains(custom.kind()) {
                    return Err(CodecError::UnregisteredKind(custom.kind().to_owned()));
                }
                self.put(&(ArgTag::Custom as u8))?;
                self.put(custom.kind())?;
                self.put(custom.encode()?.as_slice())
            }
        }
    }
}

struct Decoder<'a, 'b> {
    input: &'a mut &'b [u8],
    limit: u64,
    registry: &'a Registry,
}

impl Decoder<'_, '_> {
    fn take<T: DeserializeOwned>(&mut self) -> Result<T, CodecError> {
        // The limit keeps a corrupt length prefix from allocating more than
        // the input could possibly hold.
        Ok(wire()
            .with_limit(self.limit)
            .deserialize_from(&mut *self.input)?)
    }

    fn chain(&mut self, depth: usize) -> Result<Chain, CodecError> {
        let depth = enter(depth)?;
        let head = self.node(depth)?;
        let mut older = Vec::new();
        let mut link = self.link()?;
        while link == LinkKind::HasNext {
            older.push(self.node(depth)?);
            link = self.link()?;
        }
        Ok(Chain::link(head, older))
    }

    fn link(&mut self) -> Result<LinkKind, CodecError> {
        LinkKind::try_from(self.take::<u8>()?)
    }

    /// Reads one node without its link.
    fn node(&mut self, depth: usize) -> Result<Chain, CodecError> {
        let cause = match CauseKind::try_from(self.take::<u8>()?)? {
            CauseKind::LocalError => Cause::Nested(Box::new(self.chain(depth)?)),
            CauseKind::NativeError => Cause::Native(self.take()?),
        };

        let count: u64 = self.take()?;
        let mut args = Vec::new();
        for _ in 0..count {
            args.push(self.arg(depth)?);
        }

        let function: String = self.take()?;
        let file: String = self.take()?;
        let line: u32 = self.take()?;
        let has_debug_info: bool = self.take()?;
        let site = has_debug_info.then(|| Site::new(function, file, line));

        Ok(Chain::from_parts(cause, args, site, None))
    }

    fn arg(&mut self, depth: usize) -> Result<Arg, CodecError> {
        let arg = match ArgTag::try_from(self.take::<u8>()?)? {
            ArgTag::Bool => Arg::Bool(self.take()?),
            ArgTag::Int => Arg::Int(self.take()?),
            ArgTag::Uint => Arg::Uint(self.take()?),
            ArgTag::Float => Arg::Float(self.take()?),
            ArgTag::Char => Arg::Char(self.take()?),
            ArgTag::Str => Arg::Str(self.take()?),
            ArgTag::Bytes => Arg::Bytes(self.take()?),
            ArgTag::List => {
                let depth = enter(depth)?;
                let count: u64 = self.take()?;
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(self.arg(depth)?);
                }
                Arg::List(items)
            }
            ArgTag::Custom => {
                let kind: String = self.take()?;
                let payload: Vec<u8> = self.take()?;
                self.registry.decode(&kind, &payload)?
            }
        };
        Ok(arg)
    }
}
