use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CodecError, ConfigError};

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// A value substituted into a node's message when it is rendered.
///
/// The built-in kinds are always encodable. Any other type enters through
/// [`Arg::custom`] and must be registered before a chain carrying it is
/// encoded or decoded.
#[derive(Debug, Clone)]
pub enum Arg {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Arg>),
    Custom(Box<dyn CustomArg>),
}

impl Arg {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Arg::Bytes(bytes.into())
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arg>,
    {
        Arg::List(items.into_iter().map(Into::into).collect())
    }

    pub fn custom<T: ArgKind>(value: T) -> Self {
        Arg::Custom(Box::new(Typed(value)))
    }

    /// Borrows the value of a custom argument of kind `T`.
    pub fn downcast_ref<T: ArgKind>(&self) -> Option<&T> {
        match self {
            Arg::Custom(custom) => custom
                .as_any()
                .downcast_ref::<Typed<T>>()
                .map(|typed| &typed.0),
            _ => None,
        }
    }

    /// Renders the argument for one placeholder spec. `None` means the spec
    /// does not apply to this kind.
    pub(crate) fn render(&self, spec: &str) -> Option<String> {
        match spec {
            "" => Some(self.to_string()),
            "?" => {
                let mut out = String::new();
                self.write_debug(&mut out).ok()?;
                Some(out)
            }
            "x" => self.hex(false),
            "X" => self.hex(true),
            _ => None,
        }
    }

    fn write_debug(&self, out: &mut String) -> fmt::Result {
        match self {
            Arg::Str(value) => write!(out, "{value:?}"),
            Arg::Char(value) => write!(out, "{value:?}"),
            Arg::Bytes(value) => write!(out, "{value:?}"),
            Arg::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_debug(out)?;
                }
                out.push(']');
                Ok(())
            }
            Arg::Custom(custom) => write!(out, "{custom:?}"),
            other => write!(out, "{other}"),
        }
    }

    fn hex(&self, upper: bool) -> Option<String> {
        let encode = |bytes: &[u8]| -> String {
            bytes
                .iter()
                .map(|byte| {
                    if upper {
                        format!("{byte:02X}")
                    } else {
                        format!("{byte:02x}")
                    }
                })
                .collect()
        };
        match (self, upper) {
            (Arg::Int(value), false) => Some(format!("{value:x}")),
            (Arg::Int(value), true) => Some(format!("{value:X}")),
            (Arg::Uint(value), false) => Some(format!("{value:x}")),
            (Arg::Uint(value), true) => Some(format!("{value:X}")),
            (Arg::Bytes(value), _) => Some(encode(value)),
            (Arg::Str(value), _) => Some(encode(value.as_bytes())),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Bool(value) => write!(f, "{value}"),
            Arg::Int(value) => write!(f, "{value}"),
            Arg::Uint(value) => write!(f, "{value}"),
            Arg::Float(value) => write!(f, "{value}"),
            Arg::Char(value) => write!(f, "{value}"),
            Arg::Str(value) => f.write_str(value),
            Arg::Bytes(value) => write!(f, "{value:?}"),
            Arg::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Arg::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Bool(a), Arg::Bool(b)) => a == b,
            (Arg::Int(a), Arg::Int(b)) => a == b,
            (Arg::Uint(a), Arg::Uint(b)) => a == b,
            (Arg::Float(a), Arg::Float(b)) => a.to_bits() == b.to_bits(),
            (Arg::Char(a), Arg::Char(b)) => a == b,
            (Arg::Str(a), Arg::Str(b)) => a == b,
            (Arg::Bytes(a), Arg::Bytes(b)) => a == b,
            (Arg::List(a), Arg::List(b)) => a == b,
            (Arg::Custom(a), Arg::Custom(b)) => {
                a.kind() == b.kind()
                    && matches!((a.encode(), b.encode()), (Ok(a), Ok(b)) if a == b)
            }
            _ => false,
        }
    }
}

macro_rules! arg_from {
    ($variant:ident as $target:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::$variant(value as $target)
                }
            }
        )*
    };
}

arg_from!(Int as i64: i8, i16, i32, i64, isize);
arg_from!(Uint as u64: u8, u16, u32, u64, usize);
arg_from!(Float as f64: f32, f64);

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<char> for Arg {
    fn from(value: char) -> Self {
        Arg::Char(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

/// Builds a `Vec<Arg>` from values convertible into [`Arg`].
///
/// ```
/// use errchain_core::{Chain, args};
///
/// let chain = Chain::with_args("read {} of {} bytes", args![12, 64_u64]);
/// assert_eq!(chain.formatted(), "read 12 of 64 bytes");
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),*]
    };
}

/// Object-safe face of a custom argument.
///
/// Implemented for every [`ArgKind`]; there is normally no reason to
/// implement it by hand.
pub trait CustomArg: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// The name the kind is registered under.
    fn kind(&self) -> &'static str;

    /// An independent deep copy.
    fn clone_arg(&self) -> Box<dyn CustomArg>;

    fn encode(&self) -> Result<Vec<u8>, CodecError>;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn CustomArg> {
    fn clone(&self) -> Self {
        self.clone_arg()
    }
}

/// A user type that can travel as a format argument.
///
/// `Clone` must produce a value that shares no mutable state with the
/// original: copies of a chain rely on it.
pub trait ArgKind:
    Serialize + DeserializeOwned + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Unique name written to the wire ahead of the payload.
    const KIND: &'static str;
}

struct Typed<T>(T);

impl<T: ArgKind> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<T: ArgKind> fmt::Display for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<T: ArgKind> CustomArg for Typed<T> {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn clone_arg(&self) -> Box<dyn CustomArg> {
        Box::new(Typed(self.0.clone()))
    }

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(&self.0)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type DecodeFn = fn(&[u8]) -> Result<Box<dyn CustomArg>, CodecError>;

fn decode_typed<T: ArgKind>(bytes: &[u8]) -> Result<Box<dyn CustomArg>, CodecError> {
    let value: T = bincode::deserialize(bytes)?;
    Ok(Box::new(Typed(value)))
}

/// The closed set of custom argument kinds the codec accepts.
///
/// Build it at startup and [`install`](Registry::install) it, or pass it
/// explicitly to `encode_with` / `decode_with`.
#[derive(Clone, Default)]
pub struct Registry {
    kinds: BTreeMap<&'static str, DecodeFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ArgKind>(&mut self) -> &mut Self {
        self.kinds.insert(T::KIND, decode_typed::<T> as DecodeFn);
        self
    }

    /// Builder form of [`Registry::register`].
    pub fn with<T: ArgKind>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    pub(crate) fn decode(&self, kind: &str, bytes: &[u8]) -> Result<Arg, CodecError> {
        let decode = self
            .kinds
            .get(kind)
            .ok_or_else(|| CodecError::UnregisteredKind(kind.to_owned()))?;
        Ok(Arg::Custom(decode(bytes)?))
    }

    /// Installs this registry for the whole process. Only the first call
    /// succeeds.
    pub fn install(self) -> Result<(), ConfigError> {
        REGISTRY
            .set(self)
            .map_err(|_| ConfigError::AlreadyInstalled("argument registry"))
    }

    /// The installed registry, or an empty one.
    pub fn global() -> &'static Registry {
        static EMPTY: OnceCell<Registry> = OnceCell::new();
        REGISTRY
            .get()
            .unwrap_or_else(|| EMPTY.get_or_init(Registry::default))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds.keys()).finish()
    }
}
