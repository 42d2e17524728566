use std::any::{Any, type_name};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use crate::chain::Chain;
use crate::error::ConstructionError;

/// An opaque error known only by its message.
///
/// Errors from other libraries are reduced to this form when they enter a
/// chain, so a chain never holds on to foreign types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Foreign {
    message: String,
}

impl Foreign {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Copies the rendered message of any error.
    pub fn from_error(err: &(dyn Error + '_)) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Foreign {}

/// Anything a chain node can be built from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A plain message.
    Message(String),
    /// An error from outside this crate.
    Foreign(Foreign),
    /// An existing chain. Constructors return it unchanged.
    Chain(Chain),
}

impl Source {
    /// Accepts a dynamically typed value, such as a panic payload.
    ///
    /// Strings, chains, [`Foreign`] and boxed errors are accepted. Anything
    /// else is a caller programming error and yields
    /// [`ConstructionError::InvalidType`].
    pub fn try_from_any(value: Box<dyn Any + Send>) -> Result<Source, ConstructionError> {
        downcast(value).map_err(|_| ConstructionError::InvalidType {
            type_name: "dyn Any",
        })
    }

    /// Like [`Source::try_from_any`] for a value whose type is known at the
    /// call site; the error names the rejected type.
    pub fn try_from_value<T: Any + Send>(value: T) -> Result<Source, ConstructionError> {
        downcast(Box::new(value)).map_err(|_| ConstructionError::InvalidType {
            type_name: type_name::<T>(),
        })
    }

    /// True for a plain message or foreign error with no text.
    pub fn is_empty_message(&self) -> bool {
        match self {
            Source::Message(message) => message.is_empty(),
            Source::Foreign(foreign) => foreign.message().is_empty(),
            Source::Chain(_) => false,
        }
    }
}

fn downcast(value: Box<dyn Any + Send>) -> Result<Source, Box<dyn Any + Send>> {
    let value = match value.downcast::<String>() {
        Ok(message) => return Ok(Source::Message(*message)),
        Err(value) => value,
    };
    let value = match value.downcast::<&'static str>() {
        Ok(message) => return Ok(Source::Message((*message).to_owned())),
        Err(value) => value,
    };
    let value = match value.downcast::<Chain>() {
        Ok(chain) => return Ok(Source::Chain(*chain)),
        Err(value) => value,
    };
    let value = match value.downcast::<Foreign>() {
        Ok(foreign) => return Ok(Source::Foreign(*foreign)),
        Err(value) => value,
    };
    let value = match value.downcast::<Source>() {
        Ok(source) => return Ok(*source),
        Err(value) => value,
    };
    value
        .downcast::<Box<dyn Error + Send + Sync>>()
        .map(|err| Source::from(*err))
}

impl From<&str> for Source {
    fn from(message: &str) -> Self {
        Source::Message(message.to_owned())
    }
}

impl From<String> for Source {
    fn from(message: String) -> Self {
        Source::Message(message)
    }
}

impl From<&String> for Source {
    fn from(message: &String) -> Self {
        Source::Message(message.clone())
    }
}

impl From<Chain> for Source {
    fn from(chain: Chain) -> Self {
        Source::Chain(chain)
    }
}

impl From<Foreign> for Source {
    fn from(foreign: Foreign) -> Self {
        Source::Foreign(foreign)
    }
}

impl From<std::io::Error> for Source {
    fn from(err: std::io::Error) -> Self {
        Source::Foreign(Foreign::from_error(&err))
    }
}

impl From<fmt::Error> for Source {
    fn from(err: fmt::Error) -> Self {
        Source::Foreign(Foreign::from_error(&err))
    }
}

impl From<Box<dyn Error + Send + Sync>> for Source {
    fn from(err: Box<dyn Error + Send + Sync>) -> Self {
        match err.downcast::<Chain>() {
            Ok(chain) => Source::Chain(*chain),
            Err(err) => Source::Foreign(Foreign::from_error(&*err)),
        }
    }
}

/// Conversion into an optional source. `None` is the "no error" value and
/// short-circuits every operation that receives it.
pub trait IntoSource {
    fn into_source(self) -> Option<Source>;
}

macro_rules! into_source {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoSource for $ty {
                fn into_source(self) -> Option<Source> {
                    Some(Source::from(self))
                }
            }
        )*
    };
}

into_source!(
    &str,
    String,
    &String,
    Chain,
    Foreign,
    Source,
    std::io::Error,
    fmt::Error,
    Box<dyn Error + Send + Sync>,
);

impl<T: IntoSource> IntoSource for Option<T> {
    fn into_source(self) -> Option<Source> {
        self.and_then(IntoSource::into_source)
    }
}

/// Read access to the message of anything that can be compared with or
/// searched in a chain.
pub trait AsMessage {
    /// The message used for equality. For a chain this is the unformatted
    /// message of its head node; arguments and site do not take part.
    fn message(&self) -> Option<Cow<'_, str>>;

    /// The message used for substring search. For a chain this is the head
    /// node's message with its arguments substituted.
    fn rendered(&self) -> Option<Cow<'_, str>> {
        self.message()
    }
}

impl AsMessage for str {
    fn message(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl AsMessage for String {
    fn message(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl AsMessage for Foreign {
    fn message(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.message))
    }
}

impl AsMessage for std::io::Error {
    fn message(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.to_string()))
    }
}

impl AsMessage for dyn Error + 'static {
    fn message(&self) -> Option<Cow<'_, str>> {
        match self.downcast_ref::<Chain>() {
            Some(chain) => chain.message(),
            None => Some(Cow::Owned(self.to_string())),
        }
    }

    fn rendered(&self) -> Option<Cow<'_, str>> {
        match self.downcast_ref::<Chain>() {
            Some(chain) => chain.rendered(),
            None => Some(Cow::Owned(self.to_string())),
        }
    }
}

impl AsMessage for dyn Error + Send + Sync + 'static {
    fn message(&self) -> Option<Cow<'_, str>> {
        (self as &(dyn Error + 'static)).message()
    }

    fn rendered(&self) -> Option<Cow<'_, str>> {
        (self as &(dyn Error + 'static)).rendered()
    }
}

impl AsMessage for Source {
    fn message(&self) -> Option<Cow<'_, str>> {
        match self {
            Source::Message(message) => Some(Cow::Borrowed(message)),
            Source::Foreign(foreign) => Some(Cow::Borrowed(foreign.message())),
            Source::Chain(chain) => chain.message(),
        }
    }

    fn rendered(&self) -> Option<Cow<'_, str>> {
        match self {
            Source::Chain(chain) => chain.rendered(),
            other => other.message(),
        }
    }
}

impl<T: AsMessage + ?Sized> AsMessage for &T {
    fn message(&self) -> Option<Cow<'_, str>> {
        (**self).message()
    }

    fn rendered(&self) -> Option<Cow<'_, str>> {
        (**self).rendered()
    }
}

impl<T: AsMessage> AsMessage for Option<T> {
    fn message(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(AsMessage::message)
    }

    fn rendered(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(AsMessage::rendered)
    }
}
