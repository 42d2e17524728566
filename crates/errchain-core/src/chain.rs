use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::mem;

use tracing::trace;

use crate::arg::Arg;
use crate::render::format_template;
use crate::site::Site;
use crate::source::{AsMessage, IntoSource, Source};

/// What a node is about.
#[derive(Debug, Clone)]
pub enum Cause {
    /// A message-only error: a plain message or the text of a foreign error.
    Native(String),
    /// A whole chain used as the cause of this node.
    Nested(Box<Chain>),
}

impl Cause {
    /// The unformatted message. A nested chain contributes its head line,
    /// site included.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Cause::Native(message) => Cow::Borrowed(message),
            Cause::Nested(inner) => Cow::Owned(inner.to_string()),
        }
    }
}

/// A chain of errors, newest first.
///
/// Each node holds one error occurrence: its cause, the arguments substituted
/// into the cause's message, and the site that produced it. The node owns the
/// next (older) node. Chains only grow by putting a new head in front, so a
/// chain is never cyclic and a built node is never modified.
///
/// `Clone` is a deep copy: every node and argument is duplicated. Cloning,
/// dropping and encoding walk the links iteratively, so chain length is
/// bounded by memory only. Nesting through [`Cause::Nested`] still recurses.
///
/// # Call sites
///
/// Constructors are `#[track_caller]`. Helpers that build chains on behalf of
/// their callers should be `#[track_caller]` too, so the recorded site stays
/// the caller's.
pub struct Chain {
    cause: Cause,
    args: Vec<Arg>,
    site: Option<Site>,
    next: Option<Box<Chain>>,
}

impl Chain {
    /// Wraps a message or foreign error in a new single-node chain recording
    /// the caller's site. An existing chain is returned unchanged.
    #[track_caller]
    pub fn new(source: impl Into<Source>) -> Chain {
        Self::with_args(source, Vec::new())
    }

    /// Like [`Chain::new`], with arguments for the message's placeholders.
    /// The arguments are ignored when `source` is already a chain.
    #[track_caller]
    pub fn with_args(source: impl Into<Source>, args: Vec<Arg>) -> Chain {
        match source.into() {
            Source::Chain(chain) => chain,
            Source::Message(message) => {
                Self::from_parts(Cause::Native(message), args, Site::capture(), None)
            }
            Source::Foreign(foreign) => Self::from_parts(
                Cause::Native(foreign.into_message()),
                args,
                Site::capture(),
                None,
            ),
        }
    }

    /// Uses a whole chain as the cause of a new node, for instance a chain
    /// received from another process that is re-raised locally.
    #[track_caller]
    pub fn nest(inner: Chain, args: Vec<Arg>) -> Chain {
        let chain = Self::from_parts(Cause::Nested(Box::new(inner)), args, Site::capture(), None);
        trace!(depth = chain.len(), "nested chain as cause");
        chain
    }

    /// Assembles a node without capturing anything.
    pub fn from_parts(
        cause: Cause,
        args: Vec<Arg>,
        site: Option<Site>,
        next: Option<Chain>,
    ) -> Chain {
        Chain {
            cause,
            args,
            site,
            next: next.map(Box::new),
        }
    }

    /// Splits the head node into its parts.
    pub fn into_parts(mut self) -> (Cause, Vec<Arg>, Option<Site>, Option<Chain>) {
        let next = self.next.take().map(|next| *next);
        let (cause, args) = self.take_payload();
        (cause, args, self.site.take(), next)
    }

    /// Puts a new head in front of this chain.
    ///
    /// The head is built from `source` and records the caller's site. When
    /// `source` is itself a chain only its last (oldest) node's cause and
    /// arguments are used. When `source` is `None` the result is `None` and
    /// this chain is dropped.
    #[track_caller]
    pub fn push(self, source: impl IntoSource) -> Option<Chain> {
        let (cause, args) = match source.into_source()? {
            Source::Chain(chain) => chain.into_oldest_payload(),
            Source::Message(message) => (Cause::Native(message), Vec::new()),
            Source::Foreign(foreign) => (Cause::Native(foreign.into_message()), Vec::new()),
        };
        let head = Self::from_parts(cause, args, Site::capture(), Some(self));
        trace!(depth = head.len(), "pushed error onto chain");
        Some(head)
    }

    /// Records that this error passed through the caller: a new head with
    /// the same cause and arguments and the caller's site.
    #[track_caller]
    pub fn forward(self) -> Chain {
        let head = Self::from_parts(
            self.cause.clone(),
            self.args.clone(),
            Site::capture(),
            Some(self),
        );
        trace!(depth = head.len(), "forwarded chain");
        head
    }

    /// Splices `older` behind the last node of this chain.
    pub fn append(self, older: Chain) -> Chain {
        let mut nodes = self.unlink();
        let mut tail = older;
        while let Some(mut node) = nodes.pop() {
            node.next = Some(Box::new(tail));
            tail = node;
        }
        tail
    }

    /// Links detached `older` nodes, newest first, behind `head`.
    pub(crate) fn link(mut head: Chain, mut older: Vec<Chain>) -> Chain {
        let mut tail = None;
        while let Some(mut node) = older.pop() {
            node.next = tail;
            tail = Some(Box::new(node));
        }
        head.next = tail;
        head
    }

    fn detached(&self) -> Chain {
        Chain {
            cause: self.cause.clone(),
            args: self.args.clone(),
            site: self.site.clone(),
            next: None,
        }
    }

    /// True when this node's unformatted message equals `other`'s message.
    /// Sites, arguments and the rest of the chain are not compared.
    pub fn equal<T: AsMessage + ?Sized>(&self, other: &T) -> bool {
        other
            .message()
            .is_some_and(|message| self.cause_message() == message)
    }

    /// Depth of the first node equal to `target`, 0 being the head.
    pub fn find<T: AsMessage + ?Sized>(&self, target: &T) -> Option<usize> {
        let message = target.message()?;
        self.iter()
            .position(|node| node.cause_message() == message)
    }

    /// True when this node's formatted message contains `needle`. An empty
    /// needle never matches.
    pub fn contains(&self, needle: &str) -> bool {
        !needle.is_empty() && self.formatted().contains(needle)
    }

    /// Depth of the first node whose formatted message contains `needle`.
    pub fn find_str(&self, needle: &str) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        self.iter().position(|node| node.contains(needle))
    }

    /// One line per node, newest first, each terminated by a newline.
    pub fn trace(&self) -> String {
        let mut out = String::new();
        for node in self {
            out.push_str(&node.to_string());
            out.push('\n');
        }
        out
    }

    /// Deep copy of the whole chain.
    pub fn copy(&self) -> Chain {
        self.clone()
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The unformatted message of this node.
    pub fn cause_message(&self) -> Cow<'_, str> {
        self.cause.message()
    }

    /// The message of this node with its arguments substituted.
    pub fn formatted(&self) -> String {
        format_template(&self.cause_message(), &self.args)
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }

    /// False when the site could not be captured; rendering then omits it.
    pub fn has_debug_info(&self) -> bool {
        self.site.is_some()
    }

    pub fn function(&self) -> Option<&str> {
        self.site.as_ref().map(Site::function)
    }

    pub fn file(&self) -> Option<&str> {
        self.site.as_ref().map(Site::file)
    }

    pub fn line(&self) -> Option<u32> {
        self.site.as_ref().map(Site::line)
    }

    /// The next (older) node.
    pub fn next(&self) -> Option<&Chain> {
        self.next.as_deref()
    }

    /// The oldest node.
    pub fn last(&self) -> &Chain {
        let mut node = self;
        while let Some(next) = node.next() {
            node = next;
        }
        node
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Walks the nodes from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter { node: Some(self) }
    }

    fn into_oldest_payload(mut self) -> (Cause, Vec<Arg>) {
        while let Some(next) = self.next.take() {
            self = *next;
        }
        self.take_payload()
    }

    fn take_payload(&mut self) -> (Cause, Vec<Arg>) {
        let cause = mem::replace(&mut self.cause, Cause::Native(String::new()));
        (cause, mem::take(&mut self.args))
    }

    /// Detaches every node, head first.
    fn unlink(self) -> Vec<Chain> {
        let mut nodes = Vec::new();
        let mut current = Some(self);
        while let Some(mut node) = current {
            current = node.next.take().map(|next| *next);
            nodes.push(node);
        }
        nodes
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

impl Clone for Chain {
    fn clone(&self) -> Self {
        let older = self.iter().skip(1).map(Chain::detached).collect();
        Self::link(self.detached(), older)
    }
}

impl fmt::Debug for Chain {
    /// The nodes as a list, newest first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(NodeDebug)).finish()
    }
}

struct NodeDebug<'a>(&'a Chain);

impl fmt::Debug for NodeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("cause", &self.0.cause)
            .field("args", &self.0.args)
            .field("site", &self.0.site)
            .finish()
    }
}

impl fmt::Display for Chain {
    /// `function - file - line: message`, or just the message without a site.
    ///
    /// The alternate form `{:#}` spells out the field names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.formatted();
        match (&self.site, f.alternate()) {
            (Some(site), false) => write!(f, "{site}: {message}"),
            (Some(site), true) => write!(
                f,
                "function: {} - file: {} - line: {} - error: {message}",
                site.function(),
                site.file(),
                site.line()
            ),
            (None, false) => f.write_str(&message),
            (None, true) => write!(f, "{message:?}"),
        }
    }
}

impl Error for Chain {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match (&self.next, &self.cause) {
            (Some(next), _) => Some(&**next),
            (None, Cause::Nested(inner)) => Some(&**inner),
            (None, Cause::Native(_)) => None,
        }
    }
}

impl AsMessage for Chain {
    fn message(&self) -> Option<Cow<'_, str>> {
        Some(self.cause_message())
    }

    fn rendered(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.formatted()))
    }
}

/// Iterator over the nodes of a chain, newest first.
pub struct Iter<'a> {
    node: Option<&'a Chain>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Chain;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.next();
        Some(node)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Chain;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::source::Foreign;
    use pretty_assertions::assert_eq;

    fn lines(chain: &Chain) -> Vec<String> {
        chain.iter().map(Chain::formatted).collect()
    }

    #[test]
    fn new_wraps_messages_and_foreign_errors() {
        let plain = Chain::new("string error");
        assert_eq!(plain.cause_message(), "string error");
        assert_eq!(plain.len(), 1);

        let io = std::io::Error::other("dummy error");
        let wrapped = Chain::new(Source::from(io));
        assert_eq!(wrapped.cause_message(), "dummy error");
    }

    #[test]
    fn new_records_the_caller_site() {
        let line = line!() + 1;
        let chain = Chain::new("dummy error");
        assert!(chain.has_debug_info());
        assert_eq!(chain.file(), Some("src/chain.rs"));
        assert_eq!(chain.line(), Some(line));
        assert!(
            chain
                .function()
                .is_some_and(|name| name.ends_with("new_records_the_caller_site"))
        );
        assert_eq!(
            chain.to_string(),
            format!("{} - src/chain.rs - {line}: dummy error", chain.function().unwrap_or_default())
        );
    }

    #[test]
    fn new_on_a_chain_is_identity() {
        let original = Chain::new("once");
        let line = original.line();
        let again = Chain::with_args(original, args![1]);
        assert_eq!(again.len(), 1);
        assert_eq!(again.line(), line);
        assert!(again.args().is_empty());
    }

    #[test]
    fn push_orders_newest_first() {
        let chain = Chain::new("e0")
            .push("e1")
            .and_then(|chain| chain.push("e2"))
            .and_then(|chain| chain.push("e3"))
            .expect("no push was suppressed");
        assert_eq!(lines(&chain), ["e3", "e2", "e1", "e0"]);
    }

    #[test]
    fn push_none_discards_the_chain() {
        assert!(Chain::new("e0").push(None::<&str>).is_none());
    }

    #[test]
    fn push_chain_uses_its_oldest_node() {
        let other = Chain::with_args("oldest {}", args![1])
            .push("newer")
            .expect("pushed");
        let chain = Chain::new("base").push(other).expect("pushed");
        assert_eq!(lines(&chain), ["oldest 1", "base"]);
    }

    #[test]
    fn push_captures_a_fresh_site() {
        let base = Chain::new("base");
        let line = line!() + 1;
        let chain = base.push(Foreign::new("foreign")).expect("pushed");
        assert_eq!(chain.line(), Some(line));
    }

    #[test]
    fn forward_keeps_message_and_moves_site() {
        let chain = Chain::with_args("code {}", args![7]);
        let first = chain.line();
        let forwarded = chain.forward();
        assert_eq!(forwarded.formatted(), "code 7");
        assert_eq!(forwarded.next().map(Chain::formatted).as_deref(), Some("code 7"));
        assert_ne!(forwarded.line(), first);
    }

    #[test]
    fn append_splices_behind_tail() {
        let newer = Chain::new("b0").push("b1").expect("pushed");
        let older = Chain::new("a0").push("a1").expect("pushed");
        assert_eq!(lines(&newer.append(older)), ["b1", "b0", "a1", "a0"]);
    }

    #[test]
    fn equal_ignores_sites_and_arguments() {
        let a = Chain::with_args("failed {}", args![1]);
        let b = Chain::with_args("failed {}", args![2]);
        assert!(a.equal(&b));
        assert!(a.equal("failed {}"));
        assert!(!a.equal("failed 1"));
        assert!(!a.equal(&None::<Chain>));
    }

    #[test]
    fn find_and_find_str_depths() {
        let chain = Chain::new("dummy error")
            .push("string error")
            .and_then(|chain| chain.push("silly error"))
            .and_then(|chain| chain.push("another error"))
            .and_then(|chain| chain.push("still a error"))
            .expect("pushed");
        assert_eq!(chain.find("silly error"), Some(2));
        assert_eq!(chain.find("string error"), Some(3));
        assert_eq!(chain.find("not found"), None);
        assert_eq!(chain.find_str("string"), Some(3));
        assert_eq!(chain.find_str("a error"), Some(0));
        assert_eq!(chain.find_str(""), None);
    }

    #[test]
    fn contains_uses_the_formatted_message() {
        let chain = Chain::with_args("timeout after {}ms", args![250]);
        assert!(chain.contains("250ms"));
        assert!(!chain.contains("{}"));
        assert!(!chain.contains(""));
    }

    #[test]
    fn trace_without_debug_info_is_bare() {
        let chain = Chain::from_parts(
            Cause::Native("outer".into()),
            Vec::new(),
            None,
            Some(Chain::from_parts(Cause::Native("inner {}".into()), args![1], None, None)),
        );
        assert_eq!(chain.trace(), "outer\ninner 1\n");
    }

    #[test]
    fn alternate_display_spells_out_fields() {
        let site = Site::new("app::run", "src/main.rs", 9);
        let chain = Chain::from_parts(Cause::Native("boom".into()), Vec::new(), Some(site), None);
        assert_eq!(
            format!("{chain:#}"),
            "function: app::run - file: src/main.rs - line: 9 - error: boom"
        );
        let bare = Chain::from_parts(Cause::Native("boom".into()), Vec::new(), None, None);
        assert_eq!(format!("{bare:#}"), "\"boom\"");
    }

    #[test]
    fn nested_cause_renders_inner_head_line() {
        let site = Site::new("remote::op", "src/op.rs", 3);
        let inner = Chain::from_parts(Cause::Native("disk".into()), Vec::new(), Some(site), None);
        let outer = Chain::nest(inner, Vec::new());
        assert_eq!(outer.cause_message(), "remote::op - src/op.rs - 3: disk");
        assert!(outer.source().is_some());
    }

    #[test]
    fn error_source_walks_the_chain() {
        let chain = Chain::new("root").push("top").expect("pushed");
        let source = chain.source().map(ToString::to_string);
        assert!(source.is_some_and(|text| text.ends_with(": root")));
    }

    #[test]
    fn last_and_len() {
        let chain = Chain::new("first").push("second").expect("pushed");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.last().cause_message(), "first");
    }
}
