//! Message rendering.
//!
//! Templates use positional placeholders: `{}` takes the next argument, `{N}`
//! takes argument `N`, and an optional spec after `:` selects `?` (debug) or
//! `x`/`X` (hex). `{{` and `}}` are literal braces. Rendering never fails:
//! a placeholder that cannot be filled is kept in the output followed by a
//! marker.

use crate::arg::Arg;
use crate::source::AsMessage;

/// The placeholder refers to an argument that was not supplied.
pub const MISSING: &str = "(!MISSING)";
/// The placeholder spec is unknown or does not apply to the argument.
pub const BAD_VERB: &str = "(!BADVERB)";
/// A `{` was never closed.
pub const NO_VERB: &str = "(!NOVERB)";

/// Substitutes `args` into `template`.
///
/// Arguments no placeholder consumed are appended as `(!EXTRA a, b)`.
pub fn format_template(template: &str, args: &[Arg]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut used = vec![false; args.len()];
    let mut next_index = 0;
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix('}') {
            // A stray or doubled closing brace renders as a single one.
            out.push('}');
            rest = after.strip_prefix('}').unwrap_or(after);
            continue;
        }

        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            out.push_str(NO_VERB);
            rest = "";
            break;
        };
        let placeholder = &tail[..=close];
        let (position, spec) = match tail[1..close].split_once(':') {
            Some((position, spec)) => (position.trim(), spec.trim()),
            None => (tail[1..close].trim(), ""),
        };

        let index = if position.is_empty() {
            let index = next_index;
            next_index += 1;
            Some(index)
        } else {
            position.parse::<usize>().ok()
        };

        match index {
            None => {
                out.push_str(placeholder);
                out.push_str(BAD_VERB);
            }
            Some(index) => match args.get(index) {
                None => {
                    out.push_str(placeholder);
                    out.push_str(MISSING);
                }
                Some(arg) => {
                    used[index] = true;
                    match arg.render(spec) {
                        Some(text) => out.push_str(&text),
                        None => {
                            out.push_str(placeholder);
                            out.push_str(BAD_VERB);
                        }
                    }
                }
            },
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);

    let extra: Vec<String> = args
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(arg, _)| arg.to_string())
        .collect();
    if !extra.is_empty() {
        out.push_str("(!EXTRA ");
        out.push_str(&extra.join(", "));
        out.push(')');
    }
    out
}

/// The message of `source` as a sentence: first letter upper-cased and a
/// trailing period ensured. Chains contribute their unformatted head message.
///
/// Absent or empty messages yield an empty string.
pub fn phrase<T: AsMessage + ?Sized>(source: &T) -> String {
    let Some(message) = source.message() else {
        return String::new();
    };
    let mut chars = message.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut out: String = first.to_uppercase().collect();
    out.push_str(chars.as_str());
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

/// The message of `source`, or an empty string when there is none.
pub fn message_of<T: AsMessage + ?Sized>(source: &T) -> String {
    source
        .message()
        .map(|message| message.into_owned())
        .unwrap_or_default()
}
