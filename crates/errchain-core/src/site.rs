use std::fmt;
use std::panic::Location;
use std::path::Path;

use tracing::debug;

use crate::config::CaptureConfig;

/// Rendered in place of the function name when symbols are unavailable.
pub const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Where a chain node was produced: enclosing function, shortened file path
/// and line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Site {
    function: String,
    file: String,
    line: u32,
}

impl Site {
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// Captures the site of the caller.
    ///
    /// Every function between the user's code and this call must be
    /// `#[track_caller]`, otherwise the recorded site is the innermost
    /// function that is not.
    ///
    /// Returns `None` when capture is disabled in [`CaptureConfig`].
    #[track_caller]
    pub fn capture() -> Option<Site> {
        Self::at(Location::caller())
    }

    /// Builds the site for a known source location, resolving the enclosing
    /// function from the current stack.
    pub fn at(location: &Location<'_>) -> Option<Site> {
        let config = CaptureConfig::current();
        if !config.enabled() {
            return None;
        }

        let function = if config.resolve_functions() {
            resolve_function(location.file(), location.line())
        } else {
            None
        };
        let function = function.unwrap_or_else(|| {
            debug!(
                file = location.file(),
                line = location.line(),
                "enclosing function could not be resolved"
            );
            UNKNOWN_FUNCTION.to_owned()
        });

        Some(Site {
            function,
            file: shorten(location.file(), config.path_segments()),
            line: location.line(),
        })
    }

    /// Captures a site by walking the stack.
    ///
    /// `skip` counts frames above the caller of `from_stack`: `0` records the
    /// function that calls `from_stack`, `1` its caller, and so on. This is for
    /// call paths where `#[track_caller]` does not propagate, such as closures
    /// and trait objects.
    ///
    /// Returns `None` when capture is disabled or the frame carries no debug
    /// information.
    #[inline(never)]
    pub fn from_stack(skip: usize) -> Option<Site> {
        let config = CaptureConfig::current();
        if !config.enabled() {
            return None;
        }

        let mut entered = false;
        let mut remaining = skip;
        let mut done = false;
        let mut found = None;

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                if done {
                    return;
                }
                let Some(name) = symbol.name().map(|name| format!("{name:#}")) else {
                    return;
                };
                let is_self = strip_closures(&name).ends_with("Site::from_stack");
                if !entered {
                    entered = is_self;
                    return;
                }
                if is_self {
                    return;
                }
                if remaining > 0 {
                    remaining -= 1;
                    return;
                }

                done = true;
                if let (Some(path), Some(line)) = (symbol.filename(), symbol.lineno()) {
                    let function = if config.resolve_functions() {
                        name
                    } else {
                        UNKNOWN_FUNCTION.to_owned()
                    };
                    found = Some(Site {
                        function,
                        file: shorten(&path.to_string_lossy(), config.path_segments()),
                        line,
                    });
                }
            });
            !done
        });

        if found.is_none() {
            debug!(skip, "no debug information for requested frame");
        }
        found
    }

    /// Fully qualified name of the enclosing function.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Trailing components of the source path, `/`-separated.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.function, self.file, self.line)
    }
}

/// Finds the stack symbol sitting at `file:line` and returns its name.
fn resolve_function(file: &str, line: u32) -> Option<String> {
    let target = Path::new(file);
    let mut found = None;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            if found.is_some() || symbol.lineno() != Some(line) {
                return;
            }
            if symbol.filename().is_some_and(|path| path.ends_with(target)) {
                found = symbol.name().map(|name| format!("{name:#}"));
            }
        });
        found.is_none()
    });

    found
}

fn strip_closures(name: &str) -> &str {
    let mut name = name;
    while let Some(outer) = name.strip_suffix("::{{closure}}") {
        name = outer;
    }
    name
}

/// Keeps the last `segments` components of `path`.
pub(crate) fn shorten(path: &str, segments: usize) -> String {
    let parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .collect();
    let keep = segments.max(1).min(parts.len());
    parts[parts.len() - keep..].join("/")
}
