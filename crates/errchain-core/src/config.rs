use once_cell::sync::OnceCell;

use crate::error::ConfigError;

static CAPTURE: OnceCell<CaptureConfig> = OnceCell::new();

/// Process-wide settings for call-site capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    enabled: bool,
    resolve_functions: bool,
    path_segments: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolve_functions: true,
            path_segments: 2,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration builder with default settings.
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    /// The installed configuration, or the default one if none was installed.
    pub fn current() -> &'static CaptureConfig {
        static DEFAULT: OnceCell<CaptureConfig> = OnceCell::new();
        CAPTURE
            .get()
            .unwrap_or_else(|| DEFAULT.get_or_init(CaptureConfig::default))
    }

    /// Installs this configuration for the whole process.
    ///
    /// Only the first call succeeds. Sites captured before installation used
    /// the default configuration.
    pub fn install(self) -> Result<(), ConfigError> {
        CAPTURE
            .set(self)
            .map_err(|_| ConfigError::AlreadyInstalled("capture configuration"))
    }

    /// Whether sites are captured at all. When false every node is built
    /// without debug info.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the enclosing function name is resolved from stack symbols.
    pub fn resolve_functions(&self) -> bool {
        self.resolve_functions
    }

    /// Number of trailing path components kept in the recorded file name.
    pub fn path_segments(&self) -> usize {
        self.path_segments
    }
}

/// Builder for `CaptureConfig`.
#[derive(Default)]
pub struct CaptureConfigBuilder {
    enabled: Option<bool>,
    resolve_functions: Option<bool>,
    path_segments: Option<usize>,
}

impl CaptureConfigBuilder {
    /// Turns capture on or off (default: on).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Turns function name resolution on or off (default: on).
    pub fn resolve_functions(mut self, resolve: bool) -> Self {
        self.resolve_functions = Some(resolve);
        self
    }

    /// Sets how many trailing path components are kept (default: 2, minimum 1).
    pub fn path_segments(mut self, segments: usize) -> Self {
        self.path_segments = Some(segments.max(1));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CaptureConfig {
        let defaults = CaptureConfig::default();
        CaptureConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            resolve_functions: self.resolve_functions.unwrap_or(defaults.resolve_functions),
            path_segments: self.path_segments.unwrap_or(defaults.path_segments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        assert_eq!(CaptureConfig::builder().build(), CaptureConfig::default());
    }

    #[test]
    fn path_segments_never_zero() {
        let config = CaptureConfig::builder().path_segments(0).build();
        assert_eq!(config.path_segments(), 1);
    }

    #[test]
    fn builder_overrides() {
        let config = CaptureConfig::builder()
            .enabled(false)
            .resolve_functions(false)
            .path_segments(3)
            .build();
        assert!(!config.enabled());
        assert!(!config.resolve_functions());
        assert_eq!(config.path_segments(), 3);
    }
}
