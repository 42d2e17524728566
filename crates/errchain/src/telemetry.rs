use errchain_core::Chain;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for the logging subsystem.
#[derive(Debug)]
pub struct TelemetryConfig {
    service_name: String,
    log_level: String,
    ansi: bool,
}

impl TelemetryConfig {
    /// Creates a new configuration builder with default settings.
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Installs a global `tracing` subscriber with this configuration.
    ///
    /// Fails if a subscriber is already installed.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let filter = EnvFilter::try_new(&self.log_level)?;

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(self.ansi).with_target(true))
            .try_init()?;

        tracing::info!(service = %self.service_name, level = %self.log_level, "telemetry initialized");
        Ok(())
    }
}

/// Builder for `TelemetryConfig`.
#[derive(Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    log_level: Option<String>,
    ansi: Option<bool>,
}

impl TelemetryConfigBuilder {
    /// Sets the service name attached to the startup event.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the filter directive (default: "info").
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Enables terminal colors (default: true).
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = Some(ansi);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self
                .service_name
                .unwrap_or_else(|| "errchain-unknown".to_string()),
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            ansi: self.ansi.unwrap_or(true),
        }
    }

    /// Shorthand for `build().init()`.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.build().init()
    }
}

/// Emits one `ERROR` event per node, newest first.
pub fn log_chain(chain: &Chain) {
    for (depth, node) in chain.iter().enumerate() {
        let message = node.formatted();
        match node.site() {
            Some(site) => error!(
                depth,
                function = site.function(),
                file = site.file(),
                line = site.line(),
                "{message}"
            ),
            None => error!(depth, "{message}"),
        }
    }
}
