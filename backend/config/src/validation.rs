//! Config validation with field paths.

use thiserror::Error;

use crate::schema::CanvasPilotConfig;

/// Provider kinds the planner knows how to build.
pub const PROVIDER_KINDS: &[&str] = &["anthropic", "openai", "openrouter", "ollama", "mock"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One problem, located by its dotted config path (e.g. `provider.kind`).
#[derive(Debug, Error)]
#[error("config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors make the config unusable; warnings are logged and tolerated.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    /// True when there are no errors. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a config after defaults have been applied.
pub fn validate(config: &CanvasPilotConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_provider(config, &mut report);
    validate_dispatch(config, &mut report);
    validate_supervisor(config, &mut report);
    validate_store(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_provider(config: &CanvasPilotConfig, report: &mut ValidationReport) {
    let Some(provider) = &config.provider else { return };
    if let Some(kind) = &provider.kind {
        if !PROVIDER_KINDS.contains(&kind.as_str()) {
            report.error(
                "provider.kind",
                format!("Unknown provider '{kind}'. Use one of: {}", PROVIDER_KINDS.join(", ")),
            );
        } else if matches!(kind.as_str(), "anthropic" | "openai" | "openrouter")
            && provider.api_key.as_deref().map_or(true, str::is_empty)
        {
            report.warn("provider.apiKey", "No API key set; commands will fail with a missing-credential error");
        }
    }
    if provider.request_timeout_secs == Some(0) {
        report.error("provider.requestTimeoutSecs", "requestTimeoutSecs must be > 0");
    }
    if let Some(url) = &provider.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("provider.baseUrl", "baseUrl must start with http:// or https://");
        }
    }
}

fn validate_dispatch(config: &CanvasPilotConfig, report: &mut ValidationReport) {
    let Some(dispatch) = &config.dispatch else { return };
    if dispatch.max_tokens == Some(0) {
        report.error("dispatch.maxTokens", "maxTokens must be > 0");
    }
    if let Some(t) = dispatch.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("dispatch.temperature", "temperature must be between 0 and 2");
        }
    }
    if dispatch.max_context_objects == Some(0) {
        report.warn("dispatch.maxContextObjects", "The model will not see any canvas objects");
    }
    match dispatch.max_count {
        Some(0) => report.error("dispatch.maxCount", "maxCount must be >= 1"),
        Some(n) if n > 1000 => report.warn("dispatch.maxCount", format!("maxCount {n} allows very large batches")),
        _ => {}
    }
}

fn validate_supervisor(config: &CanvasPilotConfig, report: &mut ValidationReport) {
    let Some(supervisor) = &config.supervisor else { return };
    if supervisor.command_timeout_secs == Some(0) {
        report.error("supervisor.commandTimeoutSecs", "commandTimeoutSecs must be > 0");
    }
    if let (Some(command), Some(request)) = (
        supervisor.command_timeout_secs,
        config.provider.as_ref().and_then(|p| p.request_timeout_secs),
    ) {
        if request >= command {
            report.warn(
                "provider.requestTimeoutSecs",
                "Provider timeout is not shorter than the command timeout; slow replies will surface as command timeouts",
            );
        }
    }
}

/// `sqlite` requires `store.path`.
fn validate_store(config: &CanvasPilotConfig, report: &mut ValidationReport) {
    let Some(store) = &config.store else { return };
    match store.backend.as_deref() {
        None | Some("memory") => {}
        Some("sqlite") => {
            if store.path.as_deref().map_or(true, str::is_empty) {
                report.error("store.path", "The sqlite backend requires a path");
            }
        }
        Some(other) => report.error(
            "store.backend",
            format!("Unknown store backend '{other}'. Use 'memory' or 'sqlite'"),
        ),
    }
}

fn validate_logging(config: &CanvasPilotConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.error("logging.level", format!("Unknown log level '{level}'"));
        }
    }
    if let Some(format) = &logging.format {
        if !matches!(format.as_str(), "pretty" | "json") {
            report.error("logging.format", "format must be 'pretty' or 'json'");
        }
    }
}
