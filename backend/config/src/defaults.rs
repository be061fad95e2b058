//! Default values for unset config fields.

use crate::schema::{
    CanvasPilotConfig, DispatchConfig, LoggingConfig, ProviderConfig, StoreConfig,
    SupervisorConfig,
};

/// Provider used when `provider.kind` is unset.
pub const DEFAULT_PROVIDER: &str = "anthropic";
/// Per HTTP request; kept below the command timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_CONTEXT_OBJECTS: usize = 100;
pub const DEFAULT_MAX_COUNT: u64 = 200;
/// Wall-clock limit for a whole command.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Model used when the provider section names none.
pub fn default_model(kind: &str) -> &'static str {
    match kind {
        "openai" => "gpt-4o-mini",
        "openrouter" => "anthropic/claude-3.5-sonnet",
        "ollama" => "llama3.1",
        "mock" => "mock",
        _ => "claude-3-5-sonnet-latest",
    }
}

/// Fill every unset field. Values already present are kept.
pub fn apply_all_defaults(config: CanvasPilotConfig) -> CanvasPilotConfig {
    let config = apply_provider_defaults(config);
    let config = apply_dispatch_defaults(config);
    let config = apply_supervisor_defaults(config);
    let config = apply_store_defaults(config);
    apply_logging_defaults(config)
}

fn apply_provider_defaults(mut config: CanvasPilotConfig) -> CanvasPilotConfig {
    let provider = config.provider.get_or_insert_with(ProviderConfig::default);
    let kind = provider
        .kind
        .get_or_insert_with(|| DEFAULT_PROVIDER.to_string())
        .clone();
    if provider.model.is_none() {
        provider.model = Some(default_model(&kind).to_string());
    }
    provider
        .request_timeout_secs
        .get_or_insert(DEFAULT_REQUEST_TIMEOUT_SECS);
    config
}

fn apply_dispatch_defaults(mut config: CanvasPilotConfig) -> CanvasPilotConfig {
    let dispatch = config.dispatch.get_or_insert_with(DispatchConfig::default);
    dispatch.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    dispatch.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    dispatch
        .max_context_objects
        .get_or_insert(DEFAULT_MAX_CONTEXT_OBJECTS);
    dispatch.max_count.get_or_insert(DEFAULT_MAX_COUNT);
    config
}

fn apply_supervisor_defaults(mut config: CanvasPilotConfig) -> CanvasPilotConfig {
    let supervisor = config
        .supervisor
        .get_or_insert_with(SupervisorConfig::default);
    supervisor
        .command_timeout_secs
        .get_or_insert(DEFAULT_COMMAND_TIMEOUT_SECS);
    supervisor
        .history_capacity
        .get_or_insert(DEFAULT_HISTORY_CAPACITY);
    config
}

/// Memory unless configured otherwise; there is no default path.
fn apply_store_defaults(mut config: CanvasPilotConfig) -> CanvasPilotConfig {
    let store = config.store.get_or_insert_with(StoreConfig::default);
    store.backend.get_or_insert_with(|| "memory".to_string());
    config
}

fn apply_logging_defaults(mut config: CanvasPilotConfig) -> CanvasPilotConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| "info".to_string());
    logging.format.get_or_insert_with(|| "pretty".to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(CanvasPilotConfig::default());
        let provider = cfg.provider.unwrap();
        assert_eq!(provider.kind.as_deref(), Some("anthropic"));
        assert_eq!(provider.model.as_deref(), Some("claude-3-5-sonnet-latest"));
        assert_eq!(cfg.supervisor.unwrap().command_timeout_secs, Some(30));
        assert_eq!(cfg.dispatch.unwrap().max_count, Some(DEFAULT_MAX_COUNT));
        assert_eq!(cfg.store.unwrap().backend.as_deref(), Some("memory"));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn model_follows_provider_kind() {
        let cfg = CanvasPilotConfig {
            provider: Some(ProviderConfig {
                kind: Some("ollama".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.provider.unwrap().model.as_deref(), Some("llama3.1"));
    }

    #[test]
    fn keeps_user_values() {
        let cfg = CanvasPilotConfig {
            supervisor: Some(SupervisorConfig {
                command_timeout_secs: Some(5),
                history_capacity: None,
            }),
            ..Default::default()
        };
        let sup = apply_all_defaults(cfg).supervisor.unwrap();
        assert_eq!(sup.command_timeout_secs, Some(5));
        assert_eq!(sup.history_capacity, Some(DEFAULT_HISTORY_CAPACITY));
    }
}
