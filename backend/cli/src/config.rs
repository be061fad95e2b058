//! Turns a prepared `CanvasPilotConfig` into runtime components.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use canvaspilot_agent::DispatcherSettings;
use canvaspilot_config::defaults as cfg;
use canvaspilot_config::CanvasPilotConfig;
use canvaspilot_core::{CanvasId, ObjectStore, StoreError};
use canvaspilot_logging::{LogFormat, LoggerOptions};
use canvaspilot_planner::ProviderSettings;
use canvaspilot_store::{CanvasInfo, MemoryStore, SqliteStore};
use canvaspilot_supervisor::SupervisorSettings;

/// Runtime settings resolved from config. All fields are defaulted.
#[derive(Debug, Clone)]
pub struct Runtime {
    pub provider: ProviderSettings,
    pub dispatcher: DispatcherSettings,
    pub supervisor: SupervisorSettings,
    pub logger: LoggerOptions,
    pub store_backend: String,
    pub store_path: Option<PathBuf>,
}

impl Runtime {
    /// Expects a config that already went through `apply_all_defaults`.
    pub fn from_config(config: &CanvasPilotConfig) -> Result<Self> {
        let provider_cfg = config.provider.clone().unwrap_or_default();
        let kind = provider_cfg
            .kind
            .unwrap_or_else(|| cfg::DEFAULT_PROVIDER.to_string());
        let model = provider_cfg
            .model
            .unwrap_or_else(|| cfg::default_model(&kind).to_string());
        let mut provider = ProviderSettings::new(kind, model);
        provider.api_key = provider_cfg.api_key.filter(|k| !k.is_empty());
        provider.base_url = provider_cfg.base_url;
        provider.request_timeout = Duration::from_secs(
            provider_cfg
                .request_timeout_secs
                .unwrap_or(cfg::DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        let dispatch = config.dispatch.clone().unwrap_or_default();
        let dispatcher = DispatcherSettings {
            max_tokens: dispatch.max_tokens.unwrap_or(cfg::DEFAULT_MAX_TOKENS),
            temperature: dispatch.temperature.unwrap_or(cfg::DEFAULT_TEMPERATURE),
            max_context_objects: dispatch
                .max_context_objects
                .unwrap_or(cfg::DEFAULT_MAX_CONTEXT_OBJECTS),
            max_count: dispatch.max_count.unwrap_or(cfg::DEFAULT_MAX_COUNT),
        };

        let sup = config.supervisor.clone().unwrap_or_default();
        let supervisor = SupervisorSettings {
            command_timeout: Duration::from_secs(
                sup.command_timeout_secs
                    .unwrap_or(cfg::DEFAULT_COMMAND_TIMEOUT_SECS),
            ),
            history_capacity: sup.history_capacity.unwrap_or(cfg::DEFAULT_HISTORY_CAPACITY),
        };

        let logging = config.logging.clone().unwrap_or_default();
        let format_name = logging.format.unwrap_or_else(|| "pretty".to_string());
        let logger = LoggerOptions {
            level: logging.level.unwrap_or_else(|| "info".to_string()),
            format: LogFormat::parse(&format_name)
                .ok_or_else(|| anyhow!("unknown log format '{format_name}'"))?,
            log_dir: logging.dir.map(PathBuf::from),
        };

        let store = config.store.clone().unwrap_or_default();
        Ok(Self {
            provider,
            dispatcher,
            supervisor,
            logger,
            store_backend: store.backend.unwrap_or_else(|| "memory".to_string()),
            store_path: store.path.map(PathBuf::from),
        })
    }

    pub fn open_store(&self) -> Result<CanvasStore> {
        match self.store_backend.as_str() {
            "memory" => Ok(CanvasStore::Memory(Arc::new(MemoryStore::new()))),
            "sqlite" => {
                let path = self
                    .store_path
                    .as_ref()
                    .context("store.path is required for the sqlite backend")?;
                let store = SqliteStore::open(path)
                    .with_context(|| format!("Failed to open store at {}", path.display()))?;
                Ok(CanvasStore::Sqlite(Arc::new(store)))
            }
            other => bail!("unknown store backend '{other}'"),
        }
    }
}

/// The configured store, with canvas management alongside `ObjectStore`.
#[derive(Clone)]
pub enum CanvasStore {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

impl CanvasStore {
    pub fn objects(&self) -> Arc<dyn ObjectStore> {
        match self {
            CanvasStore::Memory(s) => s.clone(),
            CanvasStore::Sqlite(s) => s.clone(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, CanvasStore::Sqlite(_))
    }

    pub fn create_canvas(&self, name: &str) -> Result<CanvasId, StoreError> {
        match self {
            CanvasStore::Memory(s) => s.create_canvas(name),
            CanvasStore::Sqlite(s) => s.create_canvas(name),
        }
    }

    pub fn list_canvases(&self) -> Result<Vec<CanvasInfo>, StoreError> {
        match self {
            CanvasStore::Memory(s) => s.list_canvases(),
            CanvasStore::Sqlite(s) => s.list_canvases(),
        }
    }
}
