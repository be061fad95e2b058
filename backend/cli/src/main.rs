mod config;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use uuid::Uuid;

use canvaspilot_agent::CommandDispatcher;
use canvaspilot_config::{config_dir, config_file_path, load_and_prepare, redact, write_config};
use canvaspilot_core::{canvas_tools, CommandRequest, DispatchError, ObjectId, Viewport};
use canvaspilot_logging::init_logger;
use canvaspilot_planner::ProviderRegistry;
use canvaspilot_supervisor::{canvas_messages, CanvasBus, CommandSupervisor};

use config::{CanvasStore, Runtime};
use terminal_output::{
    note_error, note_info, note_success, note_warn, object_columns, object_rows, print_outcome,
    render_table, Column,
};

#[derive(Parser)]
#[command(name = "canvaspilot")]
#[command(about = "canvaspilot: natural-language commands for a shared canvas")]
#[command(version)]
struct Cli {
    /// Config file (default: $CANVASPILOT_CONFIG_DIR/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command against a canvas
    Run {
        /// Natural-language command, e.g. "draw three red circles"
        text: String,

        /// Target canvas. A scratch canvas is created when omitted.
        #[arg(long)]
        canvas: Option<Uuid>,

        /// Selected object ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        select: Vec<ObjectId>,

        /// Current drawing colour
        #[arg(long, default_value = "#4A90D9")]
        color: String,

        /// Viewport as x,y,width,height
        #[arg(long, value_delimiter = ',', num_args = 4)]
        viewport: Option<Vec<f64>>,

        /// Provider to use instead of the configured one (e.g. "mock")
        #[arg(long)]
        provider: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage canvases
    Canvas {
        #[command(subcommand)]
        command: CanvasCommands,
    },
    /// List the tools offered to the model
    Tools {
        /// Include each tool's parameter schema
        #[arg(long)]
        schema: bool,
    },
    /// Inspect or initialize configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum CanvasCommands {
    /// Create a canvas and print its id
    Create { name: String },
    /// List canvases
    List,
    /// Show a canvas's objects
    Show {
        id: Uuid,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Load, validate and print the effective config (secrets redacted)
    Check,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    if let Commands::Config {
        command: ConfigCommands::Init,
    } = &cli.command
    {
        return init_config(&path).await;
    }

    let (config, report) = load_and_prepare(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    let runtime = Runtime::from_config(&config)?;
    init_logger(&runtime.logger)?;

    match cli.command {
        // `config init` returned before the config was loaded.
        Commands::Config { .. } => {
            let shown = serde_yaml::to_string(&redact(&serde_json::to_value(&config)?))
                .context("Failed to render config")?;
            print!("{shown}");
            for w in &report.warnings {
                note_warn(&format!("{}: {}", w.path, w.message));
            }
            for e in &report.errors {
                note_error(&format!("{}: {}", e.path, e.message));
            }
            if !report.is_valid() {
                bail!("config has {} error(s)", report.errors.len());
            }
            note_success(&format!("{} is valid", path.display()));
        }
        Commands::Tools { schema } => print_tools(schema)?,
        Commands::Canvas { command } => {
            if !report.is_valid() {
                bail!("config is invalid; run `canvaspilot config check`");
            }
            let store = runtime.open_store()?;
            if !store.is_persistent() {
                note_warn("store.backend is 'memory'; canvases do not outlive this process");
            }
            canvas_command(&store, command)?;
        }
        Commands::Run {
            text,
            canvas,
            select,
            color,
            viewport,
            provider,
            json,
        } => {
            if !report.is_valid() {
                bail!("config is invalid; run `canvaspilot config check`");
            }
            let mut request = CommandRequest::new(Uuid::nil(), text).with_selection(select);
            request.context.current_color = color;
            if let Some(v) = viewport {
                request.context.viewport = Viewport {
                    x: v[0],
                    y: v[1],
                    width: v[2],
                    height: v[3],
                    zoom: 1.0,
                };
            }
            run_command(&runtime, canvas, request, provider.as_deref(), json).await?;
        }
    }
    Ok(())
}

async fn init_config(path: &std::path::Path) -> Result<()> {
    if path.exists() {
        note_info(&format!("{} already exists; leaving it untouched", path.display()));
        return Ok(());
    }
    let config = canvaspilot_config::CanvasPilotConfig {
        provider: Some(canvaspilot_config::ProviderConfig {
            kind: Some("anthropic".to_string()),
            api_key: Some("${ANTHROPIC_API_KEY}".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    write_config(&config, path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}

fn print_tools(schema: bool) -> Result<()> {
    let tools = canvas_tools();
    if schema {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = tools
        .iter()
        .map(|t| vec![t.name.clone(), t.description.clone()])
        .collect();
    print!(
        "{}",
        render_table(&[Column::left("TOOL"), Column::left("DESCRIPTION")], &rows)
    );
    Ok(())
}

fn canvas_command(store: &CanvasStore, command: CanvasCommands) -> Result<()> {
    match command {
        CanvasCommands::Create { name } => {
            let id = store.create_canvas(&name)?;
            println!("{id}");
        }
        CanvasCommands::List => {
            let rows: Vec<Vec<String>> = store
                .list_canvases()?
                .into_iter()
                .map(|c| vec![c.id.to_string(), c.name, c.object_count.to_string()])
                .collect();
            print!(
                "{}",
                render_table(
                    &[Column::left("ID"), Column::left("NAME"), Column::right("OBJECTS")],
                    &rows
                )
            );
        }
        CanvasCommands::Show { id, json } => {
            let objects = store.objects().list_objects(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                print!("{}", render_table(&object_columns(), &object_rows(&objects)));
            }
        }
    }
    Ok(())
}

async fn run_command(
    runtime: &Runtime,
    canvas: Option<Uuid>,
    mut request: CommandRequest,
    provider: Option<&str>,
    json: bool,
) -> Result<()> {
    let store = runtime.open_store()?;
    request.canvas_id = match canvas {
        Some(id) => id,
        None => {
            let id = store.create_canvas("scratch")?;
            note_info(&format!("Created scratch canvas {id}"));
            id
        }
    };

    let registry = ProviderRegistry::from_settings(&runtime.provider)?;
    let provider = registry.select(provider.unwrap_or(&runtime.provider.kind))?;
    info!(provider = provider.name(), model = %runtime.provider.model, "Provider ready");
    let dispatcher = Arc::new(CommandDispatcher::new(
        provider,
        store.objects(),
        runtime.dispatcher.clone(),
    ));
    let supervisor = CommandSupervisor::new(dispatcher, runtime.supervisor.clone());

    let bus = CanvasBus::new();
    let mut updates = bus.subscribe(request.canvas_id);
    let canvas_id = request.canvas_id;

    let mut events = supervisor.subscribe();
    let handle = supervisor.submit(request);
    let command_id = handle.command_id;
    let watcher = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.command_id() != command_id {
                continue;
            }
            info!(%command_id, kind = event.kind(), "Command lifecycle");
            if event.is_terminal() {
                break;
            }
        }
    });
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let result = tokio::select! {
        result = handle.wait() => result,
        _ = &mut ctrl_c => {
            warn!(%command_id, "Interrupted; cancelling command");
            supervisor.cancel(command_id);
            Err(DispatchError::Cancelled)
        }
    };

    if tokio::time::timeout(Duration::from_secs(1), watcher).await.is_err() {
        warn!(%command_id, "No terminal lifecycle event observed");
    }

    match result {
        Ok(outcome) => {
            let published = bus.publish(canvas_messages(canvas_id, outcome.results()));
            let mut changes = 0;
            while updates.try_recv().is_ok() {
                changes += 1;
            }
            info!(published, changes, "Canvas updates fanned out");
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
            Ok(())
        }
        Err(err) => {
            note_error(&err.user_message());
            bail!(err)
        }
    }
}
