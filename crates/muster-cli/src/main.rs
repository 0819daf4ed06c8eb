//! muster CLI
//!
//! Command line interface for the muster asset inventory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;

mod config;
mod views;

use config::AppConfig;
use muster_core::attrs::EntityAttrs;
use muster_core::model::{Entity, EntityKind};
use muster_core::ops::{self, Reconciler, SearchBatches, StateFilter};
use muster_core::source::Source;
use muster_core::store::{EntityStore, FileStore};
use muster_sources::{CloudSource, CuratedSource, HttpGateway};

#[derive(Parser)]
#[command(name = "muster")]
#[command(version)]
#[command(about = "Command line inventory of cloud and risk management assets", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the inventory with the configured sources
    Update {
        /// Kinds to update (default: all)
        kinds: Vec<EntityKind>,
    },

    /// List inventory entities
    List {
        /// Kinds to list (default: all)
        kinds: Vec<EntityKind>,

        /// Include terminated entities
        #[arg(short, long)]
        all: bool,

        /// Show only terminated entities
        #[arg(short, long)]
        inactive: bool,
    },

    /// Search entities whose attributes match a regular expression
    Search {
        /// Regular expression matched against attribute values
        regexp: String,

        /// Kinds to search (default: all)
        kinds: Vec<EntityKind>,

        /// Include terminated entities
        #[arg(short, long)]
        all: bool,

        /// Show only terminated entities
        #[arg(short, long)]
        inactive: bool,
    },

    /// Print every attribute of one entity
    Print {
        /// Entity id
        id: String,
    },

    /// List entities no service or project uses
    Unused {
        /// Kinds to consider (default: every candidate kind)
        kinds: Vec<EntityKind>,
    },

    /// Add a curated entity
    Add {
        /// Kind of the new entity
        kind: EntityKind,

        /// Entity name
        #[arg(short, long)]
        name: Option<String>,

        /// Entity id (generated for curated kinds when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Initial state
        #[arg(short, long, default_value = "unknown")]
        state: String,

        /// Additional attribute as key=value (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        field: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {:#}", "Error".red(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = AppConfig::load_or_default(&config_path)?;

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config.logging.level()
    };
    muster_observability::init_logging_with_config(muster_observability::LoggingConfig {
        level,
        json_format: config.logging.json_format,
        ..Default::default()
    });

    let store = FileStore::open(&config.inventory)
        .await
        .with_context(|| format!("Failed to open inventory {}", config.inventory.display()))?;

    match cli.command {
        Commands::Update { kinds } => cmd_update(&store, &config, &kinds).await,
        Commands::List {
            kinds,
            all,
            inactive,
        } => cmd_list(&store, &kinds, StateFilter { all, inactive }).await,
        Commands::Search {
            regexp,
            kinds,
            all,
            inactive,
        } => cmd_search(&store, regexp, &kinds, StateFilter { all, inactive }).await,
        Commands::Print { id } => cmd_print(&store, &id).await,
        Commands::Unused { kinds } => cmd_unused(&store, &kinds).await,
        Commands::Add {
            kind,
            name,
            id,
            state,
            field,
        } => cmd_add(&store, kind, name, id, &state, &field).await,
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "muster", "muster") {
        dirs.config_dir().join("muster.yaml")
    } else {
        PathBuf::from("muster.yaml")
    }
}

/// Build the source list named in the configuration, in order.
fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn Source>>> {
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();
    for name in &config.sources {
        match name.as_str() {
            "cloud" => {
                let gateway_config = config
                    .cloud
                    .clone()
                    .context("The cloud source is enabled but the config has no cloud section")?;
                let gateway = HttpGateway::new(gateway_config)?;
                sources.push(Arc::new(CloudSource::new(gateway)));
            }
            "curated" => sources.push(Arc::new(CuratedSource::new())),
            other => bail!("Unknown source in config: {}", other),
        }
    }
    Ok(sources)
}

async fn cmd_update(
    store: &dyn EntityStore,
    config: &AppConfig,
    kinds: &[EntityKind],
) -> Result<()> {
    let sources = build_sources(config)?;

    println!("{}", "Updating inventory...".cyan());
    let reconciler = Reconciler::new(sources);
    let report = reconciler.run(store, kinds).await?;

    views::print_run_report(&report);
    if report.source_errors > 0 {
        println!(
            "{}",
            "Some sources failed; their kinds kept the previous state.".yellow()
        );
    }
    Ok(())
}

async fn cmd_list(
    store: &dyn EntityStore,
    kinds: &[EntityKind],
    filter: StateFilter,
) -> Result<()> {
    let entities = ops::list_entities(store, kinds, filter).await?;
    views::print_entity_table(&entities);
    Ok(())
}

async fn cmd_search(
    store: &dyn EntityStore,
    regexp: String,
    kinds: &[EntityKind],
    filter: StateFilter,
) -> Result<()> {
    let mut batches = SearchBatches::new(store, regexp, kinds, filter);
    let mut table = views::SearchTable::new();
    while let Some(batch) = batches.next_batch().await? {
        table.print_batch(&batch);
    }
    Ok(())
}

async fn cmd_print(store: &dyn EntityStore, id: &str) -> Result<()> {
    let entity = ops::find_entity(store, id).await?;
    views::print_entity(&entity)
}

async fn cmd_unused(store: &dyn EntityStore, kinds: &[EntityKind]) -> Result<()> {
    let entities = ops::unused(store, kinds).await?;
    if entities.is_empty() {
        println!("{}", "Every entity is used by a service or project.".green());
        return Ok(());
    }
    views::print_entity_table(&entities);
    Ok(())
}

async fn cmd_add(
    store: &dyn EntityStore,
    kind: EntityKind,
    name: Option<String>,
    id: Option<String>,
    state: &str,
    fields: &[String],
) -> Result<()> {
    let id = match id {
        Some(id) => id,
        None if kind.is_curated() => ops::next_id(store, kind).await?,
        None => bail!(
            "--id is required for {} entities, their ids come from the provider",
            kind
        ),
    };

    let mut attrs = EntityAttrs::new();
    attrs.insert("id".to_string(), Value::String(id));
    attrs.insert("state".to_string(), Value::String(state.to_string()));
    if let Some(name) = name {
        attrs.insert("name".to_string(), Value::String(name));
    }
    for field in fields {
        let (key, value) = parse_field(field)?;
        attrs.insert(key, value);
    }

    let entity = Entity::from_attrs(kind, &attrs)?;
    let label = format!("{} {}", entity.kind(), entity.id());
    ops::add_entity(store, entity).await?;
    println!("{} {}", "Added".green(), label.cyan());
    Ok(())
}

/// Parse one `key=value` field. Values that parse as JSON (lists, booleans,
/// numbers) are taken as JSON, anything else as a plain string.
fn parse_field(field: &str) -> Result<(String, Value)> {
    let Some((key, value)) = field.split_once('=') else {
        bail!("Invalid field '{}', expected key=value", field);
    };
    let parsed = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), parsed))
}
