use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;
use lineage_api::{ApiError, BackendGraphPayload, GraphEnvelope, GraphQuery, LineageApi};
use lineage_app::{ExplorerSettings, LineageExplorer};
use lineage_core::{Direction, Entity, FilterPatch, NodeId, NodeKind, ViewLevel};
use lineage_events::Event;
use lineage_graph::{ExportFormat, Vec2};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SURFACE: Vec2 = Vec2 { x: 1200.0, y: 800.0 };

#[derive(Parser, Debug)]
#[command(name = "lineage", author, version, about = "Explore and export data lineage graphs", long_about = None)]
struct Cli {
    /// Settings file to use instead of the per-user one
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the lineage around an entity, print a summary and optionally export it
    Graph(GraphArgs),
    /// Search tables or columns by partial name
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// Focal entity id
    #[arg(short, long)]
    entity: String,

    #[arg(short, long, default_value = "table")]
    level: ViewLevel,

    /// Read the graph from a JSON file instead of the backend
    #[arg(short, long)]
    payload: Option<PathBuf>,

    #[arg(short, long)]
    depth: Option<u8>,

    /// upstream, downstream or both
    #[arg(long)]
    direction: Option<Direction>,

    /// Export format: png, jpg or svg
    #[arg(short, long)]
    format: Option<ExportFormat>,

    /// Directory exported images are written to
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Print upstream and downstream neighbours of this node
    #[arg(long)]
    detail: Option<String>,

    /// Print the laid-out graph as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    text: String,

    #[arg(short, long, default_value = "table")]
    level: ViewLevel,

    /// Search the nodes of a saved JSON payload instead of the backend
    #[arg(short, long)]
    payload: Option<PathBuf>,
}

/// Serves one saved payload for every graph request.
struct PayloadFile {
    payload: BackendGraphPayload,
}

impl PayloadFile {
    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?;
        let envelope: GraphEnvelope = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse payload {}", path.display()))?;
        Ok(Self {
            payload: envelope.into_payload(),
        })
    }
}

#[async_trait]
impl LineageApi for PayloadFile {
    async fn fetch_lineage_graph(
        &self,
        _kind: NodeKind,
        _entity_id: &NodeId,
        _query: &GraphQuery,
    ) -> Result<BackendGraphPayload, ApiError> {
        Ok(self.payload.clone())
    }

    async fn search_entities(
        &self,
        kind: NodeKind,
        partial_name: &str,
    ) -> Result<Vec<Entity>, ApiError> {
        let needle = partial_name.to_lowercase();
        Ok(self
            .payload
            .nodes
            .iter()
            .filter_map(|raw| {
                let name = raw.name.as_deref().or(raw.label.as_deref())?;
                let raw_kind = raw
                    .node_type
                    .as_deref()
                    .and_then(NodeKind::from_type_name)?;
                (raw_kind == kind && name.to_lowercase().contains(&needle))
                    .then(|| Entity::new(&raw.id, name, kind))
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => ExplorerSettings::load_from(path),
        None => ExplorerSettings::load(),
    };
    if let Some(base_url) = cli.base_url {
        settings.api.base_url = base_url;
    }

    match cli.command {
        Command::Graph(args) => run_graph(settings, args).await,
        Command::Search(args) => run_search(settings, args).await,
    }
}

fn build_explorer(settings: ExplorerSettings, payload: Option<&Path>) -> Result<LineageExplorer> {
    match payload {
        Some(path) => Ok(LineageExplorer::new(settings, Arc::new(PayloadFile::read(path)?))),
        None => LineageExplorer::with_http(settings).context("failed to create API client"),
    }
}

async fn run_graph(settings: ExplorerSettings, args: GraphArgs) -> Result<()> {
    let explorer = build_explorer(settings, args.payload.as_deref())?;
    let events = explorer.events();
    let level = args.level;
    explorer.mount_graph_view(level, SURFACE);

    let patch = FilterPatch {
        depth: args.depth,
        direction: args.direction,
        ..FilterPatch::default()
    };
    explorer.set_filters(level, patch).await?;

    let entity = Entity::new(args.entity.as_str(), args.entity.as_str(), level.entity_kind());
    let result = explorer.select_entity(level, &entity).await;
    report_events(&events);
    let graph = result?;

    let view = explorer.view(level);
    println!(
        "{} lineage of {}: {} nodes, {} edges (depth {}, direction {})",
        level,
        entity.id,
        graph.node_count(),
        graph.edge_count(),
        view.filters.depth,
        view.filters.direction
    );

    if args.json
        && let Some(render) = &view.render
    {
        println!("{}", serde_json::to_string_pretty(render.as_ref())?);
    }

    if let Some(node) = args.detail {
        match explorer.on_click(level, &NodeId::new(node.as_str())) {
            Some(detail) => {
                println!("{} ({})", detail.node.display_name, detail.node.kind.label());
                println!("  upstream:   {}", detail.upstream.join(", "));
                println!("  downstream: {}", detail.downstream.join(", "));
            }
            None => bail!("node {node} is not in the graph"),
        }
    }

    if let Some(format) = args.format {
        let image = explorer.export_image(format);
        report_events(&events);
        let path = image?
            .save_to(&args.out)
            .with_context(|| format!("failed to write into {}", args.out.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

async fn run_search(settings: ExplorerSettings, args: SearchArgs) -> Result<()> {
    let explorer = build_explorer(settings, args.payload.as_deref())?;
    let events = explorer.events();
    explorer.mount_graph_view(args.level, SURFACE);

    let result = explorer.search(args.level, &args.text).await;
    report_events(&events);
    let results = result?;

    if results.is_empty() {
        println!("No {} matches {:?}", args.level, args.text);
    }
    for entity in results {
        println!("{:>8}  {}", entity.id, entity.label());
    }
    Ok(())
}

/// Prints user-facing notifications that piled up on the bus.
fn report_events(events: &Receiver<Event>) {
    for event in events.try_iter() {
        match event {
            Event::ShowInfo { message } | Event::ShowSuccess { message } => {
                eprintln!("{message}")
            }
            Event::ShowWarning { message } => eprintln!("warning: {message}"),
            Event::ShowError { message } => eprintln!("error: {message}"),
            Event::GraphEmpty { level } => eprintln!("The {level} lineage is empty"),
            other => tracing::debug!("{:?}", other),
        }
    }
}
