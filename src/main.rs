//! FieldLineage CLI - Trace column-level data lineage
//!
//! Usage:
//!   fieldlineage init [--db <path>]
//!   fieldlineage load <edges.json> [--db <path>]
//!   fieldlineage trace <ns.dataset.field> [--direction <dir>] [--depth <n>] [--summary]
//!   fieldlineage impact <ns.dataset.field> [--depth <n>] [--classify]
//!   fieldlineage deactivate <edge-id>
//!   fieldlineage stats
//!
//! Examples:
//!   fieldlineage trace warehouse.fact_sales.revenue --direction upstream --depth 5
//!   fieldlineage impact staging.orders.amount --classify
//!   fieldlineage load edges.json --db /var/lib/lineage.db

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use fieldlineage::config::LineageConfig;
use fieldlineage::error::{LineageError, Result};
use fieldlineage::graph::impact::{CriticalityPolicy, ImpactAnalysis};
use fieldlineage::graph::store::EdgeStore;
use fieldlineage::graph::traversal::LineageTraversal;
use fieldlineage::observability::{self, Metrics};
use fieldlineage::types::{make_edge_id, Direction, FieldRef, LineageEdge};

#[derive(Parser)]
#[command(name = "fieldlineage")]
#[command(about = "FieldLineage - Column-level data lineage tracing and impact analysis")]
#[command(version)]
struct Cli {
    /// Path to the SQLite edge store (overrides the config file)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the edge store schema (safe to run on an existing store)
    Init,

    /// Load lineage edges from a JSON file (array of edges, upserted by id)
    Load {
        /// Path to the JSON edge file
        file: PathBuf,
    },

    /// Trace lineage out of a field reference
    Trace {
        /// Field reference as namespace.dataset.field
        field: String,

        /// Traversal direction
        #[arg(long, default_value = "upstream")]
        direction: DirectionArg,

        /// Maximum traversal depth (config default when omitted, always
        /// clamped to the configured cap)
        #[arg(short, long)]
        depth: Option<u32>,

        /// Print counts only instead of the full graph
        #[arg(long)]
        summary: bool,
    },

    /// Report the downstream blast radius of a field
    Impact {
        /// Field reference as namespace.dataset.field
        field: String,

        /// Maximum traversal depth
        #[arg(short, long)]
        depth: Option<u32>,

        /// Tag impacted datasets with the criticality markers
        #[arg(long)]
        classify: bool,
    },

    /// Re-enable a previously deactivated edge
    Activate {
        /// Edge id
        id: String,
    },

    /// Soft-delete an edge so traversals skip it
    Deactivate {
        /// Edge id
        id: String,
    },

    /// Print edge store statistics
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    /// Toward the sources this field is computed from
    Upstream,
    /// Toward the fields computed from this one
    Downstream,
    /// Both directions merged into one result
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Upstream => Direction::Upstream,
            DirectionArg::Downstream => Direction::Downstream,
            DirectionArg::Both => Direction::Both,
        }
    }
}

fn main() -> ExitCode {
    observability::init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let db_path = cli.db.unwrap_or_else(|| config.database_path.clone());

    match cli.command {
        Commands::Init => cmd_init(&db_path),
        Commands::Load { file } => cmd_load(&db_path, &file),
        Commands::Trace {
            field,
            direction,
            depth,
            summary,
        } => cmd_trace(&db_path, &config, &field, direction.into(), depth, summary),
        Commands::Impact {
            field,
            depth,
            classify,
        } => cmd_impact(&db_path, &config, &field, depth, classify),
        Commands::Activate { id } => cmd_set_active(&db_path, &id, true),
        Commands::Deactivate { id } => cmd_set_active(&db_path, &id, false),
        Commands::Stats => cmd_stats(&db_path),
    }
}

fn load_config(path: Option<&Path>) -> Result<LineageConfig> {
    match path {
        Some(p) => LineageConfig::load(p),
        None => Ok(LineageConfig::default()),
    }
}

fn parse_field(raw: &str) -> Result<FieldRef> {
    FieldRef::parse(raw).ok_or_else(|| LineageError::MalformedFieldRef(raw.to_string()))
}

fn cmd_init(db_path: &str) -> Result<()> {
    let store = EdgeStore::new(db_path)?;
    let stats = store.stats()?;
    println!("initialized {} ({} edges)", db_path, stats.edges);
    Ok(())
}

fn cmd_load(db_path: &str, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file)?;
    let mut edges: Vec<LineageEdge> = serde_json::from_str(&raw)?;

    // Fill in what the file may leave out: content-addressed ids and a
    // load timestamp.
    let mut generated = 0usize;
    for edge in &mut edges {
        if edge.id.trim().is_empty() {
            edge.id = make_edge_id(&edge.source, &edge.target, edge.transformation_type);
            generated += 1;
        }
        if edge.created_at.is_none() {
            edge.created_at = Some(Utc::now());
        }
    }

    let store = EdgeStore::new(db_path)?;
    store.upsert_edges(&edges)?;
    println!(
        "loaded {} edges into {} ({} ids generated)",
        edges.len(),
        db_path,
        generated
    );
    Ok(())
}

fn cmd_trace(
    db_path: &str,
    config: &LineageConfig,
    field: &str,
    direction: Direction,
    depth: Option<u32>,
    summary: bool,
) -> Result<()> {
    let start = parse_field(field)?;
    let max_depth = config.clamp_depth(depth.unwrap_or(config.default_max_depth));

    let store = EdgeStore::new(db_path)?;
    let traversal = LineageTraversal::new(&store);

    if summary {
        let counts = traversal.traverse_summary(&start, direction, max_depth)?;
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    let started = Instant::now();
    let result = traversal.traverse(&start, direction, max_depth)?;

    let mut metrics = Metrics::new();
    metrics.record_traversal(result.edges.len(), result.nodes.len(), started.elapsed());
    tracing::debug!(metrics = %metrics.to_json(), "trace finished");

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_impact(
    db_path: &str,
    config: &LineageConfig,
    field: &str,
    depth: Option<u32>,
    classify: bool,
) -> Result<()> {
    let start = parse_field(field)?;
    let max_depth = config.clamp_depth(depth.unwrap_or(config.default_max_depth));

    let store = EdgeStore::new(db_path)?;
    let analysis = ImpactAnalysis::new(&store);

    let report = if classify {
        let policy = if config.critical_dataset_patterns.is_empty() {
            CriticalityPolicy::default()
        } else {
            CriticalityPolicy::new(&config.critical_dataset_patterns)?
        };
        analysis.impact_classified(&start, max_depth, |node| policy.is_critical(node))?
    } else {
        analysis.impact(&start, max_depth)?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_set_active(db_path: &str, id: &str, active: bool) -> Result<()> {
    let store = EdgeStore::new(db_path)?;
    let changed = store.set_active(id, active)?;
    if !changed {
        return Err(LineageError::InvalidEdge {
            id: id.to_string(),
            reason: "no such edge in the store".to_string(),
        });
    }
    println!(
        "edge {} is now {}",
        id,
        if active { "active" } else { "inactive" }
    );
    Ok(())
}

fn cmd_stats(db_path: &str) -> Result<()> {
    let store = EdgeStore::new(db_path)?;
    let stats = store.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
