use clap::{Parser, Subcommand, ValueEnum};
use cli::{load_events, RunConfig};
use color_eyre::eyre::{eyre, Result};
use labelkit::{
    io::{chains_to_geojson, load_labels, save_labels},
    pipeline::finalize,
    BoundaryTracer, EditEvent, EditSession, LabelError, MooreTracer, NeighborEngine,
    NeighborSource, ObjectSet,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run configuration (.toml or .json); defaults apply without one
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure neighbours of every object and write the table as JSON
    Neighbors {
        /// Label image or JSON rows of the measured objects
        #[arg(short, long)]
        labels: PathBuf,
        /// Labels the objects were filtered from
        #[arg(long)]
        unfiltered: Option<PathBuf>,
        /// Second object set; the objects are measured against themselves without it
        #[arg(long)]
        neighbors: Option<PathBuf>,
        /// Superset of the second object set
        #[arg(long, requires = "neighbors")]
        neighbors_unfiltered: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Replay an edit script over a label matrix and save the result
    Edit {
        #[arg(short, long)]
        labels: PathBuf,
        /// JSON array of edit events
        #[arg(short, long)]
        events: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Where to write object counts, locations and parents as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Trace the boundary chains of one object to GeoJSON
    Trace {
        #[arg(short, long)]
        labels: PathBuf,
        #[arg(long)]
        object: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value = "events")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    Events,
    Config,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    match &cli.command {
        Commands::Neighbors {
            labels,
            unfiltered,
            neighbors,
            neighbors_unfiltered,
            output,
        } => {
            let objects = object_set(labels, unfiltered.as_deref())?;
            let other = match neighbors {
                Some(path) => Some(object_set(path, neighbors_unfiltered.as_deref())?),
                None => None,
            };
            measure_neighbors(&config, &objects, other.as_ref(), output)?;
        }
        Commands::Edit {
            labels,
            events,
            output,
            report,
        } => {
            edit_labels(&config, labels, events, output, report.as_deref())?;
        }
        Commands::Trace {
            labels,
            object,
            output,
        } => {
            trace_object(&config, labels, *object, output)?;
        }
        Commands::Schema { kind } => {
            let schema = match kind {
                SchemaKind::Events => serde_json::to_string_pretty(&EditEvent::schema())?,
                SchemaKind::Config => serde_json::to_string_pretty(&RunConfig::schema())?,
            };
            println!("{schema}");
        }
    }

    Ok(())
}

fn object_set(labels: &Path, unfiltered: Option<&Path>) -> Result<ObjectSet> {
    let labels = load_labels(labels)?;
    Ok(match unfiltered {
        Some(path) => ObjectSet::with_unfiltered(labels, load_labels(path)?)?,
        None => ObjectSet::new(labels),
    })
}

fn measure_neighbors(
    config: &RunConfig,
    objects: &ObjectSet,
    other: Option<&ObjectSet>,
    output: &Path,
) -> Result<()> {
    let mut neighbor_config = config.neighbors.clone();
    let source = match other {
        Some(set) => {
            if neighbor_config.is_self() {
                neighbor_config.neighbor_name = format!("{}Neighbors", neighbor_config.object_name);
            }
            NeighborSource::Other(set)
        }
        None => {
            neighbor_config.neighbor_name = neighbor_config.object_name.clone();
            NeighborSource::SameObjects
        }
    };
    let measurements = NeighborEngine::new(neighbor_config).measure(objects, source)?;
    measurements.save_json(output)?;
    info!(
        "Wrote {} rows and {} relationships to {:?}",
        measurements.rows.len(),
        measurements.relationships.len(),
        output
    );
    Ok(())
}

fn edit_labels(
    config: &RunConfig,
    labels_path: &Path,
    events_path: &Path,
    output: &Path,
    report: Option<&Path>,
) -> Result<()> {
    let labels = load_labels(labels_path)?;
    let events = load_events(events_path)?;
    info!("Replaying {} events over {:?}", events.len(), labels_path);

    let session = EditSession::new(labels.clone(), config.edit.clone());
    let edited = match session.run(&events) {
        Ok(edited) => edited,
        Err(LabelError::Cancelled) => {
            warn!("Edit script cancelled the session; nothing written");
            return Err(eyre!("edit session cancelled"));
        }
        Err(e) => return Err(e.into()),
    };
    save_labels(&edited, output)?;

    if let Some(report) = report {
        let objects = finalize(&labels, edited, &config.finalize)?;
        std::fs::write(report, serde_json::to_string_pretty(&objects)?)?;
        info!("{} objects after editing, report in {:?}", objects.count, report);
    }
    Ok(())
}

fn trace_object(config: &RunConfig, labels_path: &Path, object: u32, output: &Path) -> Result<()> {
    let labels = load_labels(labels_path)?;
    let chains = MooreTracer::new(config.edit.trace).trace(&labels, object);
    if chains.is_empty() {
        warn!("Object {} has no traceable boundary", object);
    }
    let collection = chains_to_geojson(&chains, labels.shape())?;
    std::fs::write(output, serde_json::to_string_pretty(&collection)?)?;
    info!("Wrote {} chains to {:?}", chains.len(), output);
    Ok(())
}
