//! # Label Matrix Editing and Neighbour Measurement
//!
//! Tools for segmented microscopy images stored as label matrices, where 0
//! is background and every positive id is one object.
//!
//! ## Core Features
//!
//! - **Boundary tracing**: Moore-neighbour tracing of outer boundaries and holes
//! - **Rasterization**: closed chains back to pixel masks with even-odd filling
//! - **Edit sessions**: an event-driven state machine for toggling, joining,
//!   splitting, hulling and reshaping objects through their boundaries
//! - **Neighbour engine**: neighbour counts, percent touching, closest
//!   neighbours and the relationship graph under three distance modes
//! - **I/O**: label images, JSON tables and GeoJSON chain exports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labelkit::{io::load_labels, DistanceMode, NeighborConfig, NeighborEngine, NeighborSource, ObjectSet};
//!
//! let labels = load_labels("nuclei.png")?;
//! let engine = NeighborEngine::new(NeighborConfig::new("Nuclei", DistanceMode::Within { distance: 5 }));
//! let measurements = engine.measure(&ObjectSet::new(labels), NeighborSource::SameObjects)?;
//! measurements.save_json("neighbors.json")?;
//! # Ok::<(), labelkit::LabelError>(())
//! ```
//!
//! ## Editing
//!
//! ```rust,no_run
//! use labelkit::{EditConfig, EditEvent, EditSession, LabelMatrix};
//!
//! let labels = LabelMatrix::new(64, 64);
//! let events: Vec<EditEvent> = serde_json::from_str(r#"[{"type": "done"}]"#)?;
//! let edited = EditSession::new(labels, EditConfig::default()).run(&events)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod algorithms;
pub mod edit;
pub mod error;
pub mod io;
pub mod labels;
pub mod neighbors;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use algorithms::{MooreTracer, ScanlineRasterizer, StructuringElement, TraceOptions};
pub use edit::{EditConfig, EditEvent, EditMode, EditSession, Response, Snapshot};
pub use error::{IllegalOperation, LabelError, Result};
pub use labels::{LabelMatrix, Mask, RenumberPolicy};
pub use neighbors::{
    ClosestPolicy, DistanceMode, Feature, NeighborConfig, NeighborEngine, NeighborMeasurements,
    NeighborSource, ObjectNeighbors, ObjectSet, Relationship,
};
pub use pipeline::{builder::PipelineBuilder, EditedObjects, FinalizeOptions, Pipeline};
pub use traits::{BoundaryTracer, PolygonRasterizer};
pub use types::{BoundaryChain, ChainKind, GridPoint};
