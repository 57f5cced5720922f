pub mod builder;

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    edit::{EditConfig, EditEvent, EditSession},
    error::Result,
    labels::LabelMatrix,
    neighbors::{NeighborConfig, NeighborEngine, NeighborMeasurements, NeighborSource, ObjectSet},
};

/// Options for turning a committed session into measurable objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FinalizeOptions {
    /// Also produce the outline of every object.
    pub outline: bool,
}

/// Centre of mass in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

/// Edited objects plus their relation to the objects they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditedObjects {
    pub labels: LabelMatrix,
    /// Number of distinct objects.
    pub count: usize,
    /// Location of every edited object.
    pub locations: BTreeMap<u32, Location>,
    /// Original object each edited object overlaps most, 0 if none.
    pub parents: BTreeMap<u32, u32>,
    /// Edited objects per original object.
    pub child_counts: BTreeMap<u32, usize>,
    pub outline: Option<LabelMatrix>,
}

/// Measurements for committed labels.
pub fn finalize(
    original: &LabelMatrix,
    edited: LabelMatrix,
    options: &FinalizeOptions,
) -> Result<EditedObjects> {
    let (child_counts, parents) = original.relate_children(&edited)?;
    let locations = edited
        .centroids()
        .into_iter()
        .map(|(id, (row, col))| (id, Location { x: col, y: row }))
        .collect();
    let outline = options.outline.then(|| edited.outline());
    let count = edited.labels().len();
    info!(count, "finalized edited objects");
    Ok(EditedObjects {
        labels: edited,
        count,
        locations,
        parents,
        child_counts,
        outline,
    })
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub objects: EditedObjects,
    pub neighbors: Option<NeighborMeasurements>,
}

/// Edit, finalize and optionally measure neighbours of the result.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    edit: EditConfig,
    finalize: FinalizeOptions,
    neighbors: Option<NeighborConfig>,
}

impl Pipeline {
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        edit: EditConfig,
        finalize: FinalizeOptions,
        neighbors: Option<NeighborConfig>,
    ) -> Self {
        Self {
            edit,
            finalize,
            neighbors,
        }
    }

    /// Replay `events` over `labels`. A cancelled script is an error and
    /// produces nothing.
    pub fn process<'a, I>(&self, labels: &LabelMatrix, events: I) -> Result<PipelineOutput>
    where
        I: IntoIterator<Item = &'a EditEvent>,
    {
        let session = EditSession::new(labels.clone(), self.edit.clone());
        let edited = session.run(events)?;
        let objects = finalize(labels, edited, &self.finalize)?;
        let neighbors = match &self.neighbors {
            Some(config) => Some(
                NeighborEngine::new(config.clone())
                    .measure(&ObjectSet::new(objects.labels.clone()), NeighborSource::SameObjects)?,
            ),
            None => None,
        };
        Ok(PipelineOutput { objects, neighbors })
    }

    pub fn info(&self) -> String {
        format!(
            "Pipeline: renumber {}, outline {}, neighbors {}",
            self.edit.renumber,
            self.finalize.outline,
            self.neighbors
                .as_ref()
                .map_or_else(|| "off".to_string(), |c| c.distance.scale()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{Cursor, EditKey, MouseButton, Panel};
    use crate::labels::RenumberPolicy;
    use crate::neighbors::DistanceMode;

    fn two_blocks() -> LabelMatrix {
        let mut labels = LabelMatrix::new(10, 12);
        for r in 2..6 {
            for c in 1..4 {
                labels.set(r, c, 1);
            }
            for c in 4..8 {
                labels.set(r, c, 2);
            }
        }
        labels
    }

    #[test]
    fn test_finalize_relations() {
        let original = two_blocks();
        let mut edited = LabelMatrix::new(10, 12);
        for r in 2..6 {
            for c in 1..8 {
                edited.set(r, c, 1);
            }
        }
        let objects = finalize(&original, edited, &FinalizeOptions { outline: true })
            .expect("same shape");
        assert_eq!(objects.count, 1);
        assert_eq!(objects.parents, BTreeMap::from([(1, 2)]));
        assert_eq!(objects.child_counts, BTreeMap::from([(1, 0), (2, 1)]));
        let location = objects.locations[&1];
        assert!((location.x - 4.0).abs() < 1e-9);
        assert!((location.y - 3.5).abs() < 1e-9);
        assert!(objects.outline.is_some());
    }

    #[test]
    fn test_finalize_without_outline() {
        let labels = two_blocks();
        let objects = finalize(&labels, labels.clone(), &FinalizeOptions::default())
            .expect("same shape");
        assert_eq!(objects.parents, BTreeMap::from([(1, 1), (2, 2)]));
        assert_eq!(objects.child_counts, BTreeMap::from([(1, 1), (2, 1)]));
        assert!(objects.outline.is_none());
    }

    #[test]
    fn test_pipeline_drops_removed_object_and_measures() {
        let pipeline = Pipeline::builder()
            .measure_neighbors(NeighborConfig::new("Cells", DistanceMode::Adjacent))
            .build();
        let events = vec![
            EditEvent::Click {
                at: Cursor::new(3.0, 2.0),
                button: MouseButton::Primary,
                panel: Panel::Original,
            },
            EditEvent::Done,
        ];
        let output = pipeline.process(&two_blocks(), &events).expect("session commits");
        assert_eq!(output.objects.count, 1);
        assert_eq!(output.objects.parents, BTreeMap::from([(1, 2)]));
        let neighbors = output.neighbors.expect("neighbors requested");
        assert_eq!(neighbors.rows.len(), 1);
        assert_eq!(neighbors.rows[0].neighbor_count, 0);
    }

    #[test]
    fn test_pipeline_retains_ids() {
        let pipeline = Pipeline::builder()
            .renumber(RenumberPolicy::RetainOriginalIds)
            .build();
        let events = vec![EditEvent::Click {
            at: Cursor::new(3.0, 2.0),
            button: MouseButton::Primary,
            panel: Panel::Original,
        }];
        let output = pipeline.process(&two_blocks(), &events).expect("session commits");
        assert_eq!(output.objects.count, 1);
        assert_eq!(output.objects.locations.keys().copied().collect::<Vec<_>>(), vec![2]);
        assert!(output.neighbors.is_none());
    }

    #[test]
    fn test_cancelled_pipeline() {
        let events = vec![
            EditEvent::Key {
                key: EditKey::RemoveAll,
                at: Cursor::new(0.0, 0.0),
            },
            EditEvent::Cancel,
        ];
        let result = Pipeline::default().process(&two_blocks(), &events);
        assert!(matches!(result, Err(crate::error::LabelError::Cancelled)));
    }
}
