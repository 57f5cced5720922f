//! Neighbour relationships between labelled objects.
//!
//! Each object is dilated according to the [`DistanceMode`]; every other
//! object its dilated footprint reaches is a neighbour. When a set was
//! filtered upstream (objects touching the border, small objects), the
//! unfiltered superset is used for geometry so discarded objects still count
//! as neighbours, while only kept objects appear in relationships and
//! closest-neighbour fields.

pub mod config;
pub mod measurements;

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::{
    algorithms::{dilate, expand_labels, StructuringElement},
    error::{LabelError, Result},
    labels::{BoundingBox, LabelMatrix},
    types::GridPoint,
};

pub use config::{ClosestPolicy, DistanceMode, NeighborConfig};
pub use measurements::{Feature, NeighborMeasurements, ObjectNeighbors, Relationship};

/// A label matrix as measured, plus the superset it was filtered from.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSet {
    labels: LabelMatrix,
    unfiltered: Option<LabelMatrix>,
}

impl ObjectSet {
    pub fn new(labels: LabelMatrix) -> Self {
        Self {
            labels,
            unfiltered: None,
        }
    }

    pub fn with_unfiltered(labels: LabelMatrix, unfiltered: LabelMatrix) -> Result<Self> {
        labels.ensure_same_shape(&unfiltered)?;
        Ok(Self {
            labels,
            unfiltered: Some(unfiltered),
        })
    }

    pub fn labels(&self) -> &LabelMatrix {
        &self.labels
    }

    /// The superset, or the labels themselves when nothing was filtered.
    pub fn unfiltered(&self) -> &LabelMatrix {
        self.unfiltered.as_ref().unwrap_or(&self.labels)
    }

    /// Superset id of every kept id present. A kept object must sit on a
    /// superset object.
    fn superset_ids(&self) -> Result<BTreeMap<u32, u32>> {
        let superset = self.unfiltered();
        let mut ids = BTreeMap::new();
        for (&kept, &sup) in self.labels.as_slice().iter().zip(superset.as_slice()) {
            if kept == 0 || ids.contains_key(&kept) {
                continue;
            }
            if sup == 0 {
                return Err(LabelError::InvariantViolation(format!(
                    "object {kept} has no counterpart in the unfiltered labels"
                )));
            }
            ids.insert(kept, sup);
        }
        Ok(ids)
    }
}

/// What the objects are measured against.
#[derive(Debug, Clone, Copy)]
pub enum NeighborSource<'a> {
    /// The objects themselves.
    SameObjects,
    /// A second object set of the same shape.
    Other(&'a ObjectSet),
}

#[derive(Debug, Clone, Default)]
pub struct NeighborEngine {
    config: NeighborConfig,
}

struct Closest {
    first: Option<(u32, f64)>,
    second: Option<(u32, f64)>,
    angle: Option<f64>,
}

impl NeighborEngine {
    pub fn new(config: NeighborConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NeighborConfig {
        &self.config
    }

    pub fn measure(
        &self,
        objects: &ObjectSet,
        source: NeighborSource<'_>,
    ) -> Result<NeighborMeasurements> {
        let (neighbors, self_mode) = match source {
            NeighborSource::SameObjects => (objects, true),
            NeighborSource::Other(other) => (other, false),
        };
        objects.labels().ensure_same_shape(neighbors.labels())?;
        let shape = objects.labels().shape();
        let mode = self.config.distance;

        let object_ids = objects.superset_ids()?;
        let neighbor_ids = if self_mode {
            object_ids.clone()
        } else {
            neighbors.superset_ids()?
        };
        let neighbor_kept: BTreeMap<u32, u32> =
            neighbor_ids.iter().map(|(&kept, &sup)| (sup, kept)).collect();

        let object_space: Cow<'_, LabelMatrix> = match mode {
            DistanceMode::Expand { limit } => {
                Cow::Owned(expand_labels(objects.unfiltered(), limit))
            }
            _ => Cow::Borrowed(objects.unfiltered()),
        };
        let neighbor_space: &LabelMatrix = if self_mode {
            &*object_space
        } else {
            neighbors.unfiltered()
        };

        let element = mode.neighbor_element();
        let touching = mode.touching_element();
        let boxes = object_space.bounding_boxes();
        let outline = self_mode.then(|| object_space.outline());
        let object_centroids = objects.labels().centroids();
        let neighbor_centroids = neighbors.labels().centroids();

        let mut rows = Vec::new();
        let mut relationships = Vec::new();
        for id in 1..=objects.labels().max_label() {
            let Some((sup, bbox)) = object_ids
                .get(&id)
                .and_then(|&sup| boxes.get(&sup).map(|&bbox| (sup, bbox)))
            else {
                debug!(object = id, "object has no pixels");
                rows.push(ObjectNeighbors::empty(id, self_mode));
                continue;
            };

            let found =
                reached_labels(&object_space, neighbor_space, sup, bbox, &element, self_mode);
            let kept_neighbors: Vec<u32> = found
                .iter()
                .filter_map(|l| neighbor_kept.get(l).copied())
                .collect();
            relationships.extend(kept_neighbors.iter().map(|&second| Relationship {
                first: id,
                second,
            }));

            let percent_touching = outline
                .as_ref()
                .map(|outline| percent_touching(outline, &object_space, sup, bbox, &touching));

            let candidates: Vec<u32> = match self.config.closest {
                ClosestPolicy::AmongNeighbors => kept_neighbors,
                ClosestPolicy::AllObjects => neighbor_centroids
                    .keys()
                    .copied()
                    .filter(|&n| !(self_mode && n == id))
                    .collect(),
            };
            let closest = rank_closest(
                object_centroids.get(&id).copied(),
                &candidates,
                &neighbor_centroids,
            );

            rows.push(ObjectNeighbors {
                object: id,
                neighbor_count: found.len(),
                percent_touching,
                first_closest: closest.first.map(|(n, _)| n),
                first_distance: closest.first.map(|(_, d)| d),
                second_closest: closest.second.map(|(n, _)| n),
                second_distance: closest.second.map(|(_, d)| d),
                angle: closest.angle,
            });
        }

        let scale = mode.scale();
        info!(
            objects = rows.len(),
            relationships = relationships.len(),
            scale = %scale,
            self_mode,
            "measured neighbors"
        );
        Ok(NeighborMeasurements {
            object_name: self.config.object_name.clone(),
            neighbor_name: self.config.neighbor_name.clone(),
            scale,
            self_mode,
            rows,
            relationships,
        })
    }
}

/// Labels of `neighbor_space` under the dilated footprint of `object`.
fn reached_labels(
    object_space: &LabelMatrix,
    neighbor_space: &LabelMatrix,
    object: u32,
    bbox: BoundingBox,
    element: &StructuringElement,
    self_mode: bool,
) -> BTreeSet<u32> {
    let (rows, cols) = bbox.window(element.radius(), object_space.shape());
    let footprint = object_space.window_mask(object, rows.clone(), cols.clone());
    let reach = dilate(&footprint, element);
    reach
        .points()
        .map(|p| neighbor_space.get(rows.start + p.row as usize, cols.start + p.col as usize))
        .filter(|&l| l != 0 && !(self_mode && l == object))
        .collect()
}

/// Share of the object's perimeter pixels lying within `touching` of any
/// other object, in percent. A zero perimeter gives 0.
fn percent_touching(
    outline: &LabelMatrix,
    space: &LabelMatrix,
    object: u32,
    bbox: BoundingBox,
    touching: &StructuringElement,
) -> f64 {
    let (rows, cols) = bbox.window(0, space.shape());
    let mut perimeter = 0usize;
    let mut touched = 0usize;
    for row in rows {
        for col in cols.clone() {
            if outline.get(row, col) != object {
                continue;
            }
            perimeter += 1;
            let p = GridPoint::new(row as i32, col as i32);
            let hit = touching.offsets().iter().any(|&(dr, dc)| {
                space
                    .at(p.offset(dr, dc))
                    .is_some_and(|l| l != 0 && l != object)
            });
            if hit {
                touched += 1;
            }
        }
    }
    if perimeter == 0 {
        0.0
    } else {
        100.0 * touched as f64 / perimeter as f64
    }
}

/// First and second closest candidates by centroid distance, ties to the
/// lower id, and the angle between them at `origin`.
fn rank_closest(
    origin: Option<(f64, f64)>,
    candidates: &[u32],
    centroids: &BTreeMap<u32, (f64, f64)>,
) -> Closest {
    let none = Closest {
        first: None,
        second: None,
        angle: None,
    };
    let Some((orow, ocol)) = origin else {
        return none;
    };
    let mut ranked: Vec<(f64, u32, (f64, f64))> = candidates
        .iter()
        .filter_map(|&n| {
            centroids
                .get(&n)
                .map(|&(r, c)| ((r - orow).hypot(c - ocol), n, (r - orow, c - ocol)))
        })
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let angle = match ranked.as_slice() {
        [(d1, _, v1), (d2, _, v2), ..] if *d1 > 0.0 && *d2 > 0.0 => {
            let cos = (v1.0 * v2.0 + v1.1 * v2.1) / (d1 * d2);
            Some(cos.clamp(-1.0, 1.0).acos().to_degrees())
        }
        _ => None,
    };
    Closest {
        first: ranked.first().map(|&(d, n, _)| (n, d)),
        second: ranked.get(1).map(|&(d, n, _)| (n, d)),
        angle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-7;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn points(height: usize, width: usize, objects: &[(usize, usize, u32)]) -> LabelMatrix {
        let mut labels = LabelMatrix::new(height, width);
        for &(r, c, id) in objects {
            labels.set(r, c, id);
        }
        labels
    }

    fn measure_self(labels: LabelMatrix, mode: DistanceMode) -> NeighborMeasurements {
        NeighborEngine::new(NeighborConfig::new("Cells", mode))
            .measure(&ObjectSet::new(labels), NeighborSource::SameObjects)
            .expect("measurement succeeds")
    }

    fn measure_cross(
        objects: &ObjectSet,
        neighbors: &ObjectSet,
        mode: DistanceMode,
        closest: ClosestPolicy,
    ) -> NeighborMeasurements {
        let config = NeighborConfig::new("Cells", mode)
            .against("Neighbors")
            .with_closest(closest);
        NeighborEngine::new(config)
            .measure(objects, NeighborSource::Other(neighbors))
            .expect("measurement succeeds")
    }

    fn five_blocks() -> LabelMatrix {
        LabelMatrix::from_rows(&[
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 1, 1, 1, 0, 0, 0, 2, 2, 2],
            vec![0, 1, 1, 1, 0, 0, 0, 2, 2, 2],
            vec![0, 1, 1, 1, 0, 0, 0, 2, 2, 2],
            vec![0, 0, 0, 0, 3, 3, 3, 0, 0, 0],
            vec![0, 0, 0, 0, 3, 3, 3, 0, 0, 0],
            vec![0, 0, 0, 0, 3, 3, 3, 0, 0, 0],
            vec![0, 4, 4, 4, 0, 0, 0, 5, 5, 5],
            vec![0, 4, 4, 4, 0, 0, 0, 5, 5, 5],
            vec![0, 4, 4, 4, 0, 0, 0, 5, 5, 5],
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        ])
        .expect("rows are rectangular")
    }

    #[test]
    fn test_empty_labels_in_every_mode() {
        for mode in [
            DistanceMode::Adjacent,
            DistanceMode::Expand { limit: None },
            DistanceMode::Within { distance: 5 },
        ] {
            let m = measure_self(LabelMatrix::new(10, 10), mode);
            assert!(m.rows.is_empty());
            assert!(m.relationships.is_empty());
            assert!(m.columns().iter().all(|(_, values)| values.is_empty()));
        }
    }

    #[test]
    fn test_single_object_has_no_neighbors() {
        let mut labels = LabelMatrix::new(10, 10);
        for r in 3..5 {
            for c in 4..6 {
                labels.set(r, c, 1);
            }
        }
        let m = measure_self(labels, DistanceMode::Expand { limit: None });
        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.rows[0].neighbor_count, 0);
        assert_eq!(m.rows[0].percent_touching, Some(0.0));
        assert!(m.rows[0].angle_or_nan().is_nan());
    }

    #[test]
    fn test_two_expanded_points() {
        let labels = points(10, 10, &[(2, 2, 1), (8, 7, 2)]);
        let m = measure_self(labels, DistanceMode::Expand { limit: None });
        assert_eq!(m.column(Feature::NumberOfNeighbors), vec![1.0, 1.0]);
        assert!(close(m.rows[0].percent_touching.unwrap_or_default(), 100.0 * 17.0 / 33.0));
        assert_eq!(m.rows[0].first_closest, Some(2));
        assert_eq!(m.rows[1].first_closest, Some(1));
        assert!(close(m.rows[0].first_distance_or_nan(), 61f64.sqrt()));
        assert!(close(m.rows[1].first_distance_or_nan(), 61f64.sqrt()));
    }

    #[test]
    fn test_distant_points_are_not_adjacent() {
        let labels = points(10, 10, &[(2, 2, 1), (8, 7, 2)]);
        let m = measure_self(labels, DistanceMode::Adjacent);
        assert_eq!(m.column(Feature::NumberOfNeighbors), vec![0.0, 0.0]);
        assert_eq!(m.column(Feature::PercentTouching), vec![0.0, 0.0]);
        assert_eq!(m.rows[0].first_closest, None);
    }

    #[test]
    fn test_adjacent_points() {
        for (r, c) in [(2, 3), (3, 3)] {
            let labels = points(10, 10, &[(2, 2, 1), (r, c, 2)]);
            let m = measure_self(labels, DistanceMode::Adjacent);
            assert_eq!(m.column(Feature::NumberOfNeighbors), vec![1.0, 1.0]);
            assert!(close(m.rows[0].percent_touching.unwrap_or_default(), 100.0));
            assert_eq!(m.rows[0].first_closest, Some(2));
            assert_eq!(m.rows[1].first_closest, Some(1));
        }
    }

    #[test]
    fn test_pythagorean_pair() {
        let labels = points(10, 10, &[(2, 2, 1), (5, 6, 2)]);
        let apart = measure_self(labels.clone(), DistanceMode::Within { distance: 4 });
        assert_eq!(apart.column(Feature::NumberOfNeighbors), vec![0.0, 0.0]);
        assert_eq!(apart.column(Feature::PercentTouching), vec![0.0, 0.0]);

        let touching = measure_self(labels, DistanceMode::Within { distance: 5 });
        assert_eq!(touching.column(Feature::NumberOfNeighbors), vec![1.0, 1.0]);
        assert!(close(touching.rows[0].percent_touching.unwrap_or_default(), 100.0));
        assert_eq!(touching.rows[0].first_closest, Some(2));
        assert_eq!(touching.rows[1].first_closest, Some(1));
    }

    #[test]
    fn test_triangle_closest_and_angles() {
        let labels = points(10, 10, &[(2, 2, 1), (2, 5, 2), (6, 2, 3)]);
        let m = measure_self(labels, DistanceMode::Within { distance: 5 });
        assert_eq!(m.column(Feature::FirstClosestObjectNumber), vec![2.0, 1.0, 1.0]);
        assert_eq!(m.column(Feature::SecondClosestObjectNumber), vec![3.0, 3.0, 2.0]);
        let second = m.column(Feature::SecondClosestDistance);
        assert!(close(second[0], 4.0) && close(second[1], 5.0) && close(second[2], 5.0));
        let angle = m.column(Feature::AngleBetweenNeighbors);
        assert!(close(angle[0], 90.0));
        assert!(close(angle[1], (3.0f64 / 5.0).acos().to_degrees()));
        assert!(close(angle[2], (4.0f64 / 5.0).acos().to_degrees()));
    }

    #[test]
    fn test_discarded_object_counts_but_is_not_related() {
        let labels = points(10, 10, &[(2, 3, 1)]);
        let unfiltered = points(10, 10, &[(2, 3, 3), (9, 9, 1), (0, 3, 2), (1, 3, 2)]);
        let objects = ObjectSet::with_unfiltered(labels, unfiltered).expect("same shape");
        let m = NeighborEngine::new(NeighborConfig::new("Cells", DistanceMode::Adjacent))
            .measure(&objects, NeighborSource::SameObjects)
            .expect("measurement succeeds");
        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.rows[0].neighbor_count, 1);
        assert!(close(m.rows[0].percent_touching.unwrap_or_default(), 100.0));
        assert_eq!(m.rows[0].first_closest, None);
        assert!(m.relationships.is_empty());
    }

    #[test]
    fn test_only_discarded_objects_give_no_rows() {
        let labels = LabelMatrix::new(10, 10);
        let unfiltered = points(10, 10, &[(0, 3, 1), (1, 3, 1), (7, 5, 2), (8, 5, 2)]);
        let objects = ObjectSet::with_unfiltered(labels, unfiltered).expect("same shape");
        let m = NeighborEngine::new(NeighborConfig::new("Cells", DistanceMode::Adjacent))
            .measure(&objects, NeighborSource::SameObjects)
            .expect("measurement succeeds");
        assert!(m.is_empty());
    }

    #[test]
    fn test_kept_object_off_the_superset_is_an_invariant_violation() {
        let labels = points(5, 5, &[(2, 2, 1)]);
        let objects =
            ObjectSet::with_unfiltered(labels, LabelMatrix::new(5, 5)).expect("same shape");
        let result = NeighborEngine::default().measure(&objects, NeighborSource::SameObjects);
        assert!(matches!(result, Err(LabelError::InvariantViolation(_))));
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let objects = ObjectSet::new(LabelMatrix::new(5, 5));
        let neighbors = ObjectSet::new(LabelMatrix::new(5, 6));
        let result = NeighborEngine::default().measure(&objects, NeighborSource::Other(&neighbors));
        assert!(matches!(result, Err(LabelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_blank_sets_against_each_other() {
        let blank = LabelMatrix::new(20, 10);
        let mut one = LabelMatrix::new(20, 10);
        for r in 2..18 {
            for c in 2..8 {
                one.set(r, c, 1);
            }
        }
        let cases = [(&blank, &blank, 0), (&blank, &one, 0), (&one, &blank, 1)];
        for (objects, neighbors, count) in cases {
            for mode in [
                DistanceMode::Adjacent,
                DistanceMode::Expand { limit: None },
                DistanceMode::Within { distance: 0 },
            ] {
                let m = measure_cross(
                    &ObjectSet::new(objects.clone()),
                    &ObjectSet::new(neighbors.clone()),
                    mode,
                    ClosestPolicy::AmongNeighbors,
                );
                for (_, values) in m.columns() {
                    assert_eq!(values.len(), count);
                }
            }
        }
    }

    #[test]
    fn test_all_objects_policy_ranks_non_neighbors() {
        let objects = ObjectSet::new(points(20, 10, &[(2, 2, 1)]));
        let neighbors = ObjectSet::new(points(20, 10, &[(18, 8, 1)]));
        for (mode, count) in [
            (DistanceMode::Adjacent, 0),
            (DistanceMode::Expand { limit: None }, 1),
            (DistanceMode::Within { distance: 20 }, 1),
        ] {
            let m = measure_cross(&objects, &neighbors, mode, ClosestPolicy::AllObjects);
            let row = &m.rows[0];
            assert_eq!(row.neighbor_count, count);
            assert_eq!(row.first_closest, Some(1));
            assert_eq!(row.second_closest, None);
            assert!(close(row.first_distance_or_nan(), (16.0f64 * 16.0 + 6.0 * 6.0).sqrt()));
            assert!(row.percent_touching.is_none());
        }
        let m = measure_cross(
            &objects,
            &neighbors,
            DistanceMode::Adjacent,
            ClosestPolicy::AmongNeighbors,
        );
        assert_eq!(m.rows[0].first_closest, None);
    }

    #[test]
    fn test_cross_expand_ranks_two_neighbors() {
        let objects = ObjectSet::new(points(20, 10, &[(2, 2, 1)]));
        let neighbors = ObjectSet::new(points(20, 10, &[(5, 2, 2), (2, 6, 1)]));
        let m = measure_cross(
            &objects,
            &neighbors,
            DistanceMode::Expand { limit: None },
            ClosestPolicy::AmongNeighbors,
        );
        let row = &m.rows[0];
        assert_eq!(row.first_closest, Some(2));
        assert_eq!(row.second_closest, Some(1));
        assert!(close(row.first_distance_or_nan(), 3.0));
        assert!(close(row.second_distance_or_nan(), 4.0));
        assert!(close(row.angle_or_nan(), 90.0));
    }

    #[test]
    fn test_self_relationships_in_both_directions() {
        let m = measure_self(five_blocks(), DistanceMode::Within { distance: 2 });
        assert_eq!(m.relationships.len(), 8);
        let into_three: BTreeSet<u32> = m
            .relationships
            .iter()
            .filter(|r| r.second == 3)
            .map(|r| r.first)
            .collect();
        let from_three: BTreeSet<u32> = m
            .relationships
            .iter()
            .filter(|r| r.first == 3)
            .map(|r| r.second)
            .collect();
        assert_eq!(into_three, BTreeSet::from([1, 2, 4, 5]));
        assert_eq!(from_three, BTreeSet::from([1, 2, 4, 5]));
    }

    #[test]
    fn test_cross_relationships() {
        let mut other = LabelMatrix::new(11, 10);
        for r in 4..7 {
            for c in 1..4 {
                other.set(r, c, 1);
            }
        }
        let m = measure_cross(
            &ObjectSet::new(five_blocks()),
            &ObjectSet::new(other),
            DistanceMode::Within { distance: 2 },
            ClosestPolicy::AmongNeighbors,
        );
        let edges: Vec<(u32, u32)> = m.relationships.iter().map(|r| (r.first, r.second)).collect();
        assert_eq!(edges, vec![(1, 1), (3, 1), (4, 1)]);
        assert_eq!(m.features().len(), 6);
    }

    #[test]
    fn test_missing_object_gets_defaults() {
        let labels = points(10, 10, &[(2, 2, 1), (2, 3, 3)]);
        let m = measure_self(labels, DistanceMode::Adjacent);
        assert_eq!(m.column(Feature::NumberOfNeighbors), vec![1.0, 0.0, 1.0]);
        assert_eq!(m.column(Feature::PercentTouching), vec![100.0, 0.0, 100.0]);
        assert_eq!(m.column(Feature::FirstClosestObjectNumber), vec![3.0, 0.0, 1.0]);
        assert_eq!(m.rows[1].first_closest, None);
    }

    #[test]
    fn test_discarded_neighbors_count_across_sets() {
        let mut objects = LabelMatrix::new(11, 13);
        let mut kept = LabelMatrix::new(11, 13);
        let mut unfiltered = LabelMatrix::new(11, 13);
        for r in 1..6 {
            for c in 5..7 {
                objects.set(r, c, 1);
            }
        }
        for r in 5..7 {
            for c in 4..8 {
                kept.set(r, c, 1);
                unfiltered.set(r, c, 1);
            }
        }
        for r in 0..4 {
            for c in 4..8 {
                unfiltered.set(r, c, 2);
            }
        }
        let neighbors = ObjectSet::with_unfiltered(kept, unfiltered).expect("same shape");
        let m = measure_cross(
            &ObjectSet::new(objects),
            &neighbors,
            DistanceMode::Within { distance: 0 },
            ClosestPolicy::AmongNeighbors,
        );
        assert_eq!(m.rows[0].neighbor_count, 2);
        assert_eq!(m.relationships, vec![Relationship { first: 1, second: 1 }]);
    }

    fn measure_set(objects: &ObjectSet, mode: DistanceMode) -> NeighborMeasurements {
        NeighborEngine::new(NeighborConfig::new("Cells", mode))
            .measure(objects, NeighborSource::SameObjects)
            .expect("measurement succeeds")
    }

    fn two_small_blocks() -> LabelMatrix {
        let mut labels = LabelMatrix::new(11, 13);
        for r in 5..7 {
            for c in 1..3 {
                labels.set(r, c, 1);
            }
        }
        for r in 6..8 {
            for c in 5..7 {
                labels.set(r, c, 2);
            }
        }
        labels
    }

    #[test]
    fn test_expanded_superset_matching_kept_objects() {
        let labels = two_small_blocks();
        let objects = ObjectSet::with_unfiltered(labels.clone(), labels).expect("same shape");
        let m = measure_set(&objects, DistanceMode::Expand { limit: None });
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.rows[0].neighbor_count, 1);
    }

    #[test]
    fn test_expanded_superset_counts_discarded_object() {
        let labels = two_small_blocks();
        let mut unfiltered = labels.clone();
        for r in 0..2 {
            for c in 0..2 {
                unfiltered.set(r, c, 3);
            }
        }
        let objects = ObjectSet::with_unfiltered(labels, unfiltered).expect("same shape");
        let m = measure_set(&objects, DistanceMode::Expand { limit: None });
        assert_eq!(m.column(Feature::NumberOfNeighbors), vec![2.0, 2.0]);
        assert_eq!(
            m.relationships,
            vec![
                Relationship { first: 1, second: 2 },
                Relationship { first: 2, second: 1 },
            ]
        );
        assert_eq!(m.rows[0].first_closest, Some(2));
        assert_eq!(m.rows[0].second_closest, None);
        assert_eq!(m.rows[1].first_closest, Some(1));
    }

    #[test]
    fn test_gap_in_object_ids_across_sets() {
        let objects = ObjectSet::new(points(20, 10, &[(2, 2, 2)]));
        let neighbors = ObjectSet::new(points(20, 10, &[(2, 3, 1), (5, 2, 2)]));
        let m = measure_cross(
            &objects,
            &neighbors,
            DistanceMode::Expand { limit: None },
            ClosestPolicy::AmongNeighbors,
        );
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.rows[0].neighbor_count, 0);
        assert_eq!(m.rows[1].first_closest, Some(1));
    }
}
