use std::collections::BTreeMap;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    labels::LabelMatrix,
    traits::BoundaryTracer,
    types::{BoundaryChain, ChainKind, GridPoint},
};

type ComponentImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Compass steps in clockwise screen order, starting at north-west.
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

/// Direction the walk pretends to have arrived from at the start pixel, so
/// the first scan begins at west.
const INITIAL_DIRECTION: usize = 2;

/// Controls how densely traced chains keep their boundary pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TraceOptions {
    /// Chains with more points than this are thinned; `None` keeps all.
    pub decimate_above: Option<usize>,
    /// Roughly how many points a thinned chain should keep.
    pub target_points: usize,
    /// Upper bound on the thinning stride.
    pub max_stride: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            decimate_above: Some(40),
            target_points: 20,
            max_stride: 10,
        }
    }
}

impl TraceOptions {
    /// Keep every boundary pixel. Rasterizing such chains reproduces the
    /// traced mask.
    pub fn exact() -> Self {
        Self {
            decimate_above: None,
            ..Self::default()
        }
    }

    fn decimate(&self, points: Vec<GridPoint>) -> Vec<GridPoint> {
        let Some(limit) = self.decimate_above else {
            return points;
        };
        if points.len() <= limit {
            return points;
        }
        let stride = points
            .len()
            .div_ceil(self.target_points.max(1))
            .clamp(1, self.max_stride.max(1));
        let mut kept: Vec<GridPoint> = points.iter().copied().step_by(stride).collect();
        if let Some(&first) = points.first() {
            if kept.last() != Some(&first) {
                kept.push(first);
            }
        }
        kept
    }
}

/// Moore-neighbour boundary tracer.
///
/// Outer boundaries are walked over 8-connected components of the object;
/// holes are walked over 4-connected background components inside a
/// one-pixel padded window, ignoring the component that reaches the pad.
#[derive(Debug, Clone, Default)]
pub struct MooreTracer {
    pub options: TraceOptions,
}

struct Component {
    label: u32,
    start: GridPoint,
    pixels: usize,
}

impl MooreTracer {
    pub fn new(options: TraceOptions) -> Self {
        Self { options }
    }

    pub fn exact() -> Self {
        Self::new(TraceOptions::exact())
    }

    /// Chains for every object in the matrix, in id order.
    pub fn trace_all(&self, labels: &LabelMatrix) -> Vec<BoundaryChain> {
        labels
            .labels()
            .into_iter()
            .flat_map(|object| self.trace(labels, object))
            .collect()
    }

    fn trace_components(
        &self,
        image: &GrayImage,
        connectivity: Connectivity,
        skip_border: bool,
        origin: GridPoint,
        object: u32,
        kind: ChainKind,
    ) -> Vec<BoundaryChain> {
        let labelled = connected_components(image, connectivity, Luma([0u8]));
        let border = skip_border.then(|| labelled.get_pixel(0, 0)[0]);

        let mut chains = Vec::new();
        for component in components(&labelled) {
            if Some(component.label) == border {
                continue;
            }
            if component.pixels < 2 {
                trace!(object, %kind, start = ?component.start, "skipping single-pixel component");
                continue;
            }
            let mut points: Vec<GridPoint> = walk(&labelled, &component)
                .into_iter()
                .map(|p| p.offset(origin.row, origin.col))
                .collect();
            if kind == ChainKind::Hole {
                points.reverse();
            }
            chains.push(BoundaryChain::new(object, kind, self.options.decimate(points)));
        }
        chains
    }
}

impl BoundaryTracer for MooreTracer {
    fn trace(&self, labels: &LabelMatrix, object: u32) -> Vec<BoundaryChain> {
        let Some(bbox) = labels.bounding_box(object) else {
            trace!(object, "object has no pixels");
            return Vec::new();
        };
        let (rows, cols) = bbox.window(0, labels.shape());
        let width = cols.len() as u32 + 2;
        let height = rows.len() as u32 + 2;

        let mut padded = GrayImage::new(width, height);
        for (y, row) in rows.clone().enumerate() {
            for (x, col) in cols.clone().enumerate() {
                if labels.get(row, col) == object {
                    padded.put_pixel(x as u32 + 1, y as u32 + 1, Luma([255]));
                }
            }
        }
        let inverted = GrayImage::from_fn(width, height, |x, y| {
            Luma([255 - padded.get_pixel(x, y)[0]])
        });

        let origin = GridPoint::new(rows.start as i32 - 1, cols.start as i32 - 1);
        let mut chains = self.trace_components(
            &padded,
            Connectivity::Eight,
            false,
            origin,
            object,
            ChainKind::Outside,
        );
        chains.extend(self.trace_components(
            &inverted,
            Connectivity::Four,
            true,
            origin,
            object,
            ChainKind::Hole,
        ));

        debug!(object, chains = chains.len(), "traced object");
        chains
    }
}

/// Components in raster order of their first pixel, which is also their
/// topmost-then-leftmost pixel.
fn components(labelled: &ComponentImage) -> Vec<Component> {
    let mut found: BTreeMap<u32, Component> = BTreeMap::new();
    for (x, y, pixel) in labelled.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        found
            .entry(label)
            .or_insert_with(|| Component {
                label,
                start: GridPoint::new(y as i32, x as i32),
                pixels: 0,
            })
            .pixels += 1;
    }
    let mut components: Vec<Component> = found.into_values().collect();
    components.sort_by_key(|c| c.start);
    components
}

/// Walk the boundary of one component clockwise from its start pixel.
/// Stops when the walk is back on the start pixel and about to repeat its
/// first move. The returned chain ends on the start pixel.
fn walk(labelled: &ComponentImage, component: &Component) -> Vec<GridPoint> {
    let inside = |p: GridPoint| {
        p.row >= 0
            && p.col >= 0
            && (p.col as u32) < labelled.width()
            && (p.row as u32) < labelled.height()
            && labelled.get_pixel(p.col as u32, p.row as u32)[0] == component.label
    };
    let next_move = |p: GridPoint, dir: usize| {
        (0..8).map(|k| (dir + 5 + k) % 8).find_map(|d| {
            let (dr, dc) = DIRECTIONS[d];
            let q = p.offset(dr, dc);
            inside(q).then_some((d, q))
        })
    };

    let start = component.start;
    let mut chain = vec![start];
    let Some((first_dir, _)) = next_move(start, INITIAL_DIRECTION) else {
        return chain;
    };

    let max_steps = 8 * component.pixels + 8;
    let (mut current, mut dir) = (start, INITIAL_DIRECTION);
    for _ in 0..max_steps {
        let Some((d, next)) = next_move(current, dir) else {
            break;
        };
        if current == start && chain.len() > 1 && d == first_dir {
            return chain;
        }
        chain.push(next);
        current = next;
        dir = d;
    }
    warn!(start = ?start, steps = chain.len(), "boundary walk hit its step limit");
    chain
}
