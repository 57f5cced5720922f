use geo_types::{Coord, LineString, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

/// An integer position on the label grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct GridPoint {
    pub row: i32,
    pub col: i32,
}

impl GridPoint {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Geometry coordinate with `x` along columns and `y` along rows.
    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.col as f64,
            y: self.row as f64,
        }
    }

    pub fn offset(self, drow: i32, dcol: i32) -> Self {
        Self::new(self.row + drow, self.col + dcol)
    }
}

/// Whether a chain bounds the object from outside or bounds one of its holes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChainKind {
    Outside,
    Hole,
}

/// A closed polyline owned by one object. The last point always repeats the
/// first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundaryChain {
    pub object: u32,
    pub kind: ChainKind,
    /// Set once the chain no longer matches the raster it was traced from.
    pub edited: bool,
    points: Vec<GridPoint>,
}

impl BoundaryChain {
    /// Build a chain, appending the closing point if it is missing.
    pub fn new(object: u32, kind: ChainKind, mut points: Vec<GridPoint>) -> Self {
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if points.len() == 1 || first != last {
                points.push(first);
            }
        }
        Self {
            object,
            kind,
            edited: false,
            points,
        }
    }

    pub fn into_edited(mut self) -> Self {
        self.edited = true;
        self
    }

    /// All points including the closing point.
    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// Distinct vertices, without the closing point.
    pub fn vertices(&self) -> &[GridPoint] {
        let n = self.points.len().saturating_sub(1);
        &self.points[..n]
    }

    /// Number of points including the closing point.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_outside(&self) -> bool {
        self.kind == ChainKind::Outside
    }

    /// Consecutive point pairs, closing edge included.
    pub fn segments(&self) -> impl Iterator<Item = (GridPoint, GridPoint)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn set_vertex(&mut self, index: usize, point: GridPoint) {
        let last = self.points.len() - 1;
        self.points[index] = point;
        if index == 0 || index == last {
            self.points[0] = point;
            self.points[last] = point;
        }
        self.edited = true;
    }

    /// Insert `point` between vertex `index` and its successor.
    pub fn insert_after(&mut self, index: usize, point: GridPoint) {
        self.points.insert(index + 1, point);
        self.edited = true;
    }

    /// Remove a distinct vertex and re-close the chain.
    pub fn remove_vertex(&mut self, index: usize) {
        let mut vertices = self.vertices().to_vec();
        vertices.remove(index);
        if let Some(&first) = vertices.first() {
            vertices.push(first);
        }
        self.points = vertices;
        self.edited = true;
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let ring: LineString<f64> = self.points.iter().map(|p| p.to_coord()).collect();
        Polygon::new(ring, vec![])
    }

    /// Signed shoelace area in (col, row) space. Outside chains traced from
    /// a raster are positive, hole chains negative.
    pub fn signed_area(&self) -> f64 {
        use geo::Area;
        self.to_polygon().signed_area()
    }
}
