//! Hit testing and edge checks over live chains.

use geo::{Contains, Intersects};
use geo_types::Line;

use crate::types::{BoundaryChain, GridPoint};

use super::{event::Cursor, mode::VertexRef};

/// Where a new control point goes: after point `after` of chain `chain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub chain: usize,
    pub after: usize,
    pub point: GridPoint,
}

/// The vertex closest to `cursor` over every chain, if closer than
/// `epsilon`. Closing points are not candidates.
pub fn nearest_vertex(chains: &[BoundaryChain], cursor: Cursor, epsilon: f64) -> Option<VertexRef> {
    let mut best: Option<(f64, VertexRef)> = None;
    for (chain, c) in chains.iter().enumerate() {
        for (index, &v) in c.vertices().iter().enumerate() {
            let d = cursor.distance_to(v);
            if d < epsilon && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, VertexRef { chain, index }));
            }
        }
    }
    best.map(|(_, v)| v)
}

/// The segment with the smallest perpendicular distance to `cursor` among
/// those whose span the cursor projects strictly inside, and the rounded
/// foot of that projection.
pub fn nearest_segment(chains: &[BoundaryChain], cursor: Cursor) -> Option<Insertion> {
    let mut best: Option<(f64, usize, usize, f64, f64)> = None;
    for (ci, chain) in chains.iter().enumerate() {
        for (si, (a, b)) in chain.segments().enumerate() {
            let (vr, vc) = ((b.row - a.row) as f64, (b.col - a.col) as f64);
            let length = vr.hypot(vc);
            if length == 0.0 {
                continue;
            }
            let (wr, wc) = (cursor.row - a.row as f64, cursor.col - a.col as f64);
            let projection = (wr * vr + wc * vc) / length;
            if projection <= 0.0 || projection >= length {
                continue;
            }
            let distance = (wr * vc - wc * vr).abs() / length;
            if best.is_none_or(|(bd, ..)| distance < bd) {
                let t = projection / length;
                best = Some((distance, ci, si, a.row as f64 + t * vr, a.col as f64 + t * vc));
            }
        }
    }
    let (_, chain, after, row, col) = best?;
    let point = GridPoint::new(row.round() as i32, col.round() as i32);
    let points = chains[chain].points();
    if point == points[after] || point == points[after + 1] {
        return None;
    }
    Some(Insertion { chain, after, point })
}

/// Index of the first chain whose polygon strictly contains the cursor.
pub fn chain_under(chains: &[BoundaryChain], cursor: Cursor) -> Option<usize> {
    let at = cursor.to_coord();
    chains
        .iter()
        .position(|c| c.len() >= 4 && c.to_polygon().contains(&at))
}

/// Whether moving `target` to `to` makes either of its two edges cross
/// another edge of the same object. Edges sharing an endpoint with the
/// moved edges are ignored. Triangles are never checked.
pub fn drag_crosses_edges(chains: &[BoundaryChain], target: VertexRef, to: GridPoint) -> bool {
    let chain = &chains[target.chain];
    if chain.len() <= 4 {
        return false;
    }
    let vertices = chain.vertices();
    let n = vertices.len();
    let prev = (target.index + n - 1) % n;
    let next = (target.index + 1) % n;
    let moved = [
        Line::new(vertices[prev].to_coord(), to.to_coord()),
        Line::new(to.to_coord(), vertices[next].to_coord()),
    ];
    let touching = [prev, target.index, next];

    for (ci, other) in chains.iter().enumerate() {
        if other.object != chain.object {
            continue;
        }
        let ov = other.vertices();
        let m = ov.len();
        for i in 0..m {
            let j = (i + 1) % m;
            if ci == target.chain && (touching.contains(&i) || touching.contains(&j)) {
                continue;
            }
            let edge = Line::new(ov[i].to_coord(), ov[j].to_coord());
            if moved.iter().any(|line| line.intersects(&edge)) {
                return true;
            }
        }
    }
    false
}

/// Points halfway from vertex `index` to its previous and next neighbours,
/// each rounded away from the vertex so the two never coincide with it.
pub fn gap_ends(vertices: &[GridPoint], index: usize) -> (GridPoint, GridPoint) {
    let n = vertices.len();
    let v = vertices[index];
    let halfway = |to: GridPoint| {
        let half = |d: i32| (d + d.signum()) / 2;
        v.offset(half(to.row - v.row), half(to.col - v.col))
    };
    (
        halfway(vertices[(index + n - 1) % n]),
        halfway(vertices[(index + 1) % n]),
    )
}
