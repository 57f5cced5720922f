use geo::ConvexHull;
use geo_types::{MultiPoint, Point};

use crate::{
    labels::Mask,
    traits::PolygonRasterizer,
    types::{BoundaryChain, ChainKind, GridPoint},
};

/// Convex hull of a pixel set as an outside chain through pixel centres.
/// Returns `None` for an empty set.
pub fn convex_hull_chain<I>(object: u32, pixels: I) -> Option<BoundaryChain>
where
    I: IntoIterator<Item = GridPoint>,
{
    let points: MultiPoint<f64> = pixels
        .into_iter()
        .map(|p| Point::new(p.col as f64, p.row as f64))
        .collect();
    if points.0.is_empty() {
        return None;
    }
    let hull = points.convex_hull();
    let ring: Vec<GridPoint> = hull
        .exterior()
        .coords()
        .map(|c| GridPoint::new(c.y.round() as i32, c.x.round() as i32))
        .collect();
    if ring.is_empty() {
        let only = points.0[0];
        return Some(BoundaryChain::new(
            object,
            ChainKind::Outside,
            vec![GridPoint::new(only.y() as i32, only.x() as i32)],
        ));
    }
    Some(BoundaryChain::new(object, ChainKind::Outside, ring))
}

/// The filled convex hull of `mask`.
pub fn convex_hull_mask<R: PolygonRasterizer>(mask: &Mask, rasterizer: &R) -> Mask {
    match convex_hull_chain(0, mask.points()) {
        Some(chain) => rasterizer.fill_chain(&chain, mask.shape()),
        None => Mask::new(mask.height(), mask.width()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::rasterize::ScanlineRasterizer;

    #[test]
    fn test_hull_fills_concavity() {
        let mut mask = Mask::new(5, 5);
        for (r, c) in [(0, 0), (0, 4), (4, 0), (4, 4), (1, 0), (0, 1)] {
            mask.set(r, c, true);
        }
        let hull = convex_hull_mask(&mask, &ScanlineRasterizer);
        assert_eq!(hull.count(), 25);
    }

    #[test]
    fn test_hull_of_line_is_the_line() {
        let mut mask = Mask::new(3, 6);
        for c in 1..5 {
            mask.set(1, c, true);
        }
        let hull = convex_hull_mask(&mask, &ScanlineRasterizer);
        assert_eq!(hull, mask);
    }

    #[test]
    fn test_empty_mask_has_no_hull() {
        assert!(convex_hull_chain(1, std::iter::empty()).is_none());
    }
}
