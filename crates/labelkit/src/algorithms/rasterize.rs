use imageproc::drawing::BresenhamLineIter;

use crate::{
    labels::Mask,
    traits::PolygonRasterizer,
    types::{BoundaryChain, GridPoint},
};

/// Boundary-fill rasterizer: every pixel on a chain edge plus every pixel
/// centre inside the chain under the even-odd rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanlineRasterizer;

impl ScanlineRasterizer {
    fn draw_edges(chain: &BoundaryChain, mask: &mut Mask) {
        for (a, b) in chain.segments() {
            let line = BresenhamLineIter::new(
                (a.col as f32, a.row as f32),
                (b.col as f32, b.row as f32),
            );
            for (x, y) in line {
                mask.mark(GridPoint::new(y, x));
            }
            mask.mark(a);
            mask.mark(b);
        }
        if let [only] = chain.points() {
            mask.mark(*only);
        }
    }

    fn fill_interior(chain: &BoundaryChain, mask: &mut Mask) {
        let (height, width) = mask.shape();
        if height == 0 || width == 0 || chain.len() < 3 {
            return;
        }
        let (min_row, max_row) = chain
            .points()
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.row), hi.max(p.row)));
        let first_row = min_row.max(0);
        let last_row = max_row.min(height as i32 - 1);

        let mut crossings: Vec<f64> = Vec::new();
        for row in first_row..=last_row {
            crossings.clear();
            let y = row as f64;
            for (a, b) in chain.segments() {
                let (y0, y1) = (a.row as f64, b.row as f64);
                if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                    let (x0, x1) = (a.col as f64, b.col as f64);
                    crossings.push(x0 + (y - y0) * (x1 - x0) / (y1 - y0));
                }
            }
            crossings.sort_by(f64::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let start = pair[0].ceil().max(0.0) as i64;
                let end = pair[1].floor().min(width as f64 - 1.0) as i64;
                for col in start..=end {
                    mask.set(row as usize, col as usize, true);
                }
            }
        }
    }
}

impl PolygonRasterizer for ScanlineRasterizer {
    fn fill_chain(&self, chain: &BoundaryChain, shape: (usize, usize)) -> Mask {
        let mut mask = Mask::new(shape.0, shape.1);
        Self::fill_interior(chain, &mut mask);
        Self::draw_edges(chain, &mut mask);
        mask
    }
}

/// Rasterize all chains of one object, combined by symmetric difference.
pub fn polygon_to_mask<'a, I>(chains: I, shape: (usize, usize)) -> Mask
where
    I: IntoIterator<Item = &'a BoundaryChain>,
{
    ScanlineRasterizer.rasterize(chains, shape)
}
