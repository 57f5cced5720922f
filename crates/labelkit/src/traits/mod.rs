use crate::{
    labels::{LabelMatrix, Mask},
    types::BoundaryChain,
};

/// Trait for turning one object of a label matrix into boundary chains
pub trait BoundaryTracer: Send + Sync {
    /// Trace every outer and hole boundary of `object`. Objects without
    /// pixels yield no chains.
    fn trace(&self, labels: &LabelMatrix, object: u32) -> Vec<BoundaryChain>;
}

/// Trait for turning the chains of one object back into pixels
pub trait PolygonRasterizer: Send + Sync {
    /// Fill a single closed chain onto a mask of the given `(height, width)`.
    fn fill_chain(&self, chain: &BoundaryChain, shape: (usize, usize)) -> Mask;

    /// Combine all chains of one object by symmetric difference, in order.
    fn rasterize<'a, I>(&self, chains: I, shape: (usize, usize)) -> Mask
    where
        I: IntoIterator<Item = &'a BoundaryChain>,
        Self: Sized,
    {
        let mut mask = Mask::new(shape.0, shape.1);
        for chain in chains {
            mask.xor_assign(&self.fill_chain(chain, shape));
        }
        mask
    }
}
