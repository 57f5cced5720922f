use crate::labels::{LabelMatrix, Mask};

/// A symmetric set of pixel offsets around the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(i32, i32)>,
    radius: usize,
}

impl StructuringElement {
    /// The `(2 * half + 1)` square; `square(1)` is the 8-connected 3×3.
    pub fn square(half: usize) -> Self {
        let h = half as i32;
        let offsets = (-h..=h)
            .flat_map(|dr| (-h..=h).map(move |dc| (dr, dc)))
            .collect();
        Self {
            offsets,
            radius: half,
        }
    }

    /// Offsets with `dr² + dc² <= radius²`.
    pub fn disk(radius: f64) -> Self {
        let reach = radius.max(0.0).floor() as i32;
        let limit = radius * radius;
        let offsets = (-reach..=reach)
            .flat_map(|dr| (-reach..=reach).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| (dr * dr + dc * dc) as f64 <= limit)
            .collect();
        Self {
            offsets,
            radius: reach as usize,
        }
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Largest row or column reach of any offset.
    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Binary dilation, clipped to the mask bounds.
pub fn dilate(mask: &Mask, element: &StructuringElement) -> Mask {
    let (height, width) = mask.shape();
    let mut out = Mask::new(height, width);
    for p in mask.points() {
        for &(dr, dc) in element.offsets() {
            out.mark(p.offset(dr, dc));
        }
    }
    out
}

/// Give every background pixel the id of its Euclidean-nearest object
/// pixel, leaving object pixels alone. With a `limit`, pixels farther than
/// that stay background.
///
/// Exact two-pass distance transform: nearest object row per column, then
/// the lower envelope of parabolas along each row.
pub fn expand_labels(labels: &LabelMatrix, limit: Option<u32>) -> LabelMatrix {
    let (height, width) = labels.shape();
    let mut out = labels.clone();
    if height == 0 || width == 0 || labels.is_blank() {
        return out;
    }

    let nearest_row = nearest_object_row(labels);
    let limit_sq = limit.map(|l| (l as i64) * (l as i64));

    let mut column_cost: Vec<Option<i64>> = vec![None; width];
    for row in 0..height {
        for (col, cost) in column_cost.iter_mut().enumerate() {
            *cost = nearest_row[row * width + col].map(|site| {
                let d = site as i64 - row as i64;
                d * d
            });
        }
        for (col, nearest) in lower_envelope(&column_cost).into_iter().enumerate() {
            if labels.get(row, col) != 0 {
                continue;
            }
            let Some((site_col, distance_sq)) = nearest else {
                continue;
            };
            if limit_sq.is_some_and(|max| distance_sq > max) {
                continue;
            }
            if let Some(site_row) = nearest_row[row * width + site_col] {
                out.set(row, col, labels.get(site_row, site_col));
            }
        }
    }
    out
}

/// For each pixel, the row of the closest object pixel in its column.
/// Ties go to the row above.
fn nearest_object_row(labels: &LabelMatrix) -> Vec<Option<usize>> {
    let (height, width) = labels.shape();
    let mut nearest = vec![None; height * width];
    for col in 0..width {
        let mut above = None;
        for row in 0..height {
            if labels.get(row, col) != 0 {
                above = Some(row);
            }
            nearest[row * width + col] = above;
        }
        let mut below = None;
        for row in (0..height).rev() {
            if labels.get(row, col) != 0 {
                below = Some(row);
            }
            let idx = row * width + col;
            nearest[idx] = match (nearest[idx], below) {
                (Some(a), Some(b)) if b - row < row - a => Some(b),
                (None, b) => b,
                (a, _) => a,
            };
        }
    }
    nearest
}

/// For each position `c`, the `c'` minimising `(c - c')² + cost[c']` and
/// that minimum. Positions without any finite cost map to `None`.
fn lower_envelope(cost: &[Option<i64>]) -> Vec<Option<(usize, i64)>> {
    let mut sites: Vec<usize> = Vec::new();
    let mut starts: Vec<f64> = Vec::new();
    for (q, gq) in cost.iter().enumerate() {
        let Some(gq) = *gq else { continue };
        loop {
            let Some(&p) = sites.last() else {
                sites.push(q);
                starts.push(f64::NEG_INFINITY);
                break;
            };
            let gp = cost[p].unwrap_or(0);
            let (qi, pi) = (q as i64, p as i64);
            let s = ((gq + qi * qi) - (gp + pi * pi)) as f64 / (2 * (qi - pi)) as f64;
            if starts.last().is_some_and(|&z| s <= z) {
                sites.pop();
                starts.pop();
                continue;
            }
            sites.push(q);
            starts.push(s);
            break;
        }
    }
    if sites.is_empty() {
        return vec![None; cost.len()];
    }

    let mut k = 0;
    (0..cost.len())
        .map(|c| {
            while k + 1 < sites.len() && starts[k + 1] < c as f64 {
                k += 1;
            }
            let site = sites[k];
            let d = c as i64 - site as i64;
            Some((site, d * d + cost[site].unwrap_or(0)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(StructuringElement::square(1).len(), 9);
        assert_eq!(StructuringElement::disk(0.0).len(), 1);
        assert_eq!(StructuringElement::disk(1.0).len(), 5);
        assert_eq!(StructuringElement::disk(1.5).len(), 9);
        assert_eq!(StructuringElement::disk(5.0).len(), 81);
        assert_eq!(StructuringElement::disk(5.0).radius(), 5);
    }

    #[test]
    fn test_dilate_is_clipped() {
        let mut mask = Mask::new(3, 3);
        mask.set(0, 0, true);
        let out = dilate(&mask, &StructuringElement::square(1));
        assert_eq!(out.count(), 4);
    }

    #[test]
    fn test_expand_splits_gap_between_objects() {
        let labels = LabelMatrix::from_rows(&[vec![1, 0, 0, 0, 0, 2]]).expect("one row");
        let expanded = expand_labels(&labels, None);
        assert_eq!(expanded.to_rows(), vec![vec![1, 1, 1, 2, 2, 2]]);
    }

    #[test]
    fn test_expand_respects_limit() {
        let labels = LabelMatrix::from_rows(&[vec![1, 0, 0, 0, 0, 0, 2]]).expect("one row");
        let expanded = expand_labels(&labels, Some(2));
        assert_eq!(expanded.to_rows(), vec![vec![1, 1, 1, 0, 2, 2, 2]]);
    }

    #[test]
    fn test_expand_uses_euclidean_distance() {
        // (0,4) is 4 from object 1 at (0,0) and sqrt(17) from object 2 at (4,5);
        // (4,1) is the mirror case.
        let mut labels = LabelMatrix::new(5, 6);
        labels.set(0, 0, 1);
        labels.set(4, 5, 2);
        let expanded = expand_labels(&labels, None);
        assert_eq!(expanded.get(0, 4), 1);
        assert_eq!(expanded.get(4, 1), 2);
        assert_eq!(expanded.get(3, 5), 2);
        assert!(expanded.as_slice().iter().all(|&l| l != 0));
    }

    #[test]
    fn test_expand_blank_is_noop() {
        let labels = LabelMatrix::new(3, 3);
        assert_eq!(expand_labels(&labels, None), labels);
    }
}
