use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    error::{LabelError, Result},
    types::GridPoint,
};

/// How object ids are handed back to callers once editing is done.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RenumberPolicy {
    /// Reassign ids to `1..=N` in increasing order of the old id.
    #[default]
    RenumberConsecutively,
    /// Keep ids as edited, gaps included.
    RetainOriginalIds,
}

/// Inclusive pixel bounds of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    fn single(row: usize, col: usize) -> Self {
        Self {
            min_row: row,
            min_col: col,
            max_row: row,
            max_col: col,
        }
    }

    fn include(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }

    /// Half-open `(rows, cols)` window grown by `margin` and clipped to `shape`.
    pub fn window(&self, margin: usize, shape: (usize, usize)) -> (Range<usize>, Range<usize>) {
        let rows = self.min_row.saturating_sub(margin)..(self.max_row + margin + 1).min(shape.0);
        let cols = self.min_col.saturating_sub(margin)..(self.max_col + margin + 1).min(shape.1);
        (rows, cols)
    }
}

/// A 2-D grid of object ids; 0 is background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatrix {
    height: usize,
    width: usize,
    data: Vec<u32>,
}

impl LabelMatrix {
    /// An all-background matrix.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![0; height * width],
        }
    }

    pub fn from_vec(height: usize, width: usize, data: Vec<u32>) -> Result<Self> {
        if data.len() != height * width {
            return Err(LabelError::ShapeMismatch {
                expected: (height, width),
                found: (data.len() / width.max(1), width),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * width);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(LabelError::RaggedRows {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            height: rows.len(),
            width,
            data,
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        if self.width == 0 {
            return vec![Vec::new(); self.height];
        }
        self.data.chunks(self.width).map(<[u32]>::to_vec).collect()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, label: u32) {
        self.data[row * self.width + col] = label;
    }

    pub fn contains(&self, p: GridPoint) -> bool {
        p.row >= 0 && p.col >= 0 && (p.row as usize) < self.height && (p.col as usize) < self.width
    }

    /// Bounds-checked lookup; `None` off the grid.
    pub fn at(&self, p: GridPoint) -> Option<u32> {
        self.contains(p)
            .then(|| self.get(p.row as usize, p.col as usize))
    }

    pub fn ensure_same_shape(&self, other: &LabelMatrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(LabelError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// Distinct non-zero ids in increasing order.
    pub fn labels(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = self.data.iter().copied().filter(|&l| l != 0).collect();
        set.into_iter().collect()
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&l| l == 0)
    }

    pub fn pixel_count(&self, label: u32) -> usize {
        self.data.iter().filter(|&&l| l == label).count()
    }

    /// Bounding box of every id present.
    pub fn bounding_boxes(&self) -> BTreeMap<u32, BoundingBox> {
        let mut boxes: BTreeMap<u32, BoundingBox> = BTreeMap::new();
        for (i, &l) in self.data.iter().enumerate() {
            if l == 0 {
                continue;
            }
            let (row, col) = (i / self.width, i % self.width);
            boxes
                .entry(l)
                .and_modify(|bbox| bbox.include(row, col))
                .or_insert_with(|| BoundingBox::single(row, col));
        }
        boxes
    }

    pub fn bounding_box(&self, label: u32) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        for (i, _) in self.data.iter().enumerate().filter(|&(_, &l)| l == label) {
            let (row, col) = (i / self.width, i % self.width);
            match &mut bbox {
                Some(b) => b.include(row, col),
                None => bbox = Some(BoundingBox::single(row, col)),
            }
        }
        bbox
    }

    /// Centre of mass `(row, col)` of every id present.
    pub fn centroids(&self) -> BTreeMap<u32, (f64, f64)> {
        let mut sums: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
        for (i, &l) in self.data.iter().enumerate() {
            if l == 0 {
                continue;
            }
            let s = sums.entry(l).or_insert((0.0, 0.0, 0));
            s.0 += (i / self.width) as f64;
            s.1 += (i % self.width) as f64;
            s.2 += 1;
        }
        sums.into_iter()
            .map(|(l, (r, c, count))| (l, (r / count as f64, c / count as f64)))
            .collect()
    }

    pub fn mask_of(&self, label: u32) -> Mask {
        Mask {
            height: self.height,
            width: self.width,
            data: self.data.iter().map(|&l| l == label).collect(),
        }
    }

    /// Pixels of `label` inside the half-open window, as a small mask whose
    /// origin is `(rows.start, cols.start)`.
    pub fn window_mask(&self, label: u32, rows: Range<usize>, cols: Range<usize>) -> Mask {
        let mut mask = Mask::new(rows.len(), cols.len());
        for (wr, r) in rows.clone().enumerate() {
            for (wc, c) in cols.clone().enumerate() {
                if self.get(r, c) == label {
                    mask.set(wr, wc, true);
                }
            }
        }
        mask
    }

    pub fn clear_label(&mut self, label: u32) {
        for l in self.data.iter_mut().filter(|l| **l == label) {
            *l = 0;
        }
    }

    /// Write `label` into every set pixel of `mask`. Returns how many pixels
    /// of other objects were overwritten.
    pub fn paint(&mut self, mask: &Mask, label: u32) -> usize {
        let mut overwritten = 0;
        for (l, &m) in self.data.iter_mut().zip(&mask.data) {
            if m {
                if *l != 0 && *l != label {
                    overwritten += 1;
                }
                *l = label;
            }
        }
        overwritten
    }

    /// Replace every id by `mapping[id]`. Ids missing from the mapping
    /// become background.
    pub fn relabel(&self, mapping: &BTreeMap<u32, u32>) -> LabelMatrix {
        LabelMatrix {
            height: self.height,
            width: self.width,
            data: self
                .data
                .iter()
                .map(|l| mapping.get(l).copied().unwrap_or(0))
                .collect(),
        }
    }

    /// Ids become exactly `1..=N`, preserving order. Returns the matrix and
    /// the old-to-new mapping.
    pub fn renumbered(&self) -> (LabelMatrix, BTreeMap<u32, u32>) {
        let mapping: BTreeMap<u32, u32> = self
            .labels()
            .into_iter()
            .zip(1..)
            .collect();
        (self.relabel(&mapping), mapping)
    }

    pub fn with_policy(&self, policy: RenumberPolicy) -> LabelMatrix {
        match policy {
            RenumberPolicy::RenumberConsecutively => self.renumbered().0,
            RenumberPolicy::RetainOriginalIds => self.clone(),
        }
    }

    /// Relate objects of `children` to objects of `self`. Each child's
    /// parent is the id it overlaps most (lowest id on ties, 0 if none).
    /// Returns `(children per parent, parent per child)` over the ids
    /// present in each matrix.
    pub fn relate_children(
        &self,
        children: &LabelMatrix,
    ) -> Result<(BTreeMap<u32, usize>, BTreeMap<u32, u32>)> {
        self.ensure_same_shape(children)?;
        let mut overlap: BTreeMap<(u32, u32), usize> = BTreeMap::new();
        for (&p, &c) in self.data.iter().zip(&children.data) {
            if c != 0 && p != 0 {
                *overlap.entry((c, p)).or_default() += 1;
            }
        }
        let mut parents: BTreeMap<u32, u32> =
            children.labels().into_iter().map(|c| (c, 0)).collect();
        let mut best: BTreeMap<u32, usize> = BTreeMap::new();
        // Keys ascend by parent within a child, so only a strictly larger
        // overlap replaces the current best.
        for (&(child, parent), &n) in &overlap {
            if best.get(&child).is_none_or(|&m| n > m) {
                best.insert(child, n);
                parents.insert(child, parent);
            }
        }
        let mut child_counts: BTreeMap<u32, usize> =
            self.labels().into_iter().map(|p| (p, 0)).collect();
        for &parent in parents.values().filter(|&&p| p != 0) {
            *child_counts.entry(parent).or_default() += 1;
        }
        Ok((child_counts, parents))
    }

    /// Keep each object pixel that sits on the image border or has an
    /// 8-neighbour with a different id; everything else becomes 0.
    pub fn outline(&self) -> LabelMatrix {
        let mut out = LabelMatrix::new(self.height, self.width);
        for row in 0..self.height {
            for col in 0..self.width {
                let l = self.get(row, col);
                if l == 0 {
                    continue;
                }
                let border =
                    row == 0 || col == 0 || row + 1 == self.height || col + 1 == self.width;
                if border || self.differs_around(row, col, l) {
                    out.set(row, col, l);
                }
            }
        }
        out
    }

    fn differs_around(&self, row: usize, col: usize, label: u32) -> bool {
        for r in row.saturating_sub(1)..=(row + 1).min(self.height - 1) {
            for c in col.saturating_sub(1)..=(col + 1).min(self.width - 1) {
                if self.get(r, c) != label {
                    return true;
                }
            }
        }
        false
    }

    /// Pixels labelled `label`, in raster order.
    pub fn pixels_of(&self, label: u32) -> impl Iterator<Item = GridPoint> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(move |&(_, &l)| l == label)
            .map(move |(i, _)| GridPoint::new((i / width) as i32, (i % width) as i32))
    }
}

/// A boolean grid with the same addressing as [`LabelMatrix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    height: usize,
    width: usize,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![false; height * width],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.data[row * self.width + col] = value;
    }

    /// `false` off the grid.
    pub fn at(&self, p: GridPoint) -> bool {
        p.row >= 0
            && p.col >= 0
            && (p.row as usize) < self.height
            && (p.col as usize) < self.width
            && self.get(p.row as usize, p.col as usize)
    }

    /// Set a pixel, ignoring points off the grid.
    pub fn mark(&mut self, p: GridPoint) {
        if p.row >= 0
            && p.col >= 0
            && (p.row as usize) < self.height
            && (p.col as usize) < self.width
        {
            self.set(p.row as usize, p.col as usize, true);
        }
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&m| m).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&m| m)
    }

    pub fn xor_assign(&mut self, other: &Mask) {
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a ^= b;
        }
    }

    pub fn or_assign(&mut self, other: &Mask) {
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a |= b;
        }
    }

    pub fn and(&self, other: &Mask) -> Mask {
        Mask {
            height: self.height,
            width: self.width,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| a && b).collect(),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m)
            .map(move |(i, _)| GridPoint::new((i / width) as i32, (i % width) as i32))
    }

    /// 255 for set pixels, for handing to `imageproc`.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([if self.get(y as usize, x as usize) { 255 } else { 0 }])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LabelMatrix {
        LabelMatrix::from_rows(&[
            vec![0, 0, 0, 0, 0],
            vec![0, 3, 3, 0, 7],
            vec![0, 3, 3, 0, 7],
            vec![0, 0, 0, 0, 7],
        ])
        .expect("rows are rectangular")
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = LabelMatrix::from_rows(&[vec![0, 1], vec![0]]).unwrap_err();
        assert!(matches!(err, LabelError::RaggedRows { row: 1, expected: 2, found: 1 }));
    }

    #[test]
    fn test_renumber_is_consecutive_and_keeps_areas() {
        let labels = sample();
        let (renumbered, mapping) = labels.renumbered();
        assert_eq!(renumbered.labels(), vec![1, 2]);
        assert_eq!(mapping, BTreeMap::from([(3, 1), (7, 2)]));
        assert_eq!(renumbered.pixel_count(1), labels.pixel_count(3));
        assert_eq!(renumbered.pixel_count(2), labels.pixel_count(7));
    }

    #[test]
    fn test_retain_policy_keeps_gaps() {
        let labels = sample();
        assert_eq!(labels.with_policy(RenumberPolicy::RetainOriginalIds), labels);
    }

    #[test]
    fn test_centroids_and_boxes() {
        let labels = sample();
        let centroids = labels.centroids();
        assert_eq!(centroids[&3], (1.5, 1.5));
        assert_eq!(centroids[&7], (2.0, 4.0));
        assert!(!centroids.contains_key(&5));
        let boxes = labels.bounding_boxes();
        assert_eq!(boxes.keys().copied().collect::<Vec<_>>(), vec![3, 7]);
        let b = boxes[&7];
        assert_eq!((b.min_row, b.max_row, b.min_col, b.max_col), (1, 3, 4, 4));
    }

    #[test]
    fn test_outline_marks_border_and_edges() {
        let labels = LabelMatrix::from_rows(&[
            vec![0, 0, 0, 0, 0],
            vec![0, 1, 1, 1, 0],
            vec![0, 1, 1, 1, 0],
            vec![0, 1, 1, 1, 0],
            vec![0, 0, 0, 0, 0],
        ])
        .expect("rows are rectangular");
        let outline = labels.outline();
        assert_eq!(outline.pixel_count(1), 8);
        assert_eq!(outline.get(2, 2), 0);
    }

    #[test]
    fn test_relate_children_picks_largest_overlap() {
        let parents = LabelMatrix::from_rows(&[vec![1, 1, 2, 2, 2]]).expect("one row");
        let children = LabelMatrix::from_rows(&[vec![1, 1, 1, 0, 2]]).expect("one row");
        let (counts, of_child) = parents.relate_children(&children).expect("same shape");
        assert_eq!(of_child, BTreeMap::from([(1, 1), (2, 2)]));
        assert_eq!(counts, BTreeMap::from([(1, 1), (2, 1)]));
    }

    #[test]
    fn test_relate_children_ties_and_orphans() {
        let parents = LabelMatrix::from_rows(&[vec![4, 4, 9, 9, 0, 0]]).expect("one row");
        let children = LabelMatrix::from_rows(&[vec![5, 5, 5, 5, 0, 8]]).expect("one row");
        let (counts, of_child) = parents.relate_children(&children).expect("same shape");
        assert_eq!(of_child, BTreeMap::from([(5, 4), (8, 0)]));
        assert_eq!(counts, BTreeMap::from([(4, 1), (9, 0)]));
    }

    #[test]
    fn test_sparse_huge_ids() {
        let big = 4_000_000_000;
        let parents = LabelMatrix::from_rows(&[vec![big, big, 0], vec![0, 0, big - 1]])
            .expect("rectangular");
        let children = LabelMatrix::from_rows(&[vec![0, 3_999_999_999, 0], vec![0, 0, big]])
            .expect("rectangular");
        let (counts, of_child) = parents.relate_children(&children).expect("same shape");
        assert_eq!(of_child, BTreeMap::from([(big - 1, big), (big, big - 1)]));
        assert_eq!(counts, BTreeMap::from([(big - 1, 1), (big, 1)]));

        assert_eq!(parents.centroids()[&big], (0.0, 0.5));
        assert_eq!(parents.bounding_boxes().len(), 2);
        let (renumbered, mapping) = parents.renumbered();
        assert_eq!(renumbered.labels(), vec![1, 2]);
        assert_eq!(mapping[&big], 2);
    }

    #[test]
    fn test_paint_reports_overwrites() {
        let mut labels = sample();
        let mut mask = Mask::new(4, 5);
        mask.set(1, 1, true);
        mask.set(0, 0, true);
        assert_eq!(labels.paint(&mask, 9), 1);
        assert_eq!(labels.get(1, 1), 9);
    }
}
