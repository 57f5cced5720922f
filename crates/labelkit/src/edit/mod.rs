//! Interactive editing of a label matrix through boundary chains.
//!
//! An [`EditSession`] owns a working copy of the labels, the chains of every
//! object currently open for editing and a keep flag per object id. It is
//! driven one [`EditEvent`] at a time; every event either applies fully or is
//! rejected with the session left untouched.

pub mod event;
pub mod geometry;
pub mod mode;

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use geo::Contains;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    algorithms::{convex_hull_mask, MooreTracer, ScanlineRasterizer, TraceOptions},
    error::{IllegalOperation, LabelError, Result},
    labels::{LabelMatrix, RenumberPolicy},
    traits::{BoundaryTracer, PolygonRasterizer},
    types::{BoundaryChain, ChainKind, GridPoint},
};

pub use event::{
    Cursor, EditEvent, EditKey, MouseButton, Panel, RenderHints, Response, Snapshot,
    SplitPreview,
};
pub use mode::{EditMode, VertexRef};

type Outcome = std::result::Result<RenderHints, IllegalOperation>;

/// Tunables for an edit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EditConfig {
    /// Hit-test reach in screen pixels.
    pub hit_radius: f64,
    /// Screen pixels per image pixel.
    pub zoom: f64,
    pub new_object_radius: f64,
    pub new_object_sides: usize,
    pub trace: TraceOptions,
    pub renumber: RenumberPolicy,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            hit_radius: 5.0,
            zoom: 1.0,
            new_object_radius: 20.0,
            new_object_sides: 12,
            trace: TraceOptions::default(),
            renumber: RenumberPolicy::default(),
        }
    }
}

impl EditConfig {
    /// Hit-test reach in image pixels.
    pub fn epsilon(&self) -> f64 {
        self.hit_radius / self.zoom.max(f64::EPSILON)
    }
}

pub struct EditSession {
    original: LabelMatrix,
    labels: LabelMatrix,
    chains: Vec<BoundaryChain>,
    keep: BTreeMap<u32, bool>,
    /// Objects whose chain set shrank and must be rewritten on close even
    /// if no remaining chain is marked edited.
    dirty: BTreeSet<u32>,
    mode: EditMode,
    drag: Option<VertexRef>,
    config: EditConfig,
    tracer: MooreTracer,
    rasterizer: ScanlineRasterizer,
}

impl EditSession {
    pub fn new(labels: LabelMatrix, config: EditConfig) -> Self {
        let keep = fresh_keep(&labels);
        Self {
            original: labels.clone(),
            labels,
            chains: Vec::new(),
            keep,
            dirty: BTreeSet::new(),
            mode: EditMode::Normal,
            drag: None,
            tracer: MooreTracer::new(config.trace),
            rasterizer: ScanlineRasterizer,
            config,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn labels(&self) -> &LabelMatrix {
        &self.labels
    }

    pub fn original(&self) -> &LabelMatrix {
        &self.original
    }

    pub fn chains(&self) -> &[BoundaryChain] {
        &self.chains
    }

    /// Keep flag of every object id.
    pub fn keep(&self) -> &BTreeMap<u32, bool> {
        &self.keep
    }

    /// Ids of objects with live chains, ascending.
    pub fn open_objects(&self) -> Vec<u32> {
        let open: BTreeSet<u32> = self.chains.iter().map(|c| c.object).collect();
        open.into_iter().collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            labels: self.labels.clone(),
            chains: self.chains.clone(),
            keep: self.keep.clone(),
        }
    }

    /// Feed one event.
    pub fn handle(&mut self, event: &EditEvent) -> Response {
        let outcome = match *event {
            EditEvent::Click { at, button, panel } => self.click(at, button, panel),
            EditEvent::Release { .. } => {
                self.drag = None;
                Ok(RenderHints::default())
            }
            EditEvent::Motion { at } => self.motion(at),
            EditEvent::Key { key, at } => self.key(key, at),
            EditEvent::Done => return Response::Finished,
            EditEvent::Cancel => return Response::Cancelled,
        };
        match outcome {
            Ok(hints) => Response::Applied(hints),
            Err(reason) => {
                debug!(event = %event, mode = self.mode.name(), %reason, "rejected edit");
                Response::Rejected(reason)
            }
        }
    }

    /// Replay events until `Done` (or the end of the script) and commit.
    /// `Cancel` aborts with [`LabelError::Cancelled`].
    pub fn run<'a, I>(mut self, events: I) -> Result<LabelMatrix>
    where
        I: IntoIterator<Item = &'a EditEvent>,
    {
        let mut rejected = 0usize;
        for event in events {
            match self.handle(event) {
                Response::Applied(_) => {}
                Response::Rejected(_) => rejected += 1,
                Response::Finished => break,
                Response::Cancelled => {
                    info!("edit session cancelled");
                    return Err(LabelError::Cancelled);
                }
            }
        }
        if rejected > 0 {
            info!(rejected, "edit script had rejected events");
        }
        Ok(self.commit())
    }

    /// Close every open object, drop objects marked remove and apply the
    /// renumbering policy.
    pub fn commit(mut self) -> LabelMatrix {
        self.close_all();
        let mapping: BTreeMap<u32, u32> = self
            .keep
            .iter()
            .map(|(&id, &keep)| (id, if keep { id } else { 0 }))
            .collect();
        let filtered = self.labels.relabel(&mapping);
        let result = filtered.with_policy(self.config.renumber);
        info!(objects = result.labels().len(), "edit session committed");
        result
    }

    /// Discard every edit.
    pub fn abort(self) -> LabelMatrix {
        self.original
    }

    fn epsilon(&self) -> f64 {
        self.config.epsilon()
    }

    fn object_at(&self, at: Cursor) -> Option<u32> {
        self.labels.at(at.to_grid()).filter(|&id| id != 0)
    }

    fn click(&mut self, at: Cursor, button: MouseButton, panel: Panel) -> Outcome {
        match (panel, button) {
            (Panel::Keep, _) => self.set_keep_at(at, false),
            (Panel::Remove, _) => self.set_keep_at(at, true),
            (Panel::Original, MouseButton::Primary) => match self.mode {
                EditMode::Normal => self.press(at),
                EditMode::SplitPickFirst => self.pick_first(at),
                EditMode::SplitPickSecond { anchor, .. } => self.pick_second(anchor, at),
            },
            (Panel::Original, MouseButton::Secondary) => {
                if self.mode.is_splitting() {
                    return Err(IllegalOperation::WrongMode(self.mode.name()));
                }
                self.open_or_close(at)
            }
        }
    }

    fn set_keep_at(&mut self, at: Cursor, keep: bool) -> Outcome {
        let id = self.object_at(at).ok_or(IllegalOperation::NoObject)?;
        self.keep.insert(id, keep);
        Ok(RenderHints::keep())
    }

    /// Primary press in the editable panel: grab a control point, or else
    /// toggle the object under the cursor.
    fn press(&mut self, at: Cursor) -> Outcome {
        if let Some(vertex) = geometry::nearest_vertex(&self.chains, at, self.epsilon()) {
            self.drag = Some(vertex);
            return Ok(RenderHints::default());
        }
        let id = self.object_at(at).ok_or(IllegalOperation::NoObject)?;
        let flag = self.keep.entry(id).or_insert(true);
        *flag = !*flag;
        Ok(RenderHints::keep())
    }

    fn open_or_close(&mut self, at: Cursor) -> Outcome {
        if let Some(index) = geometry::chain_under(&self.chains, at) {
            let id = self.chains[index].object;
            self.close_object(id);
            debug!(object = id, "closed object");
            return Ok(RenderHints::labels());
        }
        let id = self.object_at(at).ok_or(IllegalOperation::NoObject)?;
        if self.chains.iter().any(|c| c.object == id) {
            return Err(IllegalOperation::AlreadyOpen(id));
        }
        let traced = self.tracer.trace(&self.labels, id);
        debug!(object = id, chains = traced.len(), "opened object");
        self.chains.extend(traced);
        Ok(RenderHints::chains())
    }

    fn motion(&mut self, at: Cursor) -> Outcome {
        if let EditMode::SplitPickSecond { anchor, .. } = self.mode {
            self.mode = EditMode::SplitPickSecond { anchor, cursor: at };
            let legal = geometry::nearest_vertex(&self.chains, at, self.epsilon())
                .is_some_and(|second| self.check_split(anchor, second).is_ok());
            let from = self.chains[anchor.chain].vertices()[anchor.index];
            return Ok(RenderHints {
                preview: Some(SplitPreview { from, to: at, legal }),
                ..RenderHints::default()
            });
        }
        let Some(target) = self.drag else {
            return Ok(RenderHints::default());
        };
        let to = at.to_grid();
        if geometry::drag_crosses_edges(&self.chains, target, to) {
            return Err(IllegalOperation::SelfIntersection);
        }
        self.chains[target.chain].set_vertex(target.index, to);
        Ok(RenderHints::chains())
    }

    fn key(&mut self, key: EditKey, at: Cursor) -> Outcome {
        match key {
            EditKey::Escape => return Ok(self.escape()),
            EditKey::KeepAll => return Ok(self.set_all_keep(|_| true)),
            EditKey::RemoveAll => return Ok(self.set_all_keep(|_| false)),
            EditKey::InvertAll => return Ok(self.set_all_keep(|k| !k)),
            EditKey::Reset => return Ok(self.reset()),
            _ => {}
        }
        if self.mode.is_splitting() {
            return Err(IllegalOperation::WrongMode(self.mode.name()));
        }
        match key {
            EditKey::Join => self.join(),
            EditKey::ConvexHull => self.convex_hull(),
            EditKey::AddPoint => self.add_point(at),
            EditKey::DeletePoint => self.delete_point(at),
            EditKey::NewObject => self.new_object(at),
            EditKey::Split => {
                if self.chains.is_empty() {
                    return Err(IllegalOperation::NothingOpen);
                }
                self.drag = None;
                self.mode = EditMode::SplitPickFirst;
                debug!("entered split mode");
                Ok(RenderHints::default())
            }
            EditKey::Escape
            | EditKey::KeepAll
            | EditKey::RemoveAll
            | EditKey::InvertAll
            | EditKey::Reset => Ok(RenderHints::default()),
        }
    }

    fn escape(&mut self) -> RenderHints {
        if self.mode.is_splitting() {
            debug!(from = self.mode.name(), "left split mode");
            self.mode = EditMode::Normal;
            return RenderHints::default();
        }
        debug!(chains = self.chains.len(), "discarded open chains");
        self.chains.clear();
        self.dirty.clear();
        self.drag = None;
        RenderHints::chains()
    }

    fn set_all_keep(&mut self, f: impl Fn(bool) -> bool) -> RenderHints {
        for keep in self.keep.values_mut() {
            *keep = f(*keep);
        }
        RenderHints::keep()
    }

    fn reset(&mut self) -> RenderHints {
        self.labels = self.original.clone();
        self.keep = fresh_keep(&self.original);
        self.chains.clear();
        self.dirty.clear();
        self.mode = EditMode::Normal;
        self.drag = None;
        debug!("session reset");
        RenderHints::labels()
    }

    /// Rasterize the object's chains into the working labels if anything
    /// changed, then drop its chains.
    fn close_object(&mut self, id: u32) {
        self.commit_object(id, true);
        self.chains.retain(|c| c.object != id);
    }

    fn commit_object(&mut self, id: u32, warn_on_overlap: bool) {
        let was_dirty = self.dirty.remove(&id);
        let edited = self.chains.iter().any(|c| c.object == id && c.edited);
        if !(was_dirty || edited) {
            return;
        }
        let mask = self
            .rasterizer
            .rasterize(self.chains.iter().filter(|c| c.object == id), self.labels.shape());
        self.labels.clear_label(id);
        let overwritten = self.labels.paint(&mask, id);
        if overwritten > 0 && warn_on_overlap {
            warn!(object = id, overwritten, "committed object overwrote other objects");
        }
    }

    fn close_all(&mut self) {
        let mut ids: BTreeSet<u32> = self.open_objects().into_iter().collect();
        ids.extend(self.dirty.iter().copied());
        for id in ids {
            self.close_object(id);
        }
        self.drag = None;
    }

    fn retrace(&mut self, id: u32) {
        let traced = self.tracer.trace(&self.labels, id);
        self.chains.extend(traced);
    }

    /// Merge already-closed objects into the lowest id and close the gaps
    /// the merged ids leave. Returns the surviving id.
    fn merge_objects(&mut self, ids: &[u32]) -> u32 {
        let primary = ids[0];
        let merged: BTreeSet<u32> = ids[1..].iter().copied().collect();
        let shifted = |id: u32| id - merged.range(..id).count() as u32;

        let mut mapping = BTreeMap::new();
        let mut keep = BTreeMap::new();
        for (&old, &flag) in &self.keep {
            if merged.contains(&old) {
                mapping.insert(old, shifted(primary));
            } else {
                mapping.insert(old, shifted(old));
                keep.insert(shifted(old), flag);
            }
        }
        self.labels = self.labels.relabel(&mapping);
        self.keep = keep;
        shifted(primary)
    }

    /// One past the highest id in use.
    fn next_id(&self) -> std::result::Result<u32, IllegalOperation> {
        match self.keep.keys().next_back() {
            Some(&id) => id.checked_add(1).ok_or(IllegalOperation::IdsExhausted),
            None => Ok(1),
        }
    }

    fn join(&mut self) -> Outcome {
        let open = self.open_objects();
        if open.len() < 2 {
            return Err(IllegalOperation::TooFewObjects(open.len()));
        }
        self.close_all();
        let primary = self.merge_objects(&open);
        self.retrace(primary);
        debug!(into = primary, merged = open.len(), "joined objects");
        Ok(RenderHints::labels())
    }

    fn convex_hull(&mut self) -> Outcome {
        let open = self.open_objects();
        if open.is_empty() {
            return Err(IllegalOperation::NothingOpen);
        }
        self.close_all();
        let primary = if open.len() > 1 {
            self.merge_objects(&open)
        } else {
            open[0]
        };
        let hull = convex_hull_mask(&self.labels.mask_of(primary), &self.rasterizer);
        let overwritten = self.labels.paint(&hull, primary);
        if overwritten > 0 {
            warn!(object = primary, overwritten, "convex hull overwrote other objects");
        }
        self.retrace(primary);
        debug!(object = primary, "replaced object with its convex hull");
        Ok(RenderHints::labels())
    }

    fn add_point(&mut self, at: Cursor) -> Outcome {
        if self.chains.is_empty() {
            return Err(IllegalOperation::NothingOpen);
        }
        let insertion =
            geometry::nearest_segment(&self.chains, at).ok_or(IllegalOperation::NoSegmentInRange)?;
        self.chains[insertion.chain].insert_after(insertion.after, insertion.point);
        Ok(RenderHints::chains())
    }

    fn delete_point(&mut self, at: Cursor) -> Outcome {
        let vertex = geometry::nearest_vertex(&self.chains, at, self.epsilon())
            .ok_or(IllegalOperation::NoVertex)?;
        self.drag = None;
        if self.chains[vertex.chain].len() <= 4 {
            let removed = self.chains.remove(vertex.chain);
            debug!(object = removed.object, "removed chain below minimum size");
            self.dirty.insert(removed.object);
        } else {
            self.chains[vertex.chain].remove_vertex(vertex.index);
        }
        Ok(RenderHints::chains())
    }

    fn new_object(&mut self, at: Cursor) -> Outcome {
        let id = self.next_id()?;
        let (height, width) = self.labels.shape();
        let max_row = height.saturating_sub(1) as f64;
        let max_col = width.saturating_sub(1) as f64;
        let sides = self.config.new_object_sides.max(3);
        let radius = self.config.new_object_radius;
        let points = (0..=sides)
            .map(|k| {
                let angle = TAU * k as f64 / sides as f64;
                let row = (at.row + radius * angle.sin()).clamp(0.0, max_row);
                let col = (at.col + radius * angle.cos()).clamp(0.0, max_col);
                GridPoint::new(row.round() as i32, col.round() as i32)
            })
            .collect();
        self.chains
            .push(BoundaryChain::new(id, ChainKind::Outside, points).into_edited());
        self.keep.insert(id, true);
        debug!(object = id, "created object");
        Ok(RenderHints::chains())
    }

    fn pick_first(&mut self, at: Cursor) -> Outcome {
        let anchor = geometry::nearest_vertex(&self.chains, at, self.epsilon())
            .ok_or(IllegalOperation::NoVertex)?;
        self.mode = EditMode::SplitPickSecond { anchor, cursor: at };
        debug!(chain = anchor.chain, index = anchor.index, "picked first split point");
        Ok(RenderHints::default())
    }

    fn pick_second(&mut self, anchor: VertexRef, at: Cursor) -> Outcome {
        let second = geometry::nearest_vertex(&self.chains, at, self.epsilon())
            .ok_or(IllegalOperation::NoVertex)?;
        self.check_split(anchor, second)?;
        let hints = if anchor.chain == second.chain {
            self.split_chain(anchor.chain, anchor.index, second.index)?
        } else {
            self.bridge_chains(anchor, second)
        };
        self.mode = EditMode::Normal;
        Ok(hints)
    }

    fn check_split(
        &self,
        a: VertexRef,
        b: VertexRef,
    ) -> std::result::Result<(), IllegalOperation> {
        let (ca, cb) = (&self.chains[a.chain], &self.chains[b.chain]);
        if ca.object != cb.object {
            return Err(IllegalOperation::DifferentObjects);
        }
        if a.chain == b.chain {
            let (lo, hi) = (a.index.min(b.index), a.index.max(b.index));
            if hi - lo < 2 || (ca.len() - hi <= 2 && lo == 0) {
                return Err(IllegalOperation::SplitTooClose);
            }
            return Ok(());
        }
        let (outer, hole) = match (ca.is_outside(), cb.is_outside()) {
            (true, false) => (ca, cb),
            (false, true) => (cb, ca),
            _ => return Err(IllegalOperation::SplitWrongChains),
        };
        if !outer.to_polygon().contains(&hole.to_polygon()) {
            return Err(IllegalOperation::SplitWrongChains);
        }
        Ok(())
    }

    /// Cut one outer chain along the chord between two of its vertices. The
    /// piece holding the original start keeps the id; the other becomes a
    /// new object. Both are committed and re-traced.
    fn split_chain(&mut self, chain: usize, a: usize, b: usize) -> Outcome {
        if !self.chains[chain].is_outside() {
            return Ok(self.split_hole(chain, a, b));
        }
        let new = self.next_id()?;
        let (lo, hi) = (a.min(b), a.max(b));
        let old = self.chains[chain].object;
        self.keep.insert(new, true);

        let points = self.chains[chain].points().to_vec();
        let mut kept: Vec<GridPoint> = points[..=lo].to_vec();
        kept.extend_from_slice(&points[hi..]);
        let cut = points[lo..=hi].to_vec();

        let kept = BoundaryChain::new(old, ChainKind::Outside, kept).into_edited();
        let cut = BoundaryChain::new(new, ChainKind::Outside, cut).into_edited();
        let cut_polygon = cut.to_polygon();
        self.chains[chain] = kept;
        self.chains.push(cut);

        for hole in self.chains.iter_mut() {
            if hole.object == old && !hole.is_outside() {
                if cut_polygon.contains(&hole.to_polygon()) {
                    hole.object = new;
                }
                hole.edited = true;
            }
        }

        self.close_object(old);
        self.commit_object(new, false);
        self.chains.retain(|c| c.object != new);
        self.retrace(old);
        self.retrace(new);
        debug!(object = old, new, "split object");
        Ok(RenderHints::labels())
    }

    /// Cut a hole along the chord between two of its vertices. Both pieces
    /// stay holes of the same object, so the chord becomes a strip of object
    /// pixels across the hole.
    fn split_hole(&mut self, chain: usize, a: usize, b: usize) -> RenderHints {
        let (lo, hi) = (a.min(b), a.max(b));
        let object = self.chains[chain].object;
        let points = self.chains[chain].points().to_vec();
        let mut kept: Vec<GridPoint> = points[..=lo].to_vec();
        kept.extend_from_slice(&points[hi..]);
        let cut = points[lo..=hi].to_vec();

        self.chains[chain] = BoundaryChain::new(object, ChainKind::Hole, kept).into_edited();
        self.chains
            .push(BoundaryChain::new(object, ChainKind::Hole, cut).into_edited());
        self.close_object(object);
        self.retrace(object);
        debug!(object, "split hole");
        RenderHints::labels()
    }

    /// Join an outer chain and one of its holes into a single chain through
    /// the two picked vertices. Each picked vertex is replaced by the points
    /// halfway to its neighbours, leaving a narrow gap between the chains.
    fn bridge_chains(&mut self, a: VertexRef, b: VertexRef) -> RenderHints {
        let (outer, inner) = if self.chains[a.chain].is_outside() {
            (a, b)
        } else {
            (b, a)
        };
        let outer_vertices = self.chains[outer.chain].vertices();
        let inner_vertices = self.chains[inner.chain].vertices();
        let (n, m) = (outer_vertices.len(), inner_vertices.len());
        let (outer_left, outer_right) = geometry::gap_ends(outer_vertices, outer.index);
        let (inner_left, inner_right) = geometry::gap_ends(inner_vertices, inner.index);

        let mut points: Vec<GridPoint> = (1..n)
            .map(|k| outer_vertices[(outer.index + k) % n])
            .collect();
        points.extend([outer_left, inner_right]);
        points.extend((1..m).map(|k| inner_vertices[(inner.index + k) % m]));
        points.extend([inner_left, outer_right]);
        points.dedup();

        let object = self.chains[outer.chain].object;
        self.chains[outer.chain] =
            BoundaryChain::new(object, ChainKind::Outside, points).into_edited();
        self.chains.remove(inner.chain);
        debug!(object, "bridged outer chain and hole");
        RenderHints::chains()
    }
}

fn fresh_keep(labels: &LabelMatrix) -> BTreeMap<u32, bool> {
    labels.labels().into_iter().map(|id| (id, true)).collect()
}
