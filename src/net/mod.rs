//! # ControlNet
//!
//! Owns every point (and through them every measure), the image adjacency
//! graph, the per-image camera map and the per-image measure counters.
//!
//! ## Mutation protocol
//!
//! Points inside a net are read through `point()` and edited through
//! `point_mut()`, which returns a [`PointMut`] handle. Any change that
//! affects the graph (adding, deleting or (un)ignoring a point or measure,
//! renaming a point) updates the graph bookkeeping before the call returns,
//! so that after each public call:
//!
//! - every measure's serial has a vertex, and each vertex lists exactly the
//!   points with a measure in that image;
//! - the strength of edge `{u, v}` equals the number of non-ignored points
//!   holding non-ignored measures on both `u` and `v`;
//! - per-image valid-measure counts match the non-ignored measures.

pub mod handle;
pub mod images;
pub mod observer;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::NetConfig;
use crate::graph::AdjacencyGraph;
use crate::model::{
    ControlMeasure, ControlPoint, CoordinateType, MeasureStatistic, PointStatus,
};
use crate::{Error, Result};

pub use handle::{MeasureMut, PointMut};
pub use images::{Camera, ImageOpener, SerialNumberList};
pub use observer::NetObserver;

/// `find_closest` ignores measures farther than this many pixels.
pub const SEARCH_DISTANCE: f64 = 99_999_999.0;

// ============================================================================
// NetId
// ============================================================================

static NEXT_NET_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a `ControlNet`, used as the point → net
/// back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetId(pub u64);

impl NetId {
    fn next() -> Self {
        NetId(NEXT_NET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

// ============================================================================
// ControlNet
// ============================================================================

pub struct ControlNet {
    id: NetId,
    network_id: String,
    target_name: String,
    user_name: String,
    created: String,
    modified: String,
    description: String,
    coordinate_type: CoordinateType,
    // points drop before cameras
    points: Vec<ControlPoint>,
    /// point id → position in `points`
    index: HashMap<String, usize>,
    graph: AdjacencyGraph,
    cameras: HashMap<String, Arc<dyn Camera>>,
    images_bound: bool,
    valid_counts: HashMap<String, usize>,
    rejected_counts: HashMap<String, usize>,
    mutex: Option<Arc<Mutex<()>>>,
    observer: Option<Box<dyn NetObserver>>,
    taken: bool,
    config: NetConfig,
}

impl ControlNet {
    pub fn new(coordinate_type: CoordinateType) -> Self {
        Self::with_config(coordinate_type, NetConfig::default())
    }

    pub fn with_config(coordinate_type: CoordinateType, config: NetConfig) -> Self {
        Self {
            id: NetId::next(),
            network_id: String::new(),
            target_name: String::new(),
            user_name: String::new(),
            created: String::new(),
            modified: String::new(),
            description: String::new(),
            coordinate_type,
            points: Vec::new(),
            index: HashMap::new(),
            graph: AdjacencyGraph::new(),
            cameras: HashMap::new(),
            images_bound: false,
            valid_counts: HashMap::new(),
            rejected_counts: HashMap::new(),
            mutex: None,
            observer: None,
            taken: false,
            config,
        }
    }

    pub fn id(&self) -> NetId {
        self.id
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    // ========================================================================
    // Header
    // ========================================================================

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    pub fn set_network_id(&mut self, id: impl Into<String>) {
        self.network_id = id.into();
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target_name = target.into();
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn set_user_name(&mut self, name: impl Into<String>) {
        self.user_name = name.into();
    }

    pub fn created(&self) -> &str {
        &self.created
    }

    pub fn set_created_date(&mut self, date: impl Into<String>) {
        self.created = date.into();
    }

    pub fn set_created_now(&mut self) {
        self.created = crate::model::timestamp();
    }

    pub fn modified(&self) -> &str {
        &self.modified
    }

    pub fn set_modified_date(&mut self, date: impl Into<String>) {
        self.modified = date.into();
    }

    pub fn set_modified_now(&mut self) {
        self.modified = crate::model::timestamp();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn coordinate_type(&self) -> CoordinateType {
        self.coordinate_type
    }

    /// Change the frame surface points are held and written in. Every
    /// point already in the network is re-expressed in the new frame.
    pub fn set_coordinate_type(&mut self, coordinate_type: CoordinateType) {
        self.coordinate_type = coordinate_type;
        for p in &mut self.points {
            p.express_in(coordinate_type);
        }
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Lock held around every call into the camera layer.
    pub fn set_mutex(&mut self, mutex: Arc<Mutex<()>>) {
        self.mutex = Some(mutex);
    }

    pub fn mutex(&self) -> Option<&Arc<Mutex<()>>> {
        self.mutex.as_ref()
    }

    pub fn set_observer(&mut self, observer: Box<dyn NetObserver>) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) -> Option<Box<dyn NetObserver>> {
        self.observer.take()
    }

    pub fn camera(&self, serial: &str) -> Option<&Arc<dyn Camera>> {
        self.cameras.get(serial)
    }

    pub fn images_bound(&self) -> bool {
        self.images_bound
    }

    // ========================================================================
    // Point lifecycle
    // ========================================================================

    /// Take ownership of `point` and wire its measures into the graph.
    pub fn add_point(&mut self, mut point: ControlPoint) -> Result<()> {
        if self.taken {
            return Err(Error::programmer(
                "Cannot add points to a network whose points have been taken",
            ));
        }
        if point.id().is_empty() {
            return Err(Error::programmer("Control point has no id"));
        }
        if self.index.contains_key(point.id()) {
            return Err(Error::programmer(format!(
                "ControlPoint must have unique Id [{}]",
                point.id()
            )));
        }

        point.set_parent(Some(self.id));
        point.express_in(self.coordinate_type);
        if self.images_bound {
            for m in point.measures_mut() {
                if let Some(camera) = self.cameras.get(m.serial()) {
                    m.set_camera(Some(Arc::clone(camera)));
                }
            }
        }

        let position = self.points.len();
        self.index.insert(point.id().to_string(), position);
        self.points.push(point);

        let point = &self.points[position];
        let mut wiring = Wiring::new(
            &mut self.graph,
            &mut self.valid_counts,
            &mut self.observer,
            &self.cameras,
            self.mutex.as_ref(),
        );
        wiring.attach_point(point)?;
        wiring.notify(|o| o.point_added(point.id()));

        tracing::debug!(id = point.id(), measures = point.num_measures(), "point added");
        Ok(())
    }

    /// Remove the point `id`. Edit-locked points are left in place.
    pub fn delete_point(&mut self, id: &str) -> Result<PointStatus> {
        let position = self.position(id)?;
        self.delete_point_at(position)
    }

    pub fn delete_point_at(&mut self, index: usize) -> Result<PointStatus> {
        let point = self.points.get(index).ok_or_else(|| self.index_error(index))?;
        if point.is_edit_locked() {
            return Ok(PointStatus::PointLocked);
        }

        let mut wiring = Wiring::new(
            &mut self.graph,
            &mut self.valid_counts,
            &mut self.observer,
            &self.cameras,
            self.mutex.as_ref(),
        );
        wiring.detach_point(point)?;

        let mut point = self.points.remove(index);
        point.set_parent(None);
        self.index.remove(point.id());
        for (i, p) in self.points.iter().enumerate().skip(index) {
            if let Some(slot) = self.index.get_mut(p.id()) {
                *slot = i;
            }
        }

        if let Some(observer) = self.observer.as_deref_mut() {
            observer.point_deleted(point.id());
        }
        tracing::debug!(id = point.id(), "point deleted");
        Ok(PointStatus::Success)
    }

    /// Move every point out of the network, leaving it empty.
    ///
    /// The returned points are detached. A second call is an error.
    pub fn take(&mut self) -> Result<Vec<ControlPoint>> {
        if self.taken {
            return Err(Error::programmer(
                "Ownership has already been taken from this network",
            ));
        }
        self.taken = true;

        let mut points = std::mem::take(&mut self.points);
        for p in &mut points {
            p.set_parent(None);
        }
        self.index.clear();
        self.graph.clear();
        self.cameras.clear();
        self.valid_counts.clear();
        self.rejected_counts.clear();
        self.images_bound = false;

        if let Some(observer) = self.observer.as_deref_mut() {
            observer.structure_modified();
        }
        tracing::debug!(points = points.len(), "network taken");
        Ok(points)
    }

    /// Remove every removable measure on `serial`. Returns how many went.
    pub fn delete_measures_with_serial(&mut self, serial: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .graph
            .points_in(serial)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut removed = 0;
        for id in ids {
            if self.point_mut(&id)?.delete(serial)? == PointStatus::Success {
                removed += 1;
            }
        }
        Ok(removed)
    }

    // ========================================================================
    // Point access
    // ========================================================================

    pub fn point(&self, id: &str) -> Option<&ControlPoint> {
        self.index.get(id).map(|&i| &self.points[i])
    }

    pub fn point_at(&self, index: usize) -> Result<&ControlPoint> {
        self.points.get(index).ok_or_else(|| self.index_error(index))
    }

    /// Editing handle for the point `id`.
    pub fn point_mut(&mut self, id: &str) -> Result<PointMut<'_>> {
        let position = self.position(id)?;
        Ok(self.handle(position))
    }

    pub fn point_mut_at(&mut self, index: usize) -> Result<PointMut<'_>> {
        if index >= self.points.len() {
            return Err(self.index_error(index));
        }
        Ok(self.handle(index))
    }

    fn handle(&mut self, position: usize) -> PointMut<'_> {
        PointMut::new(
            &mut self.points[position],
            &mut self.index,
            self.coordinate_type,
            Wiring::new(
                &mut self.graph,
                &mut self.valid_counts,
                &mut self.observer,
                &self.cameras,
                self.mutex.as_ref(),
            ),
        )
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.index.get(id).copied().ok_or_else(|| {
            Error::programmer(format!("Control point [{id}] does not exist in the network"))
        })
    }

    fn index_error(&self, index: usize) -> Error {
        Error::programmer(format!(
            "Index [{index}] out of range for network with [{}] points",
            self.points.len()
        ))
    }

    pub fn contains_point(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Points in insertion order.
    pub fn points(&self) -> std::slice::Iter<'_, ControlPoint> {
        self.points.iter()
    }

    pub fn point_ids(&self) -> Vec<&str> {
        self.points.iter().map(ControlPoint::id).collect()
    }

    // ========================================================================
    // Counters
    // ========================================================================

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_valid_points(&self) -> usize {
        self.active_points().count()
    }

    pub fn num_measures(&self) -> usize {
        self.points.iter().map(ControlPoint::num_measures).sum()
    }

    /// Non-ignored measures in non-ignored points.
    pub fn num_valid_measures(&self) -> usize {
        self.active_points().map(ControlPoint::num_valid_measures).sum()
    }

    /// Ignored measures in non-ignored points.
    pub fn num_ignored_measures(&self) -> usize {
        self.active_points()
            .map(|p| p.num_measures() - p.num_valid_measures())
            .sum()
    }

    pub fn num_edit_lock_points(&self) -> usize {
        self.points.iter().filter(|p| p.is_edit_locked()).count()
    }

    /// Effectively locked measures in non-ignored points.
    pub fn num_edit_lock_measures(&self) -> usize {
        self.active_points().map(ControlPoint::num_locked_measures).sum()
    }

    fn active_points(&self) -> impl Iterator<Item = &ControlPoint> + '_ {
        self.points.iter().filter(|p| !p.is_ignored())
    }

    // ========================================================================
    // Image queries
    // ========================================================================

    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }

    /// Every image serial with a vertex, in first-seen order.
    pub fn cube_serials(&self) -> Vec<&str> {
        self.graph.serials().collect()
    }

    pub fn adjacent_images(&self, serial: &str) -> Vec<&str> {
        self.graph.adjacent(serial)
    }

    pub fn measures_in_cube(&self, serial: &str) -> Vec<&ControlMeasure> {
        self.graph
            .points_in(serial)
            .into_iter()
            .filter_map(|id| self.point(id)?.measure(serial))
            .collect()
    }

    pub fn valid_measures_in_cube(&self, serial: &str) -> Vec<&ControlMeasure> {
        self.measures_in_cube(serial)
            .into_iter()
            .filter(|m| !m.is_ignored())
            .collect()
    }

    pub fn num_valid_measures_in_image(&self, serial: &str) -> usize {
        if self.images_bound {
            return self.valid_counts.get(serial).copied().unwrap_or(0);
        }
        self.valid_measures_in_cube(serial).len()
    }

    pub fn num_rejected_measures_in_image(&self, serial: &str) -> usize {
        self.rejected_counts.get(serial).copied().unwrap_or(0)
    }

    pub fn increment_rejected_measures_in_image(&mut self, serial: &str) {
        *self.rejected_counts.entry(serial.to_string()).or_insert(0) += 1;
    }

    /// Floored at zero.
    pub fn decrement_rejected_measures_in_image(&mut self, serial: &str) {
        if let Some(count) = self.rejected_counts.get_mut(serial) {
            *count = count.saturating_sub(1);
        }
    }

    // ========================================================================
    // Residuals and statistics
    // ========================================================================

    /// Measures of non-ignored points whose `which` lies in `(min, max]`,
    /// ascending by that value.
    pub fn sorted_measure_list(
        &self,
        which: MeasureStatistic,
        min: f64,
        max: f64,
    ) -> Vec<&ControlMeasure> {
        let mut selected: Vec<(f64, &ControlMeasure)> = self
            .active_points()
            .flat_map(|p| p.iter())
            .filter(|m| !m.is_ignored())
            .filter_map(|m| {
                let value = m.statistic(which)?;
                (value > min && value <= max).then_some((value, m))
            })
            .collect();
        selected.sort_by(|a, b| a.0.total_cmp(&b.0));
        selected.into_iter().map(|(_, m)| m).collect()
    }

    /// Mean over non-ignored points of each point's mean residual
    /// magnitude. Points without residuals are skipped.
    pub fn average_residual(&self) -> Option<f64> {
        let averages: Vec<f64> = self
            .active_points()
            .filter_map(|p| p.statistic(MeasureStatistic::ResidualMagnitude).average())
            .collect();
        if averages.is_empty() {
            return None;
        }
        Some(averages.iter().sum::<f64>() / averages.len() as f64)
    }

    /// Largest residual magnitude among non-ignored measures of non-ignored
    /// points.
    pub fn maximum_residual(&self) -> Option<f64> {
        self.active_points()
            .filter_map(|p| p.statistic(MeasureStatistic::ResidualMagnitude).maximum())
            .reduce(f64::max)
    }

    pub fn compute_residuals(&mut self) -> Result<()> {
        let mutex = self.mutex.clone();
        let _guard = mutex.as_ref().map(|m| m.lock());
        for p in self.points.iter_mut().filter(|p| !p.is_ignored()) {
            p.compute_residuals()?;
        }
        Ok(())
    }

    pub fn compute_apriori(&mut self) -> Result<()> {
        let mutex = self.mutex.clone();
        let _guard = mutex.as_ref().map(|m| m.lock());
        let frame = self.coordinate_type;
        for p in self.points.iter_mut().filter(|p| !p.is_ignored()) {
            p.compute_apriori()?;
            p.express_in(frame);
        }
        Ok(())
    }

    /// Point whose measure on `serial` is nearest to `(sample, line)`.
    pub fn find_closest(&self, serial: &str, sample: f64, line: f64) -> Result<&ControlPoint> {
        if !self.graph.contains(serial) {
            return Err(Error::programmer(format!(
                "Serial number [{serial}] does not exist in the network"
            )));
        }

        let mut best: Option<&ControlPoint> = None;
        let mut min_distance = SEARCH_DISTANCE;
        for id in self.graph.points_in(serial) {
            let Some(point) = self.point(id) else { continue };
            let Some((s, l)) = point.measure(serial).and_then(ControlMeasure::coordinate) else {
                continue;
            };
            let distance = (s - sample).hypot(l - line);
            if distance < min_distance {
                min_distance = distance;
                best = Some(point);
            }
        }

        best.ok_or_else(|| {
            Error::programmer(format!(
                "No point found within [{SEARCH_DISTANCE}] pixels of sample/line [{sample}, {line}] in image [{serial}]"
            ))
        })
    }
}

// ============================================================================
// Wiring: graph and counter bookkeeping
// ============================================================================

/// Borrowed view of the bookkeeping state a point edit has to update.
pub(crate) struct Wiring<'a> {
    graph: &'a mut AdjacencyGraph,
    valid_counts: &'a mut HashMap<String, usize>,
    observer: &'a mut Option<Box<dyn NetObserver>>,
    cameras: &'a HashMap<String, Arc<dyn Camera>>,
    mutex: Option<&'a Arc<Mutex<()>>>,
}

impl<'a> Wiring<'a> {
    fn new(
        graph: &'a mut AdjacencyGraph,
        valid_counts: &'a mut HashMap<String, usize>,
        observer: &'a mut Option<Box<dyn NetObserver>>,
        cameras: &'a HashMap<String, Arc<dyn Camera>>,
        mutex: Option<&'a Arc<Mutex<()>>>,
    ) -> Self {
        Self { graph, valid_counts, observer, cameras, mutex }
    }

    pub(crate) fn reborrow(&mut self) -> Wiring<'_> {
        Wiring {
            graph: &mut *self.graph,
            valid_counts: &mut *self.valid_counts,
            observer: &mut *self.observer,
            cameras: self.cameras,
            mutex: self.mutex,
        }
    }

    pub(crate) fn notify(&mut self, event: impl FnOnce(&mut dyn NetObserver)) {
        if let Some(observer) = self.observer.as_deref_mut() {
            event(observer);
        }
    }

    pub(crate) fn camera(&self, serial: &str) -> Option<Arc<dyn Camera>> {
        self.cameras.get(serial).cloned()
    }

    pub(crate) fn mutex(&self) -> Option<&'a Arc<Mutex<()>>> {
        self.mutex
    }

    pub(crate) fn rename(&mut self, point: &ControlPoint, old_id: &str) {
        self.graph.rename_point(old_id, point.id(), point.serials());
    }

    /// Attach every measure of a newly added point, then add each pair edge
    /// once.
    fn attach_point(&mut self, point: &ControlPoint) -> Result<()> {
        for m in point.iter() {
            self.graph.attach_measure(m.serial(), point.id());
            if !m.is_ignored() {
                *self.valid_counts.entry(m.serial().to_string()).or_insert(0) += 1;
            }
        }
        if !point.is_ignored() {
            self.link_pairs(point, true)?;
        }
        Ok(())
    }

    fn detach_point(&mut self, point: &ControlPoint) -> Result<()> {
        if !point.is_ignored() {
            self.link_pairs(point, false)?;
        }
        for m in point.iter() {
            if !m.is_ignored() {
                self.uncount(m.serial());
            }
            self.graph.detach_measure(m.serial(), point.id());
        }
        Ok(())
    }

    /// `serial` has just been installed in `point`.
    pub(crate) fn measure_added(&mut self, point: &ControlPoint, serial: &str) -> Result<()> {
        self.graph.attach_measure(serial, point.id());
        let ignored = point.measure(serial).is_none_or(ControlMeasure::is_ignored);
        if !ignored {
            *self.valid_counts.entry(serial.to_string()).or_insert(0) += 1;
            if !point.is_ignored() {
                self.link_one(point, serial, true)?;
            }
        }
        self.notify(|o| o.structure_modified());
        Ok(())
    }

    /// `serial` is about to leave `point`; edges go first, then the vertex
    /// entry.
    pub(crate) fn measure_deleted(&mut self, point: &ControlPoint, serial: &str) -> Result<()> {
        let ignored = point.measure(serial).is_none_or(ControlMeasure::is_ignored);
        if !ignored {
            if !point.is_ignored() {
                self.link_one(point, serial, false)?;
            }
            self.uncount(serial);
        }
        self.graph.detach_measure(serial, point.id());
        self.notify(|o| o.structure_modified());
        Ok(())
    }

    /// The measure on `serial` has just become ignored.
    pub(crate) fn measure_ignored(&mut self, point: &ControlPoint, serial: &str) -> Result<()> {
        self.uncount(serial);
        if !point.is_ignored() {
            self.link_one(point, serial, false)?;
        }
        Ok(())
    }

    /// The measure on `serial` has just been un-ignored.
    pub(crate) fn measure_unignored(&mut self, point: &ControlPoint, serial: &str) -> Result<()> {
        *self.valid_counts.entry(serial.to_string()).or_insert(0) += 1;
        if !point.is_ignored() {
            self.link_one(point, serial, true)?;
        }
        Ok(())
    }

    pub(crate) fn point_ignored(&mut self, point: &ControlPoint) -> Result<()> {
        self.link_pairs(point, false)
    }

    pub(crate) fn point_unignored(&mut self, point: &ControlPoint) -> Result<()> {
        self.link_pairs(point, true)
    }

    /// One unit between `serial` and every other non-ignored measure of
    /// `point`.
    fn link_one(&mut self, point: &ControlPoint, serial: &str, add: bool) -> Result<()> {
        for other in point.valid_serials() {
            if other == serial {
                continue;
            }
            if add {
                self.graph.add_edge(serial, other)?;
            } else {
                self.graph.remove_edge(serial, other)?;
            }
        }
        Ok(())
    }

    /// One unit for every unordered pair of non-ignored measures.
    fn link_pairs(&mut self, point: &ControlPoint, add: bool) -> Result<()> {
        let serials = point.valid_serials();
        for (i, u) in serials.iter().enumerate() {
            for v in &serials[i + 1..] {
                if add {
                    self.graph.add_edge(u, v)?;
                } else {
                    self.graph.remove_edge(u, v)?;
                }
            }
        }
        Ok(())
    }

    fn uncount(&mut self, serial: &str) {
        if let Some(count) = self.valid_counts.get_mut(serial) {
            *count = count.saturating_sub(1);
        }
    }
}

// ============================================================================
// Trait impls
// ============================================================================

/// Deep copy with a fresh identity. Observers are not copied; cameras and
/// the camera mutex are shared.
impl Clone for ControlNet {
    fn clone(&self) -> Self {
        let id = NetId::next();
        let points = self
            .points
            .iter()
            .map(|p| {
                let mut copy = p.clone();
                copy.set_parent(Some(id));
                copy
            })
            .collect();
        Self {
            id,
            network_id: self.network_id.clone(),
            target_name: self.target_name.clone(),
            user_name: self.user_name.clone(),
            created: self.created.clone(),
            modified: self.modified.clone(),
            description: self.description.clone(),
            coordinate_type: self.coordinate_type,
            points,
            index: self.index.clone(),
            graph: self.graph.clone(),
            cameras: self.cameras.clone(),
            images_bound: self.images_bound,
            valid_counts: self.valid_counts.clone(),
            rejected_counts: self.rejected_counts.clone(),
            mutex: self.mutex.clone(),
            observer: None,
            taken: self.taken,
            config: self.config.clone(),
        }
    }
}

/// Header fields plus points compared in order.
impl PartialEq for ControlNet {
    fn eq(&self, other: &Self) -> bool {
        self.network_id == other.network_id
            && self.target_name == other.target_name
            && self.user_name == other.user_name
            && self.created == other.created
            && self.modified == other.modified
            && self.description == other.description
            && self.coordinate_type == other.coordinate_type
            && self.points == other.points
    }
}

impl std::fmt::Debug for ControlNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlNet")
            .field("id", &self.id)
            .field("network_id", &self.network_id)
            .field("target_name", &self.target_name)
            .field("coordinate_type", &self.coordinate_type)
            .field("points", &self.points.len())
            .field("images", &self.graph.vertex_count())
            .field("edges", &self.graph.edge_count())
            .field("images_bound", &self.images_bound)
            .finish()
    }
}

impl<'a> IntoIterator for &'a ControlNet {
    type Item = &'a ControlPoint;
    type IntoIter = std::slice::Iter<'a, ControlPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
