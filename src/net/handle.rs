//! Editing handles for points and measures that live inside a network.
//!
//! A handle borrows one point mutably together with the network's graph
//! bookkeeping, so every edit that changes connectivity is mirrored in the
//! graph before the call returns. Both handles deref to the plain model type
//! for reading.

use std::ops::Deref;
use std::sync::Arc;

use hashbrown::HashMap;

use super::{Camera, Wiring};
use crate::model::{
    ControlMeasure, ControlPoint, CoordinateType, LogDataType, MeasureModType, MeasureStatus,
    MeasureType, PointModType, PointStatus, PointType, RadiusSource, SurfacePoint,
    SurfacePointSource,
};
use crate::{Error, Result};

// ============================================================================
// PointMut
// ============================================================================

pub struct PointMut<'a> {
    point: &'a mut ControlPoint,
    index: &'a mut HashMap<String, usize>,
    /// frame surface points are held in
    frame: CoordinateType,
    wiring: Wiring<'a>,
}

impl<'a> PointMut<'a> {
    pub(crate) fn new(
        point: &'a mut ControlPoint,
        index: &'a mut HashMap<String, usize>,
        frame: CoordinateType,
        wiring: Wiring<'a>,
    ) -> Self {
        Self { point, index, frame, wiring }
    }

    // ========================================================================
    // Graph-relevant edits
    // ========================================================================

    /// Rename the point, re-keying the network's id map and graph entries.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<PointStatus> {
        let id = id.into();
        if id == self.point.id() {
            return Ok(PointStatus::Success);
        }
        if self.point.is_edit_locked() {
            return Ok(PointStatus::PointLocked);
        }
        if self.index.contains_key(&id) {
            return Err(Error::programmer(format!("ControlPoint must have unique Id [{id}]")));
        }

        let old_id = self.point.id().to_string();
        let status = self.point.set_id(id)?;
        if status != PointStatus::Success {
            return Ok(status);
        }

        if let Some(position) = self.index.remove(&old_id) {
            self.index.insert(self.point.id().to_string(), position);
        }
        self.wiring.rename(self.point, &old_id);
        let new_id = self.point.id();
        self.wiring.notify(|o| o.point_modified(new_id, PointModType::IdModified));
        tracing::debug!(old = %old_id, new = %new_id, "point renamed");
        Ok(status)
    }

    pub fn set_ignored(&mut self, ignored: bool) -> Result<PointStatus> {
        let was = self.point.is_ignored();
        let status = self.point.set_ignored(ignored);
        if status == PointStatus::Success && was != ignored {
            if ignored {
                self.wiring.point_ignored(self.point)?;
            } else {
                self.wiring.point_unignored(self.point)?;
            }
            self.modified(PointModType::IgnoredModified);
        }
        Ok(status)
    }

    /// Install `measure`. A camera is attached when the network has one for
    /// its serial.
    pub fn add(&mut self, mut measure: ControlMeasure) -> Result<()> {
        let serial = measure.serial().to_string();
        if let Some(camera) = self.wiring.camera(&serial) {
            measure.set_camera(Some(camera));
        }
        self.point.add(measure)?;
        self.wiring.measure_added(self.point, &serial)
    }

    /// Remove the measure on `serial` unless it is (effectively) locked.
    pub fn delete(&mut self, serial: &str) -> Result<PointStatus> {
        let status = self.point.check_deletable(serial)?;
        if status != PointStatus::Success {
            return Ok(status);
        }
        self.wiring.measure_deleted(self.point, serial)?;
        self.point.remove_measure(serial);
        Ok(PointStatus::Success)
    }

    pub fn delete_at(&mut self, index: usize) -> Result<PointStatus> {
        let serial = self.point.measure_at(index)?.serial().to_string();
        self.delete(&serial)
    }

    pub fn measure_mut(&mut self, serial: &str) -> Result<MeasureMut<'_>> {
        let position = self.point.index_of(serial).ok_or_else(|| {
            Error::programmer(format!(
                "Control point [{}] has no measure with serial number [{serial}]",
                self.point.id()
            ))
        })?;
        Ok(self.measure_handle(position))
    }

    pub fn measure_mut_at(&mut self, index: usize) -> Result<MeasureMut<'_>> {
        self.point.measure_at(index)?;
        Ok(self.measure_handle(index))
    }

    fn measure_handle(&mut self, position: usize) -> MeasureMut<'_> {
        MeasureMut {
            point: &mut *self.point,
            position,
            wiring: self.wiring.reborrow(),
        }
    }

    fn modified(&mut self, change: PointModType) {
        let id = self.point.id();
        self.wiring.notify(|o| o.point_modified(id, change));
    }

    // ========================================================================
    // Attribute edits
    // ========================================================================

    pub fn set_edit_lock(&mut self, locked: bool) -> PointStatus {
        let was = self.point.is_edit_locked();
        let status = self.point.set_edit_lock(locked);
        if was != locked {
            self.modified(PointModType::EditLockModified);
        }
        status
    }

    pub fn set_type(&mut self, point_type: PointType) -> PointStatus {
        let was = self.point.point_type();
        let status = self.point.set_type(point_type);
        if status == PointStatus::Success && was != point_type {
            self.modified(PointModType::TypeModified);
        }
        status
    }

    pub fn set_rejected(&mut self, rejected: bool) -> PointStatus {
        self.point.set_rejected(rejected)
    }

    pub fn set_reference(&mut self, serial: &str) -> Result<PointStatus> {
        self.point.set_reference(serial)
    }

    pub fn set_chooser_name(&mut self, name: impl Into<String>) -> PointStatus {
        self.point.set_chooser_name(name)
    }

    pub fn set_date_time(&mut self, date_time: impl Into<String>) -> PointStatus {
        self.point.set_date_time(date_time)
    }

    pub fn set_date_time_now(&mut self) -> PointStatus {
        self.point.set_date_time_now()
    }

    pub fn set_apriori_surface_point(&mut self, point: Option<SurfacePoint>) -> PointStatus {
        self.point.set_apriori_surface_point(point.map(|sp| sp.in_frame(self.frame)))
    }

    pub fn set_adjusted_surface_point(&mut self, point: Option<SurfacePoint>) -> PointStatus {
        self.point.set_adjusted_surface_point(point.map(|sp| sp.in_frame(self.frame)))
    }

    pub fn set_apriori_surface_point_source(&mut self, source: SurfacePointSource) -> PointStatus {
        self.point.set_apriori_surface_point_source(source)
    }

    pub fn set_apriori_surface_point_source_file(&mut self, file: impl Into<String>) -> PointStatus {
        self.point.set_apriori_surface_point_source_file(file)
    }

    pub fn set_apriori_radius_source(&mut self, source: RadiusSource) -> PointStatus {
        self.point.set_apriori_radius_source(source)
    }

    pub fn set_apriori_radius_source_file(&mut self, file: impl Into<String>) -> PointStatus {
        self.point.set_apriori_radius_source_file(file)
    }

    pub fn reset_apriori(&mut self) -> PointStatus {
        self.point.reset_apriori()
    }

    pub fn compute_apriori(&mut self) -> Result<PointStatus> {
        let _guard = self.wiring.mutex().map(|m| m.lock());
        let status = self.point.compute_apriori()?;
        self.point.express_in(self.frame);
        Ok(status)
    }

    pub fn compute_residuals(&mut self) -> Result<PointStatus> {
        let _guard = self.wiring.mutex().map(|m| m.lock());
        self.point.compute_residuals()
    }
}

impl Deref for PointMut<'_> {
    type Target = ControlPoint;

    fn deref(&self) -> &ControlPoint {
        self.point
    }
}

// ============================================================================
// MeasureMut
// ============================================================================

pub struct MeasureMut<'a> {
    point: &'a mut ControlPoint,
    position: usize,
    wiring: Wiring<'a>,
}

impl MeasureMut<'_> {
    /// The point this measure lives in.
    pub fn point(&self) -> &ControlPoint {
        self.point
    }

    /// Apply `edit` unless the measure is locked, by its own flag or as the
    /// reference of a locked point.
    fn edit(&mut self, edit: impl FnOnce(&mut ControlMeasure) -> MeasureStatus) -> MeasureStatus {
        let serial = self.point.slot(self.position).serial();
        if self.point.is_measure_edit_locked(serial) {
            return MeasureStatus::MeasureLocked;
        }
        edit(self.point.slot_mut(self.position))
    }

    fn modified(&mut self, change: MeasureModType) {
        let point_id = self.point.id();
        let serial = self.point.slot(self.position).serial();
        self.wiring.notify(|o| o.measure_modified(point_id, serial, change));
    }

    pub fn set_ignored(&mut self, ignored: bool) -> Result<MeasureStatus> {
        let was = self.is_ignored();
        let status = self.edit(|m| m.set_ignored(ignored));
        if status == MeasureStatus::Success && was != ignored {
            let serial = self.serial().to_string();
            if ignored {
                self.wiring.measure_ignored(self.point, &serial)?;
            } else {
                self.wiring.measure_unignored(self.point, &serial)?;
            }
            self.modified(MeasureModType::IgnoredModified);
        }
        Ok(status)
    }

    pub fn set_edit_lock(&mut self, locked: bool) -> MeasureStatus {
        let was = self.is_edit_locked();
        let status = self.point.slot_mut(self.position).set_edit_lock(locked);
        if was != locked {
            self.modified(MeasureModType::EditLockModified);
        }
        status
    }

    pub fn set_residual(&mut self, sample_residual: f64, line_residual: f64) -> MeasureStatus {
        let status = self
            .point
            .slot_mut(self.position)
            .set_residual(sample_residual, line_residual);
        self.modified(MeasureModType::ResidualModified);
        status
    }

    pub fn set_rejected(&mut self, rejected: bool) -> MeasureStatus {
        self.point.slot_mut(self.position).set_rejected(rejected)
    }

    pub fn set_camera(&mut self, camera: Option<Arc<dyn Camera>>) -> MeasureStatus {
        self.point.slot_mut(self.position).set_camera(camera)
    }

    pub fn set_coordinate(&mut self, sample: f64, line: f64) -> MeasureStatus {
        self.edit(|m| m.set_coordinate(sample, line))
    }

    pub fn set_type(&mut self, measure_type: MeasureType) -> MeasureStatus {
        self.edit(|m| m.set_type(measure_type))
    }

    pub fn set_diameter(&mut self, diameter: f64) -> MeasureStatus {
        self.edit(|m| m.set_diameter(diameter))
    }

    pub fn set_apriori_sample(&mut self, sample: f64) -> MeasureStatus {
        self.edit(|m| m.set_apriori_sample(sample))
    }

    pub fn set_apriori_line(&mut self, line: f64) -> MeasureStatus {
        self.edit(|m| m.set_apriori_line(line))
    }

    pub fn set_sample_sigma(&mut self, sigma: f64) -> MeasureStatus {
        self.edit(|m| m.set_sample_sigma(sigma))
    }

    pub fn set_line_sigma(&mut self, sigma: f64) -> MeasureStatus {
        self.edit(|m| m.set_line_sigma(sigma))
    }

    pub fn set_chooser_name(&mut self, name: impl Into<String>) -> MeasureStatus {
        let name = name.into();
        self.edit(|m| m.set_chooser_name(name))
    }

    pub fn set_date_time(&mut self, date_time: impl Into<String>) -> MeasureStatus {
        let date_time = date_time.into();
        self.edit(|m| m.set_date_time(date_time))
    }

    pub fn set_date_time_now(&mut self) -> MeasureStatus {
        self.edit(ControlMeasure::set_date_time_now)
    }

    pub fn set_log_data(&mut self, data_type: LogDataType, value: f64) -> Result<MeasureStatus> {
        let mut result = Ok(MeasureStatus::Success);
        let status = self.edit(|m| {
            result = m.set_log_data(data_type, value);
            MeasureStatus::Success
        });
        if status == MeasureStatus::MeasureLocked {
            return Ok(status);
        }
        result
    }

    pub fn delete_log_data(&mut self, data_type: LogDataType) -> bool {
        let mut removed = false;
        self.edit(|m| {
            removed = m.delete_log_data(data_type);
            MeasureStatus::Success
        });
        removed
    }
}

impl Deref for MeasureMut<'_> {
    type Target = ControlMeasure;

    fn deref(&self) -> &ControlMeasure {
        self.point.slot(self.position)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{ControlMeasure, ControlPoint, CoordinateType, MeasureStatus, PointStatus};
    use crate::ControlNet;

    fn net() -> ControlNet {
        let mut net = ControlNet::new(CoordinateType::Rectangular);
        let mut p = ControlPoint::new("p0");
        p.add(ControlMeasure::new("ALPHA")).unwrap();
        p.add(ControlMeasure::new("BRAVO")).unwrap();
        p.add(ControlMeasure::new("CHARLIE")).unwrap();
        net.add_point(p).unwrap();
        net
    }

    #[test]
    fn test_measure_ignore_updates_edges_and_counts() {
        let mut net = net();
        assert_eq!(net.graph().edge_count(), 3);

        let mut point = net.point_mut("p0").unwrap();
        let mut m = point.measure_mut("CHARLIE").unwrap();
        assert_eq!(m.set_ignored(true).unwrap(), MeasureStatus::Success);
        // repeated toggle is not double counted
        m.set_ignored(true).unwrap();

        assert_eq!(net.graph().edge_count(), 1);
        assert_eq!(net.num_valid_measures_in_image("CHARLIE"), 0);

        net.point_mut("p0").unwrap().measure_mut("CHARLIE").unwrap().set_ignored(false).unwrap();
        assert_eq!(net.graph().edge_count(), 3);
    }

    #[test]
    fn test_measure_ignore_inside_ignored_point_leaves_graph() {
        let mut net = net();
        let mut point = net.point_mut("p0").unwrap();
        point.set_ignored(true).unwrap();
        point.measure_mut("ALPHA").unwrap().set_ignored(true).unwrap();
        point.set_ignored(false).unwrap();

        assert_eq!(net.graph().edges(), vec![("BRAVO", "CHARLIE", 1)]);
    }

    #[test]
    fn test_locked_reference_refuses_edits() {
        let mut net = net();
        let mut point = net.point_mut("p0").unwrap();
        point.set_reference("ALPHA").unwrap();
        point.set_edit_lock(true);

        let mut m = point.measure_mut("ALPHA").unwrap();
        assert_eq!(m.set_coordinate(1.0, 1.0), MeasureStatus::MeasureLocked);
        assert_eq!(m.set_ignored(true).unwrap(), MeasureStatus::MeasureLocked);
        assert_eq!(point.delete("ALPHA").unwrap(), PointStatus::MeasureLocked);
        assert_eq!(point.delete("BRAVO").unwrap(), PointStatus::Success);
        assert_eq!(net.graph().edge_count(), 1);
    }

    #[test]
    fn test_set_id_rekeys() {
        let mut net = net();
        let mut other = ControlPoint::new("p1");
        other.add(ControlMeasure::new("ALPHA")).unwrap();
        net.add_point(other).unwrap();

        let err = net.point_mut("p0").unwrap().set_id("p1").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Programmer);

        net.point_mut("p0").unwrap().set_id("renamed").unwrap();
        assert!(net.point("p0").is_none());
        assert_eq!(net.point("renamed").unwrap().measure("BRAVO").unwrap().parent_id(), Some("renamed"));
        assert_eq!(net.point_ids(), vec!["renamed", "p1"]);
        assert_eq!(net.graph().points_in("ALPHA"), vec!["p1", "renamed"]);
        assert!(net.delete_point("renamed").is_ok());
    }

    #[test]
    fn test_log_data_through_handle() {
        let mut net = net();
        let mut point = net.point_mut("p0").unwrap();
        let mut m = point.measure_mut("ALPHA").unwrap();
        m.set_log_data(crate::LogDataType::GoodnessOfFit, 0.75).unwrap();
        assert!(m.set_log_data(crate::LogDataType::GoodnessOfFit, f64::NAN).is_err());
        assert_eq!(m.log_value(crate::LogDataType::GoodnessOfFit), Some(0.75));
        assert!(m.delete_log_data(crate::LogDataType::GoodnessOfFit));
    }
}
