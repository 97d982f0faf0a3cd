//! A control point: one ground feature and its measures.

use serde::{Deserialize, Serialize};

use super::{ControlMeasure, CoordinateType, MeasureStatistic, Statistics, SurfacePoint};
use crate::net::NetId;
use crate::{Error, Result};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointType {
    /// Ground coordinates are held fixed by adjustment.
    Fixed,
    /// Ground coordinates are constrained by their apriori covariance.
    Constrained,
    #[default]
    Free,
}

impl PointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointType::Fixed => "Fixed",
            PointType::Constrained => "Constrained",
            PointType::Free => "Free",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [PointType::Fixed, PointType::Constrained, PointType::Free]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for PointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a point operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointStatus {
    Failure,
    Success,
    PointLocked,
    MeasureLocked,
}

/// Point changes that the owning network reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointModType {
    EditLockModified,
    IgnoredModified,
    TypeModified,
    IdModified,
}

macro_rules! named_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                [$($name::$variant),+]
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(name))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum!(SurfacePointSource {
    None => "None",
    User => "User",
    AverageOfMeasures => "AverageOfMeasures",
    Reference => "Reference",
    Basemap => "Basemap",
    BundleSolution => "BundleSolution",
});

named_enum!(RadiusSource {
    None => "None",
    User => "User",
    AverageOfMeasures => "AverageOfMeasures",
    Ellipsoid => "Ellipsoid",
    Dem => "DEM",
    BundleSolution => "BundleSolution",
});

// ============================================================================
// ControlPoint
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlPoint {
    id: String,
    point_type: PointType,
    chooser_name: String,
    date_time: String,
    ignored: bool,
    edit_lock: bool,
    jigsaw_rejected: bool,
    apriori: Option<SurfacePoint>,
    adjusted: Option<SurfacePoint>,
    apriori_surface_point_source: SurfacePointSource,
    apriori_surface_point_source_file: String,
    apriori_radius_source: RadiusSource,
    apriori_radius_source_file: String,
    /// Insertion ordered; serials are unique.
    measures: Vec<ControlMeasure>,
    reference: Option<String>,
    #[serde(skip)]
    parent: Option<NetId>,
}

impl ControlPoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            point_type: PointType::Free,
            chooser_name: String::new(),
            date_time: String::new(),
            ignored: false,
            edit_lock: false,
            jigsaw_rejected: false,
            apriori: None,
            adjusted: None,
            apriori_surface_point_source: SurfacePointSource::None,
            apriori_surface_point_source_file: String::new(),
            apriori_radius_source: RadiusSource::None,
            apriori_radius_source_file: String::new(),
            measures: Vec::new(),
            reference: None,
            parent: None,
        }
    }

    pub fn with_type(mut self, point_type: PointType) -> Self {
        self.point_type = point_type;
        self
    }

    // ========================================================================
    // Measures
    // ========================================================================

    /// Install `measure`, taking ownership. Serials must be unique per point.
    pub fn add(&mut self, mut measure: ControlMeasure) -> Result<()> {
        if measure.serial().is_empty() {
            return Err(Error::programmer(format!(
                "Control measure added to point [{}] has no serial number",
                self.id
            )));
        }
        if self.contains_serial(measure.serial()) {
            return Err(Error::programmer(format!(
                "Control measure with serial number [{}] already exists in control point [{}]",
                measure.serial(),
                self.id
            )));
        }
        measure.set_parent(Some(self.id.clone()));
        self.measures.push(measure);
        Ok(())
    }

    /// Remove the measure on `serial`. Locked measures stay put.
    pub fn delete(&mut self, serial: &str) -> Result<PointStatus> {
        let status = self.check_deletable(serial)?;
        if status == PointStatus::Success {
            self.remove_measure(serial);
        }
        Ok(status)
    }

    /// Remove the measure at insertion position `index`.
    pub fn delete_at(&mut self, index: usize) -> Result<PointStatus> {
        let serial = self.measure_at(index)?.serial().to_string();
        self.delete(&serial)
    }

    pub(crate) fn check_deletable(&self, serial: &str) -> Result<PointStatus> {
        if !self.contains_serial(serial) {
            return Err(self.missing_serial(serial));
        }
        if self.is_measure_edit_locked(serial) {
            return Ok(PointStatus::MeasureLocked);
        }
        Ok(PointStatus::Success)
    }

    pub(crate) fn remove_measure(&mut self, serial: &str) -> Option<ControlMeasure> {
        let index = self.index_of(serial)?;
        let mut measure = self.measures.remove(index);
        measure.set_parent(None);
        if self.reference.as_deref() == Some(serial) {
            self.reference = None;
        }
        Some(measure)
    }

    fn missing_serial(&self, serial: &str) -> Error {
        Error::programmer(format!(
            "Control point [{}] has no measure with serial number [{}]",
            self.id, serial
        ))
    }

    pub fn measure(&self, serial: &str) -> Option<&ControlMeasure> {
        self.measures.iter().find(|m| m.serial() == serial)
    }

    /// Direct access for points outside a network. Points inside one are
    /// edited through `PointMut::measure_mut`.
    pub fn measure_mut(&mut self, serial: &str) -> Option<&mut ControlMeasure> {
        self.measures.iter_mut().find(|m| m.serial() == serial)
    }

    pub fn measure_at(&self, index: usize) -> Result<&ControlMeasure> {
        self.measures.get(index).ok_or_else(|| {
            Error::programmer(format!(
                "Index [{index}] out of range for control point [{}] with [{}] measures",
                self.id,
                self.measures.len()
            ))
        })
    }

    pub fn index_of(&self, serial: &str) -> Option<usize> {
        self.measures.iter().position(|m| m.serial() == serial)
    }

    pub fn contains_serial(&self, serial: &str) -> bool {
        self.index_of(serial).is_some()
    }

    /// Measures in insertion order, optionally skipping ignored ones.
    pub fn measures(&self, valid_only: bool) -> Vec<&ControlMeasure> {
        self.measures
            .iter()
            .filter(|m| !valid_only || !m.is_ignored())
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ControlMeasure> {
        self.measures.iter()
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> + '_ {
        self.measures.iter().map(ControlMeasure::serial)
    }

    /// Serials of non-ignored measures, in insertion order.
    pub fn valid_serials(&self) -> Vec<&str> {
        self.measures
            .iter()
            .filter(|m| !m.is_ignored())
            .map(ControlMeasure::serial)
            .collect()
    }

    pub fn num_measures(&self) -> usize {
        self.measures.len()
    }

    pub fn num_valid_measures(&self) -> usize {
        self.measures.iter().filter(|m| !m.is_ignored()).count()
    }

    pub fn num_locked_measures(&self) -> usize {
        self.serials().filter(|s| self.is_measure_edit_locked(s)).count()
    }

    /// A measure's own lock, or the point's lock when it is the reference.
    pub fn is_measure_edit_locked(&self, serial: &str) -> bool {
        let own = self.measure(serial).is_some_and(ControlMeasure::is_edit_locked);
        own || (self.edit_lock && self.reference.as_deref() == Some(serial))
    }

    // ========================================================================
    // Reference measure
    // ========================================================================

    pub fn set_reference(&mut self, serial: &str) -> Result<PointStatus> {
        if !self.contains_serial(serial) {
            return Err(self.missing_serial(serial));
        }
        if self.edit_lock {
            return Ok(PointStatus::PointLocked);
        }
        self.reference = Some(serial.to_string());
        Ok(PointStatus::Success)
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference_serial(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn reference_measure(&self) -> Option<&ControlMeasure> {
        self.reference.as_deref().and_then(|s| self.measure(s))
    }

    // ========================================================================
    // Point attributes
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rename the point. Inside a network this goes through `PointMut::set_id`.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<PointStatus> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::programmer("Control point id must not be empty"));
        }
        if self.edit_lock {
            return Ok(PointStatus::PointLocked);
        }
        for m in &mut self.measures {
            m.set_parent(Some(id.clone()));
        }
        self.id = id;
        Ok(PointStatus::Success)
    }

    pub fn point_type(&self) -> PointType {
        self.point_type
    }

    pub fn set_type(&mut self, point_type: PointType) -> PointStatus {
        self.locked_or(|p| p.point_type = point_type)
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn set_ignored(&mut self, ignored: bool) -> PointStatus {
        self.locked_or(|p| p.ignored = ignored)
    }

    pub fn is_edit_locked(&self) -> bool {
        self.edit_lock
    }

    pub fn set_edit_lock(&mut self, locked: bool) -> PointStatus {
        self.edit_lock = locked;
        PointStatus::Success
    }

    pub fn is_rejected(&self) -> bool {
        self.jigsaw_rejected
    }

    pub fn set_rejected(&mut self, rejected: bool) -> PointStatus {
        self.jigsaw_rejected = rejected;
        PointStatus::Success
    }

    pub fn chooser_name(&self) -> &str {
        &self.chooser_name
    }

    pub fn set_chooser_name(&mut self, name: impl Into<String>) -> PointStatus {
        let name = name.into();
        self.locked_or(|p| p.chooser_name = name)
    }

    pub fn date_time(&self) -> &str {
        &self.date_time
    }

    pub fn set_date_time(&mut self, date_time: impl Into<String>) -> PointStatus {
        let date_time = date_time.into();
        self.locked_or(|p| p.date_time = date_time)
    }

    pub fn set_date_time_now(&mut self) -> PointStatus {
        self.set_date_time(super::timestamp())
    }

    pub fn apriori_surface_point(&self) -> Option<&SurfacePoint> {
        self.apriori.as_ref()
    }

    pub fn set_apriori_surface_point(&mut self, point: Option<SurfacePoint>) -> PointStatus {
        self.locked_or(|p| p.apriori = point)
    }

    pub fn adjusted_surface_point(&self) -> Option<&SurfacePoint> {
        self.adjusted.as_ref()
    }

    /// Adjustment output; accepted on locked points.
    pub fn set_adjusted_surface_point(&mut self, point: Option<SurfacePoint>) -> PointStatus {
        self.adjusted = point;
        PointStatus::Success
    }

    /// Adjusted point when valid, otherwise the apriori one.
    pub fn best_surface_point(&self) -> Option<&SurfacePoint> {
        self.adjusted
            .as_ref()
            .filter(|p| p.is_valid())
            .or_else(|| self.apriori.as_ref().filter(|p| p.is_valid()))
    }

    pub fn apriori_surface_point_source(&self) -> SurfacePointSource {
        self.apriori_surface_point_source
    }

    pub fn set_apriori_surface_point_source(&mut self, source: SurfacePointSource) -> PointStatus {
        self.locked_or(|p| p.apriori_surface_point_source = source)
    }

    pub fn apriori_surface_point_source_file(&self) -> &str {
        &self.apriori_surface_point_source_file
    }

    pub fn set_apriori_surface_point_source_file(&mut self, file: impl Into<String>) -> PointStatus {
        let file = file.into();
        self.locked_or(|p| p.apriori_surface_point_source_file = file)
    }

    pub fn apriori_radius_source(&self) -> RadiusSource {
        self.apriori_radius_source
    }

    pub fn set_apriori_radius_source(&mut self, source: RadiusSource) -> PointStatus {
        self.locked_or(|p| p.apriori_radius_source = source)
    }

    pub fn apriori_radius_source_file(&self) -> &str {
        &self.apriori_radius_source_file
    }

    pub fn set_apriori_radius_source_file(&mut self, file: impl Into<String>) -> PointStatus {
        let file = file.into();
        self.locked_or(|p| p.apriori_radius_source_file = file)
    }

    /// Drop the apriori surface point and its provenance.
    pub fn reset_apriori(&mut self) -> PointStatus {
        self.locked_or(|p| {
            p.apriori = None;
            p.apriori_surface_point_source = SurfacePointSource::None;
            p.apriori_surface_point_source_file.clear();
            p.apriori_radius_source = RadiusSource::None;
            p.apriori_radius_source_file.clear();
        })
    }

    fn locked_or(&mut self, apply: impl FnOnce(&mut Self)) -> PointStatus {
        if self.edit_lock {
            return PointStatus::PointLocked;
        }
        apply(self);
        PointStatus::Success
    }

    pub fn parent_net(&self) -> Option<NetId> {
        self.parent
    }

    /// Re-express the apriori and adjusted points in `frame`. Representation
    /// only, so edit locks do not apply.
    pub(crate) fn express_in(&mut self, frame: CoordinateType) {
        self.apriori = self.apriori.map(|sp| sp.in_frame(frame));
        self.adjusted = self.adjusted.map(|sp| sp.in_frame(frame));
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NetId>) {
        self.parent = parent;
    }

    // ========================================================================
    // Computation
    // ========================================================================

    /// Average a ground coordinate from the measured, non-ignored measures.
    ///
    /// An existing valid apriori point with a known source is kept. Fixed
    /// points must already carry one.
    pub fn compute_apriori(&mut self) -> Result<PointStatus> {
        if self.ignored {
            return Ok(PointStatus::Failure);
        }
        if self.edit_lock {
            return Ok(PointStatus::PointLocked);
        }

        let has_apriori = self.apriori.as_ref().is_some_and(SurfacePoint::is_valid);
        if has_apriori && self.apriori_surface_point_source != SurfacePointSource::None {
            return Ok(PointStatus::Success);
        }
        if self.point_type == PointType::Fixed {
            if has_apriori {
                return Ok(PointStatus::Success);
            }
            return Err(Error::user(format!(
                "Control point [{}] is fixed and requires an apriori surface point",
                self.id
            )));
        }

        let mut ground = Vec::with_capacity(self.measures.len());
        for m in self.measures.iter().filter(|m| m.is_measured() && !m.is_ignored()) {
            let camera = m.camera().ok_or_else(|| {
                Error::programmer(format!(
                    "Camera must be set before computing apriori for control point [{}], measure [{}]",
                    self.id,
                    m.serial()
                ))
            })?;
            let Some((sample, line)) = m.coordinate() else {
                continue;
            };
            if let Some(sp) = camera.image_to_ground(sample, line) {
                ground.push(sp);
            }
        }

        let average = SurfacePoint::average(ground.iter()).ok_or_else(|| {
            Error::user(format!(
                "Control point [{}] has no measures which project to the surface",
                self.id
            ))
        })?;

        self.apriori = Some(average);
        self.apriori_surface_point_source = SurfacePointSource::AverageOfMeasures;
        self.apriori_radius_source = RadiusSource::AverageOfMeasures;
        Ok(PointStatus::Success)
    }

    /// Residual = measured − projected, per measured non-ignored measure
    /// that has a camera. Others keep their last residual.
    pub fn compute_residuals(&mut self) -> Result<PointStatus> {
        if self.ignored {
            return Ok(PointStatus::Failure);
        }
        if self.edit_lock {
            return Ok(PointStatus::PointLocked);
        }

        let ground = self.best_surface_point().copied();
        let id = &self.id;
        for m in self.measures.iter_mut().filter(|m| m.is_measured() && !m.is_ignored()) {
            let Some(camera) = m.camera().cloned() else {
                continue;
            };
            let Some((sample, line)) = m.coordinate() else {
                continue;
            };
            let ground = ground.ok_or_else(|| {
                Error::user(format!("Control point [{id}] has no surface point to project"))
            })?;
            let (cu_sample, cu_line) = camera.ground_to_image(&ground).ok_or_else(|| {
                Error::user(format!(
                    "Unable to map control point [{id}] into image [{}]",
                    m.serial()
                ))
            })?;
            m.set_residual(sample - cu_sample, line - cu_line);
        }
        Ok(PointStatus::Success)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Accumulate `which` over the non-ignored measures that have it.
    pub fn statistic(&self, which: MeasureStatistic) -> Statistics {
        self.measures
            .iter()
            .filter(|m| !m.is_ignored())
            .filter_map(|m| m.statistic(which))
            .collect()
    }

    pub fn sample_residual_rms(&self) -> Option<f64> {
        self.statistic(MeasureStatistic::SampleResidual).rms()
    }

    pub fn line_residual_rms(&self) -> Option<f64> {
        self.statistic(MeasureStatistic::LineResidual).rms()
    }

    /// RMS over both residual components of every valid measure.
    pub fn residual_rms(&self) -> Option<f64> {
        let stats: Statistics = self
            .measures
            .iter()
            .filter(|m| !m.is_ignored())
            .flat_map(|m| [m.sample_residual(), m.line_residual()])
            .flatten()
            .collect();
        stats.rms()
    }

    pub(crate) fn measures_mut(&mut self) -> std::slice::IterMut<'_, ControlMeasure> {
        self.measures.iter_mut()
    }

    /// Measure at a position known to be in range.
    pub(crate) fn slot(&self, position: usize) -> &ControlMeasure {
        &self.measures[position]
    }

    pub(crate) fn slot_mut(&mut self, position: usize) -> &mut ControlMeasure {
        &mut self.measures[position]
    }
}

/// Copies are detached from any network.
impl Clone for ControlPoint {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            point_type: self.point_type,
            chooser_name: self.chooser_name.clone(),
            date_time: self.date_time.clone(),
            ignored: self.ignored,
            edit_lock: self.edit_lock,
            jigsaw_rejected: self.jigsaw_rejected,
            apriori: self.apriori,
            adjusted: self.adjusted,
            apriori_surface_point_source: self.apriori_surface_point_source,
            apriori_surface_point_source_file: self.apriori_surface_point_source_file.clone(),
            apriori_radius_source: self.apriori_radius_source,
            apriori_radius_source_file: self.apriori_radius_source_file.clone(),
            measures: self.measures.clone(),
            reference: self.reference.clone(),
            parent: None,
        }
    }
}

impl PartialEq for ControlPoint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.point_type == other.point_type
            && self.chooser_name == other.chooser_name
            && self.date_time == other.date_time
            && self.ignored == other.ignored
            && self.edit_lock == other.edit_lock
            && self.jigsaw_rejected == other.jigsaw_rejected
            && self.apriori == other.apriori
            && self.adjusted == other.adjusted
            && self.apriori_surface_point_source == other.apriori_surface_point_source
            && self.apriori_surface_point_source_file == other.apriori_surface_point_source_file
            && self.apriori_radius_source == other.apriori_radius_source
            && self.apriori_radius_source_file == other.apriori_radius_source_file
            && self.measures == other.measures
            && self.reference == other.reference
    }
}

impl<'a> IntoIterator for &'a ControlPoint {
    type Item = &'a ControlMeasure;
    type IntoIter = std::slice::Iter<'a, ControlMeasure>;

    fn into_iter(self) -> Self::IntoIter {
        self.measures.iter()
    }
}
