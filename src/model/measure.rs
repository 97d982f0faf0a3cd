//! A control measure: one observation of a control point in one image.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::Camera;
use crate::{Error, Result};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MeasureType {
    /// Not yet measured; the coordinate is a guess.
    #[default]
    Candidate,
    Manual,
    RegisteredPixel,
    RegisteredSubPixel,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Candidate => "Candidate",
            MeasureType::Manual => "Manual",
            MeasureType::RegisteredPixel => "RegisteredPixel",
            MeasureType::RegisteredSubPixel => "RegisteredSubPixel",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            MeasureType::Candidate,
            MeasureType::Manual,
            MeasureType::RegisteredPixel,
            MeasureType::RegisteredSubPixel,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for MeasureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a measure setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureStatus {
    Success,
    MeasureLocked,
}

/// Measure changes that the owning network reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureModType {
    IgnoredModified,
    EditLockModified,
    ResidualModified,
}

/// Closed set of registration log tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogDataType {
    MinimumPixelZScore,
    MaximumPixelZScore,
    PixelShift,
    WholePixelCorrelation,
    SubPixelCorrelation,
    GoodnessOfFit,
}

impl LogDataType {
    pub const ALL: [LogDataType; 6] = [
        LogDataType::MinimumPixelZScore,
        LogDataType::MaximumPixelZScore,
        LogDataType::PixelShift,
        LogDataType::WholePixelCorrelation,
        LogDataType::SubPixelCorrelation,
        LogDataType::GoodnessOfFit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogDataType::MinimumPixelZScore => "MinimumPixelZScore",
            LogDataType::MaximumPixelZScore => "MaximumPixelZScore",
            LogDataType::PixelShift => "PixelShift",
            LogDataType::WholePixelCorrelation => "WholePixelCorrelation",
            LogDataType::SubPixelCorrelation => "SubPixelCorrelation",
            LogDataType::GoodnessOfFit => "GoodnessOfFit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for LogDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub data_type: LogDataType,
    pub value: f64,
}

/// Which scalar of a measure a statistic or sort is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureStatistic {
    ResidualMagnitude,
    SampleResidual,
    LineResidual,
    SampleShift,
    LineShift,
    PixelShift,
    SampleSigma,
    LineSigma,
    Diameter,
    Log(LogDataType),
}

// ============================================================================
// ControlMeasure
// ============================================================================

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMeasure {
    serial: String,
    measure_type: MeasureType,
    sample: Option<f64>,
    line: Option<f64>,
    apriori_sample: Option<f64>,
    apriori_line: Option<f64>,
    sample_sigma: Option<f64>,
    line_sigma: Option<f64>,
    diameter: Option<f64>,
    sample_residual: Option<f64>,
    line_residual: Option<f64>,
    log_data: SmallVec<[LogEntry; 4]>,
    ignored: bool,
    edit_lock: bool,
    jigsaw_rejected: bool,
    chooser_name: String,
    date_time: String,
    /// Id of the owning point.
    #[serde(skip)]
    parent: Option<String>,
    #[serde(skip)]
    camera: Option<Arc<dyn Camera>>,
}

impl ControlMeasure {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            measure_type: MeasureType::Candidate,
            sample: None,
            line: None,
            apriori_sample: None,
            apriori_line: None,
            sample_sigma: None,
            line_sigma: None,
            diameter: None,
            sample_residual: None,
            line_residual: None,
            log_data: SmallVec::new(),
            ignored: false,
            edit_lock: false,
            jigsaw_rejected: false,
            chooser_name: String::new(),
            date_time: String::new(),
            parent: None,
            camera: None,
        }
    }

    /// Builder form of `set_coordinate` for freshly created measures.
    pub fn with_coordinate(mut self, sample: f64, line: f64) -> Self {
        self.sample = finite(sample);
        self.line = finite(line);
        self
    }

    pub fn with_type(mut self, measure_type: MeasureType) -> Self {
        self.measure_type = measure_type;
        self
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    /// Fails once the measure has been installed in a point; remove it and
    /// add a new measure instead.
    pub fn set_serial(&mut self, serial: impl Into<String>) -> Result<MeasureStatus> {
        let serial = serial.into();
        if let Some(parent) = &self.parent {
            return Err(Error::programmer(format!(
                "Cannot change serial number of measure [{}] while it belongs to control point [{}]",
                self.serial, parent
            )));
        }
        if serial.is_empty() {
            return Err(Error::programmer("Serial number must not be empty"));
        }
        if self.edit_lock {
            return Ok(MeasureStatus::MeasureLocked);
        }
        self.serial = serial;
        Ok(MeasureStatus::Success)
    }

    pub fn set_coordinate(&mut self, sample: f64, line: f64) -> MeasureStatus {
        self.locked_or(|m| {
            m.sample = finite(sample);
            m.line = finite(line);
        })
    }

    /// Residuals are written by adjustment; edit lock does not apply.
    pub fn set_residual(&mut self, sample_residual: f64, line_residual: f64) -> MeasureStatus {
        self.sample_residual = finite(sample_residual);
        self.line_residual = finite(line_residual);
        MeasureStatus::Success
    }

    pub fn set_diameter(&mut self, diameter: f64) -> MeasureStatus {
        self.locked_or(|m| m.diameter = finite(diameter))
    }

    pub fn set_apriori_sample(&mut self, sample: f64) -> MeasureStatus {
        self.locked_or(|m| m.apriori_sample = finite(sample))
    }

    pub fn set_apriori_line(&mut self, line: f64) -> MeasureStatus {
        self.locked_or(|m| m.apriori_line = finite(line))
    }

    pub fn set_sample_sigma(&mut self, sigma: f64) -> MeasureStatus {
        self.locked_or(|m| m.sample_sigma = finite(sigma))
    }

    pub fn set_line_sigma(&mut self, sigma: f64) -> MeasureStatus {
        self.locked_or(|m| m.line_sigma = finite(sigma))
    }

    pub fn set_type(&mut self, measure_type: MeasureType) -> MeasureStatus {
        self.locked_or(|m| m.measure_type = measure_type)
    }

    pub fn set_ignored(&mut self, ignored: bool) -> MeasureStatus {
        self.locked_or(|m| m.ignored = ignored)
    }

    pub fn set_edit_lock(&mut self, locked: bool) -> MeasureStatus {
        self.edit_lock = locked;
        MeasureStatus::Success
    }

    pub fn set_rejected(&mut self, rejected: bool) -> MeasureStatus {
        self.jigsaw_rejected = rejected;
        MeasureStatus::Success
    }

    pub fn set_chooser_name(&mut self, name: impl Into<String>) -> MeasureStatus {
        let name = name.into();
        self.locked_or(|m| m.chooser_name = name)
    }

    pub fn set_date_time(&mut self, date_time: impl Into<String>) -> MeasureStatus {
        let date_time = date_time.into();
        self.locked_or(|m| m.date_time = date_time)
    }

    pub fn set_date_time_now(&mut self) -> MeasureStatus {
        self.set_date_time(super::timestamp())
    }

    /// Insert or replace the value for `data_type`.
    pub fn set_log_data(&mut self, data_type: LogDataType, value: f64) -> Result<MeasureStatus> {
        if !value.is_finite() {
            return Err(Error::programmer(format!(
                "Log data [{data_type}] value [{value}] is not a valid number"
            )));
        }
        if self.edit_lock {
            return Ok(MeasureStatus::MeasureLocked);
        }
        match self.log_data.iter_mut().find(|e| e.data_type == data_type) {
            Some(entry) => entry.value = value,
            None => self.log_data.push(LogEntry { data_type, value }),
        }
        Ok(MeasureStatus::Success)
    }

    /// Returns `true` if an entry was removed.
    pub fn delete_log_data(&mut self, data_type: LogDataType) -> bool {
        let before = self.log_data.len();
        self.log_data.retain(|e| e.data_type != data_type);
        self.log_data.len() != before
    }

    pub fn set_camera(&mut self, camera: Option<Arc<dyn Camera>>) -> MeasureStatus {
        self.camera = camera;
        MeasureStatus::Success
    }

    fn locked_or(&mut self, apply: impl FnOnce(&mut Self)) -> MeasureStatus {
        if self.edit_lock {
            return MeasureStatus::MeasureLocked;
        }
        apply(self);
        MeasureStatus::Success
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn measure_type(&self) -> MeasureType {
        self.measure_type
    }

    pub fn sample(&self) -> Option<f64> {
        self.sample
    }

    pub fn line(&self) -> Option<f64> {
        self.line
    }

    pub fn coordinate(&self) -> Option<(f64, f64)> {
        Some((self.sample?, self.line?))
    }

    pub fn apriori_sample(&self) -> Option<f64> {
        self.apriori_sample
    }

    pub fn apriori_line(&self) -> Option<f64> {
        self.apriori_line
    }

    pub fn sample_sigma(&self) -> Option<f64> {
        self.sample_sigma
    }

    pub fn line_sigma(&self) -> Option<f64> {
        self.line_sigma
    }

    pub fn diameter(&self) -> Option<f64> {
        self.diameter
    }

    pub fn sample_residual(&self) -> Option<f64> {
        self.sample_residual
    }

    pub fn line_residual(&self) -> Option<f64> {
        self.line_residual
    }

    /// `None` unless both residual components are valid.
    pub fn residual_magnitude(&self) -> Option<f64> {
        Some(self.sample_residual?.hypot(self.line_residual?))
    }

    pub fn sample_shift(&self) -> Option<f64> {
        Some(self.sample? - self.apriori_sample?)
    }

    pub fn line_shift(&self) -> Option<f64> {
        Some(self.line? - self.apriori_line?)
    }

    pub fn pixel_shift(&self) -> Option<f64> {
        Some(self.sample_shift()?.hypot(self.line_shift()?))
    }

    pub fn log_data(&self) -> &[LogEntry] {
        &self.log_data
    }

    pub fn log_value(&self, data_type: LogDataType) -> Option<f64> {
        self.log_data.iter().find(|e| e.data_type == data_type).map(|e| e.value)
    }

    pub fn has_log_data(&self, data_type: LogDataType) -> bool {
        self.log_value(data_type).is_some()
    }

    pub fn statistic(&self, which: MeasureStatistic) -> Option<f64> {
        match which {
            MeasureStatistic::ResidualMagnitude => self.residual_magnitude(),
            MeasureStatistic::SampleResidual => self.sample_residual,
            MeasureStatistic::LineResidual => self.line_residual,
            MeasureStatistic::SampleShift => self.sample_shift(),
            MeasureStatistic::LineShift => self.line_shift(),
            MeasureStatistic::PixelShift => self.pixel_shift(),
            MeasureStatistic::SampleSigma => self.sample_sigma,
            MeasureStatistic::LineSigma => self.line_sigma,
            MeasureStatistic::Diameter => self.diameter,
            MeasureStatistic::Log(tag) => self.log_value(tag),
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// The measure's own flag. A point may lock it further, see
    /// `ControlPoint::is_measure_edit_locked`.
    pub fn is_edit_locked(&self) -> bool {
        self.edit_lock
    }

    pub fn is_rejected(&self) -> bool {
        self.jigsaw_rejected
    }

    pub fn is_measured(&self) -> bool {
        self.measure_type != MeasureType::Candidate
    }

    pub fn is_registered(&self) -> bool {
        matches!(
            self.measure_type,
            MeasureType::RegisteredPixel | MeasureType::RegisteredSubPixel
        )
    }

    pub fn chooser_name(&self) -> &str {
        &self.chooser_name
    }

    pub fn date_time(&self) -> &str {
        &self.date_time
    }

    /// Id of the point this measure lives in.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn camera(&self) -> Option<&Arc<dyn Camera>> {
        self.camera.as_ref()
    }
}

/// Structural equality over the recorded data; parent and camera are
/// relations, not data.
impl PartialEq for ControlMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial
            && self.measure_type == other.measure_type
            && self.sample == other.sample
            && self.line == other.line
            && self.apriori_sample == other.apriori_sample
            && self.apriori_line == other.apriori_line
            && self.sample_sigma == other.sample_sigma
            && self.line_sigma == other.line_sigma
            && self.diameter == other.diameter
            && self.sample_residual == other.sample_residual
            && self.line_residual == other.line_residual
            && self.log_data == other.log_data
            && self.ignored == other.ignored
            && self.edit_lock == other.edit_lock
            && self.jigsaw_rejected == other.jigsaw_rejected
            && self.chooser_name == other.chooser_name
            && self.date_time == other.date_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residual_magnitude() {
        let mut m = ControlMeasure::new("ALPHA");
        assert_eq!(m.residual_magnitude(), None);
        m.set_residual(3.0, 4.0);
        assert_eq!(m.residual_magnitude(), Some(5.0));
        m.set_residual(f64::NAN, 4.0);
        assert_eq!(m.residual_magnitude(), None);
    }

    #[test]
    fn test_edit_lock_refuses_edits() {
        let mut m = ControlMeasure::new("ALPHA").with_coordinate(1.0, 2.0);
        m.set_edit_lock(true);
        assert_eq!(m.set_coordinate(5.0, 5.0), MeasureStatus::MeasureLocked);
        assert_eq!(m.set_ignored(true), MeasureStatus::MeasureLocked);
        assert_eq!(m.set_type(MeasureType::Manual), MeasureStatus::MeasureLocked);
        assert_eq!(m.coordinate(), Some((1.0, 2.0)));
        assert!(!m.is_ignored());

        // adjustment output still lands on locked measures
        assert_eq!(m.set_residual(1.0, 1.0), MeasureStatus::Success);
        assert_eq!(m.set_rejected(true), MeasureStatus::Success);
        assert!(m.is_rejected());

        assert_eq!(m.set_edit_lock(false), MeasureStatus::Success);
        assert_eq!(m.set_ignored(true), MeasureStatus::Success);
    }

    #[test]
    fn test_set_serial_rules() {
        let mut m = ControlMeasure::new("ALPHA");
        assert_eq!(m.set_serial("BRAVO").unwrap(), MeasureStatus::Success);
        assert_eq!(m.serial(), "BRAVO");
        assert!(m.set_serial("").is_err());

        m.set_parent(Some("p0".into()));
        let err = m.set_serial("CHARLIE").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Programmer);
        assert_eq!(m.serial(), "BRAVO");
    }

    #[test]
    fn test_log_data_upsert_and_delete() {
        let mut m = ControlMeasure::new("ALPHA");
        m.set_log_data(LogDataType::GoodnessOfFit, 0.5).unwrap();
        m.set_log_data(LogDataType::PixelShift, 2.0).unwrap();
        m.set_log_data(LogDataType::GoodnessOfFit, 0.9).unwrap();
        assert_eq!(m.log_data().len(), 2);
        assert_eq!(m.log_data()[0].data_type, LogDataType::GoodnessOfFit);
        assert_eq!(m.log_value(LogDataType::GoodnessOfFit), Some(0.9));
        assert!(m.set_log_data(LogDataType::PixelShift, f64::INFINITY).is_err());

        assert!(m.delete_log_data(LogDataType::GoodnessOfFit));
        assert!(!m.delete_log_data(LogDataType::GoodnessOfFit));
        assert!(!m.has_log_data(LogDataType::GoodnessOfFit));
    }

    #[test]
    fn test_shifts() {
        let mut m = ControlMeasure::new("ALPHA").with_coordinate(13.0, 24.0);
        assert_eq!(m.pixel_shift(), None);
        m.set_apriori_sample(10.0);
        m.set_apriori_line(20.0);
        assert_eq!(m.sample_shift(), Some(3.0));
        assert_eq!(m.line_shift(), Some(4.0));
        assert_eq!(m.statistic(MeasureStatistic::PixelShift), Some(5.0));
    }

    #[test]
    fn test_measured_and_registered() {
        let m = ControlMeasure::new("ALPHA");
        assert!(!m.is_measured());
        let m = m.with_type(MeasureType::RegisteredSubPixel);
        assert!(m.is_measured() && m.is_registered());
        assert_eq!(MeasureType::from_name("manual"), Some(MeasureType::Manual));
    }

    #[test]
    fn test_equality_ignores_parent() {
        let a = ControlMeasure::new("ALPHA").with_coordinate(1.0, 1.0);
        let mut b = a.clone();
        b.set_parent(Some("p9".into()));
        assert_eq!(a, b);
        b.set_diameter(3.0);
        assert_ne!(a, b);
    }
}
