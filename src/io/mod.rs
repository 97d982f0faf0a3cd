//! # Network files
//!
//! Both on-disk shapes serialise the same record tree, [`NetworkFile`]:
//!
//! | Format | Module | Layout |
//! |--------|--------|--------|
//! | `Text` | [`pvl`] | `Object = ControlNetwork ... End_Object` labelled objects |
//! | `Binary` | [`binary`] | `CNETBIN1` magic followed by an rkyv archive |
//!
//! Surface points are written in the network's coordinate type. Reading
//! sniffs the magic, so callers never name the format when loading.

pub mod binary;
pub mod pvl;

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use rkyv::Archive;
use serde::{Deserialize, Serialize};

use crate::config::NetConfig;
use crate::model::{
    ControlMeasure, ControlPoint, CoordinateType, LogDataType, MeasureType, PointType,
    RadiusSource, SurfacePoint, SurfacePointSource,
};
use crate::net::ControlNet;
use crate::progress::Progress;
use crate::{Error, ErrorKind, Result};

// ============================================================================
// Format
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    #[default]
    Text,
    Binary,
}

impl Format {
    /// Guess from leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(binary::MAGIC) {
            Format::Binary
        } else {
            Format::Text
        }
    }
}

// ============================================================================
// Record tree
// ============================================================================

/// Everything a network file carries.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize,
    Archive, rkyv::Serialize, rkyv::Deserialize,
)]
pub struct NetworkFile {
    pub network_id: String,
    pub target_name: String,
    pub user_name: String,
    pub created: String,
    pub modified: String,
    pub description: String,
    pub coordinate_type: String,
    pub points: Vec<PointEntry>,
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize,
    Archive, rkyv::Serialize, rkyv::Deserialize,
)]
pub struct PointEntry {
    pub id: String,
    pub point_type: String,
    pub chooser_name: String,
    pub date_time: String,
    pub edit_lock: bool,
    pub ignore: bool,
    pub jigsaw_rejected: bool,
    pub reference: Option<String>,
    pub apriori_surface_point_source: String,
    pub apriori_surface_point_source_file: String,
    pub apriori_radius_source: String,
    pub apriori_radius_source_file: String,
    pub apriori: Option<SurfaceEntry>,
    pub adjusted: Option<SurfaceEntry>,
    pub measures: Vec<MeasureEntry>,
}

/// Coordinates in the file's coordinate type plus rectangular covariance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize,
    Archive, rkyv::Serialize, rkyv::Deserialize,
)]
pub struct SurfaceEntry {
    pub coordinates: [f64; 3],
    pub covariance: Option<[f64; 6]>,
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize,
    Archive, rkyv::Serialize, rkyv::Deserialize,
)]
pub struct MeasureEntry {
    pub serial: String,
    pub measure_type: String,
    pub chooser_name: String,
    pub date_time: String,
    pub edit_lock: bool,
    pub ignore: bool,
    pub jigsaw_rejected: bool,
    pub sample: Option<f64>,
    pub line: Option<f64>,
    pub apriori_sample: Option<f64>,
    pub apriori_line: Option<f64>,
    pub sample_sigma: Option<f64>,
    pub line_sigma: Option<f64>,
    pub diameter: Option<f64>,
    pub sample_residual: Option<f64>,
    pub line_residual: Option<f64>,
    pub log: Vec<LogRecord>,
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize,
    Archive, rkyv::Serialize, rkyv::Deserialize,
)]
pub struct LogRecord {
    pub name: String,
    pub value: f64,
}

// ============================================================================
// Net → records
// ============================================================================

impl NetworkFile {
    pub fn from_net(net: &ControlNet) -> Self {
        let frame = net.coordinate_type();
        Self {
            network_id: net.network_id().to_string(),
            target_name: net.target_name().to_string(),
            user_name: net.user_name().to_string(),
            created: net.created().to_string(),
            modified: net.modified().to_string(),
            description: net.description().to_string(),
            coordinate_type: frame.as_str().to_string(),
            points: net.points().map(|p| PointEntry::from_point(p, frame)).collect(),
        }
    }
}

impl PointEntry {
    fn from_point(p: &ControlPoint, frame: CoordinateType) -> Self {
        let surface = |sp: &SurfacePoint| SurfaceEntry {
            coordinates: sp.components_in(frame),
            covariance: sp.covariance(),
        };
        Self {
            id: p.id().to_string(),
            point_type: p.point_type().as_str().to_string(),
            chooser_name: p.chooser_name().to_string(),
            date_time: p.date_time().to_string(),
            edit_lock: p.is_edit_locked(),
            ignore: p.is_ignored(),
            jigsaw_rejected: p.is_rejected(),
            reference: p.reference_serial().map(str::to_string),
            apriori_surface_point_source: p.apriori_surface_point_source().as_str().to_string(),
            apriori_surface_point_source_file: p.apriori_surface_point_source_file().to_string(),
            apriori_radius_source: p.apriori_radius_source().as_str().to_string(),
            apriori_radius_source_file: p.apriori_radius_source_file().to_string(),
            apriori: p.apriori_surface_point().map(surface),
            adjusted: p.adjusted_surface_point().map(surface),
            measures: p.iter().map(MeasureEntry::from_measure).collect(),
        }
    }
}

impl MeasureEntry {
    fn from_measure(m: &ControlMeasure) -> Self {
        Self {
            serial: m.serial().to_string(),
            measure_type: m.measure_type().as_str().to_string(),
            chooser_name: m.chooser_name().to_string(),
            date_time: m.date_time().to_string(),
            edit_lock: m.is_edit_locked(),
            ignore: m.is_ignored(),
            jigsaw_rejected: m.is_rejected(),
            sample: m.sample(),
            line: m.line(),
            apriori_sample: m.apriori_sample(),
            apriori_line: m.apriori_line(),
            sample_sigma: m.sample_sigma(),
            line_sigma: m.line_sigma(),
            diameter: m.diameter(),
            sample_residual: m.sample_residual(),
            line_residual: m.line_residual(),
            log: m
                .log_data()
                .iter()
                .map(|e| LogRecord { name: e.data_type.as_str().to_string(), value: e.value })
                .collect(),
        }
    }
}

// ============================================================================
// Records → net
// ============================================================================

fn parse_name<T>(kind: &str, value: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| Error::user(format!("Invalid {kind} [{value}]")))
}

impl NetworkFile {
    /// Build a network, feeding points through `add_point` one by one.
    /// `progress` may cancel between points.
    pub fn into_net(self, config: NetConfig, mut progress: Option<&mut dyn Progress>) -> Result<ControlNet> {
        let frame = if self.coordinate_type.is_empty() {
            CoordinateType::default()
        } else {
            parse_name("coordinate type", &self.coordinate_type, CoordinateType::from_name)?
        };

        let mut net = ControlNet::with_config(frame, config);
        net.set_network_id(self.network_id);
        net.set_target(self.target_name);
        net.set_user_name(self.user_name);
        net.set_created_date(self.created);
        net.set_modified_date(self.modified);
        net.set_description(self.description);

        if let Some(p) = progress.as_deref_mut() {
            p.set_text("Loading Control Points...");
            p.set_maximum_steps(self.points.len());
        }
        for entry in self.points {
            let id = entry.id.clone();
            let point = entry.into_point(frame).map_err(|e| {
                e.context(ErrorKind::User, format!("Unable to read control point [{id}]"))
            })?;
            net.add_point(point)?;
            if let Some(p) = progress.as_deref_mut() {
                if !p.check_status() {
                    return Err(Error::user("Reading of the control network was cancelled"));
                }
            }
        }
        Ok(net)
    }
}

impl PointEntry {
    fn into_point(self, frame: CoordinateType) -> Result<ControlPoint> {
        let surface = |e: SurfaceEntry| {
            let sp = SurfacePoint::from_components(frame, e.coordinates);
            match e.covariance {
                Some(c) => sp.with_covariance(c),
                None => sp,
            }
        };

        let point_type = if self.point_type.is_empty() {
            PointType::Free
        } else {
            parse_name("point type", &self.point_type, PointType::from_name)?
        };
        let mut p = ControlPoint::new(self.id).with_type(point_type);
        p.set_chooser_name(self.chooser_name);
        p.set_date_time(self.date_time);
        p.set_apriori_surface_point(self.apriori.map(surface));
        p.set_adjusted_surface_point(self.adjusted.map(surface));
        if !self.apriori_surface_point_source.is_empty() {
            p.set_apriori_surface_point_source(parse_name(
                "surface point source",
                &self.apriori_surface_point_source,
                SurfacePointSource::from_name,
            )?);
        }
        p.set_apriori_surface_point_source_file(self.apriori_surface_point_source_file);
        if !self.apriori_radius_source.is_empty() {
            p.set_apriori_radius_source(parse_name(
                "radius source",
                &self.apriori_radius_source,
                RadiusSource::from_name,
            )?);
        }
        p.set_apriori_radius_source_file(self.apriori_radius_source_file);

        for m in self.measures {
            p.add(m.into_measure()?)?;
        }
        if let Some(reference) = &self.reference {
            p.set_reference(reference)?;
        }

        p.set_ignored(self.ignore);
        p.set_rejected(self.jigsaw_rejected);
        p.set_edit_lock(self.edit_lock);
        Ok(p)
    }
}

impl MeasureEntry {
    fn into_measure(self) -> Result<ControlMeasure> {
        let measure_type = if self.measure_type.is_empty() {
            MeasureType::Candidate
        } else {
            parse_name("measure type", &self.measure_type, MeasureType::from_name)?
        };
        let nan = f64::NAN;
        let mut m = ControlMeasure::new(self.serial).with_type(measure_type);
        m.set_coordinate(self.sample.unwrap_or(nan), self.line.unwrap_or(nan));
        m.set_apriori_sample(self.apriori_sample.unwrap_or(nan));
        m.set_apriori_line(self.apriori_line.unwrap_or(nan));
        m.set_sample_sigma(self.sample_sigma.unwrap_or(nan));
        m.set_line_sigma(self.line_sigma.unwrap_or(nan));
        m.set_diameter(self.diameter.unwrap_or(nan));
        m.set_residual(self.sample_residual.unwrap_or(nan), self.line_residual.unwrap_or(nan));
        m.set_chooser_name(self.chooser_name);
        m.set_date_time(self.date_time);
        for record in self.log {
            let tag = parse_name("log data type", &record.name, LogDataType::from_name)?;
            m.set_log_data(tag, record.value)?;
        }
        m.set_ignored(self.ignore);
        m.set_rejected(self.jigsaw_rejected);
        m.set_edit_lock(self.edit_lock);
        Ok(m)
    }
}

// ============================================================================
// Read / write
// ============================================================================

/// Serialise `net` in `format`. Two writes of the same network are
/// byte-identical.
pub fn write_network(net: &ControlNet, format: Format, writer: &mut impl Write) -> Result<()> {
    let file = NetworkFile::from_net(net);
    match format {
        Format::Text => writer.write_all(pvl::to_string(&file).as_bytes())?,
        Format::Binary => writer.write_all(&binary::encode(&file)?)?,
    }
    Ok(())
}

/// Decode a network from `reader`, text or binary.
pub fn read_network(
    reader: &mut impl Read,
    config: NetConfig,
    progress: Option<&mut dyn Progress>,
) -> Result<ControlNet> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_network(&bytes)?.into_net(config, progress)
}

fn decode_network(bytes: &[u8]) -> Result<NetworkFile> {
    match Format::sniff(bytes) {
        Format::Binary => binary::decode(bytes),
        Format::Text => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::unknown("Network file is not valid UTF-8", e))
                .map_err(|e| e.context(ErrorKind::User, "Invalid text network"))?;
            pvl::from_str(text)
        }
    }
}

impl ControlNet {
    /// Load a network file. Any failure names the file and yields no net.
    pub fn from_file(path: impl AsRef<Path>, progress: Option<&mut dyn Progress>) -> Result<Self> {
        Self::from_file_with_config(path, NetConfig::default(), progress)
    }

    pub fn from_file_with_config(
        path: impl AsRef<Path>,
        config: NetConfig,
        progress: Option<&mut dyn Progress>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            Error::io(format!("Unable to open control network [{}]", path.display()), e)
        })?;
        let net = read_network(&mut file, config, progress).map_err(|e| match e.kind() {
            ErrorKind::Io => e,
            _ => e.context(
                ErrorKind::User,
                format!("Invalid control network file [{}]", path.display()),
            ),
        })?;
        tracing::info!(path = %path.display(), points = net.num_points(), "control network read");
        Ok(net)
    }

    pub fn write(&self, path: impl AsRef<Path>, format: Format) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            Error::io(format!("Unable to create control network [{}]", path.display()), e)
        })?;
        let mut writer = BufWriter::new(file);
        write_network(self, format, &mut writer)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), ?format, points = self.num_points(), "control network written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_net(frame: CoordinateType) -> ControlNet {
        let mut net = ControlNet::new(frame);
        net.set_network_id("Sample");
        net.set_target("Mars");

        let mut p = ControlPoint::new("p0").with_type(PointType::Constrained);
        let mut m = ControlMeasure::new("ALPHA").with_coordinate(10.5, 20.25);
        m.set_log_data(LogDataType::GoodnessOfFit, 0.875).unwrap();
        p.add(m).unwrap();
        p.add(ControlMeasure::new("BRAVO").with_type(MeasureType::Manual)).unwrap();
        p.set_reference("BRAVO").unwrap();
        let sp = match frame {
            CoordinateType::Rectangular => SurfacePoint::rectangular(1000.0, -250.5, 3.0),
            CoordinateType::Latitudinal => SurfacePoint::latitudinal(12.5, 301.0, 3_396_190.0),
        };
        p.set_apriori_surface_point(Some(sp.with_covariance([1.0, 0.0, 0.0, 2.0, 0.0, 3.0])));
        p.set_apriori_surface_point_source(SurfacePointSource::User);
        p.set_edit_lock(true);
        net.add_point(p).unwrap();
        net
    }

    #[test]
    fn test_record_round_trip_both_frames() {
        for frame in [CoordinateType::Rectangular, CoordinateType::Latitudinal] {
            let net = sample_net(frame);
            let file = NetworkFile::from_net(&net);
            let back = file.clone().into_net(NetConfig::default(), None).unwrap();
            assert_eq!(back, net);
            assert_eq!(NetworkFile::from_net(&back), file);
        }
    }

    #[test]
    fn test_sniff() {
        assert_eq!(Format::sniff(b"CNETBIN1\0\0"), Format::Binary);
        assert_eq!(Format::sniff(b"Object = ControlNetwork"), Format::Text);
        assert_eq!(Format::sniff(b""), Format::Text);
    }

    #[test]
    fn test_unknown_enum_name_is_user_error() {
        let mut file = NetworkFile::from_net(&sample_net(CoordinateType::Rectangular));
        file.points[0].point_type = "Floating".into();
        let err = file.into_net(NetConfig::default(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::User);
    }

    #[test]
    fn test_cancelled_read() {
        let mut bytes = Vec::new();
        write_network(&sample_net(CoordinateType::Rectangular), Format::Text, &mut bytes).unwrap();
        let mut progress = crate::progress::StepCounter::cancel_after(1);
        let result = read_network(&mut bytes.as_slice(), NetConfig::default(), Some(&mut progress));
        assert!(result.is_err());
    }
}
