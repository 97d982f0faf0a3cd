//! # Control Network Model
//!
//! Plain data types: measures, points, ground coordinates and the scalar
//! statistics computed over them. No graph bookkeeping happens here; the
//! owning `ControlNet` does that.

pub mod measure;
pub mod point;
pub mod surface;
pub mod statistics;

pub use measure::{
    ControlMeasure, MeasureType, MeasureStatus, MeasureModType, LogDataType, LogEntry,
    MeasureStatistic,
};
pub use point::{
    ControlPoint, PointType, PointStatus, PointModType, SurfacePointSource, RadiusSource,
};
pub use surface::{SurfacePoint, Coordinates, CoordinateType, Distance, Displacement};
pub use statistics::Statistics;

/// Current local time as `YYYY-MM-DDTHH:MM:SS`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
