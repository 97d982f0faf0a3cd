//! Ground coordinates and the scalar value types around them.
//!
//! `SurfacePoint` keeps whatever frame it was built in. Conversion to the
//! other frame happens only when a caller asks for it (writers do, using the
//! enclosing net's `CoordinateType`).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// CoordinateType
// ============================================================================

/// Frame in which a network reads and writes its surface points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordinateType {
    #[default]
    Latitudinal,
    Rectangular,
}

impl CoordinateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateType::Latitudinal => "Latitudinal",
            CoordinateType::Rectangular => "Rectangular",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("latitudinal") {
            Some(CoordinateType::Latitudinal)
        } else if name.eq_ignore_ascii_case("rectangular") {
            Some(CoordinateType::Rectangular)
        } else {
            None
        }
    }
}

impl std::fmt::Display for CoordinateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Distance / Displacement
// ============================================================================

/// Non-negative length in metres. The default value is uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distance(Option<f64>);

impl Distance {
    pub fn from_meters(meters: f64) -> Result<Self> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(Error::programmer(format!(
                "Negative or non-finite distance [{meters}] is not allowed"
            )));
        }
        Ok(Distance(Some(meters)))
    }

    pub fn from_kilometers(km: f64) -> Result<Self> {
        Self::from_meters(km * 1000.0)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn meters(&self) -> Result<f64> {
        self.0.ok_or_else(|| Error::programmer("Distance has not been initialized"))
    }

    pub fn kilometers(&self) -> Result<f64> {
        Ok(self.meters()? / 1000.0)
    }
}

/// Signed length in metres. The default value is uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Displacement(Option<f64>);

impl Displacement {
    pub fn from_meters(meters: f64) -> Self {
        Displacement(meters.is_finite().then_some(meters))
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn meters(&self) -> Result<f64> {
        self.0.ok_or_else(|| Error::programmer("Displacement has not been initialized"))
    }

    /// Difference `b - a` of two distances.
    pub fn between(a: Distance, b: Distance) -> Result<Self> {
        Ok(Displacement(Some(b.meters()? - a.meters()?)))
    }
}

// ============================================================================
// SurfacePoint
// ============================================================================

/// Native coordinates of a surface point.
///
/// Rectangular values are body-fixed metres. Latitudinal values are
/// planetocentric degrees (longitude positive east, 0..360) and a radius in
/// metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coordinates {
    Rectangular { x: f64, y: f64, z: f64 },
    Latitudinal { latitude: f64, longitude: f64, radius: f64 },
}

impl Coordinates {
    pub fn frame(&self) -> CoordinateType {
        match self {
            Coordinates::Rectangular { .. } => CoordinateType::Rectangular,
            Coordinates::Latitudinal { .. } => CoordinateType::Latitudinal,
        }
    }

    /// The three components in frame order.
    pub fn components(&self) -> [f64; 3] {
        match *self {
            Coordinates::Rectangular { x, y, z } => [x, y, z],
            Coordinates::Latitudinal { latitude, longitude, radius } => [latitude, longitude, radius],
        }
    }
}

/// 3D ground coordinate with optional covariance.
///
/// The covariance is always rectangular: the six upper-triangle entries
/// `[xx, xy, xz, yy, yz, zz]` in square metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    coordinates: Coordinates,
    covariance: Option<[f64; 6]>,
}

impl SurfacePoint {
    pub fn rectangular(x: f64, y: f64, z: f64) -> Self {
        Self { coordinates: Coordinates::Rectangular { x, y, z }, covariance: None }
    }

    pub fn latitudinal(latitude: f64, longitude: f64, radius: f64) -> Self {
        Self {
            coordinates: Coordinates::Latitudinal { latitude, longitude, radius },
            covariance: None,
        }
    }

    /// Build a point from three components interpreted in `frame`.
    pub fn from_components(frame: CoordinateType, c: [f64; 3]) -> Self {
        match frame {
            CoordinateType::Rectangular => Self::rectangular(c[0], c[1], c[2]),
            CoordinateType::Latitudinal => Self::latitudinal(c[0], c[1], c[2]),
        }
    }

    pub fn with_covariance(mut self, covariance: [f64; 6]) -> Self {
        self.covariance = Some(covariance);
        self
    }

    pub fn set_covariance(&mut self, covariance: Option<[f64; 6]>) {
        self.covariance = covariance;
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn covariance(&self) -> Option<[f64; 6]> {
        self.covariance
    }

    pub fn is_valid(&self) -> bool {
        self.coordinates.components().iter().all(|c| c.is_finite())
    }

    /// Body-fixed `(x, y, z)` in metres.
    pub fn to_rectangular(&self) -> [f64; 3] {
        match self.coordinates {
            Coordinates::Rectangular { x, y, z } => [x, y, z],
            Coordinates::Latitudinal { latitude, longitude, radius } => {
                let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
                [
                    radius * lat.cos() * lon.cos(),
                    radius * lat.cos() * lon.sin(),
                    radius * lat.sin(),
                ]
            }
        }
    }

    /// `(latitude, longitude, radius)`, degrees and metres.
    pub fn to_latitudinal(&self) -> [f64; 3] {
        match self.coordinates {
            Coordinates::Latitudinal { latitude, longitude, radius } => [latitude, longitude, radius],
            Coordinates::Rectangular { x, y, z } => {
                let radius = (x * x + y * y + z * z).sqrt();
                if radius == 0.0 {
                    return [0.0, 0.0, 0.0];
                }
                let latitude = z.atan2(x.hypot(y)).to_degrees();
                let mut longitude = y.atan2(x).to_degrees();
                if longitude < 0.0 {
                    longitude += 360.0;
                }
                [latitude, longitude, radius]
            }
        }
    }

    /// Components expressed in `frame`, converting when the native frame differs.
    pub fn components_in(&self, frame: CoordinateType) -> [f64; 3] {
        if self.coordinates.frame() == frame {
            return self.coordinates.components();
        }
        match frame {
            CoordinateType::Rectangular => self.to_rectangular(),
            CoordinateType::Latitudinal => self.to_latitudinal(),
        }
    }

    /// The same point stored natively in `frame`; covariance is kept.
    pub fn in_frame(&self, frame: CoordinateType) -> SurfacePoint {
        if self.coordinates.frame() == frame {
            return *self;
        }
        SurfacePoint {
            coordinates: SurfacePoint::from_components(frame, self.components_in(frame)).coordinates,
            covariance: self.covariance,
        }
    }

    pub fn local_radius(&self) -> Result<Distance> {
        let [_, _, radius] = self.to_latitudinal();
        Distance::from_meters(radius)
    }

    /// Rectangular mean of `points`, `None` for an empty input.
    pub fn average<'a>(points: impl IntoIterator<Item = &'a SurfacePoint>) -> Option<SurfacePoint> {
        let mut sum = [0.0_f64; 3];
        let mut n = 0usize;
        for p in points {
            let r = p.to_rectangular();
            sum[0] += r[0];
            sum[1] += r[1];
            sum[2] += r[2];
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let n = n as f64;
        Some(SurfacePoint::rectangular(sum[0] / n, sum[1] / n, sum[2] / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_latitudinal_rectangular_conversion() {
        let p = SurfacePoint::latitudinal(0.0, 90.0, 1000.0);
        let [x, y, z] = p.to_rectangular();
        assert!(close(x, 0.0) && close(y, 1000.0) && close(z, 0.0));

        let back = SurfacePoint::rectangular(x, y, z).to_latitudinal();
        assert!(close(back[0], 0.0) && close(back[1], 90.0) && close(back[2], 1000.0));
    }

    #[test]
    fn test_negative_longitude_wraps() {
        let [_, lon, _] = SurfacePoint::rectangular(0.0, -5.0, 0.0).to_latitudinal();
        assert!(close(lon, 270.0));
    }

    #[test]
    fn test_components_in_native_frame_are_exact() {
        let p = SurfacePoint::rectangular(1.5, -2.25, 3.125);
        assert_eq!(p.components_in(CoordinateType::Rectangular), [1.5, -2.25, 3.125]);
    }

    #[test]
    fn test_in_frame_converts_and_keeps_covariance() {
        let p = SurfacePoint::rectangular(0.0, 1000.0, 0.0).with_covariance([1.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        let lat = p.in_frame(CoordinateType::Latitudinal);
        assert_eq!(lat.coordinates().frame(), CoordinateType::Latitudinal);
        let [la, lo, r] = lat.coordinates().components();
        assert!(close(la, 0.0) && close(lo, 90.0) && close(r, 1000.0));
        assert_eq!(lat.covariance(), p.covariance());
        assert_eq!(p.in_frame(CoordinateType::Rectangular), p);
    }

    #[test]
    fn test_average() {
        let pts = [SurfacePoint::rectangular(0.0, 0.0, 0.0), SurfacePoint::rectangular(2.0, 4.0, 6.0)];
        let avg = SurfacePoint::average(pts.iter()).unwrap();
        assert_eq!(avg.to_rectangular(), [1.0, 2.0, 3.0]);
        assert!(SurfacePoint::average(std::iter::empty()).is_none());
    }

    #[test]
    fn test_uninitialized_distance_is_programmer_error() {
        let err = Distance::default().meters().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Programmer);
        assert!(Distance::from_meters(-1.0).is_err());
        assert_eq!(Distance::from_kilometers(2.0).unwrap().meters().unwrap(), 2000.0);
    }

    #[test]
    fn test_displacement_between() {
        let a = Distance::from_meters(10.0).unwrap();
        let b = Distance::from_meters(4.0).unwrap();
        assert_eq!(Displacement::between(a, b).unwrap().meters().unwrap(), -6.0);
        assert!(Displacement::default().meters().is_err());
    }
}
