//! # controlnet - Control Network core
//!
//! In-memory relational structure tying *control points* (ground features)
//! to *control measures* (their observations in individual images), plus
//! the image-adjacency graph that is kept consistent as the network is
//! mutated.
//!
//! ## Design Principles
//!
//! 1. **The net owns everything**: points live in the `ControlNet`, measures
//!    live in their `ControlPoint`. Back-references are keys, not pointers.
//! 2. **Every structural mutation routes through the net**: points inside a
//!    net are edited through `PointMut` / `MeasureMut` handles so the
//!    adjacency graph never drifts from the point map.
//! 3. **Soft refusals are statuses**: edit-locked objects answer with
//!    `PointStatus::PointLocked` / `MeasureStatus::MeasureLocked`, not errors.
//! 4. **External collaborators are traits**: cameras and cube access sit
//!    behind `Camera` and `ImageOpener`.
//!
//! ## Quick Start
//!
//! ```rust
//! use controlnet::{ControlMeasure, ControlNet, ControlPoint, CoordinateType};
//!
//! # fn example() -> controlnet::Result<()> {
//! let mut net = ControlNet::new(CoordinateType::Rectangular);
//!
//! let mut point = ControlPoint::new("p0");
//! point.add(ControlMeasure::new("ALPHA"))?;
//! point.add(ControlMeasure::new("BRAVO"))?;
//! net.add_point(point)?;
//!
//! assert_eq!(net.graph().edge_count(), 1);
//! net.point_mut("p0")?.set_ignored(true)?;
//! assert_eq!(net.graph().edge_count(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## File Formats
//!
//! | Format | Module | Description |
//! |--------|--------|-------------|
//! | Text | `io::pvl` | Labelled-object form, human readable |
//! | Binary | `io::binary` | Magic header + rkyv archive |

use std::panic::Location;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod graph;
pub mod net;
pub mod io;
pub mod export;
pub mod config;
pub mod progress;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    ControlMeasure, MeasureType, MeasureStatus, MeasureModType, LogDataType, LogEntry,
    MeasureStatistic,
    ControlPoint, PointType, PointStatus, PointModType, SurfacePointSource, RadiusSource,
    SurfacePoint, Coordinates, CoordinateType, Distance, Displacement,
    Statistics,
};

// ============================================================================
// Re-exports: Network
// ============================================================================

pub use graph::AdjacencyGraph;
pub use net::{
    ControlNet, NetId, PointMut, MeasureMut, NetObserver,
    Camera, ImageOpener, SerialNumberList,
};
pub use io::Format;
pub use config::NetConfig;
pub use progress::Progress;

// ============================================================================
// Error Types
// ============================================================================

/// Classification of a failure, independent of where it was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input from a user-controlled artifact (file, image list, serial).
    User,
    /// Contract violation by the calling code.
    Programmer,
    /// Filesystem failure.
    Io,
    /// Propagated lower-level failure (camera construction, serialisers).
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::User => "User",
            ErrorKind::Programmer => "Programmer",
            ErrorKind::Io => "Io",
            ErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("User error: {message} [{location}]")]
    User {
        message: String,
        location: &'static Location<'static>,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("Programmer error: {message} [{location}]")]
    Programmer {
        message: String,
        location: &'static Location<'static>,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("IO error: {message} [{location}]")]
    Io {
        message: String,
        location: &'static Location<'static>,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown error: {message} [{location}]")]
    Unknown {
        message: String,
        location: &'static Location<'static>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[track_caller]
    pub fn user(message: impl Into<String>) -> Self {
        Error::User { message: message.into(), location: Location::caller(), source: None }
    }

    #[track_caller]
    pub fn programmer(message: impl Into<String>) -> Self {
        Error::Programmer { message: message.into(), location: Location::caller(), source: None }
    }

    #[track_caller]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io { message: message.into(), location: Location::caller(), source }
    }

    #[track_caller]
    pub fn unknown(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Unknown { message: message.into(), location: Location::caller(), source: source.into() }
    }

    /// Wrap this error in a new one of the given kind, keeping the chain.
    ///
    /// `Io` and `Unknown` wrappers both become `Unknown` since their
    /// cause slot is not an `Error`.
    #[track_caller]
    pub fn context(self, kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let location = Location::caller();
        match kind {
            ErrorKind::User => Error::User { message, location, source: Some(Box::new(self)) },
            ErrorKind::Programmer => {
                Error::Programmer { message, location, source: Some(Box::new(self)) }
            }
            ErrorKind::Io | ErrorKind::Unknown => {
                Error::Unknown { message, location, source: Box::new(self) }
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::User { .. } => ErrorKind::User,
            Error::Programmer { .. } => ErrorKind::Programmer,
            Error::Io { .. } => ErrorKind::Io,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::User { message, .. }
            | Error::Programmer { message, .. }
            | Error::Io { message, .. }
            | Error::Unknown { message, .. } => message,
        }
    }

    /// Source location where the error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        match self {
            Error::User { location, .. }
            | Error::Programmer { location, .. }
            | Error::Io { location, .. }
            | Error::Unknown { location, .. } => location,
        }
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_and_message() {
        let err = Error::programmer("ControlPoint must have unique Id");
        assert_eq!(err.kind(), ErrorKind::Programmer);
        assert_eq!(err.message(), "ControlPoint must have unique Id");
        assert!(err.location().file().ends_with("lib.rs"));
    }

    #[test]
    fn test_context_preserves_chain() {
        let inner = Error::user("Invalid value [abc] for keyword [Sample]");
        let outer = inner.context(ErrorKind::User, "Invalid Format in [net.txt]");
        assert_eq!(outer.kind(), ErrorKind::User);
        let cause = outer.source().expect("wrapped error has a cause");
        assert!(cause.to_string().contains("Sample"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source().is_some());
    }
}
