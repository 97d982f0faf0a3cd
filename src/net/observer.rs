//! Change notifications for embedders (editors, views, caches).

use crate::model::{MeasureModType, PointModType};

/// Receives network change events. Every method defaults to a no-op.
///
/// Events fire after the network has been updated, so the observer sees
/// the new state when it queries back.
pub trait NetObserver: Send {
    fn point_added(&mut self, _id: &str) {}

    fn point_deleted(&mut self, _id: &str) {}

    fn point_modified(&mut self, _id: &str, _change: PointModType) {}

    fn measure_modified(&mut self, _point_id: &str, _serial: &str, _change: MeasureModType) {}

    /// A measure was added or removed, or the network was emptied.
    fn structure_modified(&mut self) {}
}
