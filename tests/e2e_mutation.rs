//! End-to-end tests for ownership, locking, uniqueness and change
//! notification.

use std::sync::Arc;

use controlnet::{
    ControlMeasure, ControlNet, ControlPoint, CoordinateType, ErrorKind, MeasureModType,
    MeasureStatus, NetObserver, PointModType, PointStatus, PointType,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

fn point(id: &str, serials: &[&str]) -> ControlPoint {
    let mut p = ControlPoint::new(id);
    for s in serials {
        p.add(ControlMeasure::new(*s)).unwrap();
    }
    p
}

fn sample_net() -> ControlNet {
    let mut net = ControlNet::new(CoordinateType::Rectangular);
    net.add_point(point("p0", &["ALPHA", "BRAVO"])).unwrap();
    net.add_point(point("p1", &["BRAVO", "CHARLIE"])).unwrap();
    net
}

// ============================================================================
// 1. Locking
// ============================================================================

#[test]
fn test_delete_locked_point_is_refused() {
    let mut net = sample_net();
    net.point_mut("p0").unwrap().set_edit_lock(true);
    let before = net.clone();

    assert_eq!(net.delete_point("p0").unwrap(), PointStatus::PointLocked);
    assert_eq!(net, before);
    assert_eq!(net.graph().edge_count(), 2);
}

#[test]
fn test_locked_point_refuses_edits() {
    let mut net = sample_net();
    let mut p0 = net.point_mut("p0").unwrap();
    p0.set_edit_lock(true);
    assert_eq!(p0.set_type(PointType::Fixed), PointStatus::PointLocked);
    assert_eq!(p0.set_ignored(true).unwrap(), PointStatus::PointLocked);
    assert_eq!(p0.set_id("other").unwrap(), PointStatus::PointLocked);
    assert_eq!(p0.point_type(), PointType::Free);
    assert!(!p0.is_ignored());
    assert!(net.contains_point("p0"));
}

#[test]
fn test_locked_measure_refuses_delete_and_edits() {
    let mut net = sample_net();
    {
        let mut p0 = net.point_mut("p0").unwrap();
        let mut alpha = p0.measure_mut("ALPHA").unwrap();
        alpha.set_edit_lock(true);
        assert_eq!(alpha.set_coordinate(1.0, 2.0), MeasureStatus::MeasureLocked);
        assert_eq!(alpha.set_ignored(true).unwrap(), MeasureStatus::MeasureLocked);
        // residuals stay writable
        assert_eq!(alpha.set_residual(1.0, 1.0), MeasureStatus::Success);
    }
    let mut p0 = net.point_mut("p0").unwrap();
    assert_eq!(p0.delete("ALPHA").unwrap(), PointStatus::MeasureLocked);
    assert_eq!(p0.num_measures(), 2);
}

#[test]
fn test_reference_of_locked_point_is_locked() {
    let mut net = sample_net();
    let mut p0 = net.point_mut("p0").unwrap();
    p0.set_reference("BRAVO").unwrap();
    p0.set_edit_lock(true);
    assert!(p0.is_measure_edit_locked("BRAVO"));
    assert!(!p0.is_measure_edit_locked("ALPHA"));
    assert_eq!(p0.delete("BRAVO").unwrap(), PointStatus::MeasureLocked);
    assert_eq!(p0.delete("ALPHA").unwrap(), PointStatus::Success);
}

// ============================================================================
// 2. Ownership
// ============================================================================

#[test]
fn test_take_empties_net_and_detaches_points() {
    let mut net = sample_net();
    let net_id = net.id();
    assert_eq!(net.point("p0").unwrap().parent_net(), Some(net_id));

    let points = net.take().unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| p.parent_net().is_none()));
    assert_eq!(net.num_points(), 0);
    assert_eq!(net.graph().vertex_count(), 0);

    let err = net.take().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Programmer);
}

#[test]
fn test_measure_parent_is_point() {
    let net = sample_net();
    let p1 = net.point("p1").unwrap();
    assert!(p1.iter().all(|m| m.parent_id() == Some("p1")));
}

#[test]
fn test_missing_point_is_programmer_error() {
    let mut net = sample_net();
    assert_eq!(net.point_mut("nope").err().map(|e| e.kind()), Some(ErrorKind::Programmer));
    assert_eq!(net.point_at(7).unwrap_err().kind(), ErrorKind::Programmer);
    assert_eq!(net.delete_point_at(7).unwrap_err().kind(), ErrorKind::Programmer);
}

#[test]
fn test_clone_is_independent() {
    let net = sample_net();
    let mut copy = net.clone();
    assert_eq!(copy, net);
    assert_ne!(copy.id(), net.id());
    assert_eq!(copy.point("p0").unwrap().parent_net(), Some(copy.id()));

    copy.point_mut("p1").unwrap().set_ignored(true).unwrap();
    assert_eq!(copy.graph().edge_count(), 1);
    assert_eq!(net.graph().edge_count(), 2);
}

// ============================================================================
// 3. Uniqueness
// ============================================================================

#[test]
fn test_duplicate_id_is_rejected() {
    let mut net = sample_net();
    let before = net.clone();
    let err = net.add_point(point("p0", &["DELTA"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Programmer);
    assert!(err.message().contains("p0"));
    assert_eq!(net, before);
    assert!(!net.graph().contains("DELTA"));
}

#[test]
fn test_rename_to_existing_id_is_rejected() {
    let mut net = sample_net();
    let err = net.point_mut("p1").unwrap().set_id("p0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Programmer);
    assert_eq!(net.point_ids(), vec!["p0", "p1"]);
}

#[test]
fn test_locked_rename_to_existing_id_is_soft_refusal() {
    let mut net = sample_net();
    let mut p1 = net.point_mut("p1").unwrap();
    p1.set_edit_lock(true);
    assert_eq!(p1.set_id("p0").unwrap(), PointStatus::PointLocked);
    assert_eq!(net.point_ids(), vec!["p0", "p1"]);
}

#[test]
fn test_empty_id_is_rejected() {
    let mut net = sample_net();
    assert_eq!(net.add_point(ControlPoint::new("")).unwrap_err().kind(), ErrorKind::Programmer);
}

#[test]
fn test_serial_is_fixed_once_installed() {
    let mut p = point("p0", &["ALPHA"]);
    let err = p.measure_mut("ALPHA").unwrap().set_serial("BRAVO").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Programmer);
}

// ============================================================================
// 4. Notifications
// ============================================================================

struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl NetObserver for Recorder {
    fn point_added(&mut self, id: &str) {
        self.events.lock().push(format!("added {id}"));
    }

    fn point_deleted(&mut self, id: &str) {
        self.events.lock().push(format!("deleted {id}"));
    }

    fn point_modified(&mut self, id: &str, change: PointModType) {
        self.events.lock().push(format!("point {id} {change:?}"));
    }

    fn measure_modified(&mut self, point_id: &str, serial: &str, change: MeasureModType) {
        self.events.lock().push(format!("measure {point_id}/{serial} {change:?}"));
    }

    fn structure_modified(&mut self) {
        self.events.lock().push("structure".to_string());
    }
}

#[test]
fn test_observer_sees_changes() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut net = ControlNet::new(CoordinateType::Rectangular);
    net.set_observer(Box::new(Recorder { events: Arc::clone(&events) }));

    net.add_point(point("p0", &["ALPHA", "BRAVO"])).unwrap();
    {
        let mut p0 = net.point_mut("p0").unwrap();
        p0.measure_mut("ALPHA").unwrap().set_ignored(true).unwrap();
        p0.set_edit_lock(true);
    }
    net.point_mut("p0").unwrap().set_edit_lock(false);
    net.delete_point("p0").unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            "added p0".to_string(),
            "measure p0/ALPHA IgnoredModified".into(),
            "point p0 EditLockModified".into(),
            "point p0 EditLockModified".into(),
            "deleted p0".into(),
        ]
    );
}
