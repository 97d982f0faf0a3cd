//! End-to-end tests for adjacency-graph maintenance.
//!
//! Each test builds a network through the public mutation surface and checks
//! edge strengths, edge counts and islands after every step.

use controlnet::{ControlMeasure, ControlNet, ControlPoint, CoordinateType, PointStatus};
use pretty_assertions::assert_eq;

fn point(id: &str, serials: &[&str]) -> ControlPoint {
    let mut p = ControlPoint::new(id);
    for s in serials {
        p.add(ControlMeasure::new(*s)).unwrap();
    }
    p
}

fn edges(net: &ControlNet) -> Vec<(String, String, u32)> {
    net.graph()
        .edges()
        .into_iter()
        .map(|(u, v, s)| (u.to_string(), v.to_string(), s))
        .collect()
}

fn e(u: &str, v: &str, s: u32) -> (String, String, u32) {
    (u.to_string(), v.to_string(), s)
}

fn alpha_bravo_charlie() -> ControlNet {
    let mut net = ControlNet::new(CoordinateType::Latitudinal);
    net.add_point(point("p0", &["ALPHA", "BRAVO"])).unwrap();
    net.add_point(point("p1", &["ALPHA", "BRAVO", "CHARLIE"])).unwrap();
    net
}

// ============================================================================
// 1. Ignoring a point removes its pair contributions
// ============================================================================

#[test]
fn test_ignore_toggles_edges() {
    let mut net = alpha_bravo_charlie();
    let initial = vec![e("ALPHA", "BRAVO", 2), e("ALPHA", "CHARLIE", 1), e("BRAVO", "CHARLIE", 1)];
    assert_eq!(edges(&net), initial);
    assert_eq!(net.graph().edge_count(), 3);

    net.point_mut("p1").unwrap().set_ignored(true).unwrap();
    assert_eq!(edges(&net), vec![e("ALPHA", "BRAVO", 1)]);
    assert_eq!(net.graph().edge_count(), 1);

    net.point_mut("p1").unwrap().set_ignored(false).unwrap();
    assert_eq!(edges(&net), initial);
    assert_eq!(net.graph().edge_count(), 3);
}

#[test]
fn test_ignore_measure_toggles_edges() {
    let mut net = alpha_bravo_charlie();
    net.point_mut("p1")
        .unwrap()
        .measure_mut("CHARLIE")
        .unwrap()
        .set_ignored(true)
        .unwrap();
    assert_eq!(edges(&net), vec![e("ALPHA", "BRAVO", 2)]);
    assert_eq!(net.num_valid_measures_in_image("CHARLIE"), 0);
    // the vertex stays even with no valid measures
    assert!(net.graph().contains("CHARLIE"));

    net.point_mut("p1")
        .unwrap()
        .measure_mut("CHARLIE")
        .unwrap()
        .set_ignored(false)
        .unwrap();
    assert_eq!(net.graph().edge_count(), 3);
}

#[test]
fn test_measure_ignored_inside_ignored_point() {
    let mut net = alpha_bravo_charlie();
    let mut p1 = net.point_mut("p1").unwrap();
    p1.set_ignored(true).unwrap();
    p1.measure_mut("ALPHA").unwrap().set_ignored(true).unwrap();
    p1.set_ignored(false).unwrap();
    assert_eq!(edges(&net), vec![e("ALPHA", "BRAVO", 1), e("BRAVO", "CHARLIE", 1)]);
}

// ============================================================================
// 2. Replacing a measure
// ============================================================================

#[test]
fn test_measure_replacement() {
    let mut net = alpha_bravo_charlie();
    {
        let mut p0 = net.point_mut("p0").unwrap();
        assert_eq!(p0.delete("BRAVO").unwrap(), PointStatus::Success);
        p0.add(ControlMeasure::new("DELTA")).unwrap();
    }
    assert_eq!(
        edges(&net),
        vec![
            e("ALPHA", "BRAVO", 1),
            e("ALPHA", "CHARLIE", 1),
            e("ALPHA", "DELTA", 1),
            e("BRAVO", "CHARLIE", 1),
        ]
    );
    assert_eq!(net.graph().edge_count(), 4);
    assert_eq!(net.graph().points_in("BRAVO"), vec!["p1"]);
    assert_eq!(net.cube_serials(), vec!["ALPHA", "BRAVO", "CHARLIE", "DELTA"]);
}

#[test]
fn test_delete_point_removes_contributions() {
    let mut net = alpha_bravo_charlie();
    assert_eq!(net.delete_point("p1").unwrap(), PointStatus::Success);
    assert_eq!(edges(&net), vec![e("ALPHA", "BRAVO", 1)]);
    assert!(net.graph().points_in("CHARLIE").is_empty());
    assert_eq!(net.point_ids(), vec!["p0"]);
}

// ============================================================================
// 3. Islands
// ============================================================================

#[test]
fn test_connected_components() {
    let mut net = ControlNet::new(CoordinateType::Rectangular);
    net.add_point(point("p0", &["ALPHA", "BRAVO"])).unwrap();
    net.add_point(point("p1", &["BRAVO", "GAMMA"])).unwrap();
    net.add_point(point("p2", &["GAMMA", "DELTA"])).unwrap();
    net.add_point(point("p3", &["EPSILON"])).unwrap();

    let islands = net.graph().connected_components();
    assert_eq!(
        islands,
        vec![
            vec!["ALPHA".to_string(), "BRAVO".into(), "DELTA".into(), "GAMMA".into()],
            vec!["EPSILON".to_string()],
        ]
    );
}

#[test]
fn test_ignoring_bridge_splits_island() {
    let mut net = ControlNet::new(CoordinateType::Rectangular);
    net.add_point(point("p0", &["ALPHA", "BRAVO"])).unwrap();
    net.add_point(point("bridge", &["BRAVO", "GAMMA"])).unwrap();
    assert_eq!(net.graph().connected_components().len(), 1);

    net.point_mut("bridge").unwrap().set_ignored(true).unwrap();
    assert_eq!(
        net.graph().connected_components(),
        vec![vec!["ALPHA".to_string(), "BRAVO".into()], vec!["GAMMA".to_string()]]
    );
}

// ============================================================================
// 4. Renames and bulk removal
// ============================================================================

#[test]
fn test_rename_point_rekeys_graph() {
    let mut net = alpha_bravo_charlie();
    net.point_mut("p1").unwrap().set_id("renamed").unwrap();
    assert!(net.point("p1").is_none());
    assert_eq!(net.point("renamed").unwrap().num_measures(), 3);
    assert_eq!(net.graph().points_in("CHARLIE"), vec!["renamed"]);
    assert_eq!(net.point_ids(), vec!["p0", "renamed"]);
    assert_eq!(net.graph().edge_count(), 3);
}

#[test]
fn test_delete_measures_with_serial() {
    let mut net = alpha_bravo_charlie();
    assert_eq!(net.delete_measures_with_serial("ALPHA").unwrap(), 2);
    assert_eq!(edges(&net), vec![e("BRAVO", "CHARLIE", 1)]);
    assert_eq!(net.num_measures(), 3);
}
