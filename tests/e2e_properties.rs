//! Property tests: random mutation sequences must keep the adjacency graph
//! equal to a from-scratch recount and never admit duplicate ids; frame
//! switches must survive a text round trip.

use std::collections::BTreeMap;

use controlnet::io::{read_network, write_network};
use controlnet::{
    ControlMeasure, ControlNet, ControlPoint, CoordinateType, Format, NetConfig, SurfacePoint,
};
use proptest::prelude::*;

const SERIALS: [&str; 5] = ["ALPHA", "BRAVO", "CHARLIE", "DELTA", "ECHO"];

#[derive(Debug, Clone)]
enum Op {
    AddPoint(u8, u8),
    DeletePoint(u8),
    IgnorePoint(u8, bool),
    LockPoint(u8, bool),
    AddMeasure(u8, u8),
    DeleteMeasure(u8, u8),
    IgnoreMeasure(u8, u8, bool),
    Rename(u8, u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..6, 0u8..32).prop_map(|(p, mask)| Op::AddPoint(p, mask)),
        1 => (0u8..6).prop_map(Op::DeletePoint),
        2 => (0u8..6, any::<bool>()).prop_map(|(p, on)| Op::IgnorePoint(p, on)),
        1 => (0u8..6, any::<bool>()).prop_map(|(p, on)| Op::LockPoint(p, on)),
        2 => (0u8..6, 0u8..5).prop_map(|(p, s)| Op::AddMeasure(p, s)),
        1 => (0u8..6, 0u8..5).prop_map(|(p, s)| Op::DeleteMeasure(p, s)),
        2 => (0u8..6, 0u8..5, any::<bool>()).prop_map(|(p, s, on)| Op::IgnoreMeasure(p, s, on)),
        1 => (0u8..6, 0u8..6).prop_map(|(p, q)| Op::Rename(p, q)),
    ]
}

fn id(n: u8) -> String {
    format!("p{n}")
}

/// Apply `op`, discarding refusals and contract errors; the graph must stay
/// sound either way.
fn apply(net: &mut ControlNet, op: &Op) {
    match *op {
        Op::AddPoint(p, mask) => {
            let mut point = ControlPoint::new(id(p));
            for (bit, serial) in SERIALS.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    let _ = point.add(ControlMeasure::new(*serial));
                }
            }
            let _ = net.add_point(point);
        }
        Op::DeletePoint(p) => {
            let _ = net.delete_point(&id(p));
        }
        Op::IgnorePoint(p, on) => {
            if let Ok(mut point) = net.point_mut(&id(p)) {
                let _ = point.set_ignored(on);
            }
        }
        Op::LockPoint(p, on) => {
            if let Ok(mut point) = net.point_mut(&id(p)) {
                point.set_edit_lock(on);
            }
        }
        Op::AddMeasure(p, s) => {
            if let Ok(mut point) = net.point_mut(&id(p)) {
                let _ = point.add(ControlMeasure::new(SERIALS[s as usize]));
            }
        }
        Op::DeleteMeasure(p, s) => {
            if let Ok(mut point) = net.point_mut(&id(p)) {
                let _ = point.delete(SERIALS[s as usize]);
            }
        }
        Op::IgnoreMeasure(p, s, on) => {
            if let Ok(mut point) = net.point_mut(&id(p)) {
                if let Ok(mut m) = point.measure_mut(SERIALS[s as usize]) {
                    let _ = m.set_ignored(on);
                }
            }
        }
        Op::Rename(p, q) => {
            if let Ok(mut point) = net.point_mut(&id(p)) {
                let _ = point.set_id(id(q));
            }
        }
    }
}

fn recount_edges(net: &ControlNet) -> BTreeMap<(String, String), u32> {
    let mut edges = BTreeMap::new();
    for point in net.points().filter(|p| !p.is_ignored()) {
        let serials = point.valid_serials();
        for (i, u) in serials.iter().enumerate() {
            for v in &serials[i + 1..] {
                let key = if u < v { (u.to_string(), v.to_string()) } else { (v.to_string(), u.to_string()) };
                *edges.entry(key).or_insert(0) += 1;
            }
        }
    }
    edges
}

fn graph_edges(net: &ControlNet) -> BTreeMap<(String, String), u32> {
    net.graph()
        .edges()
        .into_iter()
        .map(|(u, v, s)| ((u.to_string(), v.to_string()), s))
        .collect()
}

fn check_vertices(net: &ControlNet) -> Result<(), TestCaseError> {
    for point in net.points() {
        for m in point.iter() {
            prop_assert!(net.graph().contains(m.serial()));
            prop_assert_eq!(m.parent_id(), Some(point.id()));
        }
        prop_assert_eq!(point.parent_net(), Some(net.id()));
    }
    for serial in net.graph().serials() {
        let mut expected: Vec<&str> = net
            .points()
            .filter(|p| p.contains_serial(serial))
            .map(ControlPoint::id)
            .collect();
        expected.sort_unstable();
        prop_assert_eq!(net.graph().points_in(serial), expected);
    }
    Ok(())
}

proptest! {
    #[test]
    fn graph_matches_recount(ops in prop::collection::vec(op(), 1..60)) {
        let mut net = ControlNet::new(CoordinateType::Rectangular);
        for op in &ops {
            apply(&mut net, op);
            prop_assert_eq!(graph_edges(&net), recount_edges(&net), "after {:?}", op);
            check_vertices(&net)?;
        }
        let islands: usize = net.graph().connected_components().iter().map(Vec::len).sum();
        prop_assert_eq!(islands, net.graph().vertex_count());
    }

    #[test]
    fn duplicate_ids_never_enter(ops in prop::collection::vec(op(), 1..40)) {
        let mut net = ControlNet::new(CoordinateType::Latitudinal);
        for op in &ops {
            apply(&mut net, op);
        }
        let ids: Vec<String> = net.point_ids().into_iter().map(str::to_string).collect();
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), ids.len());

        for existing in &ids {
            let before = net.clone();
            let mut point = ControlPoint::new(existing.as_str());
            point.add(ControlMeasure::new("ZULU")).unwrap();
            prop_assert!(net.add_point(point).is_err());
            prop_assert!(net == before);
            prop_assert!(!net.graph().contains("ZULU"));
        }
    }

    #[test]
    fn frame_switches_survive_text_round_trip(
        coords in prop::collection::vec((-5.0e6..5.0e6f64, -5.0e6..5.0e6f64, -5.0e6..5.0e6f64), 1..6),
        switches in prop::collection::vec(any::<bool>(), 0..4),
    ) {
        let mut net = ControlNet::new(CoordinateType::Latitudinal);
        for (i, (x, y, z)) in coords.into_iter().enumerate() {
            let mut point = ControlPoint::new(id(i as u8));
            point.set_apriori_surface_point(Some(SurfacePoint::rectangular(x, y, z)));
            net.add_point(point).unwrap();
        }
        for rectangular in switches {
            net.set_coordinate_type(if rectangular {
                CoordinateType::Rectangular
            } else {
                CoordinateType::Latitudinal
            });
        }

        let mut first = Vec::new();
        write_network(&net, Format::Text, &mut first).unwrap();
        let back = read_network(&mut first.as_slice(), NetConfig::default(), None).unwrap();
        prop_assert!(back == net);

        let mut second = Vec::new();
        write_network(&back, Format::Text, &mut second).unwrap();
        prop_assert_eq!(first, second);
    }
}
