//! Small networks shared by tests across the crate.

use chrono::NaiveDate;

use crate::domain::{Coordinate, IdFactory, ServiceDay, TraverseMode, TraverseModeSet};

use super::{Graph, GraphBuilder, StreetSegment, TransferConstraint, TripTimes};

pub(crate) fn service_day() -> ServiceDay {
    ServiceDay::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
}

pub(crate) fn builder() -> GraphBuilder {
    GraphBuilder::new(IdFactory::new("test"), service_day())
}

fn walk(length: f64) -> StreetSegment {
    StreetSegment::new(length).with_permission(TraverseModeSet::single(TraverseMode::Walk))
}

/// A, B and C with walkable streets A-B = 10 m, A-C = 1 m, C-B = 1 m.
///
/// Coordinates are close enough that straight-line distances never exceed
/// street lengths.
pub(crate) fn triangle() -> Graph {
    let mut b = builder();
    let a = b.add_intersection("A", Coordinate::new(0.0, 0.0)).unwrap();
    let bb = b.add_intersection("B", Coordinate::new(0.0, 0.000_01)).unwrap();
    let c = b.add_intersection("C", Coordinate::new(0.0, 0.000_005)).unwrap();
    b.add_street_pair(a, bb, walk(10.0)).unwrap();
    b.add_street_pair(a, c, walk(1.0)).unwrap();
    b.add_street_pair(c, bb, walk(1.0)).unwrap();
    b.build()
}

/// A straight street of `n` vertices `V0..Vn-1`, 100 m apart, open to
/// every street mode.
pub(crate) fn line(n: usize) -> Graph {
    let mut b = builder();
    let ids: Vec<_> = (0..n)
        .map(|i| {
            b.add_intersection(&format!("V{i}"), Coordinate::new(0.0, i as f64 * 0.000_89))
                .unwrap()
        })
        .collect();
    for w in ids.windows(2) {
        b.add_street_pair(w[0], w[1], StreetSegment::new(100.0)).unwrap();
    }
    b.build()
}

/// Origin O with a 10 m street to T and a dead-end street of `n` 1 m
/// segments `L0..Ln-1`, all at one coordinate. A search for T keeps
/// exploring the dead end after T is found.
pub(crate) fn spur(n: usize) -> Graph {
    let mut b = builder();
    let here = Coordinate::new(0.0, 0.0);
    let o = b.add_intersection("O", here).unwrap();
    let t = b.add_intersection("T", here).unwrap();
    b.add_street_pair(o, t, walk(10.0)).unwrap();
    let mut previous = o;
    for i in 0..n {
        let v = b.add_intersection(&format!("L{i}"), here).unwrap();
        b.add_street_pair(previous, v, walk(1.0)).unwrap();
        previous = v;
    }
    b.build()
}

/// Street vertices O and D 5.1 km apart, each next to a stop, with route
/// R1 running from S1 (at O) to S2 (at D) at 08:00 and 08:30, ten minutes
/// per run.
pub(crate) fn small_transit() -> Graph {
    let mut b = builder();
    let o = b.add_intersection("O", Coordinate::new(0.0, 0.0)).unwrap();
    let d = b.add_intersection("D", Coordinate::new(0.0, 0.045)).unwrap();
    b.add_street_pair(o, d, walk(5100.0)).unwrap();

    let s1 = b.add_stop("S1", "Origin stop", Coordinate::new(0.0, 0.0), true).unwrap();
    let s2 = b.add_stop("S2", "Destination stop", Coordinate::new(0.0, 0.045), true).unwrap();
    b.link_stop(s1, o).unwrap();
    b.link_stop(s2, d).unwrap();

    let trips = vec![
        TripTimes::from_departures(b.ids().create("T1"), vec![8 * 3600, 8 * 3600 + 600]).unwrap(),
        TripTimes::from_departures(b.ids().create("T2"), vec![8 * 3600 + 1800, 8 * 3600 + 2400])
            .unwrap(),
    ];
    b.add_pattern("R1", &[s1, s2], trips).unwrap();
    b.build()
}

/// Stops A, X and B, each linked to a street vertex `a`, `x`, `b`.
///
/// Route P1 runs trip T1 from A (t=40) to X (t=100). Route P2 runs T2 from
/// X (t=100) to B (t=200) and T3 from X (t=400) to B (t=500). When
/// `interlined`, T1 continues as T2 without the rider getting off.
pub(crate) fn interline(interlined: bool) -> Graph {
    let mut b = builder();
    let stops = three_stops(&mut b);

    let t1 = TripTimes::from_departures(b.ids().create("T1"), vec![40, 100]).unwrap();
    let t2 = TripTimes::from_departures(b.ids().create("T2"), vec![100, 200]).unwrap();
    let t3 = TripTimes::from_departures(b.ids().create("T3"), vec![400, 500]).unwrap();
    let p1 = b.add_pattern("P1", &[stops[0], stops[1]], vec![t1]).unwrap();
    let p2 = b.add_pattern("P2", &[stops[1], stops[2]], vec![t2, t3]).unwrap();
    if interlined {
        b.add_interline(p1, p2, &[("T1", "T2")]).unwrap();
    }
    b.build()
}

/// Like [`interline`] but P1 runs A1 from A (t=40) to X (t=140) and P2
/// runs B0 (X t=150) and B1 (X t=200); A1 to B1 is a stay-seated
/// transfer.
pub(crate) fn stay_seated() -> Graph {
    let mut b = builder();
    let stops = three_stops(&mut b);

    let a1 = TripTimes::from_departures(b.ids().create("A1"), vec![40, 140]).unwrap();
    let b0 = TripTimes::from_departures(b.ids().create("B0"), vec![150, 250]).unwrap();
    let b1 = TripTimes::from_departures(b.ids().create("B1"), vec![200, 300]).unwrap();
    b.add_pattern("P1", &[stops[0], stops[1]], vec![a1]).unwrap();
    b.add_pattern("P2", &[stops[1], stops[2]], vec![b0, b1]).unwrap();
    b.add_trip_transfer("A1", stops[1], "B1", stops[1], TransferConstraint::StaySeated)
        .unwrap();
    b.build()
}

fn three_stops(b: &mut GraphBuilder) -> Vec<super::StopId> {
    ["A", "X", "B"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let coordinate = Coordinate::new(0.0, i as f64 * 0.001);
            let street = b
                .add_intersection(&name.to_lowercase(), coordinate)
                .unwrap();
            let stop = b.add_stop(name, name, coordinate, true).unwrap();
            b.link_stop(stop, street).unwrap();
            stop
        })
        .collect()
}
