//! Tests of route following and merging on the full cloverleaf network.

use std::collections::HashSet;

use interchange_sim::{network, LaneId, Simulation, SimulationParams};

const DT: f64 = 1.0 / 60.0;

/// A cloverleaf with spawning disabled, so tests control every vehicle.
fn quiet_cloverleaf() -> Simulation {
    let params = SimulationParams {
        max_vehicles: 0,
        ..Default::default()
    };
    network::cloverleaf(params, 1200.0, 900.0)
}

/// A ramp-bound vehicle leaves its through-lane, traverses the three-segment
/// connector chain, and merges onto a different through-lane.
#[test]
fn vehicle_takes_the_ramp() {
    let mut sim = quiet_cloverleaf();
    let start = sim
        .iter_lanes()
        .find(|l| l.ramp_entry().is_some())
        .unwrap()
        .id();
    let veh = sim.add_vehicle(start, 0.0, 80.0, true);

    let mut visited_finite: HashSet<LaneId> = HashSet::new();
    let mut done = false;
    for _ in 0..60_000 {
        sim.step(DT, true);
        let lane_id = sim.get_vehicle(veh).lane_id();
        let lane = sim.get_lane(lane_id);
        if lane.is_finite() {
            visited_finite.insert(lane_id);
        } else if !visited_finite.is_empty() {
            done = true;
            break;
        }
    }

    assert!(done, "vehicle never completed the ramp chain");
    assert_eq!(visited_finite.len(), 3, "entry, ramp and exit expected");
    let end = sim.get_vehicle(veh).lane_id();
    assert_ne!(end, start, "ramp must lead to a different through-lane");
    assert!(!sim.get_lane(end).is_finite());
}

/// A vehicle without the ramp preference stays on its wrapping through-lane
/// indefinitely.
#[test]
fn through_vehicle_ignores_the_ramp() {
    let mut sim = quiet_cloverleaf();
    let start = sim
        .iter_lanes()
        .find(|l| l.ramp_entry().is_some())
        .unwrap()
        .id();
    let veh = sim.add_vehicle(start, 0.0, 80.0, false);

    for _ in 0..6000 {
        sim.step(DT, false);
        assert_eq!(sim.get_vehicle(veh).lane_id(), start);
    }
}

/// A vehicle reaching the end of a connector with no safe gap on the ramp
/// parks at the segment end, then merges once the gap opens.
#[test]
fn merge_backpressure_holds_then_releases() {
    let mut sim = quiet_cloverleaf();
    let entry = sim
        .iter_lanes()
        .find(|l| {
            l.successor()
                .map_or(false, |(next, _)| !sim.get_lane(next).is_straight())
        })
        .unwrap()
        .id();
    let (ramp, merge_s) = sim.get_lane(entry).successor().unwrap();
    let ramp_len = sim.get_lane(ramp).path().length();

    // Stationary blocker just past the merge point
    sim.add_vehicle(ramp, merge_s + 5.0 / ramp_len, 0.0, false);
    let merger = sim.add_vehicle(entry, 0.96, 50.0, false);

    for _ in 0..15 {
        sim.step(DT, false);
    }
    let held = sim.get_vehicle(merger);
    assert_eq!(held.lane_id(), entry, "merged into an unsafe gap");
    assert_eq!(held.vel(), 0.0);
    assert!(held.pos() > 0.99);

    // The blocker drives off, opening the gap
    for _ in 0..1200 {
        sim.step(DT, false);
    }
    let released = sim.get_vehicle(merger);
    assert_ne!(released.lane_id(), entry, "merge never released");
    assert!((0.0..1.0).contains(&released.pos()));
}

/// The default cloverleaf spawns traffic and respects the vehicle cap while
/// keeping every vehicle in a valid state.
#[test]
fn spawning_respects_cap_and_invariants() {
    let params = SimulationParams::default();
    let mut sim = network::cloverleaf(params, 1200.0, 900.0);

    for _ in 0..3600 {
        sim.step(DT, true);
    }

    let count = sim.iter_vehicles().count();
    assert!(count > 10, "only {} vehicles after a minute", count);
    assert!(count <= 260);
    for vehicle in sim.iter_vehicles() {
        assert!((0.0..1.0).contains(&vehicle.pos()));
        assert!(vehicle.vel() >= 0.0);
        let p = vehicle.position();
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}
