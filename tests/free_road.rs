//! Tests of a lone vehicle on a single wrapping lane.

use interchange_sim::{RoadPath, Simulation, SimulationParams};

const DT: f64 = 1.0 / 60.0;

fn single_lane_sim() -> Simulation {
    let mut sim = Simulation::new(SimulationParams {
        max_vehicles: 0,
        ..Default::default()
    });
    sim.add_lane(RoadPath::straight(0.0, 0.0, 1000.0, 0.0));
    sim
}

/// A lone vehicle accelerates towards the desired speed and settles there.
#[test]
fn reaches_desired_speed() {
    let mut sim = single_lane_sim();
    let lane = sim.iter_lanes().next().unwrap().id();
    let veh = sim.add_vehicle(lane, 0.0, 0.0, false);

    for _ in 0..3000 {
        sim.step(DT, true);
    }

    let vel = sim.get_vehicle(veh).vel();
    let desired = 108.0;
    assert!(
        (vel - desired).abs() < 0.02 * desired,
        "settled at {} px/s",
        vel
    );
}

/// Progress increases every tick, except when wrapping past the lane end,
/// and always stays in `[0, 1)`.
#[test]
fn drives_forward_and_wraps() {
    let mut sim = single_lane_sim();
    let lane = sim.iter_lanes().next().unwrap().id();
    let veh = sim.add_vehicle(lane, 0.0, 50.0, false);

    let mut pos = sim.get_vehicle(veh).pos();
    let mut wraps = 0;
    for _ in 0..3000 {
        sim.step(DT, true);
        let next = sim.get_vehicle(veh).pos();
        assert!((0.0..1.0).contains(&next));
        if next < pos {
            wraps += 1;
        } else {
            assert!(next > pos);
        }
        pos = next;
    }
    // 50 s at up to 108 px/s on a 1000 px loop
    assert!(wraps >= 2, "wrapped {} times", wraps);
}

/// A stationary vehicle with no leader starts moving immediately.
#[test]
fn pulls_away_from_standstill() {
    let mut sim = single_lane_sim();
    let lane = sim.iter_lanes().next().unwrap().id();
    let veh = sim.add_vehicle(lane, 0.5, 0.0, false);

    sim.step(DT, true);
    assert!(sim.get_vehicle(veh).vel() > 0.0);
}
