//! Canonical network builders.
//!
//! The route graph is wired with lane handles at build time, including the
//! precomputed merge progress for every connection, so the per-tick code
//! never searches for lanes.

use crate::path::RoadPath;
use crate::simulation::{Simulation, SimulationParams};

/// Width of a single lane, in px.
pub const LANE_WIDTH: f64 = 18.0;

/// Radius of the loop ramps, in px.
pub const OUTER_RADIUS: f64 = 200.0;

/// Margin between the world border and the through-road endpoints, in px.
pub const EDGE_MARGIN: f64 = 60.0;

/// Builds a full cloverleaf interchange inside a `width` x `height` world.
///
/// Two crossing dual-carriageway roads (two lanes per direction), four loop
/// ramps, and for each ramp a straight entry and exit connector. Each ramp
/// chain is `entry -> ramp -> exit -> target through-lane`; the exit always
/// merges into the inner lane of the target direction. Through-lanes wrap
/// around; connectors and ramps are finite routed segments.
pub fn cloverleaf(params: SimulationParams, width: f64, height: f64) -> Simulation {
    let mut sim = Simulation::new(params);
    let (w, h) = (width, height);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let lw = LANE_WIDTH;
    let r = OUTER_RADIUS;
    let edge = EDGE_MARGIN;

    // Through roads, two lanes each, offset from a shared centreline
    let east_c = RoadPath::straight(w - edge, cy + lw * 1.2, edge, cy + lw * 1.2);
    let east_left = sim.add_lane(east_c.offset(lw / 2.0));
    let east_right = sim.add_lane(east_c.offset(-lw / 2.0));

    let west_c = RoadPath::straight(edge, cy - lw * 1.2, w - edge, cy - lw * 1.2);
    let west_left = sim.add_lane(west_c.offset(lw / 2.0));
    let west_right = sim.add_lane(west_c.offset(-lw / 2.0));

    let south_c = RoadPath::straight(cx - lw * 1.2, edge, cx - lw * 1.2, h - edge);
    let south_left = sim.add_lane(south_c.offset(lw / 2.0));
    let south_right = sim.add_lane(south_c.offset(-lw / 2.0));

    let north_c = RoadPath::straight(cx + lw * 1.2, h - edge, cx + lw * 1.2, edge);
    let north_left = sim.add_lane(north_c.offset(lw / 2.0));
    let north_right = sim.add_lane(north_c.offset(-lw / 2.0));

    sim.set_adjacent(east_left, east_right);
    sim.set_adjacent(west_left, west_right);
    sim.set_adjacent(south_left, south_right);
    sim.set_adjacent(north_left, north_right);

    // Loop ramps, one per quadrant
    let r1 = sim.add_lane(RoadPath::arc(cx + lw, cy + lw, r, 30.0, 60.0));
    let r2 = sim.add_lane(RoadPath::arc(cx + lw, cy - lw, r, 300.0, 330.0));
    let r3 = sim.add_lane(RoadPath::arc(cx - lw, cy - lw, r, 210.0, 240.0));
    let r4 = sim.add_lane(RoadPath::arc(cx - lw, cy + lw, r, 120.0, 150.0));

    // Straight entry/exit connectors joined to the ramp arc endpoints
    let (a0, a1) = (30f64.to_radians(), 60f64.to_radians());
    let r1_entry = sim.add_lane(RoadPath::straight(
        edge + (w - edge * 2.0) * 0.7,
        cy + lw * 1.7,
        cx + lw + r * a0.cos(),
        cy + lw + r * a0.sin(),
    ));
    let r1_exit = sim.add_lane(RoadPath::straight(
        cx + lw + r * a1.cos(),
        cy + lw + r * a1.sin(),
        cx + lw * 1.7,
        edge + (h - edge * 2.0) * 0.7,
    ));

    let (a0, a1) = (300f64.to_radians(), 330f64.to_radians());
    let r2_entry = sim.add_lane(RoadPath::straight(
        cx + lw * 1.7,
        edge + (h - edge * 2.0) * 0.3,
        cx + lw + r * a0.cos(),
        cy - lw + r * a0.sin(),
    ));
    let r2_exit = sim.add_lane(RoadPath::straight(
        cx + lw + r * a1.cos(),
        cy - lw + r * a1.sin(),
        edge + (w - edge * 2.0) * 0.7,
        cy - lw * 1.7,
    ));

    let (a0, a1) = (210f64.to_radians(), 240f64.to_radians());
    let r3_entry = sim.add_lane(RoadPath::straight(
        edge + (w - edge * 2.0) * 0.3,
        cy - lw * 1.7,
        cx - lw + r * a0.cos(),
        cy - lw + r * a0.sin(),
    ));
    let r3_exit = sim.add_lane(RoadPath::straight(
        cx - lw + r * a1.cos(),
        cy - lw + r * a1.sin(),
        cx - lw * 1.7,
        edge + (h - edge * 2.0) * 0.3,
    ));

    let (a0, a1) = (120f64.to_radians(), 150f64.to_radians());
    let r4_entry = sim.add_lane(RoadPath::straight(
        cx - lw * 1.7,
        edge + (h - edge * 2.0) * 0.7,
        cx - lw + r * a0.cos(),
        cy + lw + r * a0.sin(),
    ));
    let r4_exit = sim.add_lane(RoadPath::straight(
        cx - lw + r * a1.cos(),
        cy + lw + r * a1.sin(),
        edge + (w - edge * 2.0) * 0.3,
        cy + lw * 1.7,
    ));

    // Eastbound -> northbound
    sim.connect(r1_entry, r1);
    sim.connect(r1, r1_exit);
    sim.connect(r1_exit, north_left);

    // Northbound -> westbound
    sim.connect(r2_entry, r2);
    sim.connect(r2, r2_exit);
    sim.connect(r2_exit, west_left);

    // Westbound -> southbound
    sim.connect(r3_entry, r3);
    sim.connect(r3, r3_exit);
    sim.connect(r3_exit, south_left);

    // Southbound -> eastbound
    sim.connect(r4_entry, r4);
    sim.connect(r4, r4_exit);
    sim.connect(r4_exit, east_left);

    // Both lanes of each direction divert onto the same entry connector
    sim.set_ramp_entry(east_left, r1_entry);
    sim.set_ramp_entry(east_right, r1_entry);
    sim.set_ramp_entry(north_left, r2_entry);
    sim.set_ramp_entry(north_right, r2_entry);
    sim.set_ramp_entry(west_left, r3_entry);
    sim.set_ramp_entry(west_right, r3_entry);
    sim.set_ramp_entry(south_left, r4_entry);
    sim.set_ramp_entry(south_right, r4_entry);

    sim
}
