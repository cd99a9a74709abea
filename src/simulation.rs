use crate::lane::Lane;
use crate::mobil::{self, MobilParams};
use crate::path::{merge_target, RoadPath};
use crate::quadtree::{QuadTree, Rect};
use crate::util::Color;
use crate::vehicle::{IdmParams, Vehicle};
use crate::{LaneId, LaneSet, VehicleId, VehicleSet};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use rayon::prelude::*;
use slotmap::SecondaryMap;

/// Quadtree node capacity before subdivision.
const QT_MAX_ITEMS: usize = 6;

/// Quadtree depth cap.
const QT_MAX_DEPTH: usize = 8;

/// Half-extent of the neighbour query window around a vehicle, in px.
const NEIGHBOUR_RADIUS: f64 = 60.0;

/// Progress at which a vehicle on a finite segment attempts its merge.
const MERGE_TRIGGER: f64 = 0.98;

/// Progress at which a vehicle is held while waiting for a merge window.
const HOLD_POS: f64 = 0.995;

/// Progress at which a ramp-bound vehicle starts looking for its connector.
const RAMP_DECISION: f64 = 0.65;

/// Minimum speed granted to a vehicle completing a merge, in px/s.
const MERGE_MIN_SPEED: f64 = 8.0;

/// Lane-change cooldown in s.
const LANE_CHANGE_COOLDOWN: f64 = 1.8;

/// New vehicles spawn with progress inside this leading fraction.
const SPAWN_WINDOW: f64 = 0.2;

/// A spawn is skipped if another vehicle on the lane is within this
/// progress distance.
const SPAWN_CLEARANCE: f64 = 0.04;

/// Speed below which a vehicle merges with tighter (zipper) gaps, in px/s.
const CREEP_SPEED: f64 = 2.0;

/// The tunable parameters of a [Simulation].
#[derive(Clone, Copy, Debug)]
pub struct SimulationParams {
    /// The world bounds used by the spatial index.
    pub bounds: Rect,
    /// Car-following model parameters.
    pub idm: IdmParams,
    /// Lane-change model parameters.
    pub mobil: MobilParams,
    /// Seconds between spawn attempts.
    pub spawn_interval: f64,
    /// Maximum number of vehicles in the world.
    pub max_vehicles: usize,
    /// Probability that a spawned vehicle prefers the ramp.
    pub ramp_preference: f64,
    /// RNG seed, for reproducible runs.
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            bounds: Rect::new(
                crate::math::Point2d::new(0.0, 0.0),
                crate::math::Point2d::new(1200.0, 900.0),
            ),
            idm: IdmParams::default(),
            mobil: MobilParams::default(),
            spawn_interval: 0.7,
            max_vehicles: 260,
            ramp_preference: 0.4,
            seed: 2,
        }
    }
}

/// Per-vehicle neighbour snapshot: nearest leader/follower in the own lane
/// and in the adjacent lanes, with gap distances in px. Recomputed from
/// scratch every tick.
#[derive(Clone, Copy, Debug, Default)]
struct Neighbours {
    leader: Option<(VehicleId, f64)>,
    follower: Option<(VehicleId, f64)>,
    left_leader: Option<(VehicleId, f64)>,
    left_follower: Option<(VehicleId, f64)>,
    right_leader: Option<(VehicleId, f64)>,
    right_follower: Option<(VehicleId, f64)>,
}

/// A traffic microsimulation.
///
/// The `Simulation` is the single owner of all mutable state; every update
/// goes through [Simulation::step]. Reading accessors take `&self` and are
/// safe to call between steps, e.g. from a render pass.
pub struct Simulation {
    /// The lanes in the network.
    lanes: LaneSet,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The spatial index, rebuilt every tick.
    tree: QuadTree<VehicleId>,
    /// The world bounds.
    bounds: Rect,
    /// Car-following parameters.
    idm: IdmParams,
    /// Lane-change parameters.
    mobil: MobilParams,
    /// Seconds between spawn attempts.
    spawn_interval: f64,
    /// Accumulated time towards the next spawn.
    spawn_acc: f64,
    /// Maximum number of vehicles.
    max_vehicles: usize,
    /// Probability that a spawned vehicle prefers the ramp.
    ramp_preference: f64,
    /// The simulation's RNG.
    rng: StdRng,
    /// Worker pool for the parallel per-vehicle phases.
    pool: rayon::ThreadPool,
    /// The current frame of simulation.
    frame: usize,
}

impl Simulation {
    /// Creates an empty simulation.
    pub fn new(params: SimulationParams) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(usize::max(2, cores - 1))
            .build()
            .expect("Failed to build worker pool");
        Self {
            lanes: LaneSet::default(),
            vehicles: VehicleSet::default(),
            tree: QuadTree::new(params.bounds, QT_MAX_ITEMS, QT_MAX_DEPTH),
            bounds: params.bounds,
            idm: params.idm,
            mobil: params.mobil,
            spawn_interval: params.spawn_interval,
            spawn_acc: 0.0,
            max_vehicles: params.max_vehicles,
            ramp_preference: params.ramp_preference,
            rng: StdRng::seed_from_u64(params.seed),
            pool,
            frame: 0,
        }
    }

    /// Adds a lane to the network.
    pub fn add_lane(&mut self, path: RoadPath) -> LaneId {
        self.lanes.insert_with_key(|id| Lane::new(id, path))
    }

    /// Registers `to` as the successor of the finite segment `from`, and
    /// precomputes the merge progress at the geometric intersection of the
    /// two paths. Panics if `from` was already wired; the route graph is
    /// static and misconfiguration is a build-time error.
    pub fn connect(&mut self, from: LaneId, to: LaneId) {
        let merge_s = merge_target(self.lanes[from].path(), self.lanes[to].path());
        self.lanes[from].set_successor(to, merge_s);
    }

    /// Declares two straight lanes adjacent, enabling lane changes
    /// between them.
    pub fn set_adjacent(&mut self, left: LaneId, right: LaneId) {
        assert!(
            self.lanes[left].is_straight() && self.lanes[right].is_straight(),
            "Only straight lanes may be adjacent"
        );
        self.lanes[left].set_adj_right(right);
        self.lanes[right].set_adj_left(left);
    }

    /// Declares `entry` the ramp connector for the through-lane `lane`.
    /// Ramp-bound vehicles on `lane` divert onto it near the segment end.
    pub fn set_ramp_entry(&mut self, lane: LaneId, entry: LaneId) {
        let merge_s = merge_target(self.lanes[lane].path(), self.lanes[entry].path());
        self.lanes[lane].set_ramp_entry(entry, merge_s);
    }

    /// Adds a vehicle at the given progress and speed.
    pub fn add_vehicle(&mut self, lane: LaneId, pos: f64, vel: f64, take_ramp: bool) -> VehicleId {
        let color = self.random_color();
        let id = self.vehicles.insert_with_key(|id| {
            let mut vehicle = Vehicle::new(id, lane, color, take_ramp);
            vehicle.pos = pos;
            vehicle.vel = vel;
            vehicle
        });
        self.vehicles[id].update_coords(&self.lanes);
        id
    }

    /// Randomly assigns a desired speed adjustment factor to each vehicle,
    /// sampled from a normal distribution with mean 1 and the given
    /// standard deviation, clamped to `[0.75, 1.25]`.
    pub fn randomise_velocity_adjusts(&mut self, stddev: f64) {
        let distr = rand_distr::Normal::new(1.0, stddev).expect("Invalid standard deviation");
        for (_, vehicle) in &mut self.vehicles {
            vehicle.vel_adjust = distr.sample(&mut self.rng).clamp(0.75, 1.25);
        }
    }

    /// Sets the interval between spawn attempts, in s.
    pub fn set_spawn_interval(&mut self, interval: f64) {
        self.spawn_interval = interval;
    }

    /// Gets the interval between spawn attempts, in s.
    pub fn spawn_interval(&self) -> f64 {
        self.spawn_interval
    }

    /// Sets the vehicle cap.
    pub fn set_max_vehicles(&mut self, cap: usize) {
        self.max_vehicles = cap;
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Returns an iterator over all the lanes in the network.
    pub fn iter_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    /// Gets a reference to the lane with the given ID.
    pub fn get_lane(&self, lane_id: LaneId) -> &Lane {
        &self.lanes[lane_id]
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// `mobil_enabled` toggles the lane-change round; everything else runs
    /// regardless. For stable behaviour keep `dt` at or below ~1/30 s.
    pub fn step(&mut self, dt: f64, mobil_enabled: bool) {
        for (_, vehicle) in &mut self.vehicles {
            vehicle.tick_timers(dt);
        }
        self.maybe_spawn(dt);
        self.rebuild_tree();

        let order = self.vehicles.keys().collect::<Vec<_>>();
        let snapshot = self.compute_neighbours(&order);
        let mut neighbours = SecondaryMap::new();
        for (id, n) in order.iter().zip(snapshot) {
            neighbours.insert(*id, n);
        }

        if mobil_enabled {
            self.lane_change_round(&order, &neighbours);
        }

        let accs = self.compute_accelerations(&order, &neighbours);
        for (id, acc) in order.iter().zip(accs) {
            let vehicle = &mut self.vehicles[*id];
            vehicle.vel = f64::max(0.0, vehicle.vel + acc * dt);
        }

        self.advance_vehicles(dt);

        for (_, vehicle) in &mut self.vehicles {
            vehicle.update_coords(&self.lanes);
        }
        self.frame += 1;
    }

    /// Spawns a vehicle on a random through-lane once the spawn timer
    /// elapses and the cap allows it.
    fn maybe_spawn(&mut self, dt: f64) {
        self.spawn_acc += dt;
        if self.vehicles.len() >= self.max_vehicles || self.spawn_acc < self.spawn_interval {
            return;
        }
        self.spawn_acc = 0.0;

        let candidates = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.is_straight() && !lane.is_finite())
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        let Some(&lane) = candidates.choose(&mut self.rng) else {
            return;
        };

        let pos = self.rng.gen_range(0.0..SPAWN_WINDOW);
        let occupied = self.vehicles.values().any(|v| {
            if v.lane != lane {
                return false;
            }
            let ds = (v.pos - pos).rem_euclid(1.0);
            f64::min(ds, 1.0 - ds) < SPAWN_CLEARANCE
        });
        if occupied {
            trace!("spawn skipped: lane occupied near s = {:.3}", pos);
            return;
        }

        let vel = self.idm.desired_speed * self.rng.gen_range(0.4..0.6);
        let take_ramp = self.rng.gen_bool(self.ramp_preference);
        let id = self.add_vehicle(lane, pos, vel, take_ramp);
        debug!(
            "spawned vehicle {:?} on lane {:?} at s = {:.3} (ramp: {})",
            id, lane, pos, take_ramp
        );
    }

    fn random_color(&mut self) -> Color {
        let h = self.rng.gen::<f32>();
        let s = 0.6 + 0.3 * self.rng.gen::<f32>();
        let b = 0.75 + 0.2 * self.rng.gen::<f32>();
        Color::from_hsb(h, s, b)
    }

    /// Rebuilds the spatial index from the current vehicle positions.
    fn rebuild_tree(&mut self) {
        let mut tree = QuadTree::new(self.bounds, QT_MAX_ITEMS, QT_MAX_DEPTH);
        for (id, vehicle) in &self.vehicles {
            let point = self.lanes[vehicle.lane].path().point_at(vehicle.pos);
            tree.insert(point, id);
        }
        self.tree = tree;
    }

    /// Computes the neighbour snapshot for every vehicle, in `order`.
    /// Read-only against the frozen tree, so dispatched to the worker pool.
    fn compute_neighbours(&self, order: &[VehicleId]) -> Vec<Neighbours> {
        self.pool.install(|| {
            order
                .par_iter()
                .map(|id| self.find_neighbours(*id))
                .collect()
        })
    }

    /// Classifies nearby vehicles into same-lane and adjacent-lane
    /// leaders/followers using a quadtree range query.
    fn find_neighbours(&self, id: VehicleId) -> Neighbours {
        let me = &self.vehicles[id];
        let lane = &self.lanes[me.lane];
        let centre = lane.path().point_at(me.pos);
        let rect = Rect::centred(centre, NEIGHBOUR_RADIUS);

        let mut n = Neighbours::default();
        let mut closer = |slot: &mut Option<(VehicleId, f64)>, other: VehicleId, dist: f64| {
            if slot.map_or(true, |(_, best)| dist < best) {
                *slot = Some((other, dist));
            }
        };

        for (_, other_id) in self.tree.query(&rect) {
            if other_id == id {
                continue;
            }
            let other = &self.vehicles[other_id];
            if other.lane == me.lane {
                let len = lane.path().length();
                let ahead = (other.pos - me.pos).rem_euclid(1.0) * len;
                let behind = (me.pos - other.pos).rem_euclid(1.0) * len;
                if ahead <= behind {
                    closer(&mut n.leader, other_id, ahead);
                } else {
                    closer(&mut n.follower, other_id, behind);
                }
            } else if Some(other.lane) == lane.adj_left() {
                let len = self.lanes[other.lane].path().length();
                let ahead = (other.pos - me.pos).rem_euclid(1.0) * len;
                let behind = (me.pos - other.pos).rem_euclid(1.0) * len;
                if ahead <= behind {
                    closer(&mut n.left_leader, other_id, ahead);
                } else {
                    closer(&mut n.left_follower, other_id, behind);
                }
            } else if Some(other.lane) == lane.adj_right() {
                let len = self.lanes[other.lane].path().length();
                let ahead = (other.pos - me.pos).rem_euclid(1.0) * len;
                let behind = (me.pos - other.pos).rem_euclid(1.0) * len;
                if ahead <= behind {
                    closer(&mut n.right_leader, other_id, ahead);
                } else {
                    closer(&mut n.right_follower, other_id, behind);
                }
            }
        }
        n
    }

    /// Runs one MOBIL pass over all vehicles in randomized order.
    ///
    /// Sequential by design: lane reassignment mutates shared state and two
    /// vehicles must not swap into the same gap in the same tick.
    fn lane_change_round(
        &mut self,
        order: &[VehicleId],
        neighbours: &SecondaryMap<VehicleId, Neighbours>,
    ) {
        let mut order = order.to_vec();
        order.shuffle(&mut self.rng);

        for id in order {
            let (lane_id, vel, cooldown, vel_adjust) = {
                let vehicle = &self.vehicles[id];
                (vehicle.lane, vehicle.vel, vehicle.lc_cooldown, vehicle.vel_adjust)
            };
            if cooldown > 0.0 {
                continue;
            }
            let lane = &self.lanes[lane_id];
            // Finite routed segments and curved paths never change lanes
            if lane.is_finite() || !lane.is_straight() {
                continue;
            }
            let n = neighbours[id];
            let idm = self.idm.with_speed_factor(vel_adjust);
            let old_leader = self.observe(n.leader);

            // Left before right; at most one change per vehicle per tick
            let sides = [
                (lane.adj_left(), n.left_leader, n.left_follower),
                (lane.adj_right(), n.right_leader, n.right_follower),
            ];
            for (target, new_leader, new_follower) in sides {
                let Some(target) = target else { continue };
                if !self.lanes[target].is_straight() {
                    continue;
                }
                let new_leader = self.observe(new_leader);
                let new_follower = self.observe(new_follower);
                if mobil::should_change(&idm, &self.mobil, vel, old_leader, new_leader, new_follower)
                {
                    self.vehicles[id].change_lane(target, LANE_CHANGE_COOLDOWN);
                    debug!("vehicle {:?} changed lane {:?} -> {:?}", id, lane_id, target);
                    break;
                }
            }
        }
    }

    /// Resolves a snapshot entry into the `(velocity, gap)` observation
    /// consumed by the models.
    fn observe(&self, entry: Option<(VehicleId, f64)>) -> Option<(f64, f64)> {
        entry.map(|(id, gap)| (self.vehicles[id].vel, gap))
    }

    /// Computes IDM accelerations for every vehicle against the frozen
    /// neighbour snapshot. Read-only, dispatched to the worker pool.
    fn compute_accelerations(
        &self,
        order: &[VehicleId],
        neighbours: &SecondaryMap<VehicleId, Neighbours>,
    ) -> Vec<f64> {
        self.pool.install(|| {
            order
                .par_iter()
                .map(|id| {
                    let vehicle = &self.vehicles[*id];
                    let leader = self.observe(neighbours[*id].leader);
                    self.idm
                        .with_speed_factor(vehicle.vel_adjust)
                        .acceleration(vehicle.vel, leader)
                })
                .collect()
        })
    }

    /// Advances every vehicle's position, wraps or holds it at segment
    /// ends, and follows the route graph.
    fn advance_vehicles(&mut self, dt: f64) {
        let ids = self.vehicles.keys().collect::<Vec<_>>();
        for id in ids {
            let lane_id = self.vehicles[id].lane;
            let finite = self.lanes[lane_id].is_finite();
            let length = self.lanes[lane_id].path().length();
            {
                let vehicle = &mut self.vehicles[id];
                vehicle.pos += vehicle.vel * dt / length;
                if finite {
                    // Held near the segment end until a merge window opens
                    if vehicle.pos > HOLD_POS {
                        vehicle.pos = HOLD_POS;
                    }
                } else {
                    if vehicle.pos >= 1.0 {
                        vehicle.pos -= 1.0;
                    } else if vehicle.pos < 0.0 {
                        vehicle.pos += 1.0;
                    }
                }
            }
            self.follow_route(id);
        }
    }

    /// Chains a vehicle onto its successor segment, or diverts a
    /// ramp-bound vehicle onto its connector.
    fn follow_route(&mut self, id: VehicleId) {
        let (lane_id, pos) = {
            let vehicle = &self.vehicles[id];
            (vehicle.lane, vehicle.pos)
        };
        let successor = self.lanes[lane_id].successor();
        if let Some((next, merge_s)) = successor {
            if pos >= MERGE_TRIGGER {
                if self.gap_ok(id, next, merge_s) {
                    let vehicle = &mut self.vehicles[id];
                    vehicle.enter_lane(next, merge_s);
                    vehicle.vel = f64::max(vehicle.vel, MERGE_MIN_SPEED);
                    trace!("vehicle {:?} merged {:?} -> {:?}", id, lane_id, next);
                } else {
                    // Deliberate backpressure: park and retry next tick
                    let vehicle = &mut self.vehicles[id];
                    vehicle.pos = HOLD_POS;
                    vehicle.vel = 0.0;
                    trace!("vehicle {:?} holding at end of {:?}", id, lane_id);
                }
            }
            return;
        }

        let take_ramp = self.vehicles[id].take_ramp;
        if !take_ramp || pos < RAMP_DECISION {
            return;
        }
        let entry = self.lanes[lane_id].ramp_entry();
        if let Some((entry, merge_s)) = entry {
            if self.gap_ok(id, entry, merge_s) {
                let vehicle = &mut self.vehicles[id];
                vehicle.enter_lane(entry, merge_s);
                vehicle.vel = f64::max(vehicle.vel, MERGE_MIN_SPEED);
                trace!("vehicle {:?} took ramp entry {:?}", id, entry);
            } else if pos >= MERGE_TRIGGER {
                let vehicle = &mut self.vehicles[id];
                vehicle.pos = HOLD_POS;
                vehicle.vel = 0.0;
            }
        }
    }

    /// Checks whether the target lane has safe leading and trailing gaps
    /// around the candidate merge progress. Gaps are dynamic headways, with
    /// a looser requirement behind than ahead, relaxed further for a nearly
    /// stopped vehicle (a zipper merge).
    fn gap_ok(&self, id: VehicleId, target: LaneId, s_cand: f64) -> bool {
        let length = self.lanes[target].path().length();
        let mut ahead: Option<(VehicleId, f64)> = None;
        let mut behind: Option<(VehicleId, f64)> = None;
        for (other_id, other) in &self.vehicles {
            if other_id == id || other.lane != target {
                continue;
            }
            let front = (other.pos - s_cand).rem_euclid(1.0) * length;
            let back = (s_cand - other.pos).rem_euclid(1.0) * length;
            if ahead.map_or(true, |(_, best)| front < best) {
                ahead = Some((other_id, front));
            }
            if behind.map_or(true, |(_, best)| back < best) {
                behind = Some((other_id, back));
            }
        }

        let me_vel = f64::max(1.0, self.vehicles[id].vel);
        let behind_vel = behind
            .map(|(bid, _)| f64::max(1.0, self.vehicles[bid].vel))
            .unwrap_or(me_vel);
        let star_me = self.idm.min_gap + me_vel * self.idm.time_headway;
        let star_behind = self.idm.min_gap + behind_vel * self.idm.time_headway;

        let (relax_ahead, relax_behind) = if me_vel <= CREEP_SPEED {
            (1.05, 1.10)
        } else {
            (1.10, 1.20)
        };
        let ok_ahead = ahead.map_or(true, |(_, d)| d > star_me * relax_ahead);
        let ok_behind = behind.map_or(true, |(_, d)| d > star_behind * relax_behind);
        ok_ahead && ok_behind
    }
}
