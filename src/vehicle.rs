use crate::math::{lerp, Point2d};
use crate::util::Color;
use crate::{LaneId, LaneSet, VehicleId};

pub use idm::IdmParams;

mod idm;

/// Duration of the cosmetic lane-change blend in s.
const BLEND_DURATION: f64 = 0.35;

/// A simulated vehicle.
///
/// Position along the current lane is the normalized progress `pos ∈ [0, 1)`;
/// velocity is in px/s and never negative.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    pub(crate) id: VehicleId,
    /// The lane the vehicle is currently on.
    pub(crate) lane: LaneId,
    /// Progress along the current lane in `[0, 1)`.
    pub(crate) pos: f64,
    /// Velocity in px/s.
    pub(crate) vel: f64,
    /// The vehicle's colour.
    color: Color,
    /// Whether the vehicle prefers to take the interchange ramp.
    pub(crate) take_ramp: bool,
    /// Time remaining before another lane change may be evaluated, in s.
    pub(crate) lc_cooldown: f64,
    /// Desired speed adjustment factor, multiplied with the model's
    /// desired speed.
    pub(crate) vel_adjust: f64,
    /// The previous lane and blend progress of an in-progress lane change.
    /// Cosmetic: drives the cached world position only.
    blend: Option<(LaneId, f64)>,
    /// Cached world position, updated once per tick.
    world_pos: Point2d,
    /// Cached heading in radians, updated once per tick.
    world_heading: f64,
}

impl Vehicle {
    pub(crate) fn new(id: VehicleId, lane: LaneId, color: Color, take_ramp: bool) -> Self {
        Self {
            id,
            lane,
            pos: 0.0,
            vel: 0.0,
            color,
            take_ramp,
            lc_cooldown: 0.0,
            vel_adjust: 1.0,
            blend: None,
            world_pos: Point2d::new(0.0, 0.0),
            world_heading: 0.0,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The lane the vehicle is currently on.
    pub fn lane_id(&self) -> LaneId {
        self.lane
    }

    /// Progress along the current lane in `[0, 1)`.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's velocity in px/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The vehicle's colour.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Whether the vehicle prefers to take the interchange ramp.
    pub fn takes_ramp(&self) -> bool {
        self.take_ramp
    }

    /// The world coordinates of the vehicle, as of the last tick.
    pub fn position(&self) -> Point2d {
        self.world_pos
    }

    /// The vehicle's heading in radians, as of the last tick.
    pub fn heading(&self) -> f64 {
        self.world_heading
    }

    /// Decays the lane-change cooldown and advances the blend timer.
    pub(crate) fn tick_timers(&mut self, dt: f64) {
        if self.lc_cooldown > 0.0 {
            self.lc_cooldown -= dt;
        }
        if let Some((_, t)) = self.blend.as_mut() {
            *t += dt / BLEND_DURATION;
        }
        self.blend = self.blend.filter(|(_, t)| *t < 1.0);
    }

    /// Moves the vehicle to another lane, starting the cooldown timer and
    /// recording the prior lane for visual blending.
    pub(crate) fn change_lane(&mut self, target: LaneId, cooldown: f64) {
        let from = self.lane;
        self.lane = target;
        self.lc_cooldown = f64::max(self.lc_cooldown, cooldown);
        self.blend = Some((from, 0.0));
    }

    /// Moves the vehicle onto a routed segment at the given progress.
    /// Unlike a lane change, no blending applies; the paths meet.
    pub(crate) fn enter_lane(&mut self, target: LaneId, pos: f64) {
        self.lane = target;
        self.pos = pos;
        self.blend = None;
    }

    /// Refreshes the cached world position and heading. During a lane
    /// change the position is interpolated between the old and new lane
    /// at the same progress.
    pub(crate) fn update_coords(&mut self, lanes: &LaneSet) {
        let path = lanes[self.lane].path();
        match self.blend {
            Some((from, t)) if lanes.contains_key(from) => {
                let p0 = lanes[from].path().point_at(self.pos);
                let p1 = path.point_at(self.pos);
                self.world_pos = Point2d::new(lerp(p0.x, p1.x, t), lerp(p0.y, p1.y, t));
                let h0 = lanes[from].path().heading_at(self.pos);
                let h1 = path.heading_at(self.pos);
                self.world_heading = h0 + (h1 - h0) * t;
            }
            _ => {
                self.world_pos = path.point_at(self.pos);
                self.world_heading = path.heading_at(self.pos);
            }
        }
    }
}
