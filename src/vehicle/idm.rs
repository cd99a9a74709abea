/// The parameters of the Intelligent Driver Model.
///
/// Units are pixels and seconds, matching the world geometry.
#[derive(Clone, Copy, Debug)]
pub struct IdmParams {
    /// The desired free-road speed in px/s.
    pub desired_speed: f64,
    /// The desired time headway to the leader in s.
    pub time_headway: f64,
    /// The maximum acceleration in px/s^2.
    pub max_acc: f64,
    /// The comfortable deceleration, a positive number in px/s^2.
    pub comf_dec: f64,
    /// The minimum standstill gap in px.
    pub min_gap: f64,
    /// The acceleration exponent.
    pub exponent: f64,
}

impl Default for IdmParams {
    fn default() -> Self {
        Self {
            desired_speed: 108.0,
            time_headway: 1.2,
            max_acc: 48.0,
            comf_dec: 60.0,
            min_gap: 8.0,
            exponent: 4.0,
        }
    }
}

impl IdmParams {
    /// Computes the longitudinal acceleration of a vehicle travelling at
    /// `vel`, given its leader's velocity and the gap to it.
    ///
    /// Without a leader only the free-road term applies. The gap denominator
    /// is clamped to 1 px so a vanishing gap cannot produce a non-finite
    /// acceleration.
    pub fn acceleration(&self, vel: f64, leader: Option<(f64, f64)>) -> f64 {
        let free = (vel / self.desired_speed).powf(self.exponent);
        let interaction = match leader {
            Some((leader_vel, gap)) => {
                let approach = vel - leader_vel;
                let dynamic =
                    vel * self.time_headway + vel * approach / (2.0 * (self.max_acc * self.comf_dec).sqrt());
                let desired_gap = self.min_gap + f64::max(0.0, dynamic);
                let term = desired_gap / f64::max(1.0, gap);
                term * term
            }
            None => 0.0,
        };
        self.max_acc * (1.0 - free - interaction)
    }

    /// Returns a copy with the desired speed scaled by `factor`.
    /// Used to apply per-vehicle velocity adjustments.
    pub fn with_speed_factor(&self, factor: f64) -> Self {
        Self {
            desired_speed: self.desired_speed * factor,
            ..*self
        }
    }
}
