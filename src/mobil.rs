//! The MOBIL lane-changing decision model.
//!
//! A change is accepted when it is safe for the follower in the target lane
//! and the acceleration gained, weighted against the follower's loss by the
//! politeness factor, exceeds the switching threshold.

use crate::vehicle::IdmParams;

/// The parameters of the MOBIL model, in px/s^2 where applicable.
#[derive(Clone, Copy, Debug)]
pub struct MobilParams {
    /// Weight given to the new follower's acceleration change.
    pub politeness: f64,
    /// Minimum net incentive required to trigger a change.
    pub threshold: f64,
    /// Additional margin on the threshold, preventing oscillation at the
    /// decision boundary.
    pub hysteresis: f64,
    /// The most braking the new follower may be forced into; a change that
    /// would push its acceleration below this floor is rejected.
    pub safe_brake: f64,
}

impl Default for MobilParams {
    fn default() -> Self {
        Self {
            politeness: 0.3,
            threshold: 8.0,
            hysteresis: 6.0,
            safe_brake: -80.0,
        }
    }
}

/// Evaluates a lane change for a vehicle travelling at `vel`.
///
/// Each neighbour is `(velocity, gap)`: for leaders the gap ahead of the
/// subject, for the new follower the gap behind it. All gaps are measured
/// along the lane in px.
pub(crate) fn should_change(
    idm: &IdmParams,
    params: &MobilParams,
    vel: f64,
    old_leader: Option<(f64, f64)>,
    new_leader: Option<(f64, f64)>,
    new_follower: Option<(f64, f64)>,
) -> bool {
    // Safety: the new follower must not be forced below the braking floor
    // once the subject becomes its leader.
    let follower_after = new_follower.map(|(f_vel, f_gap)| {
        idm.acceleration(f_vel, Some((vel, f_gap)))
    });
    if matches!(follower_after, Some(a) if a < params.safe_brake) {
        return false;
    }

    let a_stay = idm.acceleration(vel, old_leader);
    let a_go = idm.acceleration(vel, new_leader);

    let follower_delta = match (new_follower, follower_after) {
        (Some((f_vel, f_gap)), Some(after)) => {
            // Before the change the follower was following the new leader
            let before =
                idm.acceleration(f_vel, new_leader.map(|(l_vel, l_gap)| (l_vel, f_gap + l_gap)));
            after - before
        }
        _ => 0.0,
    };

    let incentive = (a_go - a_stay) + params.politeness * follower_delta;
    incentive > params.threshold + params.hysteresis
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// An unsafe change is never selected, whatever the surrounding traffic.
    #[test]
    fn safety_floor_always_holds() {
        let idm = IdmParams::default();
        let params = MobilParams::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..2000 {
            let vel = rng.gen_range(0.0..150.0);
            let rand_neighbour = |rng: &mut StdRng| {
                rng.gen_bool(0.8)
                    .then(|| (rng.gen_range(0.0..150.0), rng.gen_range(0.0..300.0)))
            };
            let old_leader = rand_neighbour(&mut rng);
            let new_leader = rand_neighbour(&mut rng);
            let new_follower = rand_neighbour(&mut rng);

            if let Some((f_vel, f_gap)) = new_follower {
                let after = idm.acceleration(f_vel, Some((vel, f_gap)));
                if after < params.safe_brake {
                    assert!(
                        !should_change(&idm, &params, vel, old_leader, new_leader, new_follower),
                        "unsafe change accepted: vel={} follower=({},{})",
                        vel,
                        f_vel,
                        f_gap
                    );
                }
            }
        }
    }

    /// A blocked lane next to an empty one is worth leaving.
    #[test]
    fn escapes_slow_leader() {
        let idm = IdmParams::default();
        let params = MobilParams::default();
        // Crawling leader close ahead, free target lane
        let change = should_change(&idm, &params, 80.0, Some((10.0, 40.0)), None, None);
        assert!(change);
    }

    /// No incentive when both lanes look the same.
    #[test]
    fn stays_without_gain() {
        let idm = IdmParams::default();
        let params = MobilParams::default();
        let leader = Some((60.0, 80.0));
        let change = should_change(&idm, &params, 80.0, leader, leader, None);
        assert!(!change);
    }

    /// A marginal gain below threshold plus hysteresis does not trigger.
    #[test]
    fn hysteresis_blocks_marginal_gain() {
        let idm = IdmParams::default();
        let params = MobilParams {
            politeness: 0.0,
            ..Default::default()
        };
        // The target leader is only slightly further away
        let change = should_change(
            &idm,
            &params,
            80.0,
            Some((60.0, 100.0)),
            Some((60.0, 102.0)),
            None,
        );
        assert!(!change);
    }
}
