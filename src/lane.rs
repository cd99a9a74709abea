use crate::path::RoadPath;
use crate::LaneId;

/// A lane wraps a single [RoadPath] and its place in the network.
///
/// A lane with a successor is a *finite segment* (on-ramp connector, ramp,
/// off-ramp connector): vehicles reaching its end merge onto the successor,
/// or hold and wait if no safe gap exists. A lane without a successor is an
/// unbounded through-lane and wraps around.
#[derive(Clone)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The lane's centre line geometry.
    path: RoadPath,
    /// The adjacent lane to the left, if lane changes are permitted.
    adj_left: Option<LaneId>,
    /// The adjacent lane to the right, if lane changes are permitted.
    adj_right: Option<LaneId>,
    /// The successor lane and the precomputed merge progress on it.
    successor: Option<(LaneId, f64)>,
    /// For a through-lane: the connector to divert onto when a vehicle
    /// prefers the ramp, with the precomputed merge progress.
    ramp_entry: Option<(LaneId, f64)>,
}

impl Lane {
    pub(crate) fn new(id: LaneId, path: RoadPath) -> Self {
        Self {
            id,
            path,
            adj_left: None,
            adj_right: None,
            successor: None,
            ramp_entry: None,
        }
    }

    /// Gets the lane's ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Gets the lane's centre line.
    pub fn path(&self) -> &RoadPath {
        &self.path
    }

    /// Whether lane changes may be evaluated from this lane.
    /// Only straight lanes have meaningful adjacency.
    pub fn is_straight(&self) -> bool {
        self.path.is_straight()
    }

    /// Whether this lane is a finite routed segment.
    pub fn is_finite(&self) -> bool {
        self.successor.is_some()
    }

    /// The adjacent lane to the left.
    pub fn adj_left(&self) -> Option<LaneId> {
        self.adj_left
    }

    /// The adjacent lane to the right.
    pub fn adj_right(&self) -> Option<LaneId> {
        self.adj_right
    }

    /// The successor lane and merge progress, for finite segments.
    pub fn successor(&self) -> Option<(LaneId, f64)> {
        self.successor
    }

    /// The ramp entry connector and merge progress, for through-lanes.
    pub fn ramp_entry(&self) -> Option<(LaneId, f64)> {
        self.ramp_entry
    }

    pub(crate) fn set_adj_left(&mut self, lane: LaneId) {
        self.adj_left = Some(lane);
    }

    pub(crate) fn set_adj_right(&mut self, lane: LaneId) {
        self.adj_right = Some(lane);
    }

    pub(crate) fn set_successor(&mut self, lane: LaneId, merge_s: f64) {
        assert!(
            self.successor.is_none(),
            "Lane already has a successor; route graph is misconfigured"
        );
        self.successor = Some((lane, merge_s));
    }

    pub(crate) fn set_ramp_entry(&mut self, lane: LaneId, merge_s: f64) {
        self.ramp_entry = Some((lane, merge_s));
    }
}
