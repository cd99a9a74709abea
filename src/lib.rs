pub use cgmath;
pub use lane::Lane;
pub use mobil::MobilParams;
pub use path::RoadPath;
pub use quadtree::{QuadTree, Rect};
pub use simulation::{Simulation, SimulationParams};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{IdmParams, Vehicle};

mod lane;
pub mod math;
mod mobil;
pub mod network;
mod path;
mod quadtree;
mod simulation;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type LaneSet = SlotMap<LaneId, Lane>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
