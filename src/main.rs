use std::time::Instant;

use interchange_sim::network;
use interchange_sim::SimulationParams;

fn main() {
    env_logger::init();

    let mut sim = network::cloverleaf(SimulationParams::default(), 1200.0, 900.0);

    println!("Simulating...");
    const NUM_FRAMES: u32 = 1000;
    for _ in 0..30 {
        let start = Instant::now();
        for _ in 0..NUM_FRAMES {
            sim.step(1.0 / 60.0, true);
        }
        sim.randomise_velocity_adjusts(0.1);
        let frame = start.elapsed() / NUM_FRAMES;
        println!(
            "Avg. frame: {:?} ({} vehicles, frame {})",
            frame,
            sim.iter_vehicles().count(),
            sim.frame(),
        )
    }
}
