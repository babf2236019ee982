use callose_core::{MemoryRecorder, NullRecorder, Scenario, SimConfig, Simulation};
use std::time::Instant;

fn main() {
    let grid_size = 100;
    let steps = 300;
    println!("Benchmarking {grid_size}x{grid_size} grid for {steps} days per scenario");

    let config = SimConfig {
        grid_size,
        pre_treatment_steps: steps / 2,
        post_treatment_steps: steps - steps / 2,
        seed: 42,
        ..SimConfig::default()
    };

    for scenario in [Scenario::Control, Scenario::Ctx, Scenario::Tetra] {
        let (mut plain, mut framed) = match (
            Simulation::new(config.clone()),
            Simulation::new(config.clone()),
        ) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("invalid benchmark config: {e}");
                std::process::exit(1);
            }
        };

        // Run WITHOUT frames
        let start = Instant::now();
        if let Err(e) = plain.run(scenario, &mut NullRecorder) {
            eprintln!("{scenario} failed: {e}");
            std::process::exit(1);
        }
        let duration_no_frames = start.elapsed();

        // Run WITH frames (every day), same seed and trajectory
        let mut recorder = MemoryRecorder::new(true);
        let start = Instant::now();
        if let Err(e) = framed.run(scenario, &mut recorder) {
            eprintln!("{scenario} failed: {e}");
            std::process::exit(1);
        }
        let duration_frames = start.elapsed();

        println!("[{scenario}] {steps} days WITHOUT frames: {duration_no_frames:?}");
        println!(
            "[{scenario}] avg per day (no frames): {:?}",
            duration_no_frames / steps as u32
        );
        println!(
            "[{scenario}] {steps} days WITH frames: {duration_frames:?} ({} frames)",
            recorder.frames.len()
        );
        let diff = duration_frames.saturating_sub(duration_no_frames);
        println!("[{scenario}] avg frame overhead per day: {:?}", diff / steps as u32);
    }
}
