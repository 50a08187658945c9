//! Timing sanity checks for the hot paths: the physics step that runs 60
//! times a second per room, and the JSON codec every frame goes through.
//! Thresholds are generous; these catch order-of-magnitude regressions, not
//! percentage drift.

use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{advance, serve, step_paddle, GameConfig, PongState, Scores, ServerMessage};
use std::time::{Duration, Instant};

#[test]
fn benchmark_physics_step() {
    let config = GameConfig::default();
    let mut rng = StdRng::seed_from_u64(99);
    let mut state = PongState::new(&config);
    state.ball = serve(&config, &mut rng);

    let steps = 100_000;
    let start = Instant::now();
    for _ in 0..steps {
        if advance(&mut state, &config, 1.0 / 60.0).is_some() {
            state.ball = serve(&config, &mut rng);
        }
    }
    let elapsed = start.elapsed();

    println!(
        "physics: {} steps in {:?} ({:.0} steps/ms)",
        steps,
        elapsed,
        steps as f64 / elapsed.as_millis().max(1) as f64
    );
    // One tick of one room must be nowhere near the 16ms frame budget.
    assert!(
        elapsed < Duration::from_secs(1),
        "physics step too slow: {:?} for {} steps",
        elapsed,
        steps
    );
}

#[test]
fn benchmark_paddle_step() {
    let config = GameConfig::default();
    let steps = 100_000;

    let start = Instant::now();
    let mut position = 0.0;
    for i in 0..steps {
        let target = if i % 2 == 0 { 0.0 } else { config.field_height };
        position = step_paddle(position, target, 1.0 / 60.0, &config);
    }
    let elapsed = start.elapsed();

    println!("paddle: {} steps in {:?} (ended at {})", steps, elapsed, position);
    assert!(elapsed < Duration::from_secs(1));
}

#[test]
fn benchmark_state_frame_codec() {
    let config = GameConfig::default();
    let state = PongState::new(&config);
    let frame = ServerMessage::GameState {
        ball: state.ball,
        paddles: state.paddles,
        scores: Scores { left: 3, right: 2 },
    };

    let rounds = 10_000;
    let start = Instant::now();
    for _ in 0..rounds {
        let text = serde_json::to_string(&frame).expect("state frame must serialize");
        let back: ServerMessage =
            serde_json::from_str(&text).expect("state frame must parse back");
        assert!(matches!(back, ServerMessage::GameState { .. }));
    }
    let elapsed = start.elapsed();

    println!("codec: {} roundtrips in {:?}", rounds, elapsed);
    // Two rooms at 60Hz is 240 encodes a second; this must be trivial.
    assert!(
        elapsed < Duration::from_secs(2),
        "frame codec too slow: {:?} for {} roundtrips",
        elapsed,
        rounds
    );
}
