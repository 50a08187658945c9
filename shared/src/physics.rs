//! Pure Pong kinematics: ball integration, wall/paddle collision response and
//! scoring detection. No timers, no sockets — the server's tick loop and the
//! tests drive this with explicit `dt` values.
//!
//! Coordinates are top-left origin, x to the right, y down. Paddle positions
//! are the y of the paddle's top edge; the ball position is its center.

use crate::{GameConfig, Side};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paddles {
    pub left: f32,
    pub right: f32,
}

/// The full live simulation state of one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PongState {
    pub ball: Ball,
    pub paddles: Paddles,
}

impl PongState {
    /// Both paddles centered, ball resting at the field center.
    pub fn new(config: &GameConfig) -> Self {
        let centered = (config.field_height - config.paddle_height) / 2.0;
        PongState {
            ball: Ball {
                x: config.field_width / 2.0,
                y: config.field_height / 2.0,
                vx: 0.0,
                vy: 0.0,
            },
            paddles: Paddles {
                left: centered,
                right: centered,
            },
        }
    }
}

/// Clamps a requested paddle position into the playable range.
pub fn clamp_paddle(y: f32, config: &GameConfig) -> f32 {
    y.clamp(0.0, config.field_height - config.paddle_height)
}

/// Moves a paddle toward its target at the configured speed. The paddle never
/// overshoots the target and always stays in-bounds.
pub fn step_paddle(current: f32, target: f32, dt: f32, config: &GameConfig) -> f32 {
    let max_step = config.paddle_speed * dt;
    let delta = target - current;
    let stepped = if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    };
    clamp_paddle(stepped, config)
}

/// Produces a fresh serve: ball centered, heading within the serve cone of
/// horizontal, horizontal direction chosen at random.
pub fn serve<R: Rng>(config: &GameConfig, rng: &mut R) -> Ball {
    let angle = rng.gen_range(-config.serve_cone..=config.serve_cone);
    let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    Ball {
        x: config.field_width / 2.0,
        y: config.field_height / 2.0,
        vx: direction * config.ball_speed * angle.cos(),
        vy: config.ball_speed * angle.sin(),
    }
}

/// Advances the simulation by `dt` seconds. Returns the side that scored if
/// the ball fully crossed an edge this step; the caller decides what to do
/// about it (re-serve, win check).
pub fn advance(state: &mut PongState, config: &GameConfig, dt: f32) -> Option<Side> {
    let radius = config.ball_size / 2.0;
    let ball = &mut state.ball;

    ball.x += ball.vx * dt;
    ball.y += ball.vy * dt;

    // Top/bottom walls: reflect and clamp so a large step cannot tunnel out.
    if ball.y - radius < 0.0 {
        ball.y = radius;
        ball.vy = ball.vy.abs();
    } else if ball.y + radius > config.field_height {
        ball.y = config.field_height - radius;
        ball.vy = -ball.vy.abs();
    }

    // Left paddle face.
    if ball.vx < 0.0
        && ball.x - radius <= config.paddle_width
        && overlaps_paddle(ball.y, radius, state.paddles.left, config)
    {
        ball.x = config.paddle_width + radius;
        ball.vx = ball.vx.abs();
        ball.vy = spin(ball.y, state.paddles.left, config);
    }

    // Right paddle face.
    if ball.vx > 0.0
        && ball.x + radius >= config.field_width - config.paddle_width
        && overlaps_paddle(ball.y, radius, state.paddles.right, config)
    {
        ball.x = config.field_width - config.paddle_width - radius;
        ball.vx = -ball.vx.abs();
        ball.vy = spin(ball.y, state.paddles.right, config);
    }

    if ball.x + radius < 0.0 {
        return Some(Side::Right);
    }
    if ball.x - radius > config.field_width {
        return Some(Side::Left);
    }

    None
}

fn overlaps_paddle(ball_y: f32, radius: f32, paddle_y: f32, config: &GameConfig) -> bool {
    ball_y + radius >= paddle_y && ball_y - radius <= paddle_y + config.paddle_height
}

/// Maps where the ball struck the paddle face (0 = top edge, 1 = bottom edge)
/// to a new vertical velocity. A center hit kills the spin; edge hits send
/// the ball off at steep angles — the "aim with the paddle" mechanic.
fn spin(ball_y: f32, paddle_y: f32, config: &GameConfig) -> f32 {
    let offset = ((ball_y - paddle_y) / config.paddle_height).clamp(0.0, 1.0);
    (offset - 0.5) * 2.0 * config.spin_multiplier * config.ball_speed
}
