//! Paddle input with change detection: the desired paddle position only
//! goes on the wire when it actually moved.

use shared::{clamp_paddle, GameConfig};

pub struct InputManager {
    target: f32,
    last_sent: Option<f32>,
}

impl InputManager {
    pub fn new(config: &GameConfig) -> Self {
        InputManager {
            target: (config.field_height - config.paddle_height) / 2.0,
            last_sent: None,
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advances the desired paddle position from held keys and returns it
    /// when it differs from the last value sent. The server enforces paddle
    /// speed independently; this rate only shapes the local intent.
    pub fn update(&mut self, up: bool, down: bool, dt: f32, config: &GameConfig) -> Option<f32> {
        let direction = match (up, down) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        if direction != 0.0 {
            self.target = clamp_paddle(self.target + direction * config.paddle_speed * dt, config);
        }
        if self.last_sent != Some(self.target) {
            self.last_sent = Some(self.target);
            Some(self.target)
        } else {
            None
        }
    }
}
