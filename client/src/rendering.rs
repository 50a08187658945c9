//! Macroquad drawing. The field is scaled uniformly to fit the window so
//! server coordinates never need to match the window size.

use crate::game::{AppPhase, ClientApp};
use macroquad::prelude::*;
use shared::Side;

pub fn draw_frame(app: &ClientApp) {
    clear_background(BLACK);

    match &app.phase {
        AppPhase::Playing { side } | AppPhase::Waiting { side } => {
            draw_field(app, *side);
            draw_overlay(app);
        }
        _ => draw_overlay(app),
    }
}

fn field_transform(app: &ClientApp) -> (f32, f32, f32) {
    let scale = (screen_width() / app.config.field_width)
        .min(screen_height() / app.config.field_height);
    let offset_x = (screen_width() - app.config.field_width * scale) / 2.0;
    let offset_y = (screen_height() - app.config.field_height * scale) / 2.0;
    (scale, offset_x, offset_y)
}

fn draw_field(app: &ClientApp, my_side: Side) {
    let config = &app.config;
    let (scale, ox, oy) = field_transform(app);

    draw_rectangle_lines(
        ox,
        oy,
        config.field_width * scale,
        config.field_height * scale,
        2.0,
        DARKGRAY,
    );

    // Center line.
    let mid_x = ox + config.field_width * scale / 2.0;
    let mut y = oy;
    while y < oy + config.field_height * scale {
        draw_line(mid_x, y, mid_x, y + 10.0 * scale, 2.0, DARKGRAY);
        y += 20.0 * scale;
    }

    let paddle_w = config.paddle_width * scale;
    let paddle_h = config.paddle_height * scale;
    let own_color = SKYBLUE;
    let other_color = WHITE;
    let (left_color, right_color) = match my_side {
        Side::Left => (own_color, other_color),
        Side::Right => (other_color, own_color),
    };

    draw_rectangle(
        ox,
        oy + app.state.paddles.left * scale,
        paddle_w,
        paddle_h,
        left_color,
    );
    draw_rectangle(
        ox + (config.field_width - config.paddle_width) * scale,
        oy + app.state.paddles.right * scale,
        paddle_w,
        paddle_h,
        right_color,
    );

    draw_circle(
        ox + app.state.ball.x * scale,
        oy + app.state.ball.y * scale,
        config.ball_size * scale / 2.0,
        WHITE,
    );

    let score = format!("{}   {}", app.scores.left, app.scores.right);
    let size = measure_text(&score, None, 48, 1.0);
    draw_text(
        &score,
        mid_x - size.width / 2.0,
        oy + 50.0 * scale,
        48.0,
        GRAY,
    );
}

fn draw_overlay(app: &ClientApp) {
    let line = app.status_line();
    let size = measure_text(&line, None, 28, 1.0);
    draw_text(
        &line,
        (screen_width() - size.width) / 2.0,
        screen_height() - 40.0,
        28.0,
        LIGHTGRAY,
    );

    if let Some(error) = &app.last_error {
        draw_text(&format!("error: {}", error), 10.0, 20.0, 20.0, RED);
    }
}
