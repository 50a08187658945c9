//! Client binary: connect, authenticate, join the given room and play.
//!
//! Controls: SPACE toggles ready while waiting, W/S or the arrow keys move
//! the paddle, ESC leaves the room and quits.

use clap::Parser;
use client::game::{AppPhase, ClientApp};
use client::input::InputManager;
use client::network::{Connection, NetEvent};
use client::rendering;
use macroquad::prelude::*;
use shared::ClientMessage;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pong room client")]
struct Args {
    /// Websocket URL of the room server
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    server: String,

    /// Auth token ("<id>:<name>" against the development server)
    #[arg(long)]
    token: String,

    /// Id of the room to join (create one over the HTTP API first)
    #[arg(long)]
    room: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Pong".to_string(),
        window_width: shared::FIELD_WIDTH as i32,
        window_height: shared::FIELD_HEIGHT as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let connection = Connection::open(args.server);
    connection.send(ClientMessage::Auth { token: args.token });

    let mut app = ClientApp::new(args.room);
    let mut input = InputManager::new(&app.config);

    loop {
        while let Some(event) = connection.poll() {
            match event {
                NetEvent::Server(message) => {
                    if let Some(reply) = app.apply(message) {
                        connection.send(reply);
                    }
                }
                NetEvent::Closed => app.connection_lost(),
            }
        }

        match app.phase {
            AppPhase::Waiting { .. } => {
                if is_key_pressed(KeyCode::Space) {
                    connection.send(ClientMessage::Ready { ready: !app.ready });
                }
            }
            AppPhase::Playing { .. } => {
                let up = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
                let down = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);
                if let Some(y) = input.update(up, down, get_frame_time(), &app.config) {
                    connection.send(ClientMessage::PaddleMove { y });
                }
            }
            _ => {}
        }

        if is_key_pressed(KeyCode::Escape) {
            connection.send(ClientMessage::LeaveRoom);
            break;
        }

        rendering::draw_frame(&app);
        next_frame().await;
    }
}
