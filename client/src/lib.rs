//! Thin render-and-input client for the Pong room server.
//!
//! The client computes nothing about the game: it forwards input intents,
//! draws whatever state frame arrived last, and tracks just enough protocol
//! state to know what to draw and what key presses mean right now.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
