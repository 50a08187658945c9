//! Authoritative game-room server for two-player Pong matches.
//!
//! The server is the single source of truth for every match: clients send
//! intents (ready up, move my paddle, leave) and receive state; they never
//! compute game outcomes themselves.
//!
//! # Architecture
//!
//! - [`room`] holds one match: two player slots, the simulation state and
//!   the fixed-rate tick loop that advances it.
//! - [`registry`] indexes all live rooms, owns their lifecycle and runs the
//!   periodic sweep that reclaims finished and abandoned ones.
//! - [`session`] is the per-connection protocol state machine
//!   (authenticate, bind to a room, play).
//! - [`ws`] and [`http`] are the transport layer: room management over
//!   plain HTTP, live play over a websocket per player.
//! - [`auth`], [`outbox`] and [`results`] are the seams to the rest of a
//!   deployment: identity lookup, event delivery and match persistence are
//!   all traits the binary wires with defaults.
//!
//! Pure game math lives in the `shared` crate so server and client agree on
//! field geometry and message shapes.

pub mod auth;
pub mod http;
pub mod outbox;
pub mod registry;
pub mod results;
pub mod room;
pub mod session;
pub mod ws;
