//! pfc-daemon library surface.
//!
//! Exposes the router builder and shared state so the scenario tests in
//! `tests/` can drive the HTTP API in-process without binding a socket.

pub mod api_types;
pub mod routes;
pub mod state;
