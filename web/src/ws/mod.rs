//! WebSocket HTTP handler for the web layer.
//!
//! The connection lifecycle (registry, pumps, keepalive) lives in the `hub`
//! crate; this module only upgrades the request and adapts axum's socket to
//! hub frames.

pub mod handler;
