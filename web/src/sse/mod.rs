//! SSE endpoint for the live log stream.
//!
//! The fan-out itself (hub, subscriber queues, delivery loop) lives in the
//! `broadcast` crate; this module only adapts a subscriber to an HTTP response.

pub mod handler;
pub(crate) mod sink;
