//! Beam: a minimal screen/video relay.
//!
//! One broadcaster WebSocket connection pushes binary frames; the relay hub
//! fans each frame out to every registered viewer. No auth, no persistence,
//! no transcoding.

pub mod hub;
pub mod protocol;
pub mod server;
