//! Deep-link dispatch and app-presence detection.
//!
//! `domain` builds addresses, `engine` decides, `runtime` races the page
//! signals against the deadline and executes the engine's commands on a
//! `host`.

pub mod domain;
pub mod engine;
pub mod host;
pub mod runtime;
