//! Terminal dashboard for supervising multi-process agent workflows.
//!
//! Control-plane events are folded into a bounded cache of per-workflow
//! sessions. Keyboard and pointer input is routed by focus zone, and
//! typed process commands go back to each workflow's command sink.

pub mod app;
pub mod config;
pub mod control_plane;
pub mod logging;
pub mod paths;
pub mod tui;

/// Git commit the binary was built from.
pub const GIT_SHA: &str = env!("CONDUCTOR_GIT_SHA");
