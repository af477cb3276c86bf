pub mod commands;
pub mod dashboard;
pub mod headless;
pub mod input;
pub mod runtime;
pub mod tui_runner;

pub use dashboard::{App, Effect, LifecycleOp, Message};
pub use runtime::{EffectRunner, EventLoop, Frontend};
