pub mod aggregator;
pub mod event;
pub mod focus;
pub mod interaction;
pub mod regions;
pub mod session;
pub mod session_store;
pub mod toast;
pub mod ui;
pub mod workflow_list;

pub use aggregator::{ApplyOutcome, EventAggregator};
pub use focus::{Direction, Focus, FocusRouter, SubFocus};
pub use session::WorkflowSession;
pub use session_store::{Clock, ManualClock, SessionStore, SystemClock};
pub use workflow_list::{SelectionChange, WorkflowList};
