//! Spin state, background spin loops and auto-stop timers.

pub mod controller;
pub mod policy;
pub mod state;

pub use controller::{SpinController, SpinStatus};
pub use policy::SpinPolicy;
pub use state::SpinFlag;
