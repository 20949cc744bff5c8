//! HTTP fixture that simulates a CPU-busy, time-bounded workload.
//!
//! Test harnesses use it to exercise timeout and liveness handling:
//!
//! ```text
//! GET /spin?spin_time=5   -> flag set, spin loop started, auto-stop in 5s
//! GET /unspin             -> flag cleared, every spin loop exits
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`spinner`]: Spin flag, spin loops and auto-stop timers
//! - [`api`]: HTTP routes and handlers
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod spinner;
pub mod utils;

pub use config::Config;
pub use error::{Result, ServerError, SpinError};
pub use spinner::{SpinController, SpinPolicy};
