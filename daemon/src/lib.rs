//! Host health agent: rolling baselines, anomaly alerts and safety-gated
//! cleanup of stale temporary files.

pub mod alert;
pub mod collector;
pub mod config;
pub mod detector;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod guardian;
pub mod health;
pub mod learner;
pub mod notifier;
pub mod optimizer;
pub mod planner;
pub mod scheduler;

pub use error::{GuardianError, Result};
pub use guardian::Guardian;
