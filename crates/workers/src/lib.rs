//! `cardbank-workers` — worker scheduler harness.
//!
//! Launches named threads that run scripted account operations on overlapping
//! timelines, with explicit join handles so tests can observe completion
//! ordering instead of fire-and-forget background work.

pub mod scheduler;

pub use scheduler::{join_all, AccountOp, OpWorker, WorkerHandle, WorkerReport};
