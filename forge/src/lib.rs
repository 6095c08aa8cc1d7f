//! Code generation orchestration engine.
//!
//! This crate turns a natural-language application spec into an ordered plan
//! of tool invocations, executes the plan step by step, and tracks the whole
//! lifecycle in a file-backed store. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (status rules, budgets, types).
//!   No I/O, fully testable in isolation.
//! - **[`store`]** and **[`io`]**: Side-effecting operations (documents, the
//!   log sink, output files, packaging). Isolated to enable tempdir tests.
//!
//! Orchestration modules ([`planner`], [`engine`], [`service`]) coordinate
//! core logic with I/O to implement the generation operations.
//!
//! Two logging paths exist and stay separate: `tracing` is dev diagnostics
//! controlled by `RUST_LOG`, while the per-project log sink in [`store::logs`]
//! is product output that clients consume.

pub mod config;
pub mod core;
pub mod engine;
pub mod io;
pub mod metrics;
pub mod planner;
pub mod service;
pub mod store;
pub mod stream;
pub mod supervisor;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
