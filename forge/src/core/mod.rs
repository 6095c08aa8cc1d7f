//! Pure, deterministic orchestration logic.
//!
//! Nothing in this module touches the filesystem, the clock (beyond opaque
//! `Instant` arithmetic in [`budget`]), or any external collaborator. All
//! status rules live here so they can be tested in isolation.

pub mod budget;
pub mod status;
pub mod types;
