//! Per-frame render units and the pool that runs them.

pub mod frame;
pub mod scheduler;
