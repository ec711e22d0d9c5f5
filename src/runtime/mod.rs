//! Detached sync worker and its outcome stream.

/// Outcome events published while draining.
pub mod events;
/// Worker task, handle and wake-up plumbing.
pub mod handle;
