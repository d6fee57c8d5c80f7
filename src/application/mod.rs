//! Application layer orchestrating the finalization view.
//!
//! `FinalizationSession` owns the snapshot and serializes every input through
//! one `tokio` channel: push events forwarded by the subscription manager,
//! resync requests, and checkout outcomes. The reconciler applies them under
//! the monotonic merge rule from the domain layer.

pub mod checkout;
pub mod poll;
pub mod reconciler;
pub mod session;
pub mod subscription;
