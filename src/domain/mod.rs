//! Domain layer: pipeline stages, inputs and the pure reconciliation rule.
//!
//! Nothing in here performs I/O. The ports describe the collaborators the
//! application layer talks to.

pub mod event;
pub mod payment;
pub mod poll;
pub mod ports;
pub mod stage;
pub mod state;
