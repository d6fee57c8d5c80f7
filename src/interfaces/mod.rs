//! Edges of the crate: recorded input logs, snapshot output and the
//! terminal reveal shown to the user.

pub mod csv;
pub mod reveal;
