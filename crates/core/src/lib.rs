//! Core domain types, errors, and constants for the autobuilder.
//!
//! Everything here is shared by the worker and supervisor crates: the
//! central `Error` enum and `Result` alias, the protocol and scheduling
//! constants, build outcome types, and the shared PID-slot array used by
//! the shutdown path.

pub mod constants;
pub mod errors;
pub mod pids;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result},
    pids::PidSlots,
    types::{BuildResult, BuildStatus, FailureReason},
};
