//! Central error handling for autobuilder operations

mod builders;
mod display;
mod types;

pub use types::{Error, Result};
