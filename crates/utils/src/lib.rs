//! System probing and filesystem helpers shared by the autobuilder crates

pub mod fs;
pub mod pidfile;
pub mod sysinfo;

pub use sysinfo::SystemInfo;
