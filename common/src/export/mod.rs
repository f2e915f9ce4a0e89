//! Export core modules shared by the CLI.

pub mod sheet_core;

#[cfg(feature = "excel")]
pub mod report_core;
