//! CLI command implementations

pub mod report;
pub mod status;
pub mod warnings;
