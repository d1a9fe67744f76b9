//! Command-line and benchmark support for the stress pipeline.

pub mod logging;
pub mod report;
