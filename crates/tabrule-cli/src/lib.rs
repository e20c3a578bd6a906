//! Library components of the `tabrule` command-line tool.

pub mod logging;
pub mod pipeline;
