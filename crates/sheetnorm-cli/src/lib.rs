//! Command line front end for the sheetnorm engine.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
