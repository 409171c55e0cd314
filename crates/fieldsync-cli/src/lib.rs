//! Library components of the fieldsync CLI.

pub mod config;
pub mod logging;
