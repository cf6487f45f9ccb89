//! The task definitions for the client's long-running operations

pub mod shield;
pub mod swap;
pub mod unshield;
