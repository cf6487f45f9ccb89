//! Type definitions shared across the workspace

pub mod position;
pub mod proof;
pub mod tasks;
pub mod transaction;
