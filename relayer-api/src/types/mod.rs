//! Request and response types for the service API
//!
//! Requests use snake_case fields; responses come back camelCase, matching
//! the service's contract.

pub mod pool;
pub mod proof;
pub mod relay;
pub mod shield;
pub mod swap;

pub use pool::*;
pub use proof::*;
pub use relay::*;
pub use shield::*;
pub use swap::*;
