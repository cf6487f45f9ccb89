//! The client CLI and config definitions

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

mod cli;

pub use cli::{Cli, Config};
