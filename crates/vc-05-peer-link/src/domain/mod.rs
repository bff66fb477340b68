//! Wire messages, transport errors and link configuration.

mod config;
mod error;
mod wire;

pub use config::*;
pub use error::*;
pub use wire::*;
