//! Domain layer for the agreement engine.

mod candidate;
mod config;
mod error;
mod inbox;
mod mode;
mod peer;
mod registry;
mod round;

pub use candidate::*;
pub use config::*;
pub use error::*;
pub use inbox::*;
pub use mode::*;
pub use peer::*;
pub use registry::*;
pub use round::*;
