//! Data models for the application
//!
//! Blocks and their lookup scope, license and product limits, and the host
//! entities used when notifying administrators.

mod block;
mod host;
mod license;

pub use block::*;
pub use host::*;
pub use license::*;
