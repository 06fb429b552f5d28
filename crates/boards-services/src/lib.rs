//! Boards Services Layer
//!
//! Business logic over the store and the host plugin API: cloud detection,
//! card limit bookkeeping, marking limited cards and nudging administrators
//! to upgrade.

pub mod cloud;
pub mod host;

pub use cloud::CloudLimitsService;
pub use host::{HostApi, StaticHostApi};
