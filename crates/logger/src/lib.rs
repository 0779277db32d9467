//! Tracing setup shared by the heartcheck binaries.

mod tracing;

pub use self::tracing::init_with_level;
