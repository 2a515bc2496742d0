//! Core data types for the floor price monitor.

pub mod price;
pub mod snapshot;

pub use price::*;
pub use snapshot::*;
