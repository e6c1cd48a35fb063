//! Pure data structures: the entities that flow through the pipeline and the
//! statistics they feed.

pub mod courier;
pub mod order;
pub mod statistics;

pub use courier::*;
pub use order::*;
pub use statistics::*;
