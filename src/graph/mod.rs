//! Dependency graph and start/stop ordering
//!
//! Services become nodes; links, volumes-from and shared network stacks
//! become edges from the dependency to the dependent. The orderer turns the
//! graph into one reproducible start sequence and mirrors it for stop.

pub mod builder;
pub mod order;

pub use builder::DependencyGraph;
pub use order::{start_order, stop_order, topology};
