//! Tether - linked container applications
//!
//! Tether groups independently managed containers into a named application
//! and starts or stops them in an order that respects their dependencies:
//!
//! - Links between containers
//! - Volumes mounted from other containers
//! - Network stacks shared with another container
//!
//! The dependency record of every service lives in labels on its container,
//! so an application can be rebuilt from the engine alone.

pub mod application;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod service;

pub use application::Application;
pub use error::{Result, TetherError};
pub use service::{LabelCodec, NetMode, Service};
