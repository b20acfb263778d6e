//! Applications: named groups of linked services
//!
//! An application is built from services directly or discovered from the
//! labels on an engine's containers, and starts or stops them one at a
//! time in dependency order.

pub mod orchestrator;
pub mod snapshot;

pub use orchestrator::{Application, Progress, ServiceStatus};
pub use snapshot::Snapshot;
