//! Service descriptors and their label encoding
//!
//! A service is the dependency record of the one container central to it:
//! which containers it links to, mounts volumes from, or shares a network
//! stack with.

pub mod descriptor;
pub mod labels;
pub mod net;

pub use descriptor::{Link, Service};
pub use labels::LabelCodec;
pub use net::NetMode;
