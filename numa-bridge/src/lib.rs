//!
//!
//!
//! numa-bridge is a NUMA topology, thread affinity and placement layer
//!
//! It answers how many memory nodes the machine has, which CPUs belong to
//! which node and how far nodes are from each other. It pins threads to CPUs
//! and hands out memory placed on a chosen node.
//!
//! Main properties:
//! * libnuma is bound at runtime through the dynamic linker. A process runs the
//! same binary whether the library is installed or not.
//! * When NUMA is unavailable, unsupported or disabled, every call is served by
//! a uniform-memory fallback which presents the machine as a single node.
//! Callers never need to branch on availability.
//! * The backend is selected once per process, on first use, and shared by
//! every thread.
//!
//! **NOTE:** Memory handed out by the `alloc*` operations is not reclaimed
//! automatically. Give it back with [`Numa::free`].
//!
//! ```rust
//! use numa_bridge::prelude::*;
//!
//! let numa = numa_bridge::get();
//!
//! for node in 0..numa.num_nodes() {
//!     let cpus = numa.node_to_cpus(node).expect("Couldn't read the node.");
//!     println!("node {}: {}", node, cpus);
//! }
//!
//! let buffer = numa.alloc_on_node(1 << 20, 0).expect("Couldn't allocate.");
//! numa.free(buffer);
//! ```
//!

// Discarded lints
#![allow(clippy::if_same_then_else)]
// Force missing implementations
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod affinity;
pub mod backend;
pub mod binding;
pub mod buffer;
pub mod config;
pub mod error;
pub mod fallback;
pub mod loader;
pub mod native;
pub mod numa;
pub mod policy;
pub mod system;
pub mod topology;

pub use numa_bridge_utils::bitmask::{BitmaskError, CpuBitmask};

/// Returns the process-wide facade, selecting the backend on first use.
///
/// Equivalent to [`Numa::init`].
///
/// [`Numa::init`]: crate::numa::Numa::init
pub fn get() -> &'static numa::Numa {
    system::global().get()
}

///
/// Prelude of numa-bridge
pub mod prelude {
    pub use crate::backend::BackendKind;
    pub use crate::buffer::NumaBuffer;
    pub use crate::config::Config;
    pub use crate::error::{NumaError, Result};
    pub use crate::numa::Numa;
    pub use crate::policy::AllocationPolicy;
    pub use crate::topology::{NodeInfo, Topology};
    pub use numa_bridge_utils::bitmask::CpuBitmask;
}
