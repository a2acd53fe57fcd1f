//! numa-bridge utilities
//!
//! Backend-free building blocks for numa-bridge, the NUMA topology, affinity and
//! placement layer with a uniform-memory fallback.
//!
//! * [bitmask] builds and reads fixed-width CPU bit vectors.
//! * [host] answers the few questions numa-bridge asks the running host.
//!

// Discarded lints
#![allow(clippy::if_same_then_else)]
// Force missing implementations
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bitmask;
pub mod host;
