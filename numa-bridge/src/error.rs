//!
//! Describes the error types that may happen within numa-bridge.
//!
//! Only mistakes in caller input are returned to the caller. Faults met while
//! binding the native facility are [LoadError]s; they are absorbed during
//! backend selection and only show up as `is_available() == false`.

use numa_bridge_utils::bitmask::BitmaskError;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

/// Result type of the caller facing operations.
pub type Result<T> = result::Result<T, NumaError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors raised by the facade
pub enum NumaError {
    #[error("invalid cpu {cpu}: this process addresses {num_cpus} cpus")]
    /// The CPU index is not in `0..num_cpus`
    InvalidCpu {
        /// Requested CPU
        cpu: usize,
        /// CPUs addressable by this process
        num_cpus: usize,
    },
    #[error("invalid numa node {node}: highest node is {max_node}")]
    /// The node index is above the highest node of the backend
    InvalidNode {
        /// Requested node
        node: usize,
        /// Highest node reported by the backend
        max_node: i32,
    },
    #[error("couldn't allocate {capacity} bytes of {kind} memory")]
    /// The backend handed back no memory
    AllocationFailed {
        /// Requested capacity in bytes
        capacity: usize,
        /// Which allocation was requested
        kind: &'static str,
    },
}

impl From<BitmaskError> for NumaError {
    fn from(err: BitmaskError) -> Self {
        match err {
            BitmaskError::CpuOutOfRange { cpu, num_cpus } => NumaError::InvalidCpu { cpu, num_cpus },
        }
    }
}

#[derive(Error, Debug)]
/// `LoadError`s occur when the native facility couldn't be bound to the process
pub enum LoadError {
    #[error("couldn't open native library {path:?}: {source}")]
    /// The image couldn't be found or loaded
    Open {
        /// Image that was requested
        path: PathBuf,
        /// Error reported by the dynamic linker
        #[source]
        source: libloading::Error,
    },
    #[error("couldn't resolve `{symbol}` in {path:?}: {source}")]
    /// The image was loaded but lacks a required symbol
    Symbol {
        /// Image that was requested
        path: PathBuf,
        /// Missing symbol
        symbol: &'static str,
        /// Error reported by the dynamic linker
        #[source]
        source: libloading::Error,
    },
    #[error("numa is not available on this host")]
    /// The image is bound but the kernel reports no NUMA support
    Unavailable,
    #[error("native loader panicked: {0}")]
    /// The loader panicked while binding
    Panicked(String),
}
