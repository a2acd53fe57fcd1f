//!
//! Backend capability interface
//!
//! Both backends implement [NumaBackend]. Every query and allocation is phrased
//! so that a constant or no-op answer is a valid, total implementation, which is
//! what lets the fallback stand in anywhere the native backend would be used.
//!
//! Node arguments are plain `i32`s as the OS facility takes them; `-1` means
//! "no preference" or "all nodes" where a mutator accepts it. Thread ids are
//! OS thread ids, `0` being the calling thread.
use crate::buffer::NumaBuffer;
use crate::fallback::FallbackBackend;
use crate::native::NativeBackend;
use numa_bridge_utils::bitmask::CpuBitmask;
use std::fmt::{self, Debug, Display, Formatter};
use std::ptr::NonNull;

/// Distance between a node and itself.
pub const LOCAL_DISTANCE: i32 = 10;

/// Capabilities shared by every backend.
pub trait NumaBackend: Debug + Send + Sync {
    /// Returns true only when the native facility was detected and bound.
    fn is_available(&self) -> bool;
    /// Highest node index, `-1` when unknown.
    fn max_node(&self) -> i32;
    /// Total memory of `node` in bytes, `-1` when unknown.
    fn node_size(&self, node: i32) -> i64;
    /// Free memory of `node` in bytes, `-1` when unknown.
    fn free_size(&self, node: i32) -> i64;
    /// Relative access cost between two nodes, [LOCAL_DISTANCE] for the same node.
    fn distance(&self, node1: i32, node2: i32) -> i32;
    /// Fills `mask` with the CPUs local to `node`. Leaves it untouched for an
    /// invalid node.
    fn node_to_cpus(&self, node: i32, mask: &mut CpuBitmask);
    /// Fills `mask` with the CPUs `tid` may run on.
    fn get_affinity(&self, tid: i32, mask: &mut CpuBitmask);
    /// Restricts `tid` to the CPUs of `mask`.
    fn set_affinity(&self, tid: i32, mask: &CpuBitmask);
    /// Preferred node of the calling thread.
    fn preferred_node(&self) -> i32;
    /// Makes the calling thread allocate on `node` when possible, `-1` for local allocation.
    fn set_preferred(&self, node: i32);
    /// Makes the calling thread allocate on the node it runs on.
    fn set_local_alloc(&self);
    /// Restricts the calling thread to the CPUs of `node`, `-1` for all nodes.
    fn run_on_node(&self, node: i32);
    /// Allocates under the calling thread's current policy.
    fn alloc(&self, capacity: usize) -> Option<NumaBuffer>;
    /// Allocates on the node the calling thread runs on.
    fn alloc_local(&self, capacity: usize) -> Option<NumaBuffer>;
    /// Allocates on `node`.
    fn alloc_on_node(&self, capacity: usize, node: i32) -> Option<NumaBuffer>;
    /// Allocates pages striped over all nodes.
    fn alloc_interleaved(&self, capacity: usize) -> Option<NumaBuffer>;
    /// Allocates under the current policy and returns the bare address.
    fn alloc_raw(&self, capacity: usize) -> Option<NonNull<u8>>;
    /// Releases a buffer from one of the `alloc*` calls.
    fn free(&self, buffer: NumaBuffer);
    /// Releases an address from [NumaBackend::alloc_raw].
    ///
    /// # Safety
    ///
    /// `address` must come from `alloc_raw` of this backend with the same
    /// `capacity`, and must not be used or released again.
    unsafe fn free_raw(&self, address: NonNull<u8>, capacity: usize);
}

/// Which backend serves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Forwards to libnuma.
    Native,
    /// Uniform-memory stand-in.
    Fallback,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => f.write_str("native"),
            BackendKind::Fallback => f.write_str("fallback"),
        }
    }
}

///
/// The backend picked for the process.
#[derive(Debug)]
pub enum Backend {
    /// Forwards to libnuma.
    Native(NativeBackend),
    /// Uniform-memory stand-in.
    Fallback(FallbackBackend),
}

impl Backend {
    /// Which variant this is.
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Native(_) => BackendKind::Native,
            Backend::Fallback(_) => BackendKind::Fallback,
        }
    }

    /// The capabilities of the selected variant.
    #[inline]
    pub fn as_dyn(&self) -> &dyn NumaBackend {
        match self {
            Backend::Native(native) => native,
            Backend::Fallback(fallback) => fallback,
        }
    }
}

impl From<NativeBackend> for Backend {
    fn from(native: NativeBackend) -> Self {
        Backend::Native(native)
    }
}

impl From<FallbackBackend> for Backend {
    fn from(fallback: FallbackBackend) -> Self {
        Backend::Fallback(fallback)
    }
}
