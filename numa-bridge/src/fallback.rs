//!
//! Uniform-memory fallback backend
//!
//! Serves every capability when the native facility is unavailable. The
//! machine is presented as a single node `0` holding all CPUs and all memory.
//! Node arguments are ignored, affinity is left to the OS scheduler and every
//! allocation comes from the process heap.
use crate::backend::{NumaBackend, LOCAL_DISTANCE};
use crate::buffer::{self, NumaBuffer, Origin};
use numa_bridge_utils::bitmask::CpuBitmask;
use numa_bridge_utils::host;
use std::ptr::NonNull;
use tracing::{trace, warn};

/// Highest node reported by the fallback: one node, the whole machine.
pub const FALLBACK_MAX_NODE: i32 = 0;

///
/// Backend used when NUMA is unavailable or disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackBackend;

impl FallbackBackend {
    /// Creates the fallback backend.
    pub fn new() -> Self {
        FallbackBackend
    }

    fn heap_buffer(&self, capacity: usize) -> Option<NumaBuffer> {
        if capacity == 0 {
            return Some(NumaBuffer::empty());
        }
        let ptr = buffer::heap_alloc(capacity)?;
        Some(unsafe { NumaBuffer::from_raw(ptr, capacity, Origin::Heap) })
    }
}

fn known_or_unknown(bytes: Option<u64>) -> i64 {
    bytes.map_or(-1, |b| b.min(i64::MAX as u64) as i64)
}

impl NumaBackend for FallbackBackend {
    fn is_available(&self) -> bool {
        false
    }

    fn max_node(&self) -> i32 {
        FALLBACK_MAX_NODE
    }

    fn node_size(&self, _node: i32) -> i64 {
        known_or_unknown(host::total_memory())
    }

    fn free_size(&self, _node: i32) -> i64 {
        known_or_unknown(host::free_memory())
    }

    fn distance(&self, _node1: i32, _node2: i32) -> i32 {
        LOCAL_DISTANCE
    }

    fn node_to_cpus(&self, node: i32, mask: &mut CpuBitmask) {
        if node == FALLBACK_MAX_NODE {
            mask.fill_all();
        }
    }

    fn get_affinity(&self, _tid: i32, mask: &mut CpuBitmask) {
        mask.fill_all();
    }

    fn set_affinity(&self, tid: i32, mask: &CpuBitmask) {
        trace!("numa-bridge: fallback: ignoring affinity {} for {}", mask, tid);
    }

    fn preferred_node(&self) -> i32 {
        FALLBACK_MAX_NODE
    }

    fn set_preferred(&self, node: i32) {
        trace!("numa-bridge: fallback: ignoring preferred node {}", node);
    }

    fn set_local_alloc(&self) {
        trace!("numa-bridge: fallback: ignoring local allocation policy");
    }

    fn run_on_node(&self, node: i32) {
        trace!("numa-bridge: fallback: ignoring run on node {}", node);
    }

    fn alloc(&self, capacity: usize) -> Option<NumaBuffer> {
        self.heap_buffer(capacity)
    }

    fn alloc_local(&self, capacity: usize) -> Option<NumaBuffer> {
        self.heap_buffer(capacity)
    }

    fn alloc_on_node(&self, capacity: usize, _node: i32) -> Option<NumaBuffer> {
        self.heap_buffer(capacity)
    }

    fn alloc_interleaved(&self, capacity: usize) -> Option<NumaBuffer> {
        self.heap_buffer(capacity)
    }

    fn alloc_raw(&self, capacity: usize) -> Option<NonNull<u8>> {
        buffer::heap_alloc(capacity)
    }

    fn free(&self, buffer: NumaBuffer) {
        let (ptr, capacity, origin) = buffer.into_raw();
        match origin {
            Origin::Heap => unsafe { buffer::heap_free(ptr, capacity) },
            Origin::Empty => {}
            Origin::Numa => {
                warn!(
                    "numa-bridge: fallback: leaking {} bytes at {:?} owned by libnuma",
                    capacity, ptr
                );
            }
        }
    }

    unsafe fn free_raw(&self, address: NonNull<u8>, capacity: usize) {
        buffer::heap_free(address, capacity)
    }
}
