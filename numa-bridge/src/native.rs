//!
//! libnuma backed backend
//!
//! Each capability is forwarded to the bound libnuma image, affinity to the
//! kernel's scheduler calls. Failures of the facility are not interpreted:
//! negative sentinels are passed through and null allocations become `None`.
use crate::affinity;
use crate::backend::NumaBackend;
use crate::binding::NumaLibrary;
use crate::buffer::{self, NumaBuffer, Origin};
use numa_bridge_utils::bitmask::CpuBitmask;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{trace, warn};

///
/// Backend forwarding to a bound libnuma image.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    library: Arc<NumaLibrary>,
}

impl NativeBackend {
    /// Creates a backend over an already bound image.
    pub fn new(library: Arc<NumaLibrary>) -> Self {
        NativeBackend { library }
    }

    /// The image this backend forwards to.
    pub fn library(&self) -> &NumaLibrary {
        &self.library
    }

    fn numa_buffer(&self, ptr: *mut u8, capacity: usize) -> Option<NumaBuffer> {
        let ptr = NonNull::new(ptr)?;
        Some(unsafe { NumaBuffer::from_raw(ptr, capacity, Origin::Numa) })
    }
}

impl NumaBackend for NativeBackend {
    fn is_available(&self) -> bool {
        self.library.available()
    }

    fn max_node(&self) -> i32 {
        self.library.max_node()
    }

    fn node_size(&self, node: i32) -> i64 {
        self.library.node_size(node).0
    }

    fn free_size(&self, node: i32) -> i64 {
        self.library.node_size(node).1
    }

    fn distance(&self, node1: i32, node2: i32) -> i32 {
        self.library.distance(node1, node2)
    }

    fn node_to_cpus(&self, node: i32, mask: &mut CpuBitmask) {
        let num_cpus = mask.num_cpus();
        let mut cpus = CpuBitmask::new(num_cpus);
        let filled = self.library.with_node_cpus(node, |is_set| {
            for cpu in (0..num_cpus).filter(|cpu| is_set(*cpu)) {
                let set = cpus.set(cpu);
                debug_assert!(set.is_ok(), "cpu {} outside of {}", cpu, num_cpus);
            }
        });
        if filled {
            *mask = cpus;
        } else {
            trace!("numa-bridge: native: no cpus for node {}", node);
        }
    }

    fn get_affinity(&self, tid: i32, mask: &mut CpuBitmask) {
        if !affinity::get_for_thread(tid, mask) {
            trace!("numa-bridge: native: couldn't read affinity of {}", tid);
        }
    }

    fn set_affinity(&self, tid: i32, mask: &CpuBitmask) {
        if !affinity::set_for_thread(tid, mask) {
            trace!("numa-bridge: native: couldn't set affinity of {} to {}", tid, mask);
        }
    }

    fn preferred_node(&self) -> i32 {
        self.library.preferred()
    }

    fn set_preferred(&self, node: i32) {
        self.library.set_preferred(node)
    }

    fn set_local_alloc(&self) {
        self.library.set_localalloc()
    }

    fn run_on_node(&self, node: i32) {
        if self.library.run_on_node(node) != 0 {
            trace!("numa-bridge: native: couldn't run on node {}", node);
        }
    }

    fn alloc(&self, capacity: usize) -> Option<NumaBuffer> {
        self.numa_buffer(self.library.alloc(capacity), capacity)
    }

    fn alloc_local(&self, capacity: usize) -> Option<NumaBuffer> {
        self.numa_buffer(self.library.alloc_local(capacity), capacity)
    }

    fn alloc_on_node(&self, capacity: usize, node: i32) -> Option<NumaBuffer> {
        self.numa_buffer(self.library.alloc_onnode(capacity, node), capacity)
    }

    fn alloc_interleaved(&self, capacity: usize) -> Option<NumaBuffer> {
        // Striping over a single node is a local allocation.
        if self.library.max_node() == 0 {
            return self.alloc_local(capacity);
        }
        self.numa_buffer(self.library.alloc_interleaved(capacity), capacity)
    }

    fn alloc_raw(&self, capacity: usize) -> Option<NonNull<u8>> {
        NonNull::new(self.library.alloc(capacity))
    }

    fn free(&self, buffer: NumaBuffer) {
        let (ptr, capacity, origin) = buffer.into_raw();
        match origin {
            Origin::Numa => unsafe { self.library.free(ptr.as_ptr(), capacity) },
            Origin::Heap => unsafe { buffer::heap_free(ptr, capacity) },
            Origin::Empty => {}
        }
    }

    unsafe fn free_raw(&self, address: NonNull<u8>, capacity: usize) {
        if capacity == 0 {
            warn!("numa-bridge: native: ignoring release of zero bytes at {:?}", address);
            return;
        }
        self.library.free(address.as_ptr(), capacity)
    }
}
