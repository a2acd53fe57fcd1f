//!
//! Facade over the selected backend
//!
//! [Numa] holds the one backend picked for the process and forwards every call
//! to it. Beyond forwarding it only counts nodes, builds the CPU masks the
//! affinity calls need and checks caller supplied indices.
//!
//! Node indices are checked against the native backend's highest node. The
//! fallback presents a single node and ignores node arguments, so any index is
//! accepted there.
use crate::backend::{Backend, BackendKind, NumaBackend};
use crate::buffer::NumaBuffer;
use crate::config::Config;
use crate::error::{NumaError, Result};
use crate::loader::{self, BindingLoader};
use crate::policy::AllocationPolicy;
use crate::system;
use crate::topology::Topology;
use numa_bridge_utils::bitmask::CpuBitmask;
use numa_bridge_utils::host;
use std::convert::TryFrom;
use std::ptr::NonNull;

/// Thread id of the calling thread.
const CURRENT_THREAD: i32 = 0;

/// Node argument meaning "every node".
const ALL_NODES: i32 = -1;

/// Access to NUMA topology, thread affinity and NUMA-aware allocation.
///
/// # Example
///
/// ```rust
/// use numa_bridge::prelude::*;
///
/// let numa = Numa::init();
///
/// println!("{} backend with {} node(s)", numa.kind(), numa.num_nodes());
///
/// let mut buffer = numa.alloc_local(4096).expect("Couldn't allocate.");
/// buffer.as_mut_slice()[0] = 42;
///
/// // The buffer is outside of any automatic reclamation.
/// numa.free(buffer);
/// ```
#[derive(Debug)]
pub struct Numa {
    backend: Backend,
}

impl Numa {
    /// Selects the process-wide backend from the environment's
    /// configuration, or returns the one already selected.
    ///
    /// See [`Config::from_env`] for the variables that are read.
    pub fn init() -> &'static Numa {
        system::global().get()
    }

    /// Selects the process-wide backend with the given configuration.
    ///
    /// The backend is selected once per process. If it has already been
    /// selected, `config` is ignored and the existing instance is returned.
    pub fn init_with(config: Config) -> &'static Numa {
        system::global().init_with(config)
    }

    /// Runs backend selection with an explicit loader, outside of the
    /// process-wide instance.
    pub fn select(config: &Config, loader: &dyn BindingLoader) -> Self {
        Numa::with_backend(loader::select_backend(config, loader))
    }

    /// Wraps an already selected backend.
    pub fn with_backend(backend: Backend) -> Self {
        Numa { backend }
    }

    /// The selected backend.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Which backend is serving calls.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    #[inline]
    pub(crate) fn api(&self) -> &dyn NumaBackend {
        self.backend.as_dyn()
    }

    /// Returns true if NUMA is available on this machine.
    pub fn is_available(&self) -> bool {
        self.api().is_available()
    }

    /// Highest node index.
    pub fn max_node(&self) -> i32 {
        self.api().max_node()
    }

    /// Number of NUMA nodes.
    pub fn num_nodes(&self) -> usize {
        (self.max_node() + 1).max(0) as usize
    }

    /// Memory size of `node` in bytes, `-1` when unknown.
    pub fn node_size(&self, node: usize) -> Result<i64> {
        let node = self.check_node(node)?;
        Ok(self.api().node_size(node))
    }

    /// Free memory of `node` in bytes, `-1` when unknown.
    pub fn free_size(&self, node: usize) -> Result<i64> {
        let node = self.check_node(node)?;
        Ok(self.api().free_size(node))
    }

    /// Distance between two nodes. Distances are multiples of 10 and a node
    /// is at distance 10 from itself.
    pub fn distance(&self, node1: usize, node2: usize) -> Result<i32> {
        let node1 = self.check_node(node1)?;
        let node2 = self.check_node(node2)?;
        Ok(self.api().distance(node1, node2))
    }

    /// Number of CPUs addressable by this process.
    pub fn num_cpus(&self) -> usize {
        host::num_cpus()
    }

    /// CPU the calling thread runs on, if the host tells.
    pub fn current_cpu(&self) -> Option<usize> {
        host::current_cpu()
    }

    /// Empty mask sized for this process. CPU 0 is the least significant bit
    /// of the first word.
    pub fn new_cpu_bitmask(&self) -> CpuBitmask {
        CpuBitmask::new(self.num_cpus())
    }

    /// Mask with only `cpu` set.
    pub fn new_cpu_bitmask_for_one_cpu(&self, cpu: usize) -> Result<CpuBitmask> {
        Ok(CpuBitmask::for_one_cpu(self.num_cpus(), cpu)?)
    }

    /// Mask with every CPU set.
    pub fn new_cpu_bitmask_for_all_cpus(&self) -> CpuBitmask {
        CpuBitmask::for_all_cpus(self.num_cpus())
    }

    /// CPUs local to `node`.
    pub fn node_to_cpus(&self, node: usize) -> Result<CpuBitmask> {
        let node = self.check_node(node)?;
        let mut mask = self.new_cpu_bitmask();
        self.api().node_to_cpus(node, &mut mask);
        Ok(mask)
    }

    /// CPUs the calling thread may run on. All of them unless the affinity was
    /// narrowed with [`Numa::set_affinity`].
    ///
    /// Reset the affinity before handing a pooled thread back so the OS can
    /// schedule it anywhere again.
    pub fn get_affinity(&self) -> CpuBitmask {
        let mut mask = self.new_cpu_bitmask();
        self.api().get_affinity(CURRENT_THREAD, &mut mask);
        mask
    }

    /// Pins the calling thread to a single CPU.
    pub fn set_affinity(&self, cpu: usize) -> Result<()> {
        let mask = self.new_cpu_bitmask_for_one_cpu(cpu)?;
        self.set_affinity_mask(&mask);
        Ok(())
    }

    /// Restricts the calling thread to the CPUs set in `mask`.
    pub fn set_affinity_mask(&self, mask: &CpuBitmask) {
        self.api().set_affinity(CURRENT_THREAD, mask)
    }

    /// Lets the calling thread run on every CPU again.
    pub fn reset_affinity(&self) {
        self.set_affinity_mask(&self.new_cpu_bitmask_for_all_cpus())
    }

    /// Preferred node of the calling thread.
    pub fn preferred_node(&self) -> i32 {
        self.api().preferred_node()
    }

    /// Makes the calling thread allocate on the node it runs on.
    pub fn set_local_alloc(&self) {
        self.api().set_local_alloc()
    }

    /// Makes the calling thread allocate on `node` when it has free memory.
    pub fn set_preferred(&self, node: usize) -> Result<()> {
        let node = self.check_node(node)?;
        self.api().set_preferred(node);
        Ok(())
    }

    /// Restricts the calling thread to the CPUs of `node`.
    pub fn run_on_node(&self, node: usize) -> Result<()> {
        let node = self.check_node(node)?;
        self.api().run_on_node(node);
        Ok(())
    }

    /// Lets the calling thread run on the CPUs of every node.
    pub fn run_on_all_nodes(&self) {
        self.api().run_on_node(ALL_NODES)
    }

    /// Moves the calling thread into `policy`.
    pub fn apply_policy(&self, policy: AllocationPolicy) -> Result<()> {
        policy.apply(self)
    }

    /// Allocates `capacity` bytes under the calling thread's policy.
    ///
    /// The buffer is not reclaimed automatically and must be handed back to
    /// [`Numa::free`].
    pub fn alloc(&self, capacity: usize) -> Result<NumaBuffer> {
        self.checked_alloc(capacity, "policy", |api| api.alloc(capacity))
    }

    /// Allocates `capacity` bytes on the node the calling thread runs on.
    pub fn alloc_local(&self, capacity: usize) -> Result<NumaBuffer> {
        self.checked_alloc(capacity, "local", |api| api.alloc_local(capacity))
    }

    /// Allocates `capacity` bytes on `node`.
    pub fn alloc_on_node(&self, capacity: usize, node: usize) -> Result<NumaBuffer> {
        let node = self.check_node(node)?;
        self.checked_alloc(capacity, "node bound", |api| api.alloc_on_node(capacity, node))
    }

    /// Allocates `capacity` bytes striped over all nodes.
    pub fn alloc_interleaved(&self, capacity: usize) -> Result<NumaBuffer> {
        self.checked_alloc(capacity, "interleaved", |api| api.alloc_interleaved(capacity))
    }

    /// Allocates `capacity` bytes under the calling thread's policy and
    /// returns the bare address.
    ///
    /// The region must be released with [`Numa::free_memory`] and the same
    /// capacity.
    pub fn alloc_memory(&self, capacity: usize) -> Result<NonNull<u8>> {
        if capacity == 0 {
            return Ok(NonNull::dangling());
        }
        self.api()
            .alloc_raw(capacity)
            .ok_or(NumaError::AllocationFailed {
                capacity,
                kind: "raw",
            })
    }

    /// Releases a buffer obtained from one of the `alloc*` calls.
    pub fn free(&self, buffer: NumaBuffer) {
        self.api().free(buffer)
    }

    /// Releases a region obtained from [`Numa::alloc_memory`].
    ///
    /// # Safety
    ///
    /// `address` must come from `alloc_memory` of this instance with the same
    /// `capacity` and must not be used or released again.
    pub unsafe fn free_memory(&self, address: NonNull<u8>, capacity: usize) {
        if capacity == 0 {
            return;
        }
        self.api().free_raw(address, capacity)
    }

    /// Snapshot of nodes, their memory and their CPUs.
    pub fn topology(&self) -> Topology {
        Topology::capture(self)
    }

    fn check_node(&self, node: usize) -> Result<i32> {
        if self.kind() == BackendKind::Fallback {
            return Ok(i32::try_from(node).unwrap_or(i32::MAX));
        }

        let max_node = self.max_node();
        match i32::try_from(node) {
            Ok(n) if n <= max_node => Ok(n),
            _ => Err(NumaError::InvalidNode { node, max_node }),
        }
    }

    fn checked_alloc<F>(&self, capacity: usize, kind: &'static str, alloc: F) -> Result<NumaBuffer>
    where
        F: FnOnce(&dyn NumaBackend) -> Option<NumaBuffer>,
    {
        if capacity == 0 {
            return Ok(NumaBuffer::empty());
        }
        alloc(self.api()).ok_or(NumaError::AllocationFailed { capacity, kind })
    }
}
