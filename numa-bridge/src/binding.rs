//!
//! Bound libnuma symbols
//!
//! [NumaLibrary] is what a successful binding produces: the libnuma image kept
//! open for the life of the process, plus the function pointers resolved out of
//! it. Every symbol is resolved up front so a partially usable image is
//! rejected at load time rather than at first call.
use crate::error::LoadError;
use libc::{c_int, c_longlong, c_uint, c_void, size_t};
use libloading::Library;
use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};

/// libnuma's `struct bitmask`. Only handled through pointers.
#[repr(C)]
pub(crate) struct RawBitmask {
    _private: [u8; 0],
}

type AvailableFn = unsafe extern "C" fn() -> c_int;
type MaxNodeFn = unsafe extern "C" fn() -> c_int;
type NodeSizeFn = unsafe extern "C" fn(c_int, *mut c_longlong) -> c_longlong;
type DistanceFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type AllocateCpumaskFn = unsafe extern "C" fn() -> *mut RawBitmask;
type BitmaskFreeFn = unsafe extern "C" fn(*mut RawBitmask);
type BitmaskIsBitSetFn = unsafe extern "C" fn(*const RawBitmask, c_uint) -> c_int;
type NodeToCpusFn = unsafe extern "C" fn(c_int, *mut RawBitmask) -> c_int;
type PreferredFn = unsafe extern "C" fn() -> c_int;
type SetPreferredFn = unsafe extern "C" fn(c_int);
type SetLocalAllocFn = unsafe extern "C" fn();
type RunOnNodeFn = unsafe extern "C" fn(c_int) -> c_int;
type AllocFn = unsafe extern "C" fn(size_t) -> *mut c_void;
type AllocOnNodeFn = unsafe extern "C" fn(size_t, c_int) -> *mut c_void;
type FreeFn = unsafe extern "C" fn(*mut c_void, size_t);

///
/// libnuma image bound to this process.
pub struct NumaLibrary {
    path: PathBuf,
    available: AvailableFn,
    max_node: MaxNodeFn,
    node_size64: NodeSizeFn,
    distance: DistanceFn,
    allocate_cpumask: AllocateCpumaskFn,
    bitmask_free: BitmaskFreeFn,
    bitmask_isbitset: BitmaskIsBitSetFn,
    node_to_cpus: NodeToCpusFn,
    preferred: PreferredFn,
    set_preferred: SetPreferredFn,
    set_localalloc: SetLocalAllocFn,
    run_on_node: RunOnNodeFn,
    alloc: AllocFn,
    alloc_local: AllocFn,
    alloc_onnode: AllocOnNodeFn,
    alloc_interleaved: AllocFn,
    free: FreeFn,
    // Must outlive every pointer above.
    _library: Library,
}

macro_rules! resolve {
    ($library:expr, $path:expr, $name:literal as $ty:ty) => {{
        let symbol = unsafe { $library.get::<$ty>(concat!($name, "\0").as_bytes()) }.map_err(|source| {
            LoadError::Symbol {
                path: $path.to_path_buf(),
                symbol: $name,
                source,
            }
        })?;
        *symbol
    }};
}

impl NumaLibrary {
    /// Opens the image at `path` and resolves every libnuma entry point
    /// numa-bridge forwards to.
    ///
    /// A bare file name is looked up through the platform's library search
    /// path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(NumaLibrary {
            path: path.to_path_buf(),
            available: resolve!(library, path, "numa_available" as AvailableFn),
            max_node: resolve!(library, path, "numa_max_node" as MaxNodeFn),
            node_size64: resolve!(library, path, "numa_node_size64" as NodeSizeFn),
            distance: resolve!(library, path, "numa_distance" as DistanceFn),
            allocate_cpumask: resolve!(library, path, "numa_allocate_cpumask" as AllocateCpumaskFn),
            bitmask_free: resolve!(library, path, "numa_bitmask_free" as BitmaskFreeFn),
            bitmask_isbitset: resolve!(library, path, "numa_bitmask_isbitset" as BitmaskIsBitSetFn),
            node_to_cpus: resolve!(library, path, "numa_node_to_cpus" as NodeToCpusFn),
            preferred: resolve!(library, path, "numa_preferred" as PreferredFn),
            set_preferred: resolve!(library, path, "numa_set_preferred" as SetPreferredFn),
            set_localalloc: resolve!(library, path, "numa_set_localalloc" as SetLocalAllocFn),
            run_on_node: resolve!(library, path, "numa_run_on_node" as RunOnNodeFn),
            alloc: resolve!(library, path, "numa_alloc" as AllocFn),
            alloc_local: resolve!(library, path, "numa_alloc_local" as AllocFn),
            alloc_onnode: resolve!(library, path, "numa_alloc_onnode" as AllocOnNodeFn),
            alloc_interleaved: resolve!(library, path, "numa_alloc_interleaved" as AllocFn),
            free: resolve!(library, path, "numa_free" as FreeFn),
            _library: library,
        })
    }

    /// Path the image was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `numa_available() != -1`
    pub fn available(&self) -> bool {
        unsafe { (self.available)() != -1 }
    }

    pub(crate) fn max_node(&self) -> c_int {
        unsafe { (self.max_node)() }
    }

    /// Returns `(total, free)` bytes of `node`, `-1` for both when unknown.
    pub(crate) fn node_size(&self, node: c_int) -> (i64, i64) {
        let mut free: c_longlong = -1;
        let total = unsafe { (self.node_size64)(node, &mut free) };
        (total as i64, free as i64)
    }

    pub(crate) fn distance(&self, node1: c_int, node2: c_int) -> c_int {
        unsafe { (self.distance)(node1, node2) }
    }

    /// Calls `f` with the CPUs of `node` while the libnuma mask is alive.
    /// Returns false when libnuma rejects the node.
    pub(crate) fn with_node_cpus<F>(&self, node: c_int, f: F) -> bool
    where
        F: FnOnce(&dyn Fn(usize) -> bool),
    {
        let mask = unsafe { (self.allocate_cpumask)() };
        if mask.is_null() {
            return false;
        }

        let filled = unsafe { (self.node_to_cpus)(node, mask) } == 0;
        if filled {
            let isbitset = self.bitmask_isbitset;
            f(&|cpu: usize| unsafe { isbitset(mask, cpu as c_uint) } != 0);
        }

        unsafe { (self.bitmask_free)(mask) };
        filled
    }

    pub(crate) fn preferred(&self) -> c_int {
        unsafe { (self.preferred)() }
    }

    pub(crate) fn set_preferred(&self, node: c_int) {
        unsafe { (self.set_preferred)(node) }
    }

    pub(crate) fn set_localalloc(&self) {
        unsafe { (self.set_localalloc)() }
    }

    pub(crate) fn run_on_node(&self, node: c_int) -> c_int {
        unsafe { (self.run_on_node)(node) }
    }

    pub(crate) fn alloc(&self, size: usize) -> *mut u8 {
        unsafe { (self.alloc)(size) as *mut u8 }
    }

    pub(crate) fn alloc_local(&self, size: usize) -> *mut u8 {
        unsafe { (self.alloc_local)(size) as *mut u8 }
    }

    pub(crate) fn alloc_onnode(&self, size: usize, node: c_int) -> *mut u8 {
        unsafe { (self.alloc_onnode)(size, node) as *mut u8 }
    }

    pub(crate) fn alloc_interleaved(&self, size: usize) -> *mut u8 {
        unsafe { (self.alloc_interleaved)(size) as *mut u8 }
    }

    /// # Safety
    ///
    /// `start` must come from one of the `alloc*` calls of this image with the
    /// same `size`, and must not be used or released again.
    pub(crate) unsafe fn free(&self, start: *mut u8, size: usize) {
        (self.free)(start as *mut c_void, size)
    }
}

impl Debug for NumaLibrary {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("NumaLibrary")
            .field("path", &self.path)
            .finish()
    }
}
