//!
//! Thread affinity placement
//!
//! Reads and writes the set of CPUs an OS thread may run on, expressed as a
//! [CpuBitmask]. A thread id of `0` names the calling thread.
use numa_bridge_utils::bitmask::CpuBitmask;

/// Fills `mask` with the CPUs `tid` may run on.
///
/// Returns false and leaves `mask` untouched when the OS refuses the query.
pub fn get_for_thread(tid: i32, mask: &mut CpuBitmask) -> bool {
    get_for_thread_helper(tid, mask)
}

///
/// Restricts `tid` to the CPUs set in `mask`.
///
/// Returns false when the OS refuses the new set, for instance when it holds
/// no CPU the thread is allowed to use.
pub fn set_for_thread(tid: i32, mask: &CpuBitmask) -> bool {
    tracing::trace!("numa-bridge: placement: set affinity of {} to {}", tid, mask);
    set_for_thread_helper(tid, mask)
}

// Linux Section

#[cfg(target_os = "linux")]
#[inline]
fn get_for_thread_helper(tid: i32, mask: &mut CpuBitmask) -> bool {
    linux::get_for_thread(tid, mask)
}

#[cfg(target_os = "linux")]
#[inline]
fn set_for_thread_helper(tid: i32, mask: &CpuBitmask) -> bool {
    linux::set_for_thread(tid, mask)
}

#[cfg(target_os = "linux")]
mod linux {
    use std::mem;

    use libc::{cpu_set_t, sched_getaffinity, sched_setaffinity, CPU_ISSET, CPU_SET, CPU_SETSIZE};
    use numa_bridge_utils::bitmask::CpuBitmask;

    pub fn get_for_thread(tid: i32, mask: &mut CpuBitmask) -> bool {
        let mut set = new_cpu_set();

        let result = unsafe { sched_getaffinity(tid, mem::size_of::<cpu_set_t>(), &mut set) };
        if result != 0 {
            return false;
        }

        mask.clear_all();
        for cpu in 0..mask.num_cpus().min(CPU_SETSIZE as usize) {
            if unsafe { CPU_ISSET(cpu, &set) } {
                let set = mask.set(cpu);
                debug_assert!(set.is_ok(), "cpu {} outside of the mask", cpu);
            }
        }
        true
    }

    pub fn set_for_thread(tid: i32, mask: &CpuBitmask) -> bool {
        let mut set = new_cpu_set();

        for cpu in mask.iter().take_while(|cpu| *cpu < CPU_SETSIZE as usize) {
            unsafe { CPU_SET(cpu, &mut set) };
        }

        unsafe { sched_setaffinity(tid, mem::size_of::<cpu_set_t>(), &set) == 0 }
    }

    fn new_cpu_set() -> cpu_set_t {
        unsafe { mem::zeroed::<cpu_set_t>() }
    }

}

// Stub Section

#[cfg(not(target_os = "linux"))]
#[inline]
fn get_for_thread_helper(_tid: i32, _mask: &mut CpuBitmask) -> bool {
    false
}

#[cfg(not(target_os = "linux"))]
#[inline]
fn set_for_thread_helper(_tid: i32, _mask: &CpuBitmask) -> bool {
    false
}
