//!
//! Host queries
//!
//! Read-only questions asked to the running host: how many CPUs the process can
//! address, how much memory the machine has and which CPU the caller runs on.
//! Nothing is cached here beyond what the host itself caches.

/// Number of CPU indices addressable by this process.
///
/// This is the larger of the configured CPU count and the CPUs the process is
/// allowed to run on, so every CPU index reported by the scheduler fits into a
/// mask of this width.
pub fn num_cpus() -> usize {
    configured_cpus_helper().max(num_cpus::get()).max(1)
}

/// Total physical memory of the host in bytes, if the host reports it.
pub fn total_memory() -> Option<u64> {
    total_memory_helper()
}

/// Available physical memory of the host in bytes, if the host reports it.
pub fn free_memory() -> Option<u64> {
    free_memory_helper()
}

/// CPU the calling thread is currently running on.
pub fn current_cpu() -> Option<usize> {
    current_cpu_helper()
}

// Linux Section

#[cfg(target_os = "linux")]
#[inline]
fn total_memory_helper() -> Option<u64> {
    linux::sysinfo().map(|info| info.totalram as u64 * info.mem_unit as u64)
}

#[cfg(target_os = "linux")]
#[inline]
fn free_memory_helper() -> Option<u64> {
    linux::sysinfo().map(|info| info.freeram as u64 * info.mem_unit as u64)
}

#[cfg(target_os = "linux")]
#[inline]
fn current_cpu_helper() -> Option<usize> {
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu >= 0 {
        Some(cpu as usize)
    } else {
        None
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::mem;

    pub fn sysinfo() -> Option<libc::sysinfo> {
        let mut info = unsafe { mem::zeroed::<libc::sysinfo>() };

        if unsafe { libc::sysinfo(&mut info) } == 0 {
            Some(info)
        } else {
            None
        }
    }
}

// Unix Section

#[cfg(unix)]
#[inline]
fn configured_cpus_helper() -> usize {
    let conf = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    if conf > 0 {
        conf as usize
    } else {
        0
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
#[inline]
fn total_memory_helper() -> Option<u64> {
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if pages > 0 && page_size > 0 {
        Some(pages as u64 * page_size as u64)
    } else {
        None
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
#[inline]
fn free_memory_helper() -> Option<u64> {
    None
}

#[cfg(all(unix, not(target_os = "linux")))]
#[inline]
fn current_cpu_helper() -> Option<usize> {
    None
}

// Stub Section

#[cfg(not(unix))]
#[inline]
fn configured_cpus_helper() -> usize {
    0
}

#[cfg(not(unix))]
#[inline]
fn total_memory_helper() -> Option<u64> {
    None
}

#[cfg(not(unix))]
#[inline]
fn free_memory_helper() -> Option<u64> {
    None
}

#[cfg(not(unix))]
#[inline]
fn current_cpu_helper() -> Option<usize> {
    None
}
