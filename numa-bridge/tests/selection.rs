use numa_bridge::binding::NumaLibrary;
use numa_bridge::error::LoadError;
use numa_bridge::loader::{BindingLoader, DylibLoader};
use numa_bridge::prelude::{BackendKind, Config, Numa};
use numa_bridge::system::NumaSystem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

const MISSING: &str = "/nonexistent/numa-bridge/libnuma.so.1";

#[derive(Debug, Default)]
struct RecordingLoader {
    inner: DylibLoader,
    calls: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
}

impl BindingLoader for RecordingLoader {
    fn load(&self, path: &Path) -> Result<Arc<NumaLibrary>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_path_buf());
        self.inner.load(path)
    }

    fn is_loaded(&self, path: &Path) -> bool {
        self.inner.is_loaded(path)
    }
}

#[derive(Debug)]
struct PanickingLoader;

impl BindingLoader for PanickingLoader {
    fn load(&self, _path: &Path) -> Result<Arc<NumaLibrary>, LoadError> {
        panic!("loader exploded");
    }

    fn is_loaded(&self, _path: &Path) -> bool {
        false
    }
}

#[derive(Debug)]
struct UnavailableLoader;

impl BindingLoader for UnavailableLoader {
    fn load(&self, _path: &Path) -> Result<Arc<NumaLibrary>, LoadError> {
        Err(LoadError::Unavailable)
    }

    fn is_loaded(&self, _path: &Path) -> bool {
        false
    }
}

#[test]
fn disabled_never_loads() {
    let loader = RecordingLoader::default();
    let numa = Numa::select(&Config::new().disable_numa(), &loader);

    assert_eq!(numa.kind(), BackendKind::Fallback);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn every_path_is_tried_in_order() {
    let loader = RecordingLoader::default();
    let config = Config::new().with_library_path(MISSING);
    let numa = Numa::select(&config, &loader);

    assert_eq!(numa.kind(), BackendKind::Fallback);
    assert!(!numa.is_available());
    assert_eq!(*loader.paths.lock().unwrap(), vec![PathBuf::from(MISSING)]);
    assert!(!loader.is_loaded(Path::new(MISSING)));
}

#[test]
fn panicking_loader_falls_back() {
    let numa = Numa::select(&Config::new(), &PanickingLoader);
    assert_eq!(numa.kind(), BackendKind::Fallback);
    assert_eq!(numa.distance(0, 0), Ok(10));
}

#[test]
fn unavailable_kernel_falls_back() {
    let numa = Numa::select(&Config::new(), &UnavailableLoader);
    assert_eq!(numa.kind(), BackendKind::Fallback);
    assert_eq!(numa.num_nodes(), 1);
}

#[test]
fn concurrent_first_use_selects_once() {
    const THREADS: usize = 16;

    let system = Arc::new(NumaSystem::new(RecordingLoader::default()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let system = Arc::clone(&system);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let numa = system.init_with(Config::new().with_library_path(MISSING));
                numa as *const Numa as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(system.is_initialized());
    assert_eq!(system.get().kind(), BackendKind::Fallback);
    if cfg!(target_os = "linux") {
        assert_eq!(system.loader().calls.load(Ordering::SeqCst), 1);
    }
}
