//!
//! Backend loader
//!
//! Turns the platform and the outcome of binding libnuma into exactly one
//! [Backend]:
//! * platforms without libnuma get the fallback without loading anything,
//! * a binding that fails for any reason, panics included, gets the fallback,
//! * a bound image whose kernel reports no NUMA support gets the fallback,
//! * anything else gets the native backend.
//!
//! This is the only place where loading faults are seen. They are logged and
//! then dropped, callers only observe `is_available() == false`.
use crate::backend::Backend;
use crate::binding::NumaLibrary;
use crate::config::Config;
use crate::error::LoadError;
use crate::fallback::FallbackBackend;
use crate::native::NativeBackend;
use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Makes a native image callable from this process.
///
/// Loading the same path twice must hand back the image bound the first
/// time rather than binding it again.
pub trait BindingLoader: Debug + Send + Sync {
    /// Binds the image at `path`.
    fn load(&self, path: &Path) -> Result<Arc<NumaLibrary>, LoadError>;
    /// Returns true if `path` has been bound by this loader.
    fn is_loaded(&self, path: &Path) -> bool;
}

///
/// Loader resolving images through the platform's dynamic linker.
#[derive(Debug, Default)]
pub struct DylibLoader {
    loaded: Mutex<HashMap<PathBuf, Arc<NumaLibrary>>>,
}

impl DylibLoader {
    /// Creates a loader that has bound nothing yet.
    pub fn new() -> Self {
        DylibLoader::default()
    }
}

impl BindingLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<Arc<NumaLibrary>, LoadError> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(library) = loaded.get(path) {
            return Ok(Arc::clone(library));
        }

        let library = Arc::new(NumaLibrary::open(path)?);
        debug!("numa-bridge: loader: bound {:?}", path);
        loaded.insert(path.to_path_buf(), Arc::clone(&library));
        Ok(library)
    }

    fn is_loaded(&self, path: &Path) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }
}

/// Returns false for the platforms that never ship libnuma.
///
/// The match is case insensitive so both `windows` and `Mac OS X` style
/// names are recognized.
pub fn platform_supports_numa(os: &str) -> bool {
    let os = os.to_ascii_lowercase();
    !(os.contains("windows") || os.contains("mac"))
}

/// Picks the backend for this process.
///
/// The configured images are tried in order and each one is handed to
/// `loader` at most once per selection. Only an image that can't be opened
/// moves on to the next candidate. Any other fault selects the fallback
/// right away.
///
/// Never fails and never panics: every fault met along the way ends in the
/// fallback backend.
pub fn select_backend(config: &Config, loader: &dyn BindingLoader) -> Backend {
    if config.is_disabled() {
        info!("numa-bridge: loader: numa disabled by configuration, using fallback");
        return FallbackBackend::new().into();
    }

    if !platform_supports_numa(env::consts::OS) {
        info!(
            "numa-bridge: loader: no numa facility on {}, using fallback",
            env::consts::OS
        );
        return FallbackBackend::new().into();
    }

    for path in config.libraries() {
        match bind(loader, path) {
            Ok(library) => {
                info!("numa-bridge: loader: using native backend from {:?}", path);
                return NativeBackend::new(library).into();
            }
            Err(LoadError::Unavailable) => {
                info!("numa-bridge: loader: kernel has no numa support, using fallback");
                return FallbackBackend::new().into();
            }
            Err(e @ LoadError::Open { .. }) => {
                debug!("numa-bridge: loader: {}", e);
            }
            Err(e) => {
                warn!("numa-bridge: loader: {}, using fallback", e);
                return FallbackBackend::new().into();
            }
        }
    }

    warn!("numa-bridge: loader: couldn't bind libnuma, using fallback");
    FallbackBackend::new().into()
}

fn bind(loader: &dyn BindingLoader, path: &Path) -> Result<Arc<NumaLibrary>, LoadError> {
    let library = panic::catch_unwind(AssertUnwindSafe(|| loader.load(path)))
        .map_err(|payload| LoadError::Panicked(panic_message(&*payload)))??;

    if library.available() {
        Ok(library)
    } else {
        Err(LoadError::Unavailable)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
