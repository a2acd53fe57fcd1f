use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Environment variable forcing the fallback backend when set to anything
/// but `0` or `false`.
pub const DISABLE_ENV: &str = "NUMA_BRIDGE_DISABLE";

/// Environment variable naming the libnuma image to bind.
pub const LIBRARY_ENV: &str = "NUMA_BRIDGE_LIBRARY";

/// Images tried in order when no library path is configured.
pub const DEFAULT_LIBRARIES: &[&str] = &["libnuma.so.1", "libnuma.so"];

#[derive(Debug, Clone)]
/// The configuration that should be used to select the
/// backend using [`Numa::init_with`].
///
/// The default behaviors are the following:
/// - NUMA is enabled (see [`Config::enable_numa`]).
/// - libnuma is looked up as `libnuma.so.1`, then `libnuma.so`.
///
/// # Example
///
/// ```rust
/// use numa_bridge::prelude::*;
///
/// let config = Config::new().disable_numa();
///
/// let numa = Numa::init_with(config);
///
/// // You can now use numa-bridge...
/// # let _ = numa.num_nodes();
/// ```
///
/// [`Numa::init_with`]: crate::numa::Numa::init_with
/// [`Config::enable_numa`]: Config::enable_numa
pub struct Config {
    numa: NumaMode,
    libraries: Vec<PathBuf>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) enum NumaMode {
    /// Bind the native facility when the platform has one.
    Enabled,
    /// Always select the fallback backend.
    Disabled,
}

impl Config {
    /// Creates a new configuration with the following default
    /// behaviors:
    /// - NUMA is enabled (see [`Config::enable_numa`]).
    /// - libnuma is looked up under its default names.
    pub fn new() -> Self {
        Config::default()
    }

    /// Creates a configuration from the process environment.
    ///
    /// Starts from the defaults and applies `NUMA_BRIDGE_DISABLE` and
    /// `NUMA_BRIDGE_LIBRARY` when they are set.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Some(value) = env::var_os(DISABLE_ENV) {
            if is_truthy(&value) {
                config = config.disable_numa();
            }
        }
        if let Some(path) = env::var_os(LIBRARY_ENV) {
            if !path.is_empty() {
                config = config.with_library_path(path);
            }
        }
        config
    }

    /// Lets the native facility be bound when the platform has one.
    ///
    /// Note that this is the default behavior.
    pub fn enable_numa(mut self) -> Self {
        self.numa = NumaMode::Enabled;
        self
    }

    /// Forces the fallback backend, even on a NUMA machine.
    pub fn disable_numa(mut self) -> Self {
        self.numa = NumaMode::Disabled;
        self
    }

    /// Binds the libnuma image found at `path` instead of the default names.
    pub fn with_library_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.libraries = vec![path.as_ref().to_path_buf()];
        self
    }

    /// Tries the libnuma images at `paths` in order, instead of the default
    /// names.
    pub fn with_library_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.libraries = paths
            .into_iter()
            .map(|path| path.as_ref().to_path_buf())
            .collect();
        self
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.numa == NumaMode::Disabled
    }

    pub(crate) fn libraries(&self) -> &[PathBuf] {
        &self.libraries
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            numa: NumaMode::Enabled,
            libraries: DEFAULT_LIBRARIES.iter().map(PathBuf::from).collect(),
        }
    }
}

fn is_truthy(value: &OsStr) -> bool {
    match value.to_str().map(str::trim) {
        Some("0") | Some("") => false,
        Some(v) if v.eq_ignore_ascii_case("false") => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new();
        assert!(!config.is_disabled());
        assert_eq!(
            config.libraries(),
            &[PathBuf::from("libnuma.so.1"), PathBuf::from("libnuma.so")]
        );
    }

    #[test]
    fn builder() {
        let config = Config::new()
            .disable_numa()
            .with_library_path("/opt/numa/libnuma.so.1");
        assert!(config.is_disabled());
        assert_eq!(config.libraries(), &[PathBuf::from("/opt/numa/libnuma.so.1")]);
        assert!(!config.enable_numa().is_disabled());
    }

    #[test]
    fn library_candidates_keep_their_order() {
        let config = Config::new().with_library_paths(&["/a/libnuma.so.1", "/b/libnuma.so"]);
        assert_eq!(
            config.libraries(),
            &[PathBuf::from("/a/libnuma.so.1"), PathBuf::from("/b/libnuma.so")]
        );
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy(OsStr::new("1")));
        assert!(is_truthy(OsStr::new("yes")));
        assert!(!is_truthy(OsStr::new("0")));
        assert!(!is_truthy(OsStr::new("FALSE")));
        assert!(!is_truthy(OsStr::new(" ")));
    }
}
