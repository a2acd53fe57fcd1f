//!
//! Process-wide backend selection
//!
//! [NumaSystem] runs backend selection at most once, however many threads race
//! for it. Every caller observes the same [Numa] afterwards.
use crate::config::Config;
use crate::loader::{BindingLoader, DylibLoader};
use crate::numa::Numa;
use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use tracing::warn;

lazy_static! {
    static ref SYSTEM: NumaSystem = NumaSystem::new(DylibLoader::new());
}

/// The system serving [`crate::get`], [`Numa::init`] and [`Numa::init_with`].
pub fn global() -> &'static NumaSystem {
    &*SYSTEM
}

///
/// Holder of a lazily selected [Numa].
#[derive(Debug)]
pub struct NumaSystem<L = DylibLoader> {
    numa: OnceCell<Numa>,
    loader: L,
}

impl<L: BindingLoader> NumaSystem<L> {
    /// Creates a system that selects its backend through `loader` on first use.
    pub fn new(loader: L) -> Self {
        NumaSystem {
            numa: OnceCell::new(),
            loader,
        }
    }

    /// Returns the selected facade, selecting it from the environment's
    /// configuration on first use.
    pub fn get(&self) -> &Numa {
        self.numa
            .get_or_init(|| Numa::select(&Config::from_env(), &self.loader))
    }

    /// Returns the selected facade, selecting it with `config` on first use.
    ///
    /// A config arriving after selection is dropped with a warning.
    pub fn init_with(&self, config: Config) -> &Numa {
        let mut selected = false;
        let numa = self.numa.get_or_init(|| {
            selected = true;
            Numa::select(&config, &self.loader)
        });

        if !selected {
            warn!(
                "numa-bridge: {} backend already selected, ignoring {:?}",
                numa.kind(),
                config
            );
        }

        numa
    }

    /// Returns true once a backend has been selected.
    pub fn is_initialized(&self) -> bool {
        self.numa.get().is_some()
    }

    /// The loader used for selection.
    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;

    #[test]
    fn late_config_is_ignored() {
        let system = NumaSystem::new(DylibLoader::new());
        assert!(!system.is_initialized());

        let numa = system.init_with(Config::new().disable_numa());
        assert_eq!(numa.kind(), BackendKind::Fallback);
        assert!(system.is_initialized());

        let again = system.init_with(Config::new().enable_numa());
        assert!(std::ptr::eq(numa, again));
        assert_eq!(again.kind(), BackendKind::Fallback);
        assert!(std::ptr::eq(numa, system.get()));
    }
}
