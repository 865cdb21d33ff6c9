//! Session lifecycle: one lazily built store per session.

use std::cell::OnceCell;

use crate::store::ConfigurationStore;

/// Owns the configuration store of one user session.
#[derive(Debug, Default)]
pub struct Session {
    store: OnceCell<ConfigurationStore>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's store, built on first use.
    pub fn config(&self) -> &ConfigurationStore {
        self.store.get_or_init(|| {
            log::debug!("Creating configuration store");
            ConfigurationStore::new()
        })
    }

    /// Replace the store, dropping every option value.
    pub fn reset(&mut self) -> &ConfigurationStore {
        log::info!("Resetting session configuration");
        self.store = OnceCell::new();
        self.config()
    }

    pub fn is_configured(&self) -> bool {
        self.store.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_built_once() {
        let session = Session::new();
        assert!(!session.is_configured());
        session.config().set(&session.config().options().scatter_size, 10.0);
        assert!(session.is_configured());
        assert_eq!(session.config().get(&session.config().options().scatter_size), 10.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut session = Session::new();
        session.config().set(&session.config().options().show_grid, true);
        let store = session.reset();
        assert!(!store.is_initialized("show_grid"));
        assert!(!store.get(&store.options().show_grid));
    }
}
