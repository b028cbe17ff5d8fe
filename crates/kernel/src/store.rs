use std::collections::BTreeMap;

use crate::config::DebugConfig;
use crate::error::EngineError;

/// Runtime toggles read by presentation layers (inspectors, overlays).
///
/// Owned by the [`Engine`](crate::Engine) and lent out by reference; there is
/// no global instance. Reads on an uninitialized store return the defaults,
/// writes fail with [`EngineError::StoreNotInitialized`].
#[derive(Debug, Clone, Default)]
pub struct EngineStore {
    initialized: bool,
    debug_enabled: bool,
    show_fps: bool,
    flags: BTreeMap<String, bool>,
}

impl EngineStore {
    /// An uninitialized store. Reads return defaults until [`EngineStore::init`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from config. Calling it again re-seeds.
    pub fn init(&mut self, config: &DebugConfig) {
        self.debug_enabled = config.enabled;
        self.show_fps = config.show_fps;
        self.flags = config.flags.clone();
        self.initialized = true;
        tracing::debug!(debug = self.debug_enabled, show_fps = self.show_fps, "engine store initialized");
    }

    /// Reset every toggle and mark the store uninitialized.
    pub fn shutdown(&mut self) {
        *self = Self::default();
        tracing::debug!("engine store shut down");
    }

    /// True between `init` and `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Master debug toggle.
    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    /// Fails with [`EngineError::StoreNotInitialized`] before `init`.
    pub fn set_debug_enabled(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        self.debug_enabled = enabled;
        Ok(())
    }

    pub fn show_fps(&self) -> bool {
        self.show_fps
    }

    /// Fails with [`EngineError::StoreNotInitialized`] before `init`.
    pub fn set_show_fps(&mut self, show: bool) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        self.show_fps = show;
        Ok(())
    }

    /// Value of a named flag; unknown flags read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Set a named flag, returning its previous value.
    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) -> Result<bool, EngineError> {
        self.ensure_initialized()?;
        let name = name.into();
        tracing::debug!(flag = %name, value, "debug flag set");
        Ok(self.flags.insert(name, value).unwrap_or(false))
    }

    /// Flip a named flag and return its new value.
    pub fn toggle_flag(&mut self, name: &str) -> Result<bool, EngineError> {
        let next = !self.flag(name);
        self.set_flag(name, next)?;
        Ok(next)
    }

    /// All named flags in ascending order.
    pub fn flags(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn ensure_initialized(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::StoreNotInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_require_init() {
        let mut store = EngineStore::new();
        assert!(!store.debug_enabled());
        assert!(matches!(
            store.set_debug_enabled(true),
            Err(EngineError::StoreNotInitialized)
        ));
        assert!(store.set_flag("grid", true).is_err());
    }

    #[test]
    fn init_seeds_from_config() {
        let mut config = DebugConfig {
            enabled: true,
            show_fps: true,
            ..DebugConfig::default()
        };
        config.flags.insert("grid".into(), true);

        let mut store = EngineStore::new();
        store.init(&config);
        assert!(store.is_initialized());
        assert!(store.debug_enabled());
        assert!(store.show_fps());
        assert!(store.flag("grid"));
        assert!(!store.flag("missing"));
    }

    #[test]
    fn flags_set_and_toggle() {
        let mut store = EngineStore::new();
        store.init(&DebugConfig::default());
        assert!(!store.set_flag("wireframe", true).unwrap());
        assert!(store.set_flag("wireframe", true).unwrap());
        assert!(!store.toggle_flag("wireframe").unwrap());
        assert!(store.toggle_flag("bounds").unwrap());
        assert_eq!(
            store.flags().collect::<Vec<_>>(),
            vec![("bounds", true), ("wireframe", false)]
        );
    }

    #[test]
    fn shutdown_resets() {
        let mut store = EngineStore::new();
        store.init(&DebugConfig {
            enabled: true,
            ..DebugConfig::default()
        });
        store.set_flag("grid", true).unwrap();
        store.shutdown();
        assert!(!store.is_initialized());
        assert!(!store.debug_enabled());
        assert!(!store.flag("grid"));
    }
}
