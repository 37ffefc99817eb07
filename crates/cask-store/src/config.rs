/// Configuration for one store instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Engine storage location (informational for in-memory backends).
    pub path: String,
    /// When `false`, `stop()` erases every registered address before
    /// closing the engine.
    pub persistent: bool,
    /// Diagnostic verbosity, 0 (silent) through 5 (trace). Maps onto the
    /// `tracing` level the store logs at; it never installs a subscriber.
    pub verbosity: u8,
    /// Capacity of the event notification buffer per subscriber.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            persistent: true,
            verbosity: 0,
            event_capacity: 256,
        }
    }
}

impl StoreConfig {
    /// Set the engine storage location.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Mark the store ephemeral: `stop()` erases all registered addresses.
    pub fn ephemeral(mut self) -> Self {
        self.persistent = false;
        self
    }

    /// Set the diagnostic verbosity (clamped to 0..=5).
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity.min(5);
        self
    }
}
