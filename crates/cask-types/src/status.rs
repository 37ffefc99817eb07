use serde::{Deserialize, Serialize};

/// Lifecycle state of a store instance.
///
/// A freshly constructed store is `Paused` (configured but inert). `start`
/// moves it through `Starting` to `Started`; `stop` through `Stopping` to
/// `Stopped`. An engine open or batch failure parks the store in `Error`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreStatus {
    /// Configured but not yet started.
    #[default]
    Paused,
    /// Engine open in progress.
    Starting,
    /// Accepting operations.
    Started,
    /// A fatal engine failure occurred.
    Error,
    /// Shutdown in progress.
    Stopping,
    /// Shut down; the engine handle is closed.
    Stopped,
}

impl StoreStatus {
    /// Returns `true` if the store accepts read/write operations.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Started)
    }
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Paused => "paused",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Error => "error",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}
