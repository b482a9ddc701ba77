//! Store configuration.

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Maximum size of a segment file before it is sealed and a new active
    /// segment is created.
    pub segment_size: u64,

    /// Whether to fsync the active segment on every put (safer but slower).
    pub sync_on_put: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            segment_size: 64 * 1024 * 1024, // 64 MB
            sync_on_put: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the maximum segment file size.
    #[must_use]
    pub const fn segment_size(mut self, size: u64) -> Self {
        self.segment_size = size;
        self
    }

    /// Sets whether to fsync on every put.
    #[must_use]
    pub const fn sync_on_put(mut self, value: bool) -> Self {
        self.sync_on_put = value;
        self
    }
}
