use std::time::Duration;

/// Counters for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Hits returned by the search.
    pub num_listed: usize,
    /// Hits repeating an id seen earlier in the same search.
    pub num_duplicates: usize,
    /// Hits already present in the store.
    pub num_known: usize,
    pub num_fetched: usize,
    pub num_recorded: usize,
}

impl Statistics {
    pub fn write_to_log(&self, running_time: Duration) {
        tracing::info!(
            num_listed = self.num_listed,
            num_duplicates = self.num_duplicates,
            num_known = self.num_known,
            num_fetched = self.num_fetched,
            num_recorded = self.num_recorded,
            running_time = ?running_time,
            "statistics"
        );
    }
}
