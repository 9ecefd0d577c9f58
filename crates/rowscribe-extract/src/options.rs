use std::time::Duration;

/// Options that bound how much work a single extraction may do.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Fail instead of returning more than this many rows.
    pub max_rows: Option<usize>,
    /// Upper bound for a single query round trip.
    pub query_timeout: Option<Duration>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_rows: None,
            query_timeout: Some(Duration::from_secs(60)),
        }
    }
}
