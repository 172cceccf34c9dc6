/// Errors surfaced by external data providers (subject resolution, status
/// snapshots, enrichment sub-fetches, preference storage).
///
/// Providers fail independently; the engine degrades the affected field to
/// absent rather than failing a whole update, so classification here is about
/// logging and user surfacing, not control flow.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether a later retry (refresh, re-selection) can plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Lookup(_) => "lookup",
            Self::Storage(_) => "storage",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Errors from the outbound display-surface transport. Always non-fatal to
/// the engine: committed state is the source of truth regardless of whether
/// a push landed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
}
