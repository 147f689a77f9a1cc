use thiserror::Error;

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network or rate-limit failure. Retried on the next natural tick.
    #[error("ledger temporarily unavailable: {0}")]
    TransientUnavailable(String),

    /// The ledger answered with something that can never be read, or
    /// rejected the request outright. Retrying the same request cannot help.
    #[error("malformed ledger data: {0}")]
    Malformed(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },

    /// The request was superseded or its view torn down before it resolved.
    #[error("response superseded by a newer request")]
    StaleResponse,

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn transient(reason: impl std::fmt::Display) -> Self {
        Self::TransientUnavailable(reason.to_string())
    }

    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::Malformed(reason.to_string())
    }

    pub fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUnavailable(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Height,
    Events,
    Game,
    History,
    Stats,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Height => "height",
            RecordKind::Events => "events",
            RecordKind::Game => "game",
            RecordKind::History => "history",
            RecordKind::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// Result of one successful invocation: either something to show or an
/// explicit "nothing there".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Data(T),
    Empty,
}

impl<T> Outcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Data(value) => Some(value),
            Outcome::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }
}

/// Maps `NotFound` into an empty outcome; every other error is kept.
pub(crate) fn absent_as_empty<T>(result: Result<T>) -> Result<Outcome<T>> {
    match result {
        Ok(value) => Ok(Outcome::Data(value)),
        Err(SyncError::NotFound { .. }) => Ok(Outcome::Empty),
        Err(e) => Err(e),
    }
}
