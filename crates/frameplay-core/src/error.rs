//! Error types for pipeline construction, transport control and probing.

use std::fmt;

/// Coarse classification of a [`PlayerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Allocation,
    Link,
    StateTransition,
    Query,
    Probe,
    ParameterMissing,
    RuntimeInit,
}

/// Errors raised while building or driving a playback pipeline.
///
/// Construction-time variants (`Allocation`, `Link`) are unrecoverable for the
/// instance that raised them. `Probe` and `ParameterMissing` are only ever
/// logged by the engine; playback continues with default assumptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// A pipeline element, bin or bus could not be created
    Allocation(String),
    /// Elements could not be added to a bin or linked together
    Link(String),
    /// The runtime rejected a requested state change
    StateTransition(String),
    /// A duration/position/caps query failed
    Query(String),
    /// Pre-flight codec inspection failed
    Probe(String),
    /// An expected stream URL parameter was absent or unusable
    ParameterMissing(String),
    /// The pipeline runtime could not be initialized
    RuntimeInit(String),
}

impl PlayerError {
    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::Allocation(_) => ErrorKind::Allocation,
            PlayerError::Link(_) => ErrorKind::Link,
            PlayerError::StateTransition(_) => ErrorKind::StateTransition,
            PlayerError::Query(_) => ErrorKind::Query,
            PlayerError::Probe(_) => ErrorKind::Probe,
            PlayerError::ParameterMissing(_) => ErrorKind::ParameterMissing,
            PlayerError::RuntimeInit(_) => ErrorKind::RuntimeInit,
        }
    }

    /// Returns true for failures that leave a freshly built instance unusable.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            PlayerError::Allocation(_) | PlayerError::Link(_) | PlayerError::RuntimeInit(_)
        )
    }
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Allocation(msg) => write!(f, "Allocation failed: {msg}"),
            PlayerError::Link(msg) => write!(f, "Link failed: {msg}"),
            PlayerError::StateTransition(msg) => write!(f, "State transition failed: {msg}"),
            PlayerError::Query(msg) => write!(f, "Query failed: {msg}"),
            PlayerError::Probe(msg) => write!(f, "Codec probe failed: {msg}"),
            PlayerError::ParameterMissing(msg) => write!(f, "Missing parameter: {msg}"),
            PlayerError::RuntimeInit(msg) => write!(f, "Runtime initialization failed: {msg}"),
        }
    }
}

impl std::error::Error for PlayerError {}
