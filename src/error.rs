//! Error types used by the registry, state containers, API facade and init coordinator.
//!
//! - [`RegistryError`]: programmer errors around suspense labels (fatal to a render pass).
//! - [`JobError`]: outcome of a failed deferred job; cloneable so every awaiter of a label
//!   observes the same error.
//! - [`PatchError`] / [`StateError`]: a patch could not be applied; the previous snapshot is retained.
//! - [`ApiError`]: failures reported by the HTTP endpoint facade.
//! - [`LoadError`]: failures of a state container's `load` that are propagated to the caller.
//! - [`InitError`]: failures surfaced by the init coordinator to the rendering environment.
//! - [`BuildError`]: failures while assembling [`Services`](crate::Services).
//!
//! All enums provide `as_label` (stable snake_case label for logs and events).

use thiserror::Error;

use crate::api::Issue;

/// # Errors produced by the suspense registry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A job was already registered under this label within the current pass.
    #[error("label '{label}' is already registered")]
    DuplicateLabel {
        /// The offending label.
        label: String,
    },

    /// Suspension was requested for a label that was never registered.
    #[error("label '{label}' is not registered")]
    UnknownLabel {
        /// The offending label.
        label: String,
    },

    /// A dehydrated payload could not be encoded or decoded.
    #[error("suspense payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use prehydrate::RegistryError;
    ///
    /// let err = RegistryError::UnknownLabel { label: "articles".into() };
    /// assert_eq!(err.as_label(), "registry_unknown_label");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateLabel { .. } => "registry_duplicate_label",
            RegistryError::UnknownLabel { .. } => "registry_unknown_label",
            RegistryError::Payload(_) => "registry_payload",
        }
    }
}

/// # Failure of a deferred job.
///
/// Stored in a failed registry entry and handed to every awaiter of that label,
/// hence `Clone`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The job ran and failed.
    #[error("job failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The job was cancelled because its render pass was aborted.
    #[error("job cancelled")]
    Canceled,
}

impl JobError {
    /// Wraps any displayable error as [`JobError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        JobError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }
}

impl From<LoadError> for JobError {
    fn from(err: LoadError) -> Self {
        JobError::fail(err)
    }
}

impl From<ApiError> for JobError {
    fn from(err: ApiError) -> Self {
        JobError::fail(err)
    }
}

/// Reason a [`Patch`](crate::state::Patch) refused to produce a new state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PatchError(pub String);

impl PatchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// # Errors produced while updating a state container.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StateError {
    /// The patch could not be applied to the current snapshot.
    #[error("malformed patch for '{store}': {reason}")]
    Malformed {
        /// Name of the state container.
        store: String,
        /// Why the patch was rejected.
        reason: String,
    },

    /// A container with the same name is already registered in the store.
    #[error("state '{name}' is already registered")]
    DuplicateState {
        /// The offending name.
        name: String,
    },

    /// A snapshot could not be serialized for hydration.
    #[error("state encode: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StateError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            StateError::Malformed { .. } => "state_malformed_patch",
            StateError::DuplicateState { .. } => "state_duplicate",
            StateError::Encode(_) => "state_encode",
        }
    }
}

/// # Errors produced by the API facade.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the request with field-level issues
    /// (`{"error": {"data": {"issues": [...]}}}`).
    #[error("validation failed with {} issue(s)", .issues.len())]
    Validation {
        /// HTTP status of the response.
        status: u16,
        /// Field-level issues reported by the server.
        issues: Vec<Issue>,
    },

    /// Non-success status without a recognized validation payload.
    #[error("http status {status}: {message}")]
    Status {
        /// HTTP status of the response.
        status: u16,
        /// Error message or raw body.
        message: String,
    },

    /// Connection, TLS or protocol failure.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body is not the expected JSON.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// A configured header name or value is not a valid HTTP header.
    #[error("invalid header '{name}'")]
    InvalidHeader {
        /// The header name.
        name: String,
    },
}

impl ApiError {
    /// Returns the issue list when this is a validation failure.
    pub fn validation_issues(&self) -> Option<&[Issue]> {
        match self {
            ApiError::Validation { issues, .. } => Some(issues),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "api_validation",
            ApiError::Status { .. } => "api_status",
            ApiError::Transport(_) => "api_transport",
            ApiError::Decode(_) => "api_decode",
            ApiError::InvalidHeader { .. } => "api_invalid_header",
        }
    }
}

/// # Errors propagated by a state container's `load`.
///
/// Validation failures never appear here: they are absorbed into state.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoadError {
    /// The endpoint failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The fetched result could not be applied to state.
    #[error(transparent)]
    State(#[from] StateError),

    /// The fetched result does not have the expected shape.
    #[error("unexpected result shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LoadError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Api(e) => e.as_label(),
            LoadError::State(e) => e.as_label(),
            LoadError::Decode(_) => "load_decode",
        }
    }
}

/// # Errors surfaced by the init coordinator to the rendering environment.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InitError {
    /// Registry misuse (duplicate or unknown label).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The server-side job for `label` failed; replayed to every awaiter.
    #[error("init '{label}' failed: {source}")]
    Job {
        /// Label of the failed job.
        label: String,
        /// The stored failure.
        source: JobError,
    },
}

impl InitError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            InitError::Registry(e) => e.as_label(),
            InitError::Job { source, .. } => source.as_label(),
        }
    }
}

/// # Errors produced while building [`Services`](crate::Services).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BuildError {
    /// The API facade could not be constructed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A state module could not be registered or hydrated.
    #[error(transparent)]
    State(#[from] StateError),
}

impl BuildError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::Api(e) => e.as_label(),
            BuildError::State(e) => e.as_label(),
        }
    }
}
