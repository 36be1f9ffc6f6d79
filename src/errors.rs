use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("A policy cannot be constructed without a subject.")]
    InvalidSubject,

    #[error("No policy `{policy}` registered for subject type `{subject_type}`.")]
    PolicyNotFound {
        subject_type: &'static str,
        policy: String,
    },

    #[error("Not authorized to `{action}` this `{subject_type}`.")]
    Unauthorized {
        action: String,
        subject_type: &'static str,
    },

    #[error("Policy `{policy}` is already registered for subject type `{subject_type}`.")]
    DuplicatePolicy {
        policy: &'static str,
        subject_type: &'static str,
    },

    #[error("Policy `{policy}` expects a `{expected}` subject, got `{actual}`.")]
    SubjectMismatch {
        policy: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("An error occurred deserializing allow rules definition: {0}.")]
    Deserializing(#[source] serde_json::Error),

    #[error("An error occurred validating allow rules definition: {0}.")]
    Validation(String),

    #[error(transparent)]
    Predicate(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an error raised inside a policy predicate.
    ///
    /// The wrapped error keeps its own message and source chain.
    pub fn predicate<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Predicate(error.into())
    }

    /// `true` for a legitimate denial, `false` for configuration and programming errors.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}
