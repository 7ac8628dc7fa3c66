use thiserror::Error;

/// Errors surfaced by [`crate::GenerationClient`].
///
/// The retry loop keys off [`GenerationError::is_retryable`]: validation
/// failures, server-side errors and transport errors are worth another
/// attempt, while client errors and cancellation end the call immediately.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP exchange succeeded but the body was not a usable plan or
    /// suggestion payload.
    #[error("response failed validation: {0}")]
    Validation(String),

    /// A 4xx status. The request itself is wrong, so retrying the same
    /// request cannot help.
    #[error("client error ({status}): {message}")]
    Client { status: u16, message: String },

    /// A non-2xx status outside the 4xx range, typically a 5xx.
    #[error("server error ({status}): {message}")]
    Transient { status: u16, message: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Client construction input that cannot be used, e.g. an API key that
    /// is not a valid header value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every allowed attempt failed. `source` is the error from the final
    /// attempt.
    #[error("generation failed after {attempts} attempts")]
    ExhaustedRetries {
        attempts: usize,
        #[source]
        source: Box<GenerationError>,
    },

    /// The caller cancelled the operation. Never retried and never wrapped.
    #[error("operation cancelled")]
    Cancelled,
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Validation(_)
            | GenerationError::Transient { .. }
            | GenerationError::Network(_) => true,
            GenerationError::Client { .. }
            | GenerationError::InvalidConfig(_)
            | GenerationError::ExhaustedRetries { .. }
            | GenerationError::Cancelled => false,
        }
    }
}

/// Errors from [`crate::PlanSession`] operations that were called in the
/// wrong state or with an index the current plan does not have.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no plan is loaded")]
    NoPlan,

    #[error("a replan is already in flight")]
    ReplanInFlight,

    #[error("no replan is in flight")]
    NotReplanning,

    #[error("no candidate plan is awaiting review")]
    NoCandidate,

    #[error("chunk index {0} is out of range")]
    ChunkOutOfRange(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_covers_validation_and_transient() {
        assert!(GenerationError::Validation("bad shape".to_string()).is_retryable());
        assert!(
            GenerationError::Transient {
                status: 503,
                message: "overloaded".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn client_errors_and_cancellation_are_terminal() {
        assert!(
            !GenerationError::Client {
                status: 400,
                message: "bad request".to_string(),
            }
            .is_retryable()
        );
        assert!(!GenerationError::Cancelled.is_retryable());
        assert!(!GenerationError::InvalidConfig("bad key".to_string()).is_retryable());
    }

    #[test]
    fn exhausted_retries_keeps_the_final_error_as_source() {
        let err = GenerationError::ExhaustedRetries {
            attempts: 3,
            source: Box::new(GenerationError::Transient {
                status: 500,
                message: "boom".to_string(),
            }),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "generation failed after 3 attempts");
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("500"));
    }
}
