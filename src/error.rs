use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Inference API unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("Agent analysis incomplete after {0} iterations")]
    AgentLimitExceeded(u32),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TriageError {
    /// Whether a fresh attempt of the same operation may succeed.
    ///
    /// Only endpoint availability and agent exhaustion qualify; everything
    /// else surfaces on the first failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InferenceUnavailable(_) | Self::AgentLimitExceeded(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(TriageError::InferenceUnavailable("timeout".into()).is_retryable());
        assert!(TriageError::AgentLimitExceeded(5).is_retryable());
    }

    #[test]
    fn test_non_retryable_kinds() {
        assert!(!TriageError::Config("missing model".into()).is_retryable());
        assert!(!TriageError::Artifact("bad".into()).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(!TriageError::from(io).is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = TriageError::AgentLimitExceeded(3);
        assert_eq!(err.to_string(), "Agent analysis incomplete after 3 iterations");
    }
}
