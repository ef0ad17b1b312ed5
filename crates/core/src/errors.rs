use thiserror::Error;

/// The single failure the orchestrator sees from the completion path.
/// Timeouts, transport failures, bad statuses and malformed payloads all
/// collapse into it; `reason` is for logs only and never shown to users.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("upstream completion unavailable: {reason}")]
    UpstreamUnavailable { reason: String },
}

impl CompletionError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable { reason: reason.into() }
    }
}

/// Outbound delivery failure reported by a transport. The core logs these
/// and moves on; delivery is never retried from here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery rejected by transport ({status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("delivery transport failure: {0}")]
    Transport(String),
    #[error("delivery response could not be decoded: {0}")]
    Decode(String),
}

impl DeliveryError {
    /// Transient failures are worth surfacing louder in logs than
    /// permanent rejections such as a blocked chat.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
            Self::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletionError, DeliveryError};

    #[test]
    fn upstream_unavailable_carries_reason_for_logs() {
        let error = CompletionError::unavailable("timed out after 18s");
        assert_eq!(error.to_string(), "upstream completion unavailable: timed out after 18s");
    }

    #[test]
    fn delivery_error_transience() {
        let throttled =
            DeliveryError::Rejected { status: 429, description: "Too Many Requests".to_owned() };
        let blocked = DeliveryError::Rejected {
            status: 403,
            description: "Forbidden: bot was blocked by the user".to_owned(),
        };

        assert!(throttled.is_transient());
        assert!(!blocked.is_transient());
        assert!(DeliveryError::Transport("connection reset".to_owned()).is_transient());
        assert!(!DeliveryError::Decode("missing result".to_owned()).is_transient());
    }
}
