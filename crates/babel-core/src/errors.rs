use std::time::Duration;

/// Typed errors for the translation gateway boundary.
/// One attempt per request — failures are reported to the caller verbatim,
/// never retried here.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TranslateError {
    // Caller errors — the request itself is bad
    #[error("no text provided")]
    EmptyInput,
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    // Upstream errors
    #[error("translation service unreachable: {0}")]
    UpstreamUnavailable(String),
    #[error("translation service returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("malformed translation response: {0}")]
    MalformedResponse(String),
    #[error("translation timed out after {0:?}")]
    Timeout(Duration),
}

impl TranslateError {
    /// True when the request was at fault, as opposed to the upstream
    /// service. Drives the HTTP status of the pass-through endpoint.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::UnsupportedLanguage(_))
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::UnsupportedLanguage(_) => "unsupported_language",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify a non-2xx upstream HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            // The keyless endpoint signals unknown language codes as 400
            400 => Self::UnsupportedLanguage(body),
            429 | 500..=599 => Self::UpstreamStatus { status, body },
            _ => Self::MalformedResponse(format!("unexpected status {status}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_error_classification() {
        assert!(TranslateError::EmptyInput.is_caller_error());
        assert!(TranslateError::UnsupportedLanguage("xx".into()).is_caller_error());
        assert!(!TranslateError::UpstreamUnavailable("refused".into()).is_caller_error());
        assert!(!TranslateError::Timeout(Duration::from_secs(10)).is_caller_error());
    }

    #[test]
    fn from_status_mapping() {
        assert!(TranslateError::from_status(400, "bad lang".into()).is_caller_error());
        assert!(matches!(
            TranslateError::from_status(429, "slow down".into()),
            TranslateError::UpstreamStatus { status: 429, .. }
        ));
        assert!(matches!(
            TranslateError::from_status(503, "unavailable".into()),
            TranslateError::UpstreamStatus { status: 503, .. }
        ));
        assert!(matches!(
            TranslateError::from_status(302, "redirect".into()),
            TranslateError::MalformedResponse(_)
        ));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(TranslateError::EmptyInput.error_kind(), "empty_input");
        assert_eq!(
            TranslateError::UpstreamUnavailable("x".into()).error_kind(),
            "upstream_unavailable"
        );
        assert_eq!(
            TranslateError::Timeout(Duration::from_secs(1)).error_kind(),
            "timeout"
        );
    }

    #[test]
    fn display_includes_detail() {
        let err = TranslateError::UpstreamStatus { status: 503, body: "overloaded".into() };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("overloaded"));
    }
}
