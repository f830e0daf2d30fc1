use thiserror::Error;

/// Message returned to callers when a failure looks like a connectivity problem.
pub const CONNECTION_FAILED_MESSAGE: &str =
    "Connection failed: unable to reach the prediction or language model service. Please try again later.";

/// Message returned to callers for every other server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Substrings that mark an error as network-related.
const NETWORK_MARKERS: &[&str] = &[
    "connection",
    "connect",
    "network",
    "timed out",
    "timeout",
    "dns",
    "error sending request",
    "econnrefused",
    "econnreset",
    "enotfound",
    "fetch failed",
    "unreachable",
];

#[derive(Debug, Error)]
pub enum CounselError {
    /// Missing or empty required request field.
    #[error("{0}")]
    InvalidInput(String),

    /// Transport failure or non-2xx from an upstream service.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Model output that is not JSON.
    #[error("model output is not valid JSON: {0}")]
    Parse(String),

    /// Model output that does not match the expected schema.
    #[error("model output failed schema validation: {0}")]
    Schema(String),

    #[error("no language model credentials configured")]
    MissingCredentials,

    /// Every model strategy was attempted and none produced usable output.
    #[error("all model strategies failed: {}", join_failures(.0))]
    StrategiesExhausted(Vec<StrategyFailure>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CounselError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }

    /// Caller-facing message. Server-side details are only ever logged.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            _ if self.is_network_failure() => CONNECTION_FAILED_MESSAGE.to_string(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// Transport-class failures only; parse and schema text is never sniffed.
    pub fn is_network_failure(&self) -> bool {
        match self {
            Self::Upstream(text) => looks_like_network_error(text),
            Self::Internal(e) => looks_like_network_error(&format!("{e:#}")),
            Self::StrategiesExhausted(failures) => {
                failures.iter().any(|f| f.error.is_network_failure())
            }
            Self::InvalidInput(_)
            | Self::Parse(_)
            | Self::Schema(_)
            | Self::MissingCredentials => false,
        }
    }
}

/// One strategy's failure inside [`CounselError::StrategiesExhausted`].
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: CounselError,
}

impl StrategyFailure {
    pub fn new(strategy: impl Into<String>, error: CounselError) -> Self {
        Self {
            strategy: strategy.into(),
            error,
        }
    }
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Substring sniffing over an error's text, case-insensitive.
pub fn looks_like_network_error(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    NETWORK_MARKERS.iter().any(|m| lower.contains(m))
}
