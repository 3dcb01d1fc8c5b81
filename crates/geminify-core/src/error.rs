use thiserror::Error;

/// Failure reported by a language-model transport.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Terminal classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    Overloaded,
    Generic,
}

const RATE_LIMIT_MARKER: &str = "429";
const OVERLOADED_MARKER: &str = "The model is overloaded";

impl ErrorKind {
    pub fn classify(message: &str) -> Self {
        if message.contains(RATE_LIMIT_MARKER) {
            ErrorKind::RateLimited
        } else if message.contains(OVERLOADED_MARKER) {
            ErrorKind::Overloaded
        } else {
            ErrorKind::Generic
        }
    }
}

/// Errors surfaced by the response flow.
#[derive(Debug, Clone, Error)]
pub enum GeminiError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("model overloaded: {0}")]
    Overloaded(String),
    #[error("{0}")]
    Generic(String),
    /// The selected text could not be read; the flow continues without it.
    #[error("selected text unavailable: {0}")]
    SelectionUnavailable(String),
    /// The live view rejected a chunk; streaming continues.
    #[error("stream callback failed: {0}")]
    StreamCallbackFault(String),
}

impl From<ApiError> for GeminiError {
    fn from(err: ApiError) -> Self {
        match ErrorKind::classify(&err.message) {
            ErrorKind::RateLimited => GeminiError::RateLimited(err.message),
            ErrorKind::Overloaded => GeminiError::Overloaded(err.message),
            ErrorKind::Generic => GeminiError::Generic(err.message),
        }
    }
}

impl GeminiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeminiError::RateLimited(_) => ErrorKind::RateLimited,
            GeminiError::Overloaded(_) => ErrorKind::Overloaded,
            _ => ErrorKind::Generic,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GeminiError::RateLimited(m)
            | GeminiError::Overloaded(m)
            | GeminiError::Generic(m)
            | GeminiError::SelectionUnavailable(m)
            | GeminiError::StreamCallbackFault(m) => m,
        }
    }

    /// Toast title and optional message for a terminal failure.
    pub fn toast(&self) -> (&'static str, String) {
        match self.kind() {
            ErrorKind::RateLimited => ("You have been rate-limited.", "Please slow down.".to_string()),
            ErrorKind::Overloaded => (
                "Model Overloaded",
                "The model is currently overloaded. Please try again later.".to_string(),
            ),
            ErrorKind::Generic => ("Response Failed", self.message().to_string()),
        }
    }

    /// Markdown rendered in place of a response.
    pub fn explanation(&self) -> &'static str {
        match self.kind() {
            ErrorKind::RateLimited => {
                "## Could not access Gemini.\n\nYou have been rate limited. Please slow down and try again later."
            }
            ErrorKind::Overloaded => {
                "## Could not access Gemini.\n\nThe model is currently overloaded. Please try again later."
            }
            ErrorKind::Generic => {
                "## Could not access Gemini.\n\nThis may be because Gemini has decided that your prompt did not comply with its regulations. Please try another prompt, and if it still does not work, create an issue on GitHub."
            }
        }
    }
}
