// errors.rs
use thiserror::Error;

/// Why a toggle action did not change any state.
#[derive(Error, Debug)]
pub enum ToggleError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("API rejected the request: {0}")]
    Rejected(String),

    #[error("Invalid API url: {0}")]
    InvalidUrl(String),

    // A newer action for the same item was already confirmed when this one resolved
    #[error("Response for request #{ticket} superseded by confirmed request #{latest}")]
    Superseded { ticket: u64, latest: u64 },

    #[error("Controller was detached before the response arrived")]
    Detached,

    #[error("Unknown action descriptor: {0}")]
    UnknownAction(String),
}

impl ToggleError {
    /// Failures of the call itself, as opposed to the server reporting an error.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ToggleError::Transport(_) | ToggleError::Status { .. } | ToggleError::MalformedResponse(_)
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindingError {
    #[error("Missing `{target}` target for controller `{identifier}`")]
    MissingTarget { identifier: &'static str, target: &'static str },

    #[error("Missing `data-{identifier}-{key}` attribute")]
    MissingData { identifier: &'static str, key: &'static str },

    #[error("Element no longer exists in the document")]
    Detached,
}

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Failed to read page snapshot: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse page snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid session cookie value")]
    InvalidCookie(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Base url cannot carry paths: {0}")]
    CannotBeABase(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to set up logging: {0}")]
    Logging(#[from] fern::InitError),

    #[error("Logger already installed: {0}")]
    LoggerInstalled(#[from] log::SetLoggerError),
}
