use reqwest::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
    #[error("capture cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("{}", network_message(.url, .attempts, .last_status))]
    Network {
        url: String,
        attempts: u32,
        last_status: Option<StatusCode>,
    },

    #[error("playlist {url} is unusable: {reason}")]
    Manifest { url: String, reason: String },

    #[error("master playlist {url} lists no resolvable variants")]
    NoVariants { url: String },

    #[error("playlist {url} contains no media segments")]
    NoSegments { url: String },

    #[error("no media data: {reason}")]
    EmptyArtifact { reason: String },

    #[error("invalid output filename `{name}`")]
    InvalidFilename { name: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

fn network_message(url: &str, attempts: &u32, last_status: &Option<StatusCode>) -> String {
    match last_status {
        Some(status) => {
            format!("fetching {url} failed after {attempts} attempt(s), last status {status}")
        }
        None => format!("fetching {url} failed after {attempts} attempt(s)"),
    }
}

impl SpoolError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn network(url: impl Into<String>, attempts: u32, last_status: Option<StatusCode>) -> Self {
        Self::Network {
            url: url.into(),
            attempts,
            last_status,
        }
    }

    pub fn manifest(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn empty_artifact(reason: impl Into<String>) -> Self {
        Self::EmptyArtifact {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether a fresh attempt at the same operation could succeed.
    ///
    /// Only fetch-level failures qualify; playlist and assembly failures are
    /// properties of the content and repeat deterministically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Network { last_status, .. } => match last_status {
                Some(status) => {
                    status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
                }
                None => true,
            },
            Self::Cancelled
            | Self::InvalidUrl { .. }
            | Self::Manifest { .. }
            | Self::NoVariants { .. }
            | Self::NoSegments { .. }
            | Self::EmptyArtifact { .. }
            | Self::InvalidFilename { .. }
            | Self::InvalidInput { .. }
            | Self::Configuration { .. }
            | Self::Io { .. } => false,
        }
    }
}
