use thiserror::Error;

/// Failures while retrieving a page, before any text reaches the model.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{url} took longer than {timeout_secs}s to respond")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("browser session failed: {0}")]
    Browser(String),
}

/// Failures from the hosted text-generation endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("no API token configured; set LEADWARM_API_TOKEN (or HF_TOKEN)")]
    MissingCredential,

    #[error("inference endpoint rejected the credential: {0}")]
    Auth(String),

    #[error("inference endpoint rate-limited the request: {0}")]
    RateLimited(String),

    #[error("inference request failed: {0}")]
    Remote(String),

    #[error("inference endpoint returned an empty completion")]
    EmptyCompletion,
}

/// Union of the stage failures a single request can surface to the UI.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Model(#[from] crate::inference::UnknownModel),
}
