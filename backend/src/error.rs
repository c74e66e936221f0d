use thiserror::Error;

/// Failure of a single call to the geocoding or directions provider.
///
/// Never shown to the user: the discovery service logs it and falls back to
/// the static catalog.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("provider rate limit exceeded (429)")]
    RateLimited,
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed provider payload: {0}")]
    Malformed(String),
    #[error("provider returned no results")]
    Empty,
    #[error("live routing path panicked")]
    Panicked,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read route catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("route catalog is not a JSON array of routes: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Rejected distance input; recovered by re-prompting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistanceError {
    #[error("`{0}` is not a number")]
    Malformed(String),
    #[error("{0} km is outside the accepted range")]
    OutOfRange(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriteriaError {
    #[error("city must not be empty")]
    EmptyCity,
    #[error("distance must be between {min} and {max} km, got {value}")]
    DistanceOutOfRange { value: f64, min: f64, max: f64 },
}
