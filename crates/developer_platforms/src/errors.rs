#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Error types for developer platform and CI provider operations.
///
/// Each variant describes one way a call to a remote platform can fail. The
/// gatekeeper core doesn't retry any of these; it only needs to distinguish
/// "the thing wasn't there" ([`Error::NotFound`]) from every other failure.
///
/// # Examples
///
/// ```rust
/// use ci_gatekeeper_developer_platforms::errors::Error;
///
/// let auth_error = Error::AuthError("Invalid token".to_string());
/// println!("{}", auth_error);
///
/// let rate_limit = Error::RateLimitExceeded;
/// assert_eq!(rate_limit.to_string(), "Rate limit exceeded");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic API request failure.
    ///
    /// Used when an API call failed for a reason that doesn't map onto a more
    /// specific variant. The string carries the platform's description.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Authentication failed with the platform.
    ///
    /// The provided credentials (app key, installation token, personal token) are
    /// invalid, expired, or insufficient for the requested operation.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Failed to create an installation access token for a repository.
    ///
    /// Parameters: repository owner, repository name, installation ID
    #[error("Failed to create an app access token for repository: {0}/{1}. For installation with ID: {2}")]
    FailedToCreateAccessToken(String, String, u64),

    /// Failed to update an issue or pull request.
    ///
    /// Covers labels, comments, state changes and merges. The string parameter
    /// contains the operation that failed.
    #[error("Failed to update the pull request: {0}")]
    FailedToUpdatePullRequest(String),

    /// Invalid response format from the platform API.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource doesn't exist.
    ///
    /// Removing a label that isn't applied produces this error, which callers
    /// that need idempotent behaviour can safely ignore.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Platform rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}
