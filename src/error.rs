use thiserror::Error;

/// Failures surfaced by the gateway request path.
///
/// Login failures are not here on purpose: the authenticator reports them as a
/// tagged [`LoginOutcome`](crate::auth::LoginOutcome) instead of an `Err`, so
/// callers always get a result they can render.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No access token in the store. Raised before any network I/O happens.
    #[error("not authenticated: no access token stored, log in first")]
    NotAuthenticated,

    /// Non-2xx response from the gateway. `status` renders as e.g.
    /// "404 Not Found"; `body` is whatever diagnostic text we could read.
    #[error("HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Network unreachable, connection reset, malformed response body.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A request body that would not serialize. Practically unreachable for
    /// the fixed body types, but the conversion is fallible.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}
