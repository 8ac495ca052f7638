use thiserror::Error;

/// Unified error taxonomy for the core. Every crate in the workspace has
/// its own local error enum for the failures specific to its layer; those
/// convert into `CoreError` via `#[from]` at the boundary where they cross
/// into shared/ orchestration code, mirroring how `ochra-invite::InviteError`
/// wraps `ochra_crypto::CryptoError`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Connection, DNS, TCP, TLS failures. Retried inside the transport
    /// layer before ever reaching a caller.
    #[error("network error: {0}")]
    NetworkError(String),

    /// Malformed envelope, padding failure, or JSON parse failure. Never
    /// retried — surfaces immediately.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Server signalled a stale session. The transport invalidates the
    /// held session as a side effect of returning this variant.
    #[error("session expired")]
    SessionExpired,

    /// Any non-zero server response code not otherwise classified.
    #[error("api error {code} on {endpoint}: {message}")]
    ApiError {
        code: i64,
        endpoint: String,
        message: String,
    },

    /// Server code 5005.
    #[error("control password wrong")]
    ControlPasswordWrong,

    /// Server code 5006. Terminal for the core instance: once observed,
    /// further command executions are rejected locally.
    #[error("control password locked")]
    ControlPasswordLocked,

    /// Server code 6024, exhausted after the orchestrator's retry budget.
    #[error("rate limited")]
    RateLimited,

    /// Server code 1001 on control endpoints, or a command known to be
    /// unsupported under the caller's current permission profile.
    #[error("endpoint not supported")]
    EndpointNotSupported,

    /// Command deadline or HTTP wall timeout elapsed.
    #[error("timeout")]
    Timeout,

    /// Server reported `controlState=2` for a triggered remote command.
    #[error("remote control failure")]
    RemoteControlFailure,

    /// No session is held and the endpoint requires authentication.
    #[error("session required")]
    SessionRequired,

    /// A command was requested while no valid session/config was present
    /// for it to operate against.
    #[error("invalid state: {0}")]
    InvalidState(String),
}
