use std::time::Duration;

use hyper::{Response, StatusCode};

use crate::{BoxError, RgBody, RgResponse, RgResponseExt};

/// Errors raised while building the route table or handling a request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("[Rg.Route] route `{route}`: unknown predicate `{name}`")]
    UnknownPredicate { route: String, name: String },
    #[error("[Rg.Route] route `{route}`: unknown filter `{name}`")]
    UnknownFilter { route: String, name: String },
    #[error("[Rg.Route] route `{route}`: cannot bind `{name}`: {message}")]
    Binding { route: String, name: String, message: String },
    #[error("[Rg.Route] route `{route}`: invalid uri `{uri}`: {message}")]
    InvalidUri { route: String, uri: String, message: String },
    #[error("[Rg.Predicate] {0}")]
    Predicate(#[source] BoxError),
    #[error("[Rg.Upstream] response took longer than timeout: {0:?}")]
    UpstreamTimeout(Duration),
    #[error("[Rg.Upstream] {0}")]
    Upstream(#[source] BoxError),
    #[error("[Rg.Filter] {message}")]
    Status { status: StatusCode, message: String },
    #[error("[Rg.Internal] {0}")]
    Internal(#[source] BoxError),
}

impl GatewayError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }
    pub fn internal(error: impl Into<BoxError>) -> Self {
        Self::Internal(error.into())
    }
    pub fn upstream(error: impl Into<BoxError>) -> Self {
        Self::Upstream(error.into())
    }

    /// Whether this error comes from route configuration rather than request handling.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPredicate { .. } | Self::UnknownFilter { .. } | Self::Binding { .. } | Self::InvalidUri { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Status { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render this error as a response for the downstream client.
    pub fn to_response(&self) -> RgResponse {
        Response::<RgBody>::with_code_message(self.status_code(), self.to_string())
    }
}
