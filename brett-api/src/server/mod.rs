use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{BytesRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use brett_common::{
    model::{
        Id,
        post::PostMarker,
        session::{SessionTokenDecodeError, SessionTokenHashError},
    },
    sanitize::ValidationError,
    util::PositiveDuration,
};
use brett_db::client::{DbClient, DbError};
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub session_ttl: SessionTtl,
}

/// How long new sessions stay valid; `None` means they never expire.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SessionTtl(pub Option<PositiveDuration>);

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Request body could not be read: {0}")]
    BodyRead(BytesRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonParse(serde_json::Error),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("The identifier is not a valid UUID: {0}")]
    IdentifierFormat(uuid::Error),
    #[error("Authorization header was invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided session token could not be decoded: {0}")]
    InvalidSessionToken(#[from] SessionTokenDecodeError),
    #[error("The session token could not be hashed: {0}")]
    SessionTokenHash(#[from] SessionTokenHashError),
    #[error("Provided session token was invalid")]
    InvalidToken,
    #[error("Authentication is required")]
    Unauthenticated,
    #[error("Creating a private post requires authentication")]
    PrivateRequiresAuth,
    #[error("You do not have access to this post")]
    AccessDenied,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidToken
            | ServerError::Unauthenticated
            | ServerError::PrivateRequiresAuth => StatusCode::UNAUTHORIZED,
            ServerError::AccessDenied => StatusCode::FORBIDDEN,
            ServerError::QueryRejection(_)
            | ServerError::BodyRead(_)
            | ServerError::JsonParse(_)
            | ServerError::Validation(_)
            | ServerError::IdentifierFormat(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidSessionToken(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::SessionTokenHash(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Client errors carry their message; server errors get a generic one
        // so internals never leak into responses.
        let error = if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
            "An internal error occurred.".to_owned()
        } else {
            warn!(error = %self, %status, "Replying with error");
            self.to_string()
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
