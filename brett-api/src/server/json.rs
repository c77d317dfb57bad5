use crate::server::ServerError;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use brett_common::sanitize;
use headers::ContentType;
use serde::{Serialize, de::DeserializeOwned};

/// JSON extractor that enforces the request-body size cap before any parsing
/// happens, as the first line of defense against oversized payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(ServerError::BodyRead)?;

        sanitize::validate_payload_size(&bytes)?;

        let value = serde_json::from_slice(&bytes).map_err(ServerError::JsonParse)?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}
