use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::TypedHeader;
use brett_common::model::session::{Identity, SessionToken};
use brett_db::client::DbClient;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The request's resolved subject: the projected session identity for
/// callers presenting a valid bearer token, or nothing for anonymous ones.
/// A missing header is not an error since most routes are public; a header
/// that is present but invalid is.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Subject(Option<Identity>);

impl Subject {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }

    pub fn require(self) -> Result<Identity, ServerError> {
        self.0.ok_or(ServerError::Unauthenticated)
    }
}

impl<S> FromRequestParts<S> for Subject
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(Self(None));
        }

        let request_token = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let token: SessionToken = request_token.token().parse()?;
        let token_hash = token.hash()?;

        let session = Arc::<DbClient>::from_ref(state)
            .fetch_session(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if session.is_expired(UtcDateTime::now()) {
            return Err(ServerError::InvalidToken);
        }

        Ok(Self(Some(session.identity)))
    }
}
