use crate::server::{Result, ServerError, ServerRouter, SessionTtl, auth::Subject, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use brett_common::{
    model::{
        session::{Identity, Session, SessionToken},
        user::{IdentityPayload, User},
    },
    sanitize::{self, MAX_AUTHOR_LEN},
};
use brett_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;
use uuid::Uuid;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(sync_user).typed_get(me)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/users/sync", rejection(ServerError))]
struct SyncUserPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct SyncUserResponse {
    user: User,
    session_token: String,
}

/// Reconciles an externally supplied identity: upserts the user record keyed
/// by the identifier, then projects the result into a fresh session whose
/// token is returned to the caller. Replies 201 when the user record was
/// newly created and 200 when it was updated.
async fn sync_user(
    SyncUserPath(): SyncUserPath,
    State(db): State<Arc<DbClient>>,
    State(SessionTtl(session_ttl)): State<SessionTtl>,
    Json(payload): Json<IdentityPayload>,
) -> Result<(StatusCode, Json<SyncUserResponse>)> {
    let user_id =
        Uuid::try_parse(payload.identifier.trim()).map_err(ServerError::IdentifierFormat)?;
    let display_name = sanitize::sanitize_text(
        Some(&payload.display_name),
        MAX_AUTHOR_LEN,
        "display_name",
        false,
    )?;

    let (user, created) = db
        .upsert_user(user_id, &display_name, payload.is_admin)
        .await?;

    let token = SessionToken::generate_random(user.id);
    let session = Session {
        token_hash: token.hash()?,
        identity: user.identity(),
        created_at: UtcDateTime::now(),
        expires_after: session_ttl,
    };
    db.create_session(&session).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SyncUserResponse {
            user,
            session_token: token.as_token_str(),
        }),
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/users/me", rejection(ServerError))]
struct MePath();

async fn me(MePath(): MePath, subject: Subject) -> Result<Json<Identity>> {
    Ok(Json(subject.require()?))
}
