use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use brett_common::model::tag::Tag;
use brett_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(list_tags)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/tags", rejection(ServerError))]
struct ListTagsPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct TagListResponse {
    tags: Vec<Tag>,
}

async fn list_tags(
    ListTagsPath(): ListTagsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<TagListResponse>> {
    let tags = db.list_tags().await?;

    Ok(Json(TagListResponse { tags }))
}
